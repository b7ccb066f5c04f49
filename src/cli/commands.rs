//! CLI command definitions and handlers

use anyhow::Context;
use clap::Subcommand;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::core::cache::{ModelCache, ModelFiles};
use crate::core::config::{ModelsConfig, ServiceConfig};
use crate::core::models::{DeviceKind, Direction};
use crate::core::pipeline::TranslationPipeline;
use crate::core::pool::WorkerPool;
use crate::core::registry::{ModelLoader, ModelRegistry};

/// Commands for the opus translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP API server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Translate text or a file once and print the result
    Translate {
        /// Direction: de-en or en-de
        #[arg(short, long)]
        direction: String,

        /// Execution device: cpu or gpu
        #[arg(long, default_value = "cpu")]
        device: String,

        /// Text to translate
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,

        /// File to translate
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Write the translation here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download the opus-mt models into the local cache
    InstallModels {
        /// Only install this direction (default: all)
        #[arg(short, long)]
        direction: Option<String>,
    },
}

/// Handle server command
pub async fn handle_serve(
    mut config: ServiceConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    use crate::server::api::run_server;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let registry = load_registry(config.models.clone()).await?;

    println!(
        "🚀 Server starting on http://{}:{}",
        config.server.host, config.server.port
    );
    run_server(config, registry).await
}

/// Handle one-shot translation command
pub async fn handle_translate(
    config: ServiceConfig,
    direction: String,
    device: String,
    text: Option<String>,
    file: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let direction: Direction = direction.parse()?;
    let device: DeviceKind = device.parse()?;

    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(file)) => tokio::fs::read_to_string(&file)
            .await
            .with_context(|| format!("failed to read {}", file.display()))?,
        (None, None) => anyhow::bail!("either --text or --file is required"),
    };

    let translation = translate_once(&config, model_loader, direction, device, &text).await?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, &translation)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("✅ Translation written to {}", path.display());
        }
        None => println!("{}", translation),
    }

    Ok(())
}

/// Handle install-models command
pub async fn handle_install_models(
    config: ServiceConfig,
    direction: Option<String>,
) -> anyhow::Result<()> {
    let directions = match direction {
        Some(direction) => vec![direction.parse::<Direction>()?],
        None => config.models.directions.clone(),
    };
    let cache_dir = config.models.cache_dir()?;

    // cached-path downloads block, keep them off the async workers
    tokio::task::spawn_blocking(move || install_models(cache_dir, &directions)).await?
}

fn install_models(cache_dir: PathBuf, directions: &[Direction]) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let cache = ModelCache::new(&cache_dir)?;
    info!(cache = %cache.root().display(), "Using model cache");

    for &direction in directions {
        let files = ModelFiles::for_direction(direction);
        let missing: Vec<_> = files
            .all()
            .into_iter()
            .filter(|file| !cache.is_cached(file))
            .collect();

        if missing.is_empty() {
            println!("✔ Model already downloaded: {}", direction.model_id());
            continue;
        }

        println!("⬇ Downloading model: {}", direction.model_id());
        let pb = ProgressBar::new(missing.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=>-"),
        );

        for file in missing {
            pb.set_message(file.name().to_string());
            cache
                .download(file)
                .with_context(|| format!("failed to download {}", file.url))?;
            pb.inc(1);
        }

        pb.finish_with_message("done");
    }

    Ok(())
}

/// Load only the model this run needs and translate `text` with it
async fn translate_once<F>(
    config: &ServiceConfig,
    make_loader: F,
    direction: Direction,
    device: DeviceKind,
    text: &str,
) -> anyhow::Result<String>
where
    F: FnOnce(&ModelsConfig) -> anyhow::Result<Box<dyn ModelLoader>> + Send + 'static,
{
    let models = ModelsConfig {
        devices: vec![device],
        directions: vec![direction],
        warm_up: false,
        ..config.models.clone()
    };
    let registry = build_registry(models, make_loader).await?;
    let unit = registry.lookup(device, direction)?;

    let mut pipeline = TranslationPipeline::new(WorkerPool::new(config.pipeline.max_workers));
    if let Some(timeout) = config.pipeline.timeout() {
        pipeline = pipeline.with_timeout(timeout);
    }

    let start_time = Instant::now();
    let translation = pipeline.translate_text(text, unit).await?;
    info!(elapsed_ms = start_time.elapsed().as_millis() as u64, "Translation finished");

    Ok(translation)
}

/// Load every configured model, failing if none could be loaded
pub async fn load_registry(models: ModelsConfig) -> anyhow::Result<ModelRegistry> {
    let registry = build_registry(models, model_loader).await?;
    if registry.is_empty() {
        anyhow::bail!("no models were loaded");
    }
    Ok(registry)
}

/// Build the registry on a blocking thread, model loading downloads and
/// reads weights synchronously. The loader lives and dies on that thread too.
async fn build_registry<F>(models: ModelsConfig, make_loader: F) -> anyhow::Result<ModelRegistry>
where
    F: FnOnce(&ModelsConfig) -> anyhow::Result<Box<dyn ModelLoader>> + Send + 'static,
{
    tokio::task::spawn_blocking(move || -> anyhow::Result<ModelRegistry> {
        let loader = make_loader(&models)?;
        Ok(ModelRegistry::load(&models, loader.as_ref())?)
    })
    .await?
}

#[cfg(feature = "marian")]
fn model_loader(models: &ModelsConfig) -> anyhow::Result<Box<dyn ModelLoader>> {
    let cache = ModelCache::new(models.cache_dir()?)?;
    info!(cache = %cache.root().display(), "Using model cache");
    Ok(Box::new(crate::core::marian::MarianLoader::new(cache)))
}

#[cfg(not(feature = "marian"))]
fn model_loader(_models: &ModelsConfig) -> anyhow::Result<Box<dyn ModelLoader>> {
    anyhow::bail!("built without a model backend, rebuild with `--features marian`")
}
