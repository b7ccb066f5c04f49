//! Core translation engine module

pub mod cache;
pub mod config;
pub mod errors;
#[cfg(feature = "marian")]
pub mod marian;
pub mod models;
pub mod pipeline;
pub mod pool;
pub mod registry;
pub mod splitter;
pub mod unit;

#[cfg(test)]
pub(crate) mod testing;
