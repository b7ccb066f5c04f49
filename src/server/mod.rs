//! HTTP server module

pub mod api;
