//! Subcast exporter library
//!
//! This module re-exports the daemon's modules for integration testing.

pub mod config;
pub mod dispatcher;
pub mod ingest;
pub mod result;
pub mod sinks;

pub use config::OutputConfig;
pub use dispatcher::{FormattedResult, ResultDispatcher};
pub use result::{format_seconds, TranslationResult};
pub use sinks::{Sink, SinkError, SinkSet};
