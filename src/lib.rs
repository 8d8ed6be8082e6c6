// THEORY:
// This file is the main entry point for the `ocean_lens` library crate. It
// exposes the `AnalysisPipeline` (synchronous, pure) and the `ParallelPipeline`
// (async façade that resolves external inputs) as the high-level interface of
// the engine, together with the configuration and error types they use.
//
// The stage modules under `core_modules` stay public so callers can reuse a
// single stage (decoding a colour, sampling a tile, scoring a section), but
// the intended entry point is the pipeline.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
pub use parallel_pipeline::{AreaQuery, DataSource, OfflineSource, ParallelPipeline};
pub use pipeline::{AnalysisPipeline, AnalysisReport, AnalysisRequest};
