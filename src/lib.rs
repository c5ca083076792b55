pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::ToolConfig;
pub use core::{
    engine::UpscaleEngine,
    handler::RequestHandler,
    normalizer::{normalize, RawRequest},
    orchestrator::Orchestrator,
    resolver::resolve,
};
pub use domain::model::{OutputOutcome, ProbeResult, ResolvedPlan, Resolution, ScaleRequest};
pub use utils::error::{Result, UpscaleError};
