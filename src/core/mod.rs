pub mod engine;
pub mod handler;
pub mod normalizer;
pub mod orchestrator;
pub mod resolver;

pub use crate::domain::model::{OutputOutcome, ProbeResult, ResolvedPlan, ScaleRequest};
pub use crate::domain::ports::{FormatConverter, ImageProbe, ProcessRunner};
pub use crate::utils::error::Result;
