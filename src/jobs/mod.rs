//! Job management: the store, per-IP rate limiting, and the pipeline
//! orchestrator that drives each research job through its stages.

mod orchestrator;
mod ratelimit;
mod store;

pub use orchestrator::{JobRequest, ResearchPipeline};
pub use ratelimit::RateLimiter;
pub use store::JobStore;
