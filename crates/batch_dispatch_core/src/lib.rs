//! Shared batch dispatch domain primitives.
//!
//! This crate owns the request/response contracts, the document transformer,
//! the size-bounded batch builder, send accounting, and the derived queue
//! topology. It intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod batching;
pub mod contract;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod template;
pub mod topology;

pub use error::PipelineError;
