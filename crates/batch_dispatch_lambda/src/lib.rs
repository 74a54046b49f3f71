//! AWS-oriented adapters and handlers for the batch dispatch functions.
//!
//! This crate owns runtime integration details (Lambda handlers, S3 listing,
//! SQS sends, and the consumer's copy step) on top of the pure primitives in
//! `batch_dispatch_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;
