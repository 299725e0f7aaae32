//! State module for tracking crawl job progress
//!
//! `JobStatus` is the lifecycle of a single crawl job, together with the table of
//! transitions the orchestrator and the caller-facing service are allowed to make.

mod job_status;

pub use job_status::JobStatus;
