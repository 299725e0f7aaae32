//! Crawl job lifecycle states
//!
//! A job moves `Queued -> Running -> {Completed, Error}`. A re-crawl request
//! returns a job that is not running to `Queued`; a running job only goes back
//! once its claim is stale.

use std::fmt;

/// Represents the current state of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Submitted (or re-submitted) and waiting for an attempt
    Queued,

    /// Claimed by exactly one attempt; result fields are not final
    Running,

    /// The last attempt finished every stage
    Completed,

    /// The last attempt failed; the job carries an error message
    Error,
}

impl JobStatus {
    /// Returns true if an attempt has finished for this job
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns true if this job is waiting for or undergoing an attempt
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Returns true if the transition `self -> next` is allowed
    ///
    /// Re-queueing is an external transition and is allowed from anywhere except
    /// `Running`, so an in-progress attempt is never orphaned.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (Self::Queued, Self::Running) => true,
            (Self::Running, Self::Completed | Self::Error) => true,
            (Self::Queued | Self::Completed | Self::Error, Self::Queued) => true,
            _ => false,
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_statuses() -> [Self; 4] {
        [Self::Queued, Self::Running, Self::Completed, Self::Error]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_string(&s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown job status '{}'", s))
    }
}
