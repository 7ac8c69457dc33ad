//! Contract for the external image-restoration job API (create + poll).

/// Opaque handle to a submitted restoration job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Provider-assigned job identifier.
    pub id: String,
}

/// Job state as reported by the provider, validated at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Accepted but not yet running.
    Queued,
    /// Currently executing.
    Running,
    /// Finished with an output locator.
    Succeeded { output_url: String },
    /// Finished unsuccessfully. The provider's message is considered safe
    /// to relay to the user.
    Failed { message: String },
    /// Cancelled on the provider side.
    Canceled,
}

impl JobStatus {
    /// Whether the job can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded { .. } | JobStatus::Failed { .. } | JobStatus::Canceled
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The HTTP request itself failed (network, DNS, TLS).
    #[error("Inference request failed: {0}")]
    Transport(String),

    /// The provider returned a non-2xx status.
    #[error("Inference provider error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The provider returned a payload we do not recognize. Never partially
    /// trusted; the job is treated as failed.
    #[error("Unrecognized job payload: {0}")]
    UnexpectedPayload(String),
}

/// Submit-and-poll client for the restoration inference service.
#[async_trait::async_trait]
pub trait RestorationJobs: Send + Sync {
    /// Submit an image for restoration; returns the provider's job handle.
    async fn submit(&self, image: &[u8], content_type: &str) -> Result<JobHandle, JobError>;

    /// Fetch the current status of a submitted job.
    async fn status(&self, job: &JobHandle) -> Result<JobStatus, JobError>;
}
