use std::io;
use std::sync::Arc;

/// Why a launch did not become ready.
///
/// `Clone` so the same failure can be observed by every waiter of a
/// [`Deferred`](crate::deferred::Deferred); I/O errors are shared behind an `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LaunchError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("{label}: process error: {source}")]
    Process {
        label: String,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("{label}: exited before becoming ready ({status})")]
    Exited { label: String, status: String },

    #[error("{label}: stopped before becoming ready")]
    Stopped { label: String },

    #[error("readiness result dropped before the launch settled")]
    Abandoned,
}

impl LaunchError {
    pub fn spawn(program: impl Into<String>, source: io::Error) -> Self {
        LaunchError::Spawn {
            program: program.into(),
            source: Arc::new(source),
        }
    }

    pub fn process(label: impl Into<String>, source: io::Error) -> Self {
        LaunchError::Process {
            label: label.into(),
            source: Arc::new(source),
        }
    }
}
