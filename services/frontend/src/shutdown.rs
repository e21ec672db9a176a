//! Full-process shutdown collaborator.

use tracing::error;

/// Escalation point for configuration-fatal errors.
pub trait ShutdownTrigger: Send + Sync {
    /// Begin a full shutdown. Production implementations do not return.
    fn full_shutdown(&self, reason: &str);
}

/// Logs the reason and exits the process with status 1.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessShutdown;

impl ShutdownTrigger for ProcessShutdown {
    fn full_shutdown(&self, reason: &str) {
        error!(reason = %reason, "Full shutdown");
        std::process::exit(1);
    }
}
