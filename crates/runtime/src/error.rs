//! Error types for the indiserver runtime.

use std::path::PathBuf;

use indictl_protocol::ProtocolError;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the indiserver runtime.
#[derive(Debug, Error)]
pub enum Error {
	/// A required executable was not found on PATH or in common locations.
	#[error("{0} not found. Install INDI or put it on PATH.")]
	ExecutableNotFound(String),

	/// Failed to launch the server process.
	#[error("Failed to launch indiserver: {0}")]
	LaunchFailed(String),

	/// The command pipe could not be created or written.
	#[error("Command pipe error at {path}: {source}")]
	Pipe {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// An operational-rule script failed.
	#[error("{stage} script {script} failed: {reason}")]
	HookFailed {
		stage: crate::hooks::HookStage,
		script: PathBuf,
		reason: String,
	},

	/// A companion client invocation failed.
	#[error("{program} failed: {reason}")]
	ClientFailed { program: String, reason: String },

	/// A companion client produced output that could not be parsed.
	#[error("Unexpected output from {program}: {output:?}")]
	UnexpectedOutput { program: String, output: String },

	/// Invalid descriptor for a FIFO command.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	/// Returns true if this error came from a hook script.
	pub fn is_hook_failure(&self) -> bool {
		matches!(self, Error::HookFailed { .. })
	}
}
