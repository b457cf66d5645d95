use std::path::PathBuf;

use indictl_runtime::HookStage;
use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("failed to read config {path}: {source}")]
	ConfigRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid config {path}: {source}")]
	ConfigParse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("no driver matches {}", .0.join(", "))]
	UnknownDrivers(Vec<String>),

	#[error("no indiserver running on port {port}")]
	ServerNotRunning { port: u16 },

	#[error("driver {label} has no executable")]
	MissingBinary { label: String },

	#[error("{stage} hook for {label} failed: {reason}")]
	HookAborted {
		label: String,
		stage: HookStage,
		reason: String,
	},

	#[error(transparent)]
	Catalog(#[from] indictl_catalog::Error),

	#[error(transparent)]
	Runtime(#[from] indictl_runtime::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	/// Converts this error to a CommandError for structured output.
	pub fn to_command_error(&self) -> CommandError {
		let code = match self {
			CliError::ConfigRead { .. } | CliError::ConfigParse { .. } | CliError::Catalog(_) => {
				ErrorCode::ConfigError
			}
			CliError::UnknownDrivers(_) => ErrorCode::UnknownDriver,
			CliError::ServerNotRunning { .. } => ErrorCode::ServerNotRunning,
			CliError::MissingBinary { .. } | CliError::HookAborted { .. } => ErrorCode::DriverNotIssued,
			CliError::Runtime(err) => match err {
				indictl_runtime::Error::ExecutableNotFound(_) | indictl_runtime::Error::LaunchFailed(_) => {
					ErrorCode::ServerLaunchFailed
				}
				indictl_runtime::Error::Pipe { .. } => ErrorCode::PipeError,
				indictl_runtime::Error::ClientFailed { .. } | indictl_runtime::Error::UnexpectedOutput { .. } => {
					ErrorCode::ClientFailed
				}
				indictl_runtime::Error::HookFailed { .. } | indictl_runtime::Error::Protocol(_) => {
					ErrorCode::DriverNotIssued
				}
				indictl_runtime::Error::Io(_) => ErrorCode::IoError,
			},
			CliError::Io(_) => ErrorCode::IoError,
			CliError::Anyhow(_) => ErrorCode::InternalError,
		};

		CommandError {
			code,
			message: self.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_drivers_are_listed() {
		let err = CliError::UnknownDrivers(vec!["Foo".into(), "Bar".into()]);
		let cmd = err.to_command_error();
		assert_eq!(cmd.code, ErrorCode::UnknownDriver);
		assert_eq!(cmd.message, "no driver matches Foo, Bar");
	}

	#[test]
	fn launch_failures_map_to_server_code() {
		let err = CliError::from(indictl_runtime::Error::LaunchFailed("exited".into()));
		assert_eq!(err.to_command_error().code, ErrorCode::ServerLaunchFailed);
	}

	#[test]
	fn context_failures_are_internal_errors() {
		use anyhow::Context;

		let err: CliError = Err::<(), _>(std::io::Error::other("no signal driver"))
			.context("failed to listen for Ctrl-C")
			.unwrap_err()
			.into();
		let cmd = err.to_command_error();
		assert_eq!(cmd.code, ErrorCode::InternalError);
		assert_eq!(cmd.message, "failed to listen for Ctrl-C");
	}

	#[test]
	fn hook_abort_names_stage() {
		let err = CliError::HookAborted {
			label: "CCD Simulator".into(),
			stage: HookStage::Pre,
			reason: "exited with exit status: 1".into(),
		};
		assert_eq!(err.to_command_error().code, ErrorCode::DriverNotIssued);
		assert!(err.to_string().starts_with("Pre hook for CCD Simulator failed"));
	}
}
