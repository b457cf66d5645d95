//! `indiserver` FIFO command lines.
//!
//! The server reads one directive per line from its command pipe:
//!
//! ```text
//! start <binary>[ -s "<skeleton>"][ -n "<label>"]
//! stop <binary>[ -n "<label>"]
//! ```

use std::fmt;

use thiserror::Error;

use crate::descriptor::DriverDescriptor;

/// Errors building a command from a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
	/// The descriptor has no executable to start or stop.
	#[error("driver '{label}' is missing its binary field; is it installed?")]
	MissingBinary { label: String },
}

/// One FIFO directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCommand {
	Start {
		binary: String,
		skeleton: Option<String>,
		label: Option<String>,
	},
	Stop {
		binary: String,
		label: Option<String>,
	},
}

impl DriverCommand {
	/// Builds the `start` directive for `driver`.
	///
	/// The instance label is omitted for remote and MDPD drivers.
	pub fn start(driver: &DriverDescriptor) -> Result<Self, ProtocolError> {
		let binary = require_binary(driver)?;
		Ok(Self::Start {
			binary,
			skeleton: driver
				.skeleton
				.as_ref()
				.map(|path| path.to_string_lossy().into_owned()),
			label: driver
				.accepts_instance_label()
				.then(|| driver.label.clone()),
		})
	}

	/// Builds the `stop` directive for `driver`.
	///
	/// `instance_label` replaces the driver label in the `-n` flag, which is
	/// still omitted for remote and MDPD drivers.
	pub fn stop(driver: &DriverDescriptor, instance_label: Option<&str>) -> Result<Self, ProtocolError> {
		let binary = require_binary(driver)?;
		Ok(Self::Stop {
			binary,
			label: driver
				.accepts_instance_label()
				.then(|| instance_label.unwrap_or(&driver.label).to_string()),
		})
	}

	/// Returns the executable this directive targets.
	pub fn binary(&self) -> &str {
		match self {
			Self::Start { binary, .. } | Self::Stop { binary, .. } => binary,
		}
	}

	/// Returns the line with every `"` backslash-escaped.
	///
	/// This is the form embedded in `echo "<line>" > <fifo>`; the shell
	/// removes the escapes, so the pipe receives [`Display`](fmt::Display) output.
	pub fn escaped(&self) -> String {
		self.to_string().replace('"', "\\\"")
	}
}

fn require_binary(driver: &DriverDescriptor) -> Result<String, ProtocolError> {
	driver
		.binary()
		.map(str::to_string)
		.ok_or_else(|| ProtocolError::MissingBinary {
			label: driver.label.clone(),
		})
}

impl fmt::Display for DriverCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Start {
				binary,
				skeleton,
				label,
			} => {
				write!(f, "start {binary}")?;
				if let Some(skeleton) = skeleton {
					write!(f, " -s \"{skeleton}\"")?;
				}
				if let Some(label) = label {
					write!(f, " -n \"{label}\"")?;
				}
				Ok(())
			}
			Self::Stop { binary, label } => {
				write!(f, "stop {binary}")?;
				if let Some(label) = label {
					write!(f, " -n \"{label}\"")?;
				}
				Ok(())
			}
		}
	}
}
