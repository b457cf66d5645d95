//! Result envelope and printing for CLI commands.
//!
//! With `--format json` every command prints one envelope on stdout:
//!
//! ```json
//! { "ok": true, "command": "server.status", "data": { ... } }
//! ```
//!
//! and on failure:
//!
//! ```json
//! { "ok": false, "command": "driver.start", "error": { "code": "UNKNOWN_DRIVER", "message": "..." } }
//! ```
//!
//! Text format prints the data through its [`TextOutput`] impl instead.


use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON envelope
	Json,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}

/// Human-readable rendering of command data.
pub trait TextOutput {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()>;
}

impl TextOutput for () {
	fn write_text(&self, _out: &mut dyn Write) -> io::Result<()> {
		Ok(())
	}
}

/// Envelope returned by every command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T> {
	pub ok: bool,

	/// Dotted command name (e.g. "drivers.list", "server.start")
	pub command: String,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Driver directory or configuration could not be read
	ConfigError,
	/// No driver matches the given label
	UnknownDriver,
	/// indiserver could not be started
	ServerLaunchFailed,
	/// No indiserver serves the port
	ServerNotRunning,
	/// Command pipe could not be created or written
	PipeError,
	/// A driver request was not issued
	DriverNotIssued,
	/// indi_getprop / indi_setprop failed
	ClientFailed,
	IoError,
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let code = match self {
			ErrorCode::ConfigError => "CONFIG_ERROR",
			ErrorCode::UnknownDriver => "UNKNOWN_DRIVER",
			ErrorCode::ServerLaunchFailed => "SERVER_LAUNCH_FAILED",
			ErrorCode::ServerNotRunning => "SERVER_NOT_RUNNING",
			ErrorCode::PipeError => "PIPE_ERROR",
			ErrorCode::DriverNotIssued => "DRIVER_NOT_ISSUED",
			ErrorCode::ClientFailed => "CLIENT_FAILED",
			ErrorCode::IoError => "IO_ERROR",
			ErrorCode::InternalError => "INTERNAL_ERROR",
		};
		f.write_str(code)
	}
}

pub struct ResultBuilder<T> {
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
}

impl<T> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			data: None,
			error: None,
		}
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
		self.error = Some(CommandError {
			code,
			message: message.into(),
		});
		self
	}

	pub fn build(self) -> CommandResult<T> {
		CommandResult {
			ok: self.error.is_none(),
			command: self.command,
			data: self.data,
			error: self.error,
		}
	}
}

/// Prints a command result to stdout in the given format.
pub fn print_result<T: Serialize + TextOutput>(result: &CommandResult<T>, format: OutputFormat) {
	let mut stdout = io::stdout().lock();
	let _ = write_result(&mut stdout, result, format);
}

pub fn write_result<T: Serialize + TextOutput>(
	out: &mut dyn Write,
	result: &CommandResult<T>,
	format: OutputFormat,
) -> io::Result<()> {
	match format {
		OutputFormat::Json => {
			let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
			writeln!(out, "{json}")
		}
		OutputFormat::Text => {
			if let Some(data) = &result.data {
				data.write_text(out)?;
			}
			if let Some(error) = &result.error {
				writeln!(out, "Error [{}]: {}", error.code, error.message)?;
			}
			Ok(())
		}
	}
}

/// Prints an error to stderr in human-readable format.
pub fn print_error_stderr(error: &CommandError) {
	eprintln!("Error [{}]: {}", error.code, error.message);
}
