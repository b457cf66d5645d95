//! Server session state.

use std::path::PathBuf;

use serde::Serialize;

use crate::process::ServerProcess;

/// The server instance a manager launched.
#[derive(Debug)]
pub struct ServerSession {
	pub port: u16,
	pub pipe: PathBuf,
	pub socket: PathBuf,
	pub process: Box<dyn ServerProcess>,
}

impl ServerSession {
	pub fn pid(&self) -> Option<u32> {
		self.process.pid()
	}

	pub fn is_running(&self) -> bool {
		self.process.is_running()
	}
}

/// Lifecycle of the managed server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
	#[default]
	Stopped,
	Starting,
	Running,
	Stopping,
}

/// Where a liveness answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Liveness {
	/// The manager's own process handle reports the server alive.
	Tracked { pid: Option<u32> },
	/// A server on the port was found in the OS process table.
	ProcessTable { pid: u32 },
	Stopped,
}

impl Liveness {
	pub fn is_running(&self) -> bool {
		!matches!(self, Liveness::Stopped)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn liveness_serializes_with_source_tag() {
		let json = serde_json::to_string(&Liveness::ProcessTable { pid: 42 }).unwrap();
		assert_eq!(json, r#"{"source":"process_table","pid":42}"#);
		assert!(Liveness::Tracked { pid: None }.is_running());
		assert!(!Liveness::Stopped.is_running());
	}
}
