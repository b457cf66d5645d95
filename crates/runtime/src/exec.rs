//! Running short-lived helper programs to completion.

use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub(crate) enum ExecFailure {
	#[error("failed to execute: {0}")]
	Spawn(#[source] std::io::Error),

	#[error("exited with {status}{}", stderr_suffix(.stderr))]
	Exit { status: ExitStatus, stderr: String },

	#[error("timed out after {0:?}")]
	TimedOut(Duration),
}

fn stderr_suffix(stderr: &str) -> String {
	let trimmed = stderr.trim();
	if trimmed.is_empty() {
		String::new()
	} else {
		format!(": {trimmed}")
	}
}

/// Runs `program` with `args` and returns its stdout.
///
/// A non-zero exit status is a failure. With `timeout` set, the child is
/// killed when the limit expires.
pub(crate) async fn run<I, S>(program: impl AsRef<OsStr>, args: I, timeout: Option<Duration>) -> Result<String, ExecFailure>
where
	I: IntoIterator<Item = S>,
	S: AsRef<OsStr>,
{
	let mut cmd = Command::new(program);
	cmd.args(args)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);

	let output = match timeout {
		Some(limit) => tokio::time::timeout(limit, cmd.output())
			.await
			.map_err(|_| ExecFailure::TimedOut(limit))?,
		None => cmd.output().await,
	}
	.map_err(ExecFailure::Spawn)?;

	if !output.status.success() {
		return Err(ExecFailure::Exit {
			status: output.status,
			stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
		});
	}

	Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
