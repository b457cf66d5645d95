//! Operational-rule hooks around driver start and stop.
//!
//! Delays suspend the calling task for the whole duration. Scripts run to
//! completion with no arguments; a non-zero exit or launch failure is a
//! failure of that hook.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::exec;

/// Point in the driver lifecycle a hook runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStage {
	/// Before the start command; failure aborts the start.
	Pre,
	/// After the start command; failure is logged only.
	Post,
	/// Before the stop command; failure aborts the stop.
	Stopping,
	/// After the stop command; failure is logged only.
	Stopped,
}

impl HookStage {
	/// Returns true when a failure at this stage cancels the FIFO write.
	pub fn aborts_on_failure(self) -> bool {
		matches!(self, HookStage::Pre | HookStage::Stopping)
	}
}

impl fmt::Display for HookStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			HookStage::Pre => "Pre",
			HookStage::Post => "Post",
			HookStage::Stopping => "Pre Shutdown",
			HookStage::Stopped => "Post Shutdown",
		};
		f.write_str(name)
	}
}

/// Sleeps for `delay` unless it is zero.
pub async fn delay(stage: HookStage, driver: &str, delay: Duration) {
	if delay.is_zero() {
		return;
	}
	info!(
		target = "indictl.hook",
		driver,
		%stage,
		secs = delay.as_secs(),
		"delaying driver"
	);
	tokio::time::sleep(delay).await;
}

/// Runs a hook script and returns its stdout.
///
/// # Errors
///
/// Returns [`Error::HookFailed`] if the script cannot be launched, exits
/// non-zero, or outlives `timeout`.
pub async fn run_script(stage: HookStage, script: &Path, timeout: Option<Duration>) -> Result<String> {
	info!(target = "indictl.hook", %stage, script = %script.display(), "running script");
	let no_args: [&str; 0] = [];
	let output = exec::run(script, no_args, timeout)
		.await
		.map_err(|failure| Error::HookFailed {
			stage,
			script: script.to_path_buf(),
			reason: failure.to_string(),
		})?;
	if !output.trim().is_empty() {
		info!(target = "indictl.hook", %stage, output = output.trim(), "script output");
	}
	Ok(output)
}
