//! indiserver process management
//!
//! [`ProcessLauncher`] starts the server and hands back a [`ServerProcess`]
//! handle that can be polled for liveness and terminated. [`TokioLauncher`]
//! is the production implementation built on `tokio::process`.

use std::fmt;
use std::fs::File;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Boxing alias: async trait methods without `async_trait`.
pub type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Program, arguments, and log destination for the server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
	pub program: String,
	pub args: Vec<String>,
	/// File receiving both stdout and stderr; discarded when `None`.
	pub log_file: Option<PathBuf>,
}

impl fmt::Display for LaunchSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.program)?;
		for arg in &self.args {
			write!(f, " {arg}")?;
		}
		if let Some(log) = &self.log_file {
			write!(f, " > {} 2>&1", log.display())?;
		}
		Ok(())
	}
}

/// Starts server processes.
pub trait ProcessLauncher: Send + Sync {
	fn launch<'a>(&'a self, spec: &'a LaunchSpec) -> BoxFut<'a, Result<Box<dyn ServerProcess>>>;
}

/// Handle to one launched server process.
pub trait ServerProcess: Send + Sync + fmt::Debug {
	/// OS process id, if known.
	fn pid(&self) -> Option<u32>;

	/// Returns true until the process has exited or been terminated.
	fn is_running(&self) -> bool;

	/// Kills the process and waits for its supervisor to finish.
	///
	/// Safe to call after the process has already exited.
	fn terminate(&mut self) -> BoxFut<'_, ()>;
}

/// Launches the server with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioLauncher;

impl ProcessLauncher for TokioLauncher {
	fn launch<'a>(&'a self, spec: &'a LaunchSpec) -> BoxFut<'a, Result<Box<dyn ServerProcess>>> {
		Box::pin(async move {
			let process = TokioProcess::spawn(spec).await?;
			Ok(Box::new(process) as Box<dyn ServerProcess>)
		})
	}
}

/// Server child process watched by a supervisor task.
///
/// The supervisor owns the child: it waits for exit or a kill request and
/// then clears the running flag.
#[derive(Debug)]
pub struct TokioProcess {
	pid: Option<u32>,
	running: Arc<AtomicBool>,
	kill_tx: Option<oneshot::Sender<()>>,
	supervisor: Option<JoinHandle<()>>,
}

impl TokioProcess {
	/// Spawns `spec` and starts its supervisor.
	///
	/// # Errors
	///
	/// Returns `Error::LaunchFailed` if the process cannot be spawned or exits
	/// immediately.
	pub async fn spawn(spec: &LaunchSpec) -> Result<Self> {
		let mut cmd = Command::new(&spec.program);
		cmd.args(&spec.args).stdin(Stdio::null());

		match &spec.log_file {
			Some(path) => {
				let log = File::create(path)
					.map_err(|e| Error::LaunchFailed(format!("Failed to open log {}: {}", path.display(), e)))?;
				let log_err = log.try_clone()?;
				cmd.stdout(Stdio::from(log)).stderr(Stdio::from(log_err));
			}
			None => {
				cmd.stdout(Stdio::null()).stderr(Stdio::null());
			}
		}

		let mut child = cmd
			.spawn()
			.map_err(|e| Error::LaunchFailed(format!("Failed to spawn {}: {}", spec.program, e)))?;

		// Check if process started successfully
		tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

		match child.try_wait() {
			Ok(Some(status)) => {
				return Err(Error::LaunchFailed(format!(
					"{} exited immediately with status: {}",
					spec.program, status
				)));
			}
			Ok(None) => {}
			Err(e) => {
				return Err(Error::LaunchFailed(format!("Failed to check process status: {}", e)));
			}
		}

		let pid = child.id();
		let running = Arc::new(AtomicBool::new(true));
		let (kill_tx, kill_rx) = oneshot::channel::<()>();
		let flag = Arc::clone(&running);
		let program = spec.program.clone();

		let supervisor = tokio::spawn(async move {
			tokio::select! {
				status = child.wait() => match status {
					Ok(status) => info!(target = "indictl.server", program, %status, "server process exited"),
					Err(err) => warn!(target = "indictl.server", program, error = %err, "failed waiting for server process"),
				},
				Ok(()) = kill_rx => {
					if let Err(err) = child.kill().await {
						warn!(target = "indictl.server", program, error = %err, "failed to kill server process");
					} else {
						debug!(target = "indictl.server", program, "server process killed");
					}
				}
			}
			flag.store(false, Ordering::SeqCst);
		});

		Ok(Self {
			pid,
			running,
			kill_tx: Some(kill_tx),
			supervisor: Some(supervisor),
		})
	}
}

impl ServerProcess for TokioProcess {
	fn pid(&self) -> Option<u32> {
		self.pid
	}

	fn is_running(&self) -> bool {
		self.running.load(Ordering::SeqCst)
	}

	fn terminate(&mut self) -> BoxFut<'_, ()> {
		Box::pin(async move {
			if let Some(kill_tx) = self.kill_tx.take() {
				let _ = kill_tx.send(());
			}
			if let Some(supervisor) = self.supervisor.take() {
				if let Err(err) = supervisor.await {
					warn!(target = "indictl.server", error = %err, "server supervisor task failed");
				}
			}
			self.running.store(false, Ordering::SeqCst);
		})
	}
}

#[cfg(all(test, unix))]
mod tests {
	use super::*;

	fn sleeper() -> LaunchSpec {
		LaunchSpec {
			program: "sleep".into(),
			args: vec!["30".into()],
			log_file: None,
		}
	}

	#[test]
	fn launch_spec_renders_shell_form() {
		let spec = LaunchSpec {
			program: "indiserver".into(),
			args: vec!["-p".into(), "7624".into()],
			log_file: Some(PathBuf::from("/tmp/indiserver.log")),
		};
		assert_eq!(spec.to_string(), "indiserver -p 7624 > /tmp/indiserver.log 2>&1");
	}

	#[tokio::test]
	async fn launch_and_terminate() {
		let mut process = TokioLauncher.launch(&sleeper()).await.unwrap();
		assert!(process.is_running());
		assert!(process.pid().is_some());

		process.terminate().await;
		assert!(!process.is_running());

		// second terminate is a no-op
		process.terminate().await;
		assert!(!process.is_running());
	}

	#[tokio::test]
	async fn immediate_exit_is_a_launch_failure() {
		let spec = LaunchSpec {
			program: "false".into(),
			args: vec![],
			log_file: None,
		};
		let err = TokioLauncher.launch(&spec).await.unwrap_err();
		assert!(matches!(err, Error::LaunchFailed(_)), "unexpected error: {err:?}");
	}

	#[tokio::test]
	async fn missing_program_is_a_launch_failure() {
		let spec = LaunchSpec {
			program: "indictl-no-such-server".into(),
			args: vec![],
			log_file: None,
		};
		let err = TokioLauncher.launch(&spec).await.unwrap_err();
		assert!(matches!(err, Error::LaunchFailed(_)));
	}

	#[tokio::test]
	async fn exit_is_observed_by_supervisor() {
		let spec = LaunchSpec {
			program: "sleep".into(),
			args: vec!["0.3".into()],
			log_file: None,
		};
		let process = TokioLauncher.launch(&spec).await.unwrap();
		assert!(process.is_running());

		tokio::time::sleep(tokio::time::Duration::from_millis(800)).await;
		assert!(!process.is_running());
	}
}
