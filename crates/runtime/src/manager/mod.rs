//! Driver lifecycle manager.
//!
//! [`DriverManager`] owns one indiserver session: it launches the server,
//! feeds it `start`/`stop` directives through the command pipe, runs each
//! driver's operational-rule hooks, and tracks which drivers it started.
//!
//! Startup of a driver list happens on a single background task per
//! [`DriverManager::start`] call, so start lines reach the pipe strictly in
//! list order. [`DriverManager::stop`] cancels that task between items.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indictl_protocol::{DriverCommand, DriverDescriptor};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::PropertyClient;
use crate::error::Result;
use crate::exec;
use crate::hooks::{self, HookStage};
use crate::inspect::{ProcessInspector, SysinfoInspector};
use crate::pipe::CommandPipe;
use crate::process::{LaunchSpec, ProcessLauncher, TokioLauncher};
use crate::session::{Liveness, ServerSession, ServerState};


/// Default indiserver TCP port.
pub const DEFAULT_PORT: u16 = 7624;
/// Default command pipe path.
pub const DEFAULT_FIFO: &str = "/tmp/indiFIFO";
/// Default server log file.
pub const DEFAULT_SERVER_LOG: &str = "/tmp/indiserver.log";
/// Default per-client output queue limit passed with `-m`, in megabytes.
pub const DEFAULT_MAX_QUEUE_MB: u32 = 1000;

/// Query listing every device's connect switch.
const CONNECT_QUERY: &str = "*.CONNECTION.CONNECT";

/// Explicit settings for a [`DriverManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
	/// Port used when no call, session, or previous start supplies one.
	pub port: u16,
	pub fifo_path: PathBuf,
	/// Server program, a bare name resolved on PATH or a path.
	pub server_executable: String,
	pub max_queue_mb: u32,
	/// Pass `-v` to the server.
	pub verbose: bool,
	/// Receives the server's stdout and stderr; discarded when `None`.
	pub server_log: Option<PathBuf>,
	pub getprop: String,
	pub setprop: String,
	/// Kills servers by name when the process table is unavailable.
	pub pkill: String,
	/// Bound on hook scripts and property client calls. `None` waits forever.
	pub command_timeout: Option<Duration>,
}

impl Default for ManagerConfig {
	fn default() -> Self {
		Self {
			port: DEFAULT_PORT,
			fifo_path: PathBuf::from(DEFAULT_FIFO),
			server_executable: "indiserver".to_string(),
			max_queue_mb: DEFAULT_MAX_QUEUE_MB,
			verbose: true,
			server_log: Some(PathBuf::from(DEFAULT_SERVER_LOG)),
			getprop: "indi_getprop".to_string(),
			setprop: "indi_setprop".to_string(),
			pkill: "pkill".to_string(),
			command_timeout: None,
		}
	}
}

impl ManagerConfig {
	/// Command line for a server on `port`.
	pub fn launch_spec(&self, port: u16) -> LaunchSpec {
		let pipe = CommandPipe::new(&self.fifo_path);
		let mut args = vec![
			"-p".to_string(),
			port.to_string(),
			"-m".to_string(),
			self.max_queue_mb.to_string(),
		];
		if self.verbose {
			args.push("-v".to_string());
		}
		args.push("-f".to_string());
		args.push(pipe.path().display().to_string());
		args.push("-u".to_string());
		args.push(pipe.socket_path().display().to_string());

		LaunchSpec {
			program: self.server_executable.clone(),
			args,
			log_file: self.server_log.clone(),
		}
	}

	/// File name of the server program, as it appears in the process table.
	fn server_process_name(&self) -> &str {
		Path::new(&self.server_executable)
			.file_name()
			.and_then(|name| name.to_str())
			.unwrap_or(&self.server_executable)
	}
}

/// Result of a single driver start or stop request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DriverOutcome {
	/// The directive was written to the command pipe.
	Issued,
	/// The descriptor has no binary; nothing was written.
	MissingBinary,
	/// A leading hook failed; nothing was written.
	Aborted { stage: HookStage, reason: String },
}

impl DriverOutcome {
	pub fn is_issued(&self) -> bool {
		matches!(self, DriverOutcome::Issued)
	}
}

#[derive(Default)]
struct Starter {
	token: Option<CancellationToken>,
	task: Option<JoinHandle<()>>,
}

struct Inner {
	config: ManagerConfig,
	pipe: CommandPipe,
	client: PropertyClient,
	launcher: Arc<dyn ProcessLauncher>,
	inspector: Arc<dyn ProcessInspector>,
	session: Mutex<Option<ServerSession>>,
	state: Mutex<ServerState>,
	last_port: Mutex<Option<u16>>,
	running: Mutex<BTreeMap<String, DriverDescriptor>>,
	starter: Mutex<Starter>,
}

/// Supervises one indiserver and the drivers started on it.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct DriverManager {
	inner: Arc<Inner>,
}

impl DriverManager {
	/// Creates a manager using `tokio::process` and the sysinfo process table.
	pub fn new(config: ManagerConfig) -> Self {
		Self::with_parts(config, Arc::new(TokioLauncher), SysinfoInspector::probe())
	}

	/// Creates a manager with explicit process seams.
	pub fn with_parts(
		config: ManagerConfig,
		launcher: Arc<dyn ProcessLauncher>,
		inspector: Arc<dyn ProcessInspector>,
	) -> Self {
		let pipe = CommandPipe::new(&config.fifo_path);
		let client = PropertyClient::new(&config.getprop, &config.setprop, config.command_timeout);
		Self {
			inner: Arc::new(Inner {
				config,
				pipe,
				client,
				launcher,
				inspector,
				session: Mutex::new(None),
				state: Mutex::new(ServerState::Stopped),
				last_port: Mutex::new(None),
				running: Mutex::new(BTreeMap::new()),
				starter: Mutex::new(Starter::default()),
			}),
		}
	}

	pub fn config(&self) -> &ManagerConfig {
		&self.inner.config
	}

	/// Port of the current session, if one was launched.
	pub fn session_port(&self) -> Option<u16> {
		self.inner.session.lock().as_ref().map(|session| session.port)
	}

	/// Current lifecycle state. A session whose process has exited reads as stopped.
	pub fn state(&self) -> ServerState {
		let state = *self.inner.state.lock();
		if state == ServerState::Running {
			let alive = self.inner.session.lock().as_ref().is_some_and(ServerSession::is_running);
			if !alive {
				return ServerState::Stopped;
			}
		}
		state
	}

	/// Snapshot of the drivers started since the last server start, keyed by label.
	pub fn running_drivers(&self) -> BTreeMap<String, DriverDescriptor> {
		self.inner.running.lock().clone()
	}

	/// Starts the server on `port` and queues `drivers` for sequential startup.
	///
	/// A server already running on the port is stopped first, as is this
	/// manager's own server when it runs on another port. Returns once the
	/// server is launched; drivers are started on a background task, see
	/// [`DriverManager::wait_for_starter`].
	///
	/// # Errors
	///
	/// Returns an error if the command pipe cannot be recreated or the server
	/// fails to launch.
	pub async fn start(&self, port: Option<u16>, drivers: Vec<DriverDescriptor>) -> Result<()> {
		let port = port.unwrap_or(self.inner.config.port);
		let previous = {
			let session = self.inner.session.lock();
			session
				.as_ref()
				.filter(|session| session.port != port && session.is_running())
				.map(|session| session.port)
		};
		if let Some(previous) = previous {
			info!(target = "indictl.server", previous, port, "moving server to a new port");
			self.stop(Some(previous)).await;
		}
		if self.is_running(Some(port)) {
			info!(target = "indictl.server", port, "server already running, restarting");
			self.stop(Some(port)).await;
		}

		self.set_state(ServerState::Starting);
		if let Err(err) = self.inner.pipe.recreate() {
			error!(target = "indictl.server", error = %err, "failed to recreate command pipe");
			self.set_state(ServerState::Stopped);
			return Err(err);
		}

		let spec = self.inner.config.launch_spec(port);
		info!(target = "indictl.server", port, command = %spec, "starting indiserver");
		let process = match self.inner.launcher.launch(&spec).await {
			Ok(process) => process,
			Err(err) => {
				error!(target = "indictl.server", port, error = %err, "indiserver failed to start");
				self.set_state(ServerState::Stopped);
				return Err(err);
			}
		};
		debug!(target = "indictl.server", port, pid = ?process.pid(), "indiserver launched");

		*self.inner.session.lock() = Some(ServerSession {
			port,
			pipe: self.inner.pipe.path().to_path_buf(),
			socket: self.inner.pipe.socket_path(),
			process,
		});
		*self.inner.last_port.lock() = Some(port);
		self.inner.running.lock().clear();
		self.set_state(ServerState::Running);

		if !drivers.is_empty() {
			self.spawn_starter(drivers);
		}
		Ok(())
	}

	/// Waits for the current starter task, if any, to finish.
	pub async fn wait_for_starter(&self) {
		let task = self.inner.starter.lock().task.take();
		if let Some(task) = task {
			if let Err(err) = task.await {
				warn!(target = "indictl.driver", error = %err, "driver starter task failed");
			}
		}
	}

	fn spawn_starter(&self, drivers: Vec<DriverDescriptor>) {
		let token = CancellationToken::new();
		let manager = self.clone();
		let task_token = token.clone();
		info!(target = "indictl.driver", count = drivers.len(), "queueing drivers");
		let task = tokio::spawn(async move { manager.drain_queue(drivers, task_token).await });

		let mut starter = self.inner.starter.lock();
		if let Some(previous) = starter.token.replace(token) {
			previous.cancel();
		}
		starter.task = Some(task);
	}

	/// Starts `drivers` in order, checking `token` before each one.
	pub(crate) async fn drain_queue(&self, drivers: Vec<DriverDescriptor>, token: CancellationToken) {
		for driver in drivers {
			if token.is_cancelled() {
				info!(target = "indictl.driver", "driver queue cancelled");
				return;
			}
			match self.start_driver(&driver).await {
				Ok(outcome) => debug!(target = "indictl.driver", label = %driver.label, ?outcome, "queued driver handled"),
				Err(err) => error!(target = "indictl.driver", label = %driver.label, error = %err, "failed to start driver"),
			}
		}
		debug!(target = "indictl.driver", "driver queue drained");
	}

	fn cancel_starter(&self) {
		let token = self.inner.starter.lock().token.take();
		if let Some(token) = token {
			token.cancel();
		}
	}

	/// Starts one driver on the running server.
	///
	/// Runs the rule's pre-delay and pre-script, writes the `start` line,
	/// records the driver, then runs the post-delay and post-script. A failing
	/// pre-script aborts before the write; a failing post-script is logged.
	///
	/// # Errors
	///
	/// Returns an error only if the command pipe cannot be written.
	pub async fn start_driver(&self, driver: &DriverDescriptor) -> Result<DriverOutcome> {
		let command = match DriverCommand::start(driver) {
			Ok(command) => command,
			Err(err) => {
				error!(target = "indictl.driver", label = %driver.label, error = %err, "cannot start driver");
				return Ok(DriverOutcome::MissingBinary);
			}
		};

		if let Some(rule) = &driver.rule {
			hooks::delay(HookStage::Pre, &driver.label, rule.pre_delay()).await;
			if let Some(script) = &rule.pre_script {
				if let Some(outcome) = self.leading_hook(HookStage::Pre, script, &driver.label).await {
					return Ok(outcome);
				}
			}
		}

		self.inner.pipe.send(&command).await?;
		self.inner.running.lock().insert(driver.label.clone(), driver.clone());
		info!(target = "indictl.driver", label = %driver.label, "driver started");

		if let Some(rule) = &driver.rule {
			hooks::delay(HookStage::Post, &driver.label, rule.post_delay()).await;
			if let Some(script) = &rule.post_script {
				self.trailing_hook(HookStage::Post, script, &driver.label).await;
			}
		}
		Ok(DriverOutcome::Issued)
	}

	/// Stops one driver.
	///
	/// `instance_label` replaces the descriptor label in the `stop` line; the
	/// running-set entry is always removed under the descriptor's own label.
	///
	/// # Errors
	///
	/// Returns an error only if the command pipe cannot be written.
	pub async fn stop_driver(&self, driver: &DriverDescriptor, instance_label: Option<&str>) -> Result<DriverOutcome> {
		let command = match DriverCommand::stop(driver, instance_label) {
			Ok(command) => command,
			Err(err) => {
				error!(target = "indictl.driver", label = %driver.label, error = %err, "cannot stop driver");
				return Ok(DriverOutcome::MissingBinary);
			}
		};

		if let Some(rule) = &driver.rule {
			if let Some(script) = &rule.stopping_script {
				if let Some(outcome) = self.leading_hook(HookStage::Stopping, script, &driver.label).await {
					return Ok(outcome);
				}
			}
			hooks::delay(HookStage::Stopping, &driver.label, rule.stopping_delay()).await;
		}

		self.inner.pipe.send(&command).await?;
		self.inner.running.lock().remove(&driver.label);
		info!(target = "indictl.driver", label = %driver.label, "driver stopped");

		if let Some(rule) = &driver.rule {
			hooks::delay(HookStage::Stopped, &driver.label, rule.stopped_delay()).await;
			if let Some(script) = &rule.stopped_script {
				self.trailing_hook(HookStage::Stopped, script, &driver.label).await;
			}
		}
		Ok(DriverOutcome::Issued)
	}

	async fn leading_hook(&self, stage: HookStage, script: &Path, label: &str) -> Option<DriverOutcome> {
		match hooks::run_script(stage, script, self.inner.config.command_timeout).await {
			Ok(_) => None,
			Err(err) => {
				warn!(target = "indictl.hook", label, %stage, error = %err, "hook failed, skipping driver");
				Some(DriverOutcome::Aborted {
					stage,
					reason: err.to_string(),
				})
			}
		}
	}

	async fn trailing_hook(&self, stage: HookStage, script: &Path, label: &str) {
		if let Err(err) = hooks::run_script(stage, script, self.inner.config.command_timeout).await {
			warn!(target = "indictl.hook", label, %stage, error = %err, "hook failed");
		}
	}

	/// Stops the server on `port` and cancels pending driver startup.
	///
	/// Kills every server process serving the port when the process table is
	/// available, otherwise falls back to killing every process named like
	/// the server executable. The session's own handle is terminated as well.
	/// Failures are logged, never returned.
	pub async fn stop(&self, port: Option<u16>) {
		let port = self.resolve_port(port);
		self.cancel_starter();
		self.set_state(ServerState::Stopping);
		info!(target = "indictl.server", port, "stopping indiserver");

		let name = self.inner.config.server_process_name();
		if self.inner.inspector.is_available() {
			let inspector = Arc::clone(&self.inner.inspector);
			let executable = name.to_string();
			let killed = tokio::task::spawn_blocking(move || {
				for pid in inspector.find_servers(&executable, port) {
					if inspector.kill(pid) {
						info!(target = "indictl.server", pid, port, "killed indiserver");
					} else {
						warn!(target = "indictl.server", pid, port, "failed to kill indiserver");
					}
				}
			})
			.await;
			if let Err(err) = killed {
				warn!(target = "indictl.server", port, error = %err, "process table kill task failed");
			}
		} else {
			let config = &self.inner.config;
			warn!(
				target = "indictl.server",
				executable = name,
				"process table unavailable, killing every instance by name"
			);
			if let Err(err) = exec::run(&config.pkill, ["-9", name], config.command_timeout).await {
				debug!(target = "indictl.server", error = %err, "kill by name reported failure");
			}
		}

		let session = {
			let mut slot = self.inner.session.lock();
			match slot.as_ref() {
				Some(session) if session.port == port => slot.take(),
				_ => None,
			}
		};
		if let Some(mut session) = session {
			session.process.terminate().await;
			debug!(target = "indictl.server", port, "session process terminated");
		}

		self.set_state(ServerState::Stopped);
	}

	/// Reports whether a server serves `port`, and how that was determined.
	pub fn liveness(&self, port: Option<u16>) -> Liveness {
		let port = self.resolve_port(port);
		let tracked = {
			let session = self.inner.session.lock();
			session
				.as_ref()
				.filter(|session| session.port == port && session.is_running())
				.map(ServerSession::pid)
		};
		if let Some(pid) = tracked {
			return Liveness::Tracked { pid };
		}

		let inspector = &self.inner.inspector;
		if inspector.is_available() {
			let name = self.inner.config.server_process_name();
			if let Some(&pid) = inspector.find_servers(name, port).first() {
				return Liveness::ProcessTable { pid };
			}
		}
		Liveness::Stopped
	}

	pub fn is_running(&self, port: Option<u16>) -> bool {
		self.liveness(port).is_running()
	}

	/// Explicit port, else the session port, else the last started port, else the configured port.
	fn resolve_port(&self, port: Option<u16>) -> u16 {
		port.or_else(|| self.session_port())
			.or_else(|| *self.inner.last_port.lock())
			.unwrap_or(self.inner.config.port)
	}

	fn set_state(&self, state: ServerState) {
		*self.inner.state.lock() = state;
	}

	pub async fn set_property(&self, device: &str, property: &str, element: &str, value: &str) -> Result<()> {
		self.inner.client.set(device, property, element, value).await
	}

	pub async fn get_property(&self, device: &str, property: &str, element: &str) -> Result<String> {
		self.inner.client.get(device, property, element).await
	}

	pub async fn get_state(&self, device: &str, property: &str) -> Result<String> {
		self.inner.client.get_state(device, property).await
	}

	/// Switches every listed device's connect switch on.
	///
	/// Returns the number of set commands issued. A failed listing issues none.
	pub async fn auto_connect(&self) -> usize {
		let listing = match self.inner.client.get_raw(CONNECT_QUERY).await {
			Ok(listing) => listing,
			Err(err) => {
				error!(target = "indictl.client", error = %err, "failed to list device connections");
				return 0;
			}
		};

		let mut issued = 0;
		for line in listing.lines().map(str::trim).filter(|line| !line.is_empty()) {
			let assignment = line.replace("Off", "On");
			issued += 1;
			if self.inner.client.set_raw(&assignment).await.is_ok() {
				debug!(target = "indictl.client", assignment, "device connect requested");
			}
		}
		info!(target = "indictl.client", issued, "auto-connect finished");
		issued
	}
}
