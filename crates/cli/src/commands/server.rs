use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use indictl_catalog::DriverCatalog;
use indictl_protocol::DriverDescriptor;
use indictl_runtime::{DriverManager, Liveness, find_executable};
use serde::Serialize;
use tracing::{info, warn};

use super::Emitter;
use crate::cli::{ServerAction, StartArgs};
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::output::TextOutput;

/// How often `server run` checks that the server is still alive.
const WATCH_INTERVAL: Duration = Duration::from_secs(1);

pub(super) async fn run(settings: &Settings, action: ServerAction, out: Emitter) -> Result<()> {
	let manager = DriverManager::new(settings.manager.clone());
	let port = settings.manager.port;

	match action {
		ServerAction::Start(args) => {
			let drivers = resolve(settings, &args)?;
			manager.start(Some(port), drivers).await?;
			manager.wait_for_starter().await;
			out.emit(Started::new(&manager, port));
		}
		ServerAction::Run(args) => {
			let drivers = resolve(settings, &args)?;
			manager.start(Some(port), drivers).await?;
			manager.wait_for_starter().await;
			out.emit(Started::new(&manager, port));
			watch(&manager, port).await?;
			manager.stop(Some(port)).await;
		}
		ServerAction::Stop => {
			manager.stop(Some(port)).await;
			out.emit(Status::probe(&manager, port));
		}
		ServerAction::Status => out.emit(Status::probe(&manager, port)),
	}
	Ok(())
}

/// Maps labels to catalog drivers, failing on any unknown label before the server starts.
fn resolve(settings: &Settings, args: &StartArgs) -> Result<Vec<DriverDescriptor>> {
	for program in [&settings.manager.server_executable, &settings.manager.getprop, &settings.manager.setprop] {
		if let Err(err) = find_executable(program) {
			warn!(target = "indictl.server", program = %program, error = %err, "executable not found");
		}
	}

	let catalog = if args.labels.is_empty() {
		DriverCatalog::default()
	} else {
		settings.load_catalog()?
	};
	let (drivers, unknown) = catalog.resolve_labels(&args.labels);
	if !unknown.is_empty() {
		return Err(CliError::UnknownDrivers(unknown));
	}
	Ok(drivers)
}

/// Waits for Ctrl-C or for the server to exit on its own.
async fn watch(manager: &DriverManager, port: u16) -> Result<()> {
	let mut ticker = tokio::time::interval(WATCH_INTERVAL);
	loop {
		tokio::select! {
			signal = tokio::signal::ctrl_c() => {
				signal.context("failed to listen for Ctrl-C")?;
				info!(target = "indictl.server", port, "interrupted, stopping server");
				return Ok(());
			}
			_ = ticker.tick() => {
				if !manager.is_running(Some(port)) {
					warn!(target = "indictl.server", port, "indiserver exited");
					return Ok(());
				}
			}
		}
	}
}

#[derive(Debug, Serialize)]
struct Started {
	port: u16,
	pid: Option<u32>,
	drivers: BTreeMap<String, DriverDescriptor>,
}

impl Started {
	fn new(manager: &DriverManager, port: u16) -> Self {
		let pid = match manager.liveness(Some(port)) {
			Liveness::Tracked { pid } => pid,
			Liveness::ProcessTable { pid } => Some(pid),
			Liveness::Stopped => None,
		};
		Self {
			port,
			pid,
			drivers: manager.running_drivers(),
		}
	}
}

impl TextOutput for Started {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		match self.pid {
			Some(pid) => writeln!(out, "indiserver {} on port {} (pid {pid})", "started".green(), self.port)?,
			None => writeln!(out, "indiserver {} on port {}", "started".green(), self.port)?,
		}
		for label in self.drivers.keys() {
			writeln!(out, "  {label}")?;
		}
		Ok(())
	}
}

#[derive(Debug, Serialize)]
struct Status {
	port: u16,
	running: bool,
	liveness: Liveness,
}

impl Status {
	fn probe(manager: &DriverManager, port: u16) -> Self {
		let liveness = manager.liveness(Some(port));
		Self {
			port,
			running: liveness.is_running(),
			liveness,
		}
	}
}

impl TextOutput for Status {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		match self.liveness {
			Liveness::Tracked { pid: Some(pid) } | Liveness::ProcessTable { pid } => {
				writeln!(out, "indiserver {} on port {} (pid {pid})", "running".green(), self.port)
			}
			Liveness::Tracked { pid: None } => writeln!(out, "indiserver {} on port {}", "running".green(), self.port),
			Liveness::Stopped => writeln!(out, "indiserver {} on port {}", "stopped".red(), self.port),
		}
	}
}
