use std::io::{self, Write};

use indictl_runtime::{DriverManager, DriverOutcome};
use serde::Serialize;

use super::Emitter;
use crate::cli::DriverAction;
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::output::TextOutput;

pub(super) async fn run(settings: &Settings, action: DriverAction, out: Emitter) -> Result<()> {
	let (label, stop_as) = match action {
		DriverAction::Start { label } => (label, None),
		DriverAction::Stop { label, name } => (label, Some(name)),
	};

	let catalog = settings.load_catalog()?;
	let driver = catalog
		.find_by_label(&label)
		.cloned()
		.ok_or_else(|| CliError::UnknownDrivers(vec![label.clone()]))?;

	let manager = DriverManager::new(settings.manager.clone());
	let port = settings.manager.port;
	if !manager.is_running(Some(port)) {
		return Err(CliError::ServerNotRunning { port });
	}

	let (outcome, action) = match &stop_as {
		None => (manager.start_driver(&driver).await?, "started"),
		Some(instance) => (manager.stop_driver(&driver, instance.as_deref()).await?, "stopped"),
	};

	match outcome {
		DriverOutcome::Issued => {
			out.emit(DriverChange {
				label: driver.label,
				action,
			});
			Ok(())
		}
		DriverOutcome::MissingBinary => Err(CliError::MissingBinary { label: driver.label }),
		DriverOutcome::Aborted { stage, reason } => Err(CliError::HookAborted {
			label: driver.label,
			stage,
			reason,
		}),
	}
}

#[derive(Debug, Serialize)]
struct DriverChange {
	label: String,
	action: &'static str,
}

impl TextOutput for DriverChange {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{} {}", self.label, self.action)
	}
}
