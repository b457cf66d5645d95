use std::collections::BTreeMap;
use std::io::{self, Write};

use colored::Colorize;
use indictl_catalog::DriverCatalog;
use indictl_protocol::DriverDescriptor;
use serde::Serialize;

use super::Emitter;
use crate::cli::DriversAction;
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::output::TextOutput;

pub(super) fn run(settings: &Settings, action: DriversAction, out: Emitter) -> Result<()> {
	let catalog = settings.load_catalog()?;
	match action {
		DriversAction::List { family } => out.emit(DriverList::from_catalog(&catalog, family.as_deref())),
		DriversAction::Families => out.emit(Families(catalog.families())),
		DriversAction::Show { label } => {
			let driver = catalog
				.find_by_label(&label)
				.cloned()
				.ok_or_else(|| CliError::UnknownDrivers(vec![label]))?;
			out.emit(DriverDetail(driver));
		}
	}
	Ok(())
}

#[derive(Debug, Serialize)]
struct RejectedEntry {
	path: String,
	error: String,
}

#[derive(Debug, Serialize)]
struct DriverList {
	drivers: Vec<DriverDescriptor>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	rejected: Vec<RejectedEntry>,
}

impl DriverList {
	fn from_catalog(catalog: &DriverCatalog, family: Option<&str>) -> Self {
		let drivers = catalog
			.iter()
			.filter(|driver| family.is_none_or(|family| driver.family == family))
			.cloned()
			.collect();
		let rejected = catalog
			.rejected()
			.iter()
			.map(|rejected| RejectedEntry {
				path: rejected.path.display().to_string(),
				error: rejected.error.to_string(),
			})
			.collect();
		Self { drivers, rejected }
	}
}

impl TextOutput for DriverList {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		let width = self.drivers.iter().map(|d| d.label.len()).max().unwrap_or(0);
		for driver in &self.drivers {
			let binary = driver.binary.as_deref().unwrap_or("-");
			let marker = if driver.custom { " (custom)" } else { "" };
			writeln!(
				out,
				"{:<width$}  {:<16}  {}{}",
				driver.label, driver.family, binary, marker
			)?;
		}
		for rejected in &self.rejected {
			writeln!(out, "{} {}: {}", "skipped".yellow(), rejected.path, rejected.error)?;
		}
		Ok(())
	}
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct Families(BTreeMap<String, Vec<String>>);

impl TextOutput for Families {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		for (family, labels) in &self.0 {
			writeln!(out, "{}", family.bold())?;
			for label in labels {
				writeln!(out, "  {label}")?;
			}
		}
		Ok(())
	}
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct DriverDetail(DriverDescriptor);

impl TextOutput for DriverDetail {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		let d = &self.0;
		writeln!(out, "{}", d.label.bold())?;
		writeln!(out, "  name:     {}", d.name)?;
		writeln!(out, "  binary:   {}", d.binary.as_deref().unwrap_or("-"))?;
		writeln!(out, "  family:   {}", d.family)?;
		writeln!(out, "  version:  {}", d.version)?;
		if let Some(skeleton) = &d.skeleton {
			writeln!(out, "  skeleton: {}", skeleton.display())?;
		}
		if d.mdpd {
			writeln!(out, "  mdpd:     yes")?;
		}
		if d.custom {
			writeln!(out, "  custom:   yes")?;
		}
		if let Some(rule) = &d.rule {
			let rule = serde_json::to_string(rule).map_err(io::Error::other)?;
			writeln!(out, "  rule:     {rule}")?;
		}
		Ok(())
	}
}
