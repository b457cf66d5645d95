use std::io::{self, Write};

use indictl_runtime::DriverManager;
use indictl_runtime::client::STATE_ELEMENT;
use serde::Serialize;

use super::Emitter;
use crate::cli::PropAction;
use crate::config::Settings;
use crate::error::Result;
use crate::output::TextOutput;

pub(super) async fn run(settings: &Settings, action: PropAction, out: Emitter) -> Result<()> {
	let manager = DriverManager::new(settings.manager.clone());
	let data = match action {
		PropAction::Get {
			device,
			property,
			element,
		} => {
			let value = manager.get_property(&device, &property, &element).await?;
			Property::new(format!("{device}.{property}.{element}"), value)
		}
		PropAction::Set {
			device,
			property,
			element,
			value,
		} => {
			manager.set_property(&device, &property, &element, &value).await?;
			Property::new(format!("{device}.{property}.{element}"), value)
		}
		PropAction::State { device, property } => {
			let state = manager.get_state(&device, &property).await?;
			Property::new(format!("{device}.{property}.{STATE_ELEMENT}"), state)
		}
	};
	out.emit(data);
	Ok(())
}

pub(super) async fn auto_connect(settings: &Settings, out: Emitter) -> Result<()> {
	let manager = DriverManager::new(settings.manager.clone());
	let issued = manager.auto_connect().await;
	out.emit(AutoConnect { issued });
	Ok(())
}

#[derive(Debug, Serialize)]
struct Property {
	key: String,
	value: String,
}

impl Property {
	fn new(key: String, value: String) -> Self {
		Self { key, value }
	}
}

impl TextOutput for Property {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{}={}", self.key, self.value)
	}
}

#[derive(Debug, Serialize)]
struct AutoConnect {
	issued: usize,
}

impl TextOutput for AutoConnect {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "connect requested for {} device(s)", self.issued)
	}
}
