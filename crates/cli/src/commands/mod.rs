//! Command dispatch.

mod driver;
mod drivers;
mod prop;
mod server;

use serde::Serialize;

use crate::cli::{Cli, Commands};
use crate::config::{Defaults, Settings};
use crate::error::Result;
use crate::output::{OutputFormat, ResultBuilder, TextOutput, print_result};

/// Runs the parsed command line.
pub async fn dispatch(cli: Cli) -> Result<()> {
	let defaults = Defaults::from_env();
	let settings = Settings::resolve(&cli.global, &defaults)?;
	let out = Emitter {
		command: cli.command.name(),
		format: cli.format,
	};

	match cli.command {
		Commands::Drivers(action) => drivers::run(&settings, action, out),
		Commands::Server(action) => server::run(&settings, action, out).await,
		Commands::Driver(action) => driver::run(&settings, action, out).await,
		Commands::Prop(action) => prop::run(&settings, action, out).await,
		Commands::AutoConnect => prop::auto_connect(&settings, out).await,
	}
}

/// Prints successful command data in the selected format.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Emitter {
	command: &'static str,
	format: OutputFormat,
}

impl Emitter {
	pub(crate) fn emit<T: Serialize + TextOutput>(self, data: T) {
		let result = ResultBuilder::new(self.command).data(data).build();
		print_result(&result, self.format);
	}
}
