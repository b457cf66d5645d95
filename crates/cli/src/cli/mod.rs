#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;
use crate::styles::cli_styles;

/// Root CLI for indictl.
#[derive(Parser, Debug)]
#[command(name = "indictl")]
#[command(about = "INDI driver catalog and indiserver lifecycle manager")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default) or json
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(flatten)]
	pub global: GlobalArgs,

	#[command(subcommand)]
	pub command: Commands,
}

/// Settings overrides shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
	/// Configuration file (default: ~/.indi/indictl.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Directory holding driver definition files
	#[arg(long, global = true, value_name = "DIR")]
	pub data_dir: Option<PathBuf>,

	/// indiserver command pipe
	#[arg(long, global = true, value_name = "PATH")]
	pub fifo: Option<PathBuf>,

	/// indiserver port
	#[arg(short, long, global = true, value_name = "PORT")]
	pub port: Option<u16>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Inspect the driver catalog.
	#[command(subcommand)]
	Drivers(DriversAction),
	/// Control the indiserver process.
	#[command(subcommand)]
	Server(ServerAction),
	/// Start or stop one driver on a running server.
	#[command(subcommand)]
	Driver(DriverAction),
	/// Read and write device properties.
	#[command(subcommand)]
	Prop(PropAction),
	/// Switch every connected device's CONNECTION switch on.
	AutoConnect,
}

impl Commands {
	/// Dotted command name used in output envelopes.
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Drivers(DriversAction::List { .. }) => "drivers.list",
			Commands::Drivers(DriversAction::Families) => "drivers.families",
			Commands::Drivers(DriversAction::Show { .. }) => "drivers.show",
			Commands::Server(ServerAction::Run(_)) => "server.run",
			Commands::Server(ServerAction::Start(_)) => "server.start",
			Commands::Server(ServerAction::Stop) => "server.stop",
			Commands::Server(ServerAction::Status) => "server.status",
			Commands::Driver(DriverAction::Start { .. }) => "driver.start",
			Commands::Driver(DriverAction::Stop { .. }) => "driver.stop",
			Commands::Prop(PropAction::Get { .. }) => "prop.get",
			Commands::Prop(PropAction::Set { .. }) => "prop.set",
			Commands::Prop(PropAction::State { .. }) => "prop.state",
			Commands::AutoConnect => "auto-connect",
		}
	}
}

#[derive(Subcommand, Debug, Clone)]
pub enum DriversAction {
	/// List cataloged drivers.
	List {
		/// Only drivers of this family
		#[arg(long, value_name = "FAMILY")]
		family: Option<String>,
	},
	/// List families and their driver labels.
	Families,
	/// Show one driver by label (exact or prefix match).
	Show {
		#[arg(value_name = "LABEL")]
		label: String,
	},
}

#[derive(Args, Debug, Clone)]
pub struct StartArgs {
	/// Driver labels to start, in order
	#[arg(value_name = "LABEL")]
	pub labels: Vec<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ServerAction {
	/// Start the server and stay in the foreground until Ctrl-C.
	Run(StartArgs),
	/// Start the server, start the drivers, and exit.
	Start(StartArgs),
	/// Stop the server on the port.
	Stop,
	/// Report whether a server serves the port.
	Status,
}

#[derive(Subcommand, Debug, Clone)]
pub enum DriverAction {
	Start {
		#[arg(value_name = "LABEL")]
		label: String,
	},
	Stop {
		#[arg(value_name = "LABEL")]
		label: String,
		/// Instance name used in the stop command instead of the label
		#[arg(long, value_name = "NAME")]
		name: Option<String>,
	},
}

#[derive(Subcommand, Debug, Clone)]
pub enum PropAction {
	/// Print DEVICE.PROPERTY.ELEMENT
	Get {
		device: String,
		property: String,
		element: String,
	},
	/// Set DEVICE.PROPERTY.ELEMENT to VALUE
	Set {
		device: String,
		property: String,
		element: String,
		value: String,
	},
	/// Print the state of DEVICE.PROPERTY
	State { device: String, property: String },
}
