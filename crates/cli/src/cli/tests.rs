use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn parse_server_start_with_labels() {
	let args = vec![
		"indictl",
		"server",
		"start",
		"Telescope Simulator",
		"CCD Simulator",
		"--port",
		"7700",
	];
	let cli = Cli::try_parse_from(args).unwrap();

	assert_eq!(cli.global.port, Some(7700));
	match cli.command {
		Commands::Server(ServerAction::Start(args)) => {
			assert_eq!(args.labels, vec!["Telescope Simulator", "CCD Simulator"]);
		}
		_ => panic!("Expected server start command"),
	}
}

#[test]
fn parse_driver_stop_with_instance_name() {
	let args = vec!["indictl", "driver", "stop", "CCD Simulator", "--name", "CCD Simulator 2"];
	let cli = Cli::try_parse_from(args).unwrap();

	match cli.command {
		Commands::Driver(DriverAction::Stop { label, name }) => {
			assert_eq!(label, "CCD Simulator");
			assert_eq!(name.as_deref(), Some("CCD Simulator 2"));
		}
		_ => panic!("Expected driver stop command"),
	}
}

#[test]
fn parse_global_flags_anywhere() {
	let args = vec![
		"indictl",
		"-vv",
		"drivers",
		"list",
		"--family",
		"CCDs",
		"--data-dir",
		"/opt/indi",
		"-f",
		"json",
	];
	let cli = Cli::try_parse_from(args).unwrap();

	assert_eq!(cli.verbose, 2);
	assert_eq!(cli.format, OutputFormat::Json);
	assert_eq!(cli.global.data_dir, Some(PathBuf::from("/opt/indi")));
	assert_eq!(cli.command.name(), "drivers.list");
}

#[test]
fn parse_prop_set() {
	let args = vec!["indictl", "prop", "set", "CCD Simulator", "CONNECTION", "CONNECT", "On"];
	let cli = Cli::try_parse_from(args).unwrap();

	match cli.command {
		Commands::Prop(PropAction::Set {
			device,
			property,
			element,
			value,
		}) => {
			assert_eq!(
				(device.as_str(), property.as_str(), element.as_str(), value.as_str()),
				("CCD Simulator", "CONNECTION", "CONNECT", "On")
			);
		}
		_ => panic!("Expected prop set command"),
	}
}

#[test]
fn prop_get_requires_element() {
	let args = vec!["indictl", "prop", "get", "CCD Simulator", "CONNECTION"];
	assert!(Cli::try_parse_from(args).is_err());
}

#[test]
fn default_format_is_text() {
	let cli = Cli::try_parse_from(["indictl", "server", "status"]).unwrap();
	assert_eq!(cli.format, OutputFormat::Text);
	assert_eq!(cli.command.name(), "server.status");
}
