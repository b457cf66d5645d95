//! End-to-end tests running the `indictl` binary against fixture directories.

use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

const DRIVERS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<driversList>
	<devGroup group="Telescopes">
		<device label="Telescope Simulator">
			<driver name="Telescope Simulator">indi_simulator_telescope</driver>
			<version>1.0</version>
		</device>
	</devGroup>
	<devGroup group="CCDs">
		<device label="CCD Simulator">
			<driver name="CCD Simulator">indi_simulator_ccd</driver>
			<version>1.0</version>
		</device>
	</devGroup>
</driversList>
"#;

struct Fixture {
	temp: TempDir,
}

impl Fixture {
	fn new() -> Self {
		let temp = TempDir::new().unwrap();
		fs::create_dir(temp.path().join("indi")).unwrap();
		fs::write(temp.path().join("indi/drivers.xml"), DRIVERS_XML).unwrap();
		Self { temp }
	}

	fn data_dir(&self) -> &Path {
		self.temp.path()
	}

	fn write_config(&self, json: &str) {
		fs::write(self.temp.path().join("indictl.json"), json).unwrap();
	}

	/// Runs indictl with JSON output and returns (exit success, stdout envelope).
	fn run(&self, args: &[&str]) -> (bool, Value) {
		let output = Command::new(env!("CARGO_BIN_EXE_indictl"))
			.arg("--format")
			.arg("json")
			.arg("--config")
			.arg(self.temp.path().join("indictl.json"))
			.arg("--data-dir")
			.arg(self.data_dir().join("indi"))
			.arg("--fifo")
			.arg(self.temp.path().join("indiFIFO"))
			.args(args)
			.env_remove("RUST_LOG")
			.output()
			.expect("failed to execute indictl");

		let stdout = String::from_utf8_lossy(&output.stdout);
		let json = serde_json::from_str(&stdout)
			.unwrap_or_else(|err| panic!("invalid JSON ({err}) from indictl: {stdout}"));
		(output.status.success(), json)
	}
}

fn labels(json: &Value) -> Vec<String> {
	json["data"]["drivers"]
		.as_array()
		.unwrap()
		.iter()
		.map(|driver| driver["label"].as_str().unwrap().to_string())
		.collect()
}

#[test]
fn drivers_list_sorts_by_label() {
	let fx = Fixture::new();

	let (ok, json) = fx.run(&["drivers", "list"]);
	assert!(ok);
	assert_eq!(json["ok"], true);
	assert_eq!(json["command"], "drivers.list");
	assert_eq!(labels(&json), vec!["CCD Simulator", "Telescope Simulator"]);
}

#[test]
fn drivers_list_reports_rejected_files() {
	let fx = Fixture::new();
	fs::write(
		fx.data_dir().join("indi/broken.xml"),
		"<driversList><devGroup><device label=\"X\"/></devGroup></driversList>",
	)
	.unwrap();

	let (ok, json) = fx.run(&["drivers", "list", "--family", "CCDs"]);
	assert!(ok);
	assert_eq!(labels(&json), vec!["CCD Simulator"]);
	let rejected = json["data"]["rejected"].as_array().unwrap();
	assert_eq!(rejected.len(), 1);
	assert!(rejected[0]["path"].as_str().unwrap().ends_with("broken.xml"));
}

#[test]
fn config_custom_drivers_and_rules_show_up() {
	let fx = Fixture::new();
	fx.write_config(
		r#"{
			"custom_drivers": [
				{ "name": "My Mount", "label": "My Mount", "exec": "indi_lx200generic", "family": "Telescopes" }
			],
			"rules": [ { "Driver": "CCD Simulator", "PreDelay": 3 } ]
		}"#,
	);

	let (_, json) = fx.run(&["drivers", "families"]);
	assert_eq!(json["data"]["Telescopes"], serde_json::json!(["Telescope Simulator", "My Mount"]));

	let (ok, json) = fx.run(&["drivers", "show", "CCD Simulator"]);
	assert!(ok);
	assert_eq!(json["data"]["rule"]["PreDelay"], 3);
}

#[test]
fn drivers_show_accepts_prefix_of_query() {
	let fx = Fixture::new();

	let (ok, json) = fx.run(&["drivers", "show", "CCD Simulator 2"]);
	assert!(ok);
	assert_eq!(json["data"]["label"], "CCD Simulator");
}

#[test]
fn unknown_driver_fails_with_code() {
	let fx = Fixture::new();

	let (ok, json) = fx.run(&["drivers", "show", "Nonexistent"]);
	assert!(!ok);
	assert_eq!(json["ok"], false);
	assert_eq!(json["error"]["code"], "UNKNOWN_DRIVER");
}

#[test]
fn malformed_config_fails_with_code() {
	let fx = Fixture::new();
	fx.write_config("{ not json");

	let (ok, json) = fx.run(&["drivers", "list"]);
	assert!(!ok);
	assert_eq!(json["error"]["code"], "CONFIG_ERROR");
}

#[test]
fn status_on_unused_port_is_stopped() {
	let fx = Fixture::new();

	let (ok, json) = fx.run(&["server", "status", "--port", "65011"]);
	assert!(ok);
	assert_eq!(json["data"]["port"], 65011);
	assert_eq!(json["data"]["running"], false);
	assert_eq!(json["data"]["liveness"]["source"], "stopped");
}

#[test]
fn driver_start_requires_running_server() {
	let fx = Fixture::new();

	let (ok, json) = fx.run(&["driver", "start", "CCD Simulator", "--port", "65012"]);
	assert!(!ok);
	assert_eq!(json["error"]["code"], "SERVER_NOT_RUNNING");
	assert!(!fx.temp.path().join("indiFIFO").exists());
}
