//! Companion property clients (`indi_getprop` / `indi_setprop`).
//!
//! These talk to the running server on its default port. Output is treated
//! as opaque `key=value` text; the device-control protocol itself is never
//! parsed here.

use std::time::Duration;

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::exec;

/// Element name the server uses for a property's state.
pub const STATE_ELEMENT: &str = "_STATE";

/// Invokes the companion get/set utilities.
#[derive(Debug, Clone)]
pub struct PropertyClient {
	getprop: String,
	setprop: String,
	timeout: Option<Duration>,
}

impl PropertyClient {
	pub fn new(getprop: impl Into<String>, setprop: impl Into<String>, timeout: Option<Duration>) -> Self {
		Self {
			getprop: getprop.into(),
			setprop: setprop.into(),
			timeout,
		}
	}

	/// Sets `device.property.element` to `value`.
	pub async fn set(&self, device: &str, property: &str, element: &str, value: &str) -> Result<()> {
		self.set_raw(&format!("{device}.{property}.{element}={value}")).await
	}

	/// Returns the value of `device.property.element`.
	pub async fn get(&self, device: &str, property: &str, element: &str) -> Result<String> {
		let output = self.get_raw(&format!("{device}.{property}.{element}")).await?;
		match output.split_once('=') {
			Some((_, value)) => Ok(value.trim().to_string()),
			None => {
				error!(target = "indictl.client", program = %self.getprop, output = output.trim(), "unparsable property value");
				Err(Error::UnexpectedOutput {
					program: self.getprop.clone(),
					output,
				})
			}
		}
	}

	/// Returns the state (`Idle`, `Ok`, `Busy`, `Alert`) of `device.property`.
	pub async fn get_state(&self, device: &str, property: &str) -> Result<String> {
		self.get(device, property, STATE_ELEMENT).await
	}

	/// Runs the getter with a raw query and returns its stdout.
	pub async fn get_raw(&self, query: &str) -> Result<String> {
		self.invoke(&self.getprop, query).await
	}

	/// Runs the setter with a raw `key=value` assignment.
	pub async fn set_raw(&self, assignment: &str) -> Result<()> {
		self.invoke(&self.setprop, assignment).await.map(|_| ())
	}

	async fn invoke(&self, program: &str, arg: &str) -> Result<String> {
		debug!(target = "indictl.client", program, arg, "invoking property client");
		exec::run(program, [arg], self.timeout).await.map_err(|failure| {
			error!(target = "indictl.client", program, arg, error = %failure, "property client failed");
			Error::ClientFailed {
				program: program.to_string(),
				reason: failure.to_string(),
			}
		})
	}
}

#[cfg(all(test, unix))]
mod tests {
	use std::fs;
	use std::os::unix::fs::PermissionsExt;
	use std::path::{Path, PathBuf};

	use tempfile::TempDir;

	use super::*;

	fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
		let path = dir.join(name);
		fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
		let mut perms = fs::metadata(&path).unwrap().permissions();
		perms.set_mode(0o755);
		fs::set_permissions(&path, perms).unwrap();
		path
	}

	fn client(getprop: &Path, setprop: &Path) -> PropertyClient {
		PropertyClient::new(getprop.to_string_lossy(), setprop.to_string_lossy(), None)
	}

	#[tokio::test]
	async fn get_returns_text_after_first_equals() {
		let temp = TempDir::new().unwrap();
		let getprop = write_script(temp.path(), "getprop", "echo \"$1=a=b\"");
		let setprop = write_script(temp.path(), "setprop", "exit 0");

		let value = client(&getprop, &setprop)
			.get("CCD Simulator", "CONNECTION", "CONNECT")
			.await
			.unwrap();
		assert_eq!(value, "a=b");
	}

	#[tokio::test]
	async fn get_state_queries_state_element() {
		let temp = TempDir::new().unwrap();
		let getprop = write_script(temp.path(), "getprop", "echo \"$1=Ok\"");
		let setprop = write_script(temp.path(), "setprop", "exit 0");
		let client = client(&getprop, &setprop);

		assert_eq!(client.get_state("Telescope Simulator", "CONNECTION").await.unwrap(), "Ok");
		let raw = client.get_raw("Telescope Simulator.CONNECTION._STATE").await.unwrap();
		assert_eq!(raw.trim(), "Telescope Simulator.CONNECTION._STATE=Ok");
	}

	#[tokio::test]
	async fn output_without_equals_is_unexpected() {
		let temp = TempDir::new().unwrap();
		let getprop = write_script(temp.path(), "getprop", "echo garbage");
		let setprop = write_script(temp.path(), "setprop", "exit 0");

		let err = client(&getprop, &setprop).get("a", "b", "c").await.unwrap_err();
		assert!(matches!(err, Error::UnexpectedOutput { .. }), "unexpected error: {err:?}");
	}

	#[tokio::test]
	async fn set_passes_single_assignment_argument() {
		let temp = TempDir::new().unwrap();
		let record = temp.path().join("set.log");
		let getprop = write_script(temp.path(), "getprop", "exit 0");
		let setprop = write_script(
			temp.path(),
			"setprop",
			&format!("echo \"$#:$1\" >> '{}'", record.display()),
		);

		client(&getprop, &setprop)
			.set("Telescope Simulator", "CONNECTION", "CONNECT", "On")
			.await
			.unwrap();
		assert_eq!(
			fs::read_to_string(&record).unwrap(),
			"1:Telescope Simulator.CONNECTION.CONNECT=On\n"
		);
	}

	#[tokio::test]
	async fn failing_client_is_reported() {
		let temp = TempDir::new().unwrap();
		let getprop = write_script(temp.path(), "getprop", "exit 1");
		let setprop = write_script(temp.path(), "setprop", "exit 2");
		let client = client(&getprop, &setprop);

		assert!(matches!(
			client.get("a", "b", "c").await.unwrap_err(),
			Error::ClientFailed { .. }
		));
		assert!(matches!(
			client.set("a", "b", "c", "d").await.unwrap_err(),
			Error::ClientFailed { .. }
		));
	}
}
