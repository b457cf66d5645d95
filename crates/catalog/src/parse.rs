//! Definition file parsing.
//!
//! A definition document groups devices by family:
//!
//! ```xml
//! <driversList>
//!   <devGroup group="Telescopes">
//!     <device label="Telescope Simulator" skel="indi_sim_sk.xml" mdpd="false">
//!       <driver name="Telescope Simulator">indi_simulator_telescope</driver>
//!       <version>1.0</version>
//!     </device>
//!   </devGroup>
//! </driversList>
//! ```

use std::path::Path;

use indictl_protocol::{DEFAULT_VERSION, DriverDescriptor};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::DefinitionError;

const GROUP: &str = "devGroup";
const DEVICE: &str = "device";
const DRIVER: &str = "driver";

/// Parses one definition document.
///
/// Skeleton references are resolved against `base_dir`. Any missing required
/// attribute (`group`, `label`, driver `name`), a device without a driver, or
/// malformed markup rejects the whole document.
pub fn parse_definitions(xml: &str, base_dir: &Path) -> Result<Vec<DriverDescriptor>, DefinitionError> {
	let mut reader = Reader::from_str(xml);
	reader.config_mut().trim_text(true);

	let mut parser = DefinitionParser::new(base_dir);
	loop {
		match reader.read_event()? {
			Event::Start(e) => parser.open(&e)?,
			Event::Empty(e) => {
				parser.open(&e)?;
				parser.close(e.name().as_ref())?;
			}
			Event::End(e) => parser.close(e.name().as_ref())?,
			Event::Text(t) => parser.text(&t.unescape()?),
			Event::Eof => break,
			_ => {}
		}
	}

	parser.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
	None,
	Binary,
	Version,
}

#[derive(Debug)]
struct PendingDevice {
	label: String,
	skeleton: Option<String>,
	mdpd: bool,
	name: Option<String>,
	binary: String,
	version: Option<String>,
}

struct DefinitionParser<'a> {
	base_dir: &'a Path,
	family: Option<String>,
	device: Option<PendingDevice>,
	capture: Capture,
	drivers: Vec<DriverDescriptor>,
}

impl<'a> DefinitionParser<'a> {
	fn new(base_dir: &'a Path) -> Self {
		Self {
			base_dir,
			family: None,
			device: None,
			capture: Capture::None,
			drivers: Vec::new(),
		}
	}

	fn open(&mut self, e: &BytesStart<'_>) -> Result<(), DefinitionError> {
		match e.name().as_ref() {
			b"devGroup" => {
				self.family = Some(required(e, GROUP, "group")?);
			}
			b"device" if self.family.is_some() => {
				self.device = Some(PendingDevice {
					label: required(e, DEVICE, "label")?,
					skeleton: attribute(e, "skel")?,
					mdpd: attribute(e, "mdpd")?.as_deref() == Some("true"),
					name: None,
					binary: String::new(),
					version: None,
				});
			}
			b"driver" => {
				if let Some(device) = self.device.as_mut() {
					device.name = Some(required(e, DRIVER, "name")?);
					self.capture = Capture::Binary;
				}
			}
			b"version" if self.device.is_some() => {
				self.capture = Capture::Version;
			}
			_ => {}
		}
		Ok(())
	}

	fn text(&mut self, text: &str) {
		let Some(device) = self.device.as_mut() else {
			return;
		};
		match self.capture {
			Capture::Binary => device.binary.push_str(text),
			Capture::Version => device.version.get_or_insert_with(String::new).push_str(text),
			Capture::None => {}
		}
	}

	fn close(&mut self, name: &[u8]) -> Result<(), DefinitionError> {
		match name {
			b"driver" | b"version" => self.capture = Capture::None,
			b"device" => {
				if let Some(device) = self.device.take() {
					let family = self.family.clone().unwrap_or_default();
					self.drivers.push(self.finish_device(device, family)?);
				}
			}
			b"devGroup" => self.family = None,
			_ => {}
		}
		Ok(())
	}

	fn finish_device(&self, device: PendingDevice, family: String) -> Result<DriverDescriptor, DefinitionError> {
		let name = device.name.ok_or_else(|| DefinitionError::MissingDriver {
			label: device.label.clone(),
		})?;
		let binary = device.binary.trim().to_string();

		Ok(DriverDescriptor {
			name,
			label: device.label,
			version: device
				.version
				.filter(|v| !v.trim().is_empty())
				.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
			binary: (!binary.is_empty()).then_some(binary),
			family,
			skeleton: device.skeleton.map(|skel| self.base_dir.join(skel)),
			mdpd: device.mdpd,
			custom: false,
			rule: None,
		})
	}

	fn finish(self) -> Result<Vec<DriverDescriptor>, DefinitionError> {
		if self.device.is_some() {
			return Err(DefinitionError::Truncated(DEVICE));
		}
		if self.family.is_some() {
			return Err(DefinitionError::Truncated(GROUP));
		}
		Ok(self.drivers)
	}
}

fn attribute(e: &BytesStart<'_>, name: &'static str) -> Result<Option<String>, DefinitionError> {
	match e.try_get_attribute(name)? {
		Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
		None => Ok(None),
	}
}

fn required(e: &BytesStart<'_>, element: &'static str, name: &'static str) -> Result<String, DefinitionError> {
	attribute(e, name)?.ok_or(DefinitionError::MissingAttribute {
		element,
		attribute: name,
	})
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;

	const TELESCOPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<driversList>
	<devGroup group="Telescopes">
		<device label="Telescope Simulator" skel="indi_sim_sk.xml">
			<driver name="Telescope Simulator">indi_simulator_telescope</driver>
			<version>1.0</version>
		</device>
		<device label="Celestron GPS">
			<driver name="Celestron GPS">indi_celestron_gps</driver>
		</device>
	</devGroup>
	<devGroup group="Auxiliary">
		<device label="Pegasus UPB" mdpd="true">
			<driver name="Pegasus UPB">indi_pegasus_upb</driver>
			<version>1.6</version>
		</device>
	</devGroup>
</driversList>
"#;

	#[test]
	fn parses_groups_devices_and_optional_fields() {
		let drivers = parse_definitions(TELESCOPES, Path::new("/usr/share/indi")).unwrap();
		assert_eq!(drivers.len(), 3);

		let sim = &drivers[0];
		assert_eq!(sim.label, "Telescope Simulator");
		assert_eq!(sim.name, "Telescope Simulator");
		assert_eq!(sim.binary.as_deref(), Some("indi_simulator_telescope"));
		assert_eq!(sim.family, "Telescopes");
		assert_eq!(sim.version, "1.0");
		assert_eq!(sim.skeleton, Some(PathBuf::from("/usr/share/indi/indi_sim_sk.xml")));
		assert!(!sim.mdpd);
		assert!(!sim.custom);

		let celestron = &drivers[1];
		assert_eq!(celestron.version, DEFAULT_VERSION);
		assert!(celestron.skeleton.is_none());

		let upb = &drivers[2];
		assert_eq!(upb.family, "Auxiliary");
		assert!(upb.mdpd);
	}

	#[test]
	fn missing_label_rejects_document() {
		let xml = r#"<driversList><devGroup group="CCDs">
			<device label="Good"><driver name="Good">indi_good</driver></device>
			<device><driver name="Bad">indi_bad</driver></device>
		</devGroup></driversList>"#;

		let err = parse_definitions(xml, Path::new(".")).unwrap_err();
		assert!(matches!(
			err,
			DefinitionError::MissingAttribute {
				element: "device",
				attribute: "label"
			}
		));
	}

	#[test]
	fn missing_group_and_driver_name_are_rejected() {
		let no_group = r#"<driversList><devGroup><device label="A"><driver name="A">a</driver></device></devGroup></driversList>"#;
		assert!(matches!(
			parse_definitions(no_group, Path::new(".")),
			Err(DefinitionError::MissingAttribute { attribute: "group", .. })
		));

		let no_name = r#"<driversList><devGroup group="G"><device label="A"><driver>a</driver></device></devGroup></driversList>"#;
		assert!(matches!(
			parse_definitions(no_name, Path::new(".")),
			Err(DefinitionError::MissingAttribute { attribute: "name", .. })
		));
	}

	#[test]
	fn device_without_driver_is_rejected() {
		let xml = r#"<driversList><devGroup group="G"><device label="Lonely"/></devGroup></driversList>"#;
		assert!(matches!(
			parse_definitions(xml, Path::new(".")),
			Err(DefinitionError::MissingDriver { label }) if label == "Lonely"
		));
	}

	#[test]
	fn mismatched_tags_are_rejected() {
		let xml = r#"<driversList><devGroup group="G"><device label="A"><driver name="A">a</driver></devGroup></driversList>"#;
		assert!(parse_definitions(xml, Path::new(".")).is_err());
	}

	#[test]
	fn empty_driver_text_leaves_binary_unset() {
		let xml = r#"<driversList><devGroup group="G"><device label="A"><driver name="A"/></device></devGroup></driversList>"#;
		let drivers = parse_definitions(xml, Path::new(".")).unwrap();
		assert_eq!(drivers.len(), 1);
		assert!(drivers[0].binary.is_none());
	}

	#[test]
	fn escaped_entities_are_decoded() {
		let xml = r#"<driversList><devGroup group="Focusers"><device label="Moonlite &amp; Co"><driver name="Moonlite">indi_moonlite_focus</driver></device></devGroup></driversList>"#;
		let drivers = parse_definitions(xml, Path::new(".")).unwrap();
		assert_eq!(drivers[0].label, "Moonlite & Co");
	}
}
