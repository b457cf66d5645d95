//! Driver descriptors.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::rule::OperationalRule;

/// Version reported for drivers whose definition omits one.
pub const DEFAULT_VERSION: &str = "0.0";

/// One cataloged driver.
///
/// Identity fields are fixed at creation. Only [`rule`](Self::rule) changes
/// afterwards, when operational rules are applied to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverDescriptor {
	/// Protocol/binary identifier (`name` attribute of the `<driver>` element).
	pub name: String,
	/// Human-readable display name; the primary lookup key.
	pub label: String,
	/// Free-form version string.
	pub version: String,
	/// Executable name, or `host@port` for a remote driver.
	///
	/// `None` when the definition carried no executable text.
	pub binary: Option<String>,
	/// Grouping category, e.g. "Telescopes".
	pub family: String,
	/// Skeleton property-definition file, already resolved against the catalog directory.
	pub skeleton: Option<PathBuf>,
	/// One process serves several devices; never pass an instance label.
	#[serde(default)]
	pub mdpd: bool,
	/// Injected from configuration rather than discovered from files.
	#[serde(default)]
	pub custom: bool,
	/// Attached operational rule.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rule: Option<OperationalRule>,
}

impl DriverDescriptor {
	/// Creates a descriptor with no skeleton, rule, or flags set.
	pub fn new(
		name: impl Into<String>,
		label: impl Into<String>,
		binary: impl Into<String>,
		family: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			label: label.into(),
			version: DEFAULT_VERSION.to_string(),
			binary: Some(binary.into()),
			family: family.into(),
			skeleton: None,
			mdpd: false,
			custom: false,
			rule: None,
		}
	}

	/// Sets the version string.
	pub fn with_version(mut self, version: impl Into<String>) -> Self {
		self.version = version.into();
		self
	}

	/// Sets the skeleton file path.
	pub fn with_skeleton(mut self, skeleton: impl Into<PathBuf>) -> Self {
		self.skeleton = Some(skeleton.into());
		self
	}

	/// Marks the driver as multi-device-per-driver.
	pub fn with_mdpd(mut self, mdpd: bool) -> Self {
		self.mdpd = mdpd;
		self
	}

	/// Attaches an operational rule.
	pub fn with_rule(mut self, rule: OperationalRule) -> Self {
		self.rule = Some(rule);
		self
	}

	/// Returns the executable, treating blank text as missing.
	pub fn binary(&self) -> Option<&str> {
		self.binary.as_deref().map(str::trim).filter(|b| !b.is_empty())
	}

	/// Returns `true` for `host@port` drivers chained from another server.
	pub fn is_remote(&self) -> bool {
		self.binary().is_some_and(|b| b.contains('@'))
	}

	/// Returns `true` when FIFO commands for this driver may carry `-n <label>`.
	///
	/// Remote drivers name themselves on the far server, and MDPD drivers
	/// create several devices from one process.
	pub fn accepts_instance_label(&self) -> bool {
		!self.is_remote() && !self.mdpd
	}
}

/// User-defined driver record as stored in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomDriver {
	pub name: String,
	pub label: String,
	#[serde(default = "default_version")]
	pub version: String,
	/// Executable name (`exec` in configuration files).
	pub exec: String,
	pub family: String,
}

fn default_version() -> String {
	DEFAULT_VERSION.to_string()
}

impl From<CustomDriver> for DriverDescriptor {
	fn from(custom: CustomDriver) -> Self {
		Self {
			name: custom.name,
			label: custom.label,
			version: custom.version,
			binary: Some(custom.exec),
			family: custom.family,
			skeleton: None,
			mdpd: false,
			custom: true,
			rule: None,
		}
	}
}
