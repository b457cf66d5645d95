//! Operational rules: hook scripts and delays around driver start and stop.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hooks bound to one driver by label.
///
/// Field names on the wire are PascalCase (`PreDelay`, `PreScript`, ...).
/// Every field is optional; an absent delay is zero and an absent script is
/// skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OperationalRule {
	/// Label of the driver this rule applies to (exact or prefix match).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub driver: Option<String>,
	/// Seconds to wait before starting the driver.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pre_delay: Option<u64>,
	/// Script run before the start command; failure aborts the start.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pre_script: Option<PathBuf>,
	/// Seconds to wait after the start command.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub post_delay: Option<u64>,
	/// Script run after the start command.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub post_script: Option<PathBuf>,
	/// Script run before the stop command; failure aborts the stop.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stopping_script: Option<PathBuf>,
	/// Seconds to wait before the stop command.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stopping_delay: Option<u64>,
	/// Seconds to wait after the stop command.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stopped_delay: Option<u64>,
	/// Script run after the stop command.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stopped_script: Option<PathBuf>,
}

impl OperationalRule {
	/// Creates an empty rule bound to `driver`.
	pub fn for_driver(driver: impl Into<String>) -> Self {
		Self {
			driver: Some(driver.into()),
			..Self::default()
		}
	}

	pub fn pre_delay(&self) -> Duration {
		secs(self.pre_delay)
	}

	pub fn post_delay(&self) -> Duration {
		secs(self.post_delay)
	}

	pub fn stopping_delay(&self) -> Duration {
		secs(self.stopping_delay)
	}

	pub fn stopped_delay(&self) -> Duration {
		secs(self.stopped_delay)
	}
}

fn secs(value: Option<u64>) -> Duration {
	Duration::from_secs(value.unwrap_or(0))
}
