//! Settings resolution: environment defaults, config file, then flags.
//!
//! The environment is read once into [`Defaults`]; nothing below this module
//! looks at environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indictl_catalog::DriverCatalog;
use indictl_protocol::{CustomDriver, OperationalRule};
use indictl_runtime::ManagerConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cli::GlobalArgs;
use crate::error::{CliError, Result};

/// Directory searched for definition files when `INDI_DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "/usr/share/indi";
/// Config directory used when no home directory is known.
pub const FALLBACK_CONFIG_DIR: &str = "/tmp/indi";
pub const CONFIG_FILE_NAME: &str = "indictl.json";

/// Environment-derived defaults, computed once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
	pub data_dir: PathBuf,
	pub config_dir: PathBuf,
}

impl Defaults {
	pub fn from_env() -> Self {
		Self::from_parts(env::var_os("INDI_DATA_DIR").map(PathBuf::from), dirs::home_dir())
	}

	pub fn from_parts(data_dir: Option<PathBuf>, home: Option<PathBuf>) -> Self {
		Self {
			data_dir: data_dir
				.filter(|dir| !dir.as_os_str().is_empty())
				.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
			config_dir: home
				.map(|home| home.join(".indi"))
				.unwrap_or_else(|| PathBuf::from(FALLBACK_CONFIG_DIR)),
		}
	}

	pub fn config_file(&self) -> PathBuf {
		self.config_dir.join(CONFIG_FILE_NAME)
	}
}

/// Contents of `indictl.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
	pub port: Option<u16>,
	pub fifo: Option<PathBuf>,
	pub data_dir: Option<PathBuf>,
	pub server_log: Option<PathBuf>,
	pub command_timeout_secs: Option<u64>,
	pub custom_drivers: Vec<CustomDriver>,
	pub rules: Vec<OperationalRule>,
}

impl ConfigFile {
	/// Reads `path`. A missing file yields defaults; unreadable or malformed files are errors.
	pub fn load(path: &Path) -> Result<Self> {
		let text = match fs::read_to_string(path) {
			Ok(text) => text,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				debug!(target = "indictl.config", path = %path.display(), "no config file");
				return Ok(Self::default());
			}
			Err(source) => {
				return Err(CliError::ConfigRead {
					path: path.to_path_buf(),
					source,
				});
			}
		};
		serde_json::from_str(&text).map_err(|source| CliError::ConfigParse {
			path: path.to_path_buf(),
			source,
		})
	}
}

/// Effective settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
	pub data_dir: PathBuf,
	pub manager: ManagerConfig,
	pub custom_drivers: Vec<CustomDriver>,
	pub rules: Vec<OperationalRule>,
}

impl Settings {
	/// Layers flags over the config file over `defaults`.
	pub fn resolve(args: &GlobalArgs, defaults: &Defaults) -> Result<Self> {
		let path = args.config.clone().unwrap_or_else(|| defaults.config_file());
		let file = ConfigFile::load(&path)?;
		Ok(Self::merge(args, defaults, file))
	}

	pub fn merge(args: &GlobalArgs, defaults: &Defaults, file: ConfigFile) -> Self {
		let mut manager = ManagerConfig::default();
		if let Some(port) = args.port.or(file.port) {
			manager.port = port;
		}
		if let Some(fifo) = args.fifo.clone().or(file.fifo) {
			manager.fifo_path = fifo;
		}
		if let Some(log) = file.server_log {
			manager.server_log = Some(log);
		}
		manager.command_timeout = file.command_timeout_secs.map(Duration::from_secs);

		Self {
			data_dir: args
				.data_dir
				.clone()
				.or(file.data_dir)
				.unwrap_or_else(|| defaults.data_dir.clone()),
			manager,
			custom_drivers: file.custom_drivers,
			rules: file.rules,
		}
	}

	/// Loads the catalog, appends custom drivers, and attaches rules.
	pub fn load_catalog(&self) -> Result<DriverCatalog> {
		let mut catalog = DriverCatalog::load(&self.data_dir)?;
		for rejected in catalog.rejected() {
			warn!(target = "indictl.catalog", path = %rejected.path.display(), "skipped definition file");
		}
		catalog.inject_custom(self.custom_drivers.iter().cloned());
		let applied = catalog.apply_rules(&self.rules);
		debug!(target = "indictl.config", rules = self.rules.len(), applied, "rules attached");
		Ok(catalog)
	}
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn defaults_follow_environment_values() {
		let defaults = Defaults::from_parts(Some("/opt/indi".into()), Some("/home/astro".into()));
		assert_eq!(defaults.data_dir, PathBuf::from("/opt/indi"));
		assert_eq!(defaults.config_file(), PathBuf::from("/home/astro/.indi/indictl.json"));

		let fallback = Defaults::from_parts(None, None);
		assert_eq!(fallback.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
		assert_eq!(fallback.config_dir, PathBuf::from(FALLBACK_CONFIG_DIR));
	}

	#[test]
	fn missing_config_file_is_default() {
		let temp = TempDir::new().unwrap();
		let file = ConfigFile::load(&temp.path().join("indictl.json")).unwrap();
		assert_eq!(file, ConfigFile::default());
	}

	#[test]
	fn malformed_config_file_is_an_error() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("indictl.json");
		fs::write(&path, "{ \"port\": \"seven\" }").unwrap();

		assert!(matches!(ConfigFile::load(&path), Err(CliError::ConfigParse { .. })));
	}

	#[test]
	fn config_file_reads_rules_and_custom_drivers() {
		let temp = TempDir::new().unwrap();
		let path = temp.path().join("indictl.json");
		fs::write(
			&path,
			r#"{
				"port": 7700,
				"command_timeout_secs": 30,
				"custom_drivers": [
					{ "name": "My Mount", "label": "My Mount", "exec": "indi_lx200generic", "family": "Telescopes" }
				],
				"rules": [
					{ "Driver": "My Mount", "PreDelay": 2, "PreScript": "/usr/local/bin/power-on" }
				]
			}"#,
		)
		.unwrap();

		let file = ConfigFile::load(&path).unwrap();
		assert_eq!(file.port, Some(7700));
		assert_eq!(file.custom_drivers.len(), 1);
		assert_eq!(file.rules[0].pre_delay, Some(2));
		assert_eq!(file.rules[0].pre_script, Some(PathBuf::from("/usr/local/bin/power-on")));
	}

	#[test]
	fn flags_override_file_over_defaults() {
		let defaults = Defaults::from_parts(None, None);
		let file = ConfigFile {
			port: Some(7700),
			fifo: Some("/run/indi/fifo".into()),
			data_dir: Some("/srv/indi".into()),
			command_timeout_secs: Some(5),
			..ConfigFile::default()
		};
		let args = GlobalArgs {
			port: Some(7800),
			..GlobalArgs::default()
		};

		let settings = Settings::merge(&args, &defaults, file);
		assert_eq!(settings.manager.port, 7800);
		assert_eq!(settings.manager.fifo_path, PathBuf::from("/run/indi/fifo"));
		assert_eq!(settings.data_dir, PathBuf::from("/srv/indi"));
		assert_eq!(settings.manager.command_timeout, Some(Duration::from_secs(5)));
	}

	#[test]
	fn load_catalog_injects_custom_drivers_and_rules() {
		let temp = TempDir::new().unwrap();
		fs::write(
			temp.path().join("drivers.xml"),
			r#"<driversList>
				<devGroup group="CCDs">
					<device label="CCD Simulator"><driver name="CCD Simulator">indi_simulator_ccd</driver></device>
				</devGroup>
			</driversList>"#,
		)
		.unwrap();
		let settings = Settings {
			data_dir: temp.path().to_path_buf(),
			manager: ManagerConfig::default(),
			custom_drivers: vec![CustomDriver {
				name: "My Mount".into(),
				label: "My Mount".into(),
				version: "1.0".into(),
				exec: "indi_lx200generic".into(),
				family: "Telescopes".into(),
			}],
			rules: vec![OperationalRule::for_driver("CCD Simulator")],
		};

		let catalog = settings.load_catalog().unwrap();
		assert_eq!(catalog.len(), 2);
		assert!(catalog.find_by_label("My Mount").unwrap().custom);
		assert!(catalog.find_by_label("CCD Simulator").unwrap().rule.is_some());
	}
}
