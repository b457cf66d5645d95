use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use indictl_protocol::{CustomDriver, DriverDescriptor, OperationalRule};
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::parse::parse_definitions;

/// File-name infix marking skeleton (auxiliary property) files.
pub const SKELETON_INFIX: &str = "_sk";
/// Extension of driver definition files.
pub const DEFINITION_EXTENSION: &str = "xml";

/// A definition file that was skipped during [`DriverCatalog::load`].
#[derive(Debug)]
pub struct RejectedFile {
	pub path: PathBuf,
	pub error: Error,
}

/// In-memory registry of driver descriptors.
///
/// Discovered drivers are kept sorted by label. Custom drivers are appended
/// in caller order by [`inject_custom`](Self::inject_custom) without
/// re-sorting.
#[derive(Debug, Default)]
pub struct DriverCatalog {
	source_dir: PathBuf,
	drivers: Vec<DriverDescriptor>,
	sources: Vec<PathBuf>,
	rejected: Vec<RejectedFile>,
}

impl DriverCatalog {
	/// Creates a catalog from already-built descriptors, sorted by label.
	pub fn from_drivers(mut drivers: Vec<DriverDescriptor>) -> Self {
		sort_by_label(&mut drivers);
		Self {
			drivers,
			..Self::default()
		}
	}

	/// Loads every definition file in `source_dir`.
	///
	/// Files that fail to read or parse are logged, recorded in
	/// [`rejected`](Self::rejected), and skipped as a whole.
	///
	/// # Errors
	///
	/// Returns [`Error::ReadDir`] if the directory itself cannot be listed.
	pub fn load(source_dir: impl AsRef<Path>) -> Result<Self> {
		let source_dir = source_dir.as_ref();
		let files = definition_files(source_dir)?;

		let mut catalog = Self {
			source_dir: source_dir.to_path_buf(),
			..Self::default()
		};

		for path in files {
			match load_file(&path, source_dir) {
				Ok(drivers) => {
					debug!(
						target = "indictl.catalog",
						path = %path.display(),
						count = drivers.len(),
						"parsed definition file"
					);
					catalog.drivers.extend(drivers);
					catalog.sources.push(path);
				}
				Err(err) => {
					error!(target = "indictl.catalog", path = %path.display(), error = %err, "skipping definition file");
					catalog.rejected.push(RejectedFile { path, error: err });
				}
			}
		}

		sort_by_label(&mut catalog.drivers);
		info!(
			target = "indictl.catalog",
			dir = %source_dir.display(),
			drivers = catalog.drivers.len(),
			rejected = catalog.rejected.len(),
			"driver catalog loaded"
		);
		Ok(catalog)
	}

	/// Directory the catalog was loaded from.
	pub fn source_dir(&self) -> &Path {
		&self.source_dir
	}

	/// Definition files that contributed drivers.
	pub fn sources(&self) -> &[PathBuf] {
		&self.sources
	}

	/// Definition files skipped during load.
	pub fn rejected(&self) -> &[RejectedFile] {
		&self.rejected
	}

	pub fn drivers(&self) -> &[DriverDescriptor] {
		&self.drivers
	}

	pub fn iter(&self) -> impl Iterator<Item = &DriverDescriptor> {
		self.drivers.iter()
	}

	pub fn len(&self) -> usize {
		self.drivers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.drivers.is_empty()
	}

	/// Appends user-defined drivers, marked custom, in the given order.
	pub fn inject_custom<I>(&mut self, drivers: I)
	where
		I: IntoIterator<Item = CustomDriver>,
	{
		let before = self.drivers.len();
		self.drivers.extend(drivers.into_iter().map(DriverDescriptor::from));
		debug!(
			target = "indictl.catalog",
			count = self.drivers.len() - before,
			"injected custom drivers"
		);
	}

	/// Removes every custom driver, keeping the others in order.
	pub fn clear_custom(&mut self) {
		self.drivers.retain(|driver| !driver.custom);
	}

	/// Finds a driver by exact label, then by the first label that prefixes `label`.
	///
	/// The prefix pass lets a device label such as `"Telescope One Name"`
	/// resolve to the driver labelled `"Telescope One"`.
	pub fn find_by_label(&self, label: &str) -> Option<&DriverDescriptor> {
		self.position_by_label(label).map(|idx| &self.drivers[idx])
	}

	pub fn find_by_name(&self, name: &str) -> Option<&DriverDescriptor> {
		self.drivers.iter().find(|driver| driver.name == name)
	}

	pub fn find_by_binary(&self, binary: &str) -> Option<&DriverDescriptor> {
		self.drivers
			.iter()
			.find(|driver| driver.binary.as_deref() == Some(binary))
	}

	/// Groups labels by family, labels in catalog order.
	pub fn families(&self) -> BTreeMap<String, Vec<String>> {
		let mut families: BTreeMap<String, Vec<String>> = BTreeMap::new();
		for driver in &self.drivers {
			families
				.entry(driver.family.clone())
				.or_default()
				.push(driver.label.clone());
		}
		families
	}

	/// Attaches each rule to the driver named by its `Driver` key.
	///
	/// A later rule for the same driver replaces an earlier one. Rules without
	/// a `Driver` key or without a matching driver are skipped. Returns the
	/// number of rules attached.
	pub fn apply_rules(&mut self, rules: &[OperationalRule]) -> usize {
		let mut applied = 0;
		for rule in rules {
			let Some(label) = rule.driver.as_deref() else {
				continue;
			};
			match self.position_by_label(label) {
				Some(idx) => {
					self.drivers[idx].rule = Some(rule.clone());
					applied += 1;
				}
				None => {
					debug!(target = "indictl.catalog", driver = label, "no driver matches rule");
				}
			}
		}
		applied
	}

	/// Resolves `labels` to descriptors, returning the labels that matched nothing.
	pub fn resolve_labels<S: AsRef<str>>(&self, labels: &[S]) -> (Vec<DriverDescriptor>, Vec<String>) {
		let mut found = Vec::new();
		let mut unknown = Vec::new();
		for label in labels {
			match self.find_by_label(label.as_ref()) {
				Some(driver) => found.push(driver.clone()),
				None => unknown.push(label.as_ref().to_string()),
			}
		}
		(found, unknown)
	}

	fn position_by_label(&self, label: &str) -> Option<usize> {
		self.drivers
			.iter()
			.position(|driver| driver.label == label)
			.or_else(|| {
				self.drivers
					.iter()
					.position(|driver| label.starts_with(driver.label.as_str()))
			})
	}
}

/// Lists definition files in `dir`, skipping skeleton files, sorted by path.
pub(crate) fn definition_files(dir: &Path) -> Result<Vec<PathBuf>> {
	let read_dir = fs::read_dir(dir).map_err(|source| Error::ReadDir {
		path: dir.to_path_buf(),
		source,
	})?;

	let mut files = Vec::new();
	for entry in read_dir {
		let entry = entry.map_err(|source| Error::ReadDir {
			path: dir.to_path_buf(),
			source,
		})?;
		let path = entry.path();
		if is_definition_file(&path) {
			files.push(path);
		}
	}
	files.sort();
	Ok(files)
}

fn is_definition_file(path: &Path) -> bool {
	let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
		return false;
	};
	let is_xml = path
		.extension()
		.and_then(|ext| ext.to_str())
		.is_some_and(|ext| ext == DEFINITION_EXTENSION);
	is_xml && !file_name.contains(SKELETON_INFIX) && path.is_file()
}

fn load_file(path: &Path, base_dir: &Path) -> Result<Vec<DriverDescriptor>> {
	let content = fs::read_to_string(path).map_err(|source| Error::ReadFile {
		path: path.to_path_buf(),
		source,
	})?;
	parse_definitions(&content, base_dir).map_err(|source| Error::Definition {
		path: path.to_path_buf(),
		source,
	})
}

fn sort_by_label(drivers: &mut [DriverDescriptor]) {
	drivers.sort_by(|a, b| a.label.cmp(&b.label));
}
