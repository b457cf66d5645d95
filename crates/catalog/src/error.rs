//! Error types for the driver catalog.

use std::path::PathBuf;

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading a catalog.
#[derive(Debug, Error)]
pub enum Error {
	/// The catalog directory itself could not be listed.
	#[error("Failed to read driver directory {path}: {source}")]
	ReadDir {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// A definition file could not be read.
	#[error("Failed to read definition file {path}: {source}")]
	ReadFile {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// A definition file was read but rejected.
	#[error("Error in file {path}: {source}")]
	Definition {
		path: PathBuf,
		#[source]
		source: DefinitionError,
	},
}

/// Reasons a single definition document is rejected.
#[derive(Debug, Error)]
pub enum DefinitionError {
	#[error("malformed XML: {0}")]
	Xml(#[from] quick_xml::Error),

	#[error("malformed attribute: {0}")]
	Attribute(#[from] AttrError),

	#[error("attribute '{attribute}' not found on <{element}>")]
	MissingAttribute {
		element: &'static str,
		attribute: &'static str,
	},

	#[error("device '{label}' has no <driver> element")]
	MissingDriver { label: String },

	#[error("document ended inside <{0}>")]
	Truncated(&'static str),
}
