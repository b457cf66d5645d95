//! Driver catalog for INDI device drivers.
//!
//! Drivers are described by XML definition files installed next to the
//! driver binaries (usually `/usr/share/indi`). [`DriverCatalog::load`] reads
//! every definition file in a directory into label-sorted
//! [`DriverDescriptor`]s. A malformed file is logged and skipped as a whole;
//! the rest of the directory still loads.
//!
//! The catalog then answers lookups by label (exact, then prefix), name, and
//! binary, groups labels by family, accepts user-defined drivers from
//! configuration, and attaches [`OperationalRule`]s by label.

mod catalog;
pub mod error;
pub mod parse;


pub use catalog::{DEFINITION_EXTENSION, DriverCatalog, RejectedFile, SKELETON_INFIX};
pub use error::{DefinitionError, Error, Result};
pub use indictl_protocol::{CustomDriver, DriverDescriptor, OperationalRule};
pub use parse::parse_definitions;
