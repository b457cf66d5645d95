//! Shared types for the indictl workspace.
//!
//! This crate holds the data that flows between the driver catalog and the
//! lifecycle manager:
//!
//! - [`DriverDescriptor`] - one cataloged driver and its metadata
//! - [`OperationalRule`] - hook scripts and delays bound to a driver by label
//! - [`CustomDriver`] - a user-defined driver record from configuration
//! - [`DriverCommand`] - the single-line FIFO directives understood by `indiserver`
//!
//! Types here carry no I/O. Everything is serde-serializable so the CLI can
//! load rules and custom drivers from JSON and print descriptors back out.

pub mod command;
pub mod descriptor;
pub mod rule;

pub use command::{DriverCommand, ProtocolError};
pub use descriptor::{CustomDriver, DEFAULT_VERSION, DriverDescriptor};
pub use rule::OperationalRule;
