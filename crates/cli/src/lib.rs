//! `indictl` command-line front end.
//!
//! Parses arguments, resolves settings from the environment, the JSON
//! configuration file and flags, then runs catalog and server commands
//! against [`indictl_catalog`] and [`indictl_runtime`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
mod styles;
