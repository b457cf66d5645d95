//! Locating INDI executables on PATH and in common install prefixes.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[cfg(not(windows))]
const COMMON_LOCATIONS: &[&str] = &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin", "/opt/local/bin"];

#[cfg(windows)]
const COMMON_LOCATIONS: &[&str] = &[];

/// Resolves `name` to an executable path.
///
/// Paths containing a separator are checked as given. Bare names are looked
/// up on `PATH`, then in common install prefixes.
///
/// # Errors
///
/// Returns [`Error::ExecutableNotFound`] when nothing executable matches.
pub fn find_executable(name: &str) -> Result<PathBuf> {
	find_in(name, env::var_os("PATH").as_deref())
}

pub(crate) fn find_in(name: &str, path_var: Option<&OsStr>) -> Result<PathBuf> {
	let cwd = env::current_dir()?;
	which::which_in(name, path_var, &cwd).or_else(|_| in_common_locations(name, &cwd))
}

fn in_common_locations(name: &str, cwd: &Path) -> Result<PathBuf> {
	let paths = env::join_paths(COMMON_LOCATIONS).ok();
	which::which_in(name, paths, cwd).map_err(|_| Error::ExecutableNotFound(name.to_string()))
}
