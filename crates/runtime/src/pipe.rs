//! The indiserver command FIFO.
//!
//! The server opens the FIFO for reading and executes one directive per line.
//! Opening the write end blocks until the server is reading, so writes run on
//! the blocking pool.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use indictl_protocol::DriverCommand;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Suffix appended to the FIFO path to form the server's control socket path.
pub const SOCKET_SUFFIX: &str = "_sock";

/// Named pipe consumed by one indiserver instance.
#[derive(Debug, Clone)]
pub struct CommandPipe {
	path: PathBuf,
}

impl CommandPipe {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Control socket path passed to the server with `-u`.
	pub fn socket_path(&self) -> PathBuf {
		let mut socket = OsString::from(self.path.as_os_str());
		socket.push(SOCKET_SUFFIX);
		PathBuf::from(socket)
	}

	/// Deletes whatever is at the pipe path and creates a fresh FIFO.
	pub fn recreate(&self) -> Result<()> {
		info!(target = "indictl.server", path = %self.path.display(), "recreating command pipe");
		match fs::remove_file(&self.path) {
			Ok(()) => {}
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
			Err(source) => return Err(self.error(source)),
		}
		make_fifo(&self.path).map_err(|source| self.error(source))
	}

	/// Writes `command` as one line.
	///
	/// The line is the unescaped command text; see [`DriverCommand::escaped`].
	pub async fn send(&self, command: &DriverCommand) -> Result<()> {
		let line = command.to_string();
		let shell = format!("echo \"{}\" > {}", command.escaped(), self.path.display());
		info!(target = "indictl.driver", command = %shell, "writing command pipe");

		let path = self.path.clone();
		let written = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
			let mut pipe = OpenOptions::new().append(true).create(true).open(&path)?;
			writeln!(pipe, "{line}")?;
			pipe.flush()
		})
		.await
		.map_err(|join| self.error(std::io::Error::other(join)))?;

		written.map_err(|source| self.error(source))?;
		debug!(target = "indictl.driver", binary = command.binary(), "command written");
		Ok(())
	}

	fn error(&self, source: std::io::Error) -> Error {
		Error::Pipe {
			path: self.path.clone(),
			source,
		}
	}
}

#[cfg(unix)]
fn make_fifo(path: &Path) -> std::io::Result<()> {
	use std::ffi::CString;
	use std::os::unix::ffi::OsStrExt;

	let c_path = CString::new(path.as_os_str().as_bytes())
		.map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
	let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o666) };
	if rc == 0 {
		Ok(())
	} else {
		Err(std::io::Error::last_os_error())
	}
}

#[cfg(not(unix))]
fn make_fifo(_path: &Path) -> std::io::Result<()> {
	Err(std::io::Error::new(
		std::io::ErrorKind::Unsupported,
		"named pipes require a unix platform",
	))
}

#[cfg(test)]
mod tests {
	use indictl_protocol::DriverDescriptor;
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn socket_path_appends_suffix() {
		let pipe = CommandPipe::new("/tmp/indiFIFO");
		assert_eq!(pipe.socket_path(), PathBuf::from("/tmp/indiFIFO_sock"));
	}

	#[tokio::test]
	async fn send_appends_one_unescaped_line_per_command() {
		let temp = TempDir::new().unwrap();
		let pipe = CommandPipe::new(temp.path().join("fifo.log"));
		let driver = DriverDescriptor::new("CCD Simulator", "CCD Simulator", "indi_simulator_ccd", "CCDs");

		pipe.send(&DriverCommand::start(&driver).unwrap()).await.unwrap();
		pipe.send(&DriverCommand::stop(&driver, None).unwrap()).await.unwrap();

		let written = fs::read_to_string(pipe.path()).unwrap();
		assert_eq!(
			written,
			"start indi_simulator_ccd -n \"CCD Simulator\"\nstop indi_simulator_ccd -n \"CCD Simulator\"\n"
		);
	}

	#[cfg(unix)]
	#[test]
	fn recreate_replaces_existing_file_with_fifo() {
		use std::os::unix::fs::FileTypeExt;

		let temp = TempDir::new().unwrap();
		let pipe = CommandPipe::new(temp.path().join("indiFIFO"));
		fs::write(pipe.path(), "stale").unwrap();

		pipe.recreate().unwrap();
		assert!(fs::metadata(pipe.path()).unwrap().file_type().is_fifo());

		pipe.recreate().unwrap();
		assert!(fs::metadata(pipe.path()).unwrap().file_type().is_fifo());
	}
}
