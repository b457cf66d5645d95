//! OS process-table access for locating server instances by port.
//!
//! Enumeration is a capability: [`SysinfoInspector::probe`] checks once
//! whether the platform supports it and returns [`NoInspector`] otherwise.
//! Callers branch on [`ProcessInspector::is_available`] instead of treating
//! enumeration errors as "unsupported".

use std::ffi::OsStr;
use std::sync::Arc;

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

/// Read/kill access to the OS process table.
pub trait ProcessInspector: Send + Sync {
	/// Whether process enumeration works on this platform.
	fn is_available(&self) -> bool;

	/// Pids of processes named `executable` whose arguments carry `-p <port>`.
	fn find_servers(&self, executable: &str, port: u16) -> Vec<u32>;

	/// Kills `pid` and waits for it to exit. Returns false if it could not be signalled.
	fn kill(&self, pid: u32) -> bool;
}

/// Returns true when `args` contain `-p` immediately followed by `port`.
pub fn serves_port<S: AsRef<OsStr>>(args: &[S], port: u16) -> bool {
	args.windows(2).any(|pair| {
		pair[0].as_ref() == "-p"
			&& pair[1]
				.as_ref()
				.to_str()
				.and_then(|value| value.trim().parse::<u16>().ok())
				== Some(port)
	})
}

/// Process table backed by `sysinfo`.
pub struct SysinfoInspector {
	system: Mutex<System>,
}

impl SysinfoInspector {
	pub fn new() -> Self {
		Self {
			system: Mutex::new(System::new()),
		}
	}

	/// Returns a sysinfo inspector if the platform supports enumeration,
	/// otherwise [`NoInspector`].
	pub fn probe() -> Arc<dyn ProcessInspector> {
		if sysinfo::IS_SUPPORTED_SYSTEM {
			Arc::new(Self::new())
		} else {
			debug!(target = "indictl.server", "process enumeration unsupported on this platform");
			Arc::new(NoInspector)
		}
	}
}

impl Default for SysinfoInspector {
	fn default() -> Self {
		Self::new()
	}
}

impl ProcessInspector for SysinfoInspector {
	fn is_available(&self) -> bool {
		true
	}

	fn find_servers(&self, executable: &str, port: u16) -> Vec<u32> {
		let mut system = self.system.lock();
		system.refresh_processes_specifics(
			ProcessesToUpdate::All,
			true,
			ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
		);

		let mut pids: Vec<u32> = system
			.processes()
			.values()
			.filter(|process| process.name() == OsStr::new(executable))
			.filter(|process| serves_port(process.cmd(), port))
			.map(|process| process.pid().as_u32())
			.collect();
		pids.sort_unstable();
		pids
	}

	fn kill(&self, pid: u32) -> bool {
		let pid = Pid::from_u32(pid);
		let mut system = self.system.lock();
		system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

		let Some(process) = system.process(pid) else {
			return false;
		};
		if !process.kill() {
			return false;
		}
		let _ = process.wait();
		true
	}
}

/// Inspector for platforms without process enumeration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInspector;

impl ProcessInspector for NoInspector {
	fn is_available(&self) -> bool {
		false
	}

	fn find_servers(&self, _executable: &str, _port: u16) -> Vec<u32> {
		Vec::new()
	}

	fn kill(&self, _pid: u32) -> bool {
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn serves_port_matches_flag_value_pairs() {
		let args = ["indiserver", "-p", "7624", "-m", "1000", "-v", "-f", "/tmp/indiFIFO"];
		assert!(serves_port(&args, 7624));
		assert!(!serves_port(&args, 7625));
	}

	#[test]
	fn serves_port_ignores_unparsable_and_dangling_flags() {
		assert!(!serves_port(&["indiserver", "-p", "abc"], 7624));
		assert!(!serves_port(&["indiserver", "-p"], 7624));
		assert!(!serves_port(&["indiserver", "7624"], 7624));
	}

	#[test]
	fn no_inspector_reports_unavailable() {
		let inspector = NoInspector;
		assert!(!inspector.is_available());
		assert!(inspector.find_servers("indiserver", 7624).is_empty());
		assert!(!inspector.kill(1));
	}

	#[test]
	fn sysinfo_inspector_finds_nothing_for_unknown_executable() {
		let inspector = SysinfoInspector::new();
		assert!(inspector.find_servers("indictl-no-such-server", 7624).is_empty());
	}
}
