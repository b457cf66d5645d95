//! indiserver runtime - server supervision and driver lifecycle
//!
//! This crate drives a single `indiserver` instance:
//!
//! - **Process management**: launching the server and watching it exit ([`process`])
//! - **Process introspection**: finding server instances by port in the OS process table ([`inspect`])
//! - **Command pipe**: the FIFO the server reads `start`/`stop` directives from ([`pipe`])
//! - **Hooks**: operational-rule scripts and delays around driver start/stop ([`hooks`])
//! - **Property client**: `indi_getprop`/`indi_setprop` wrappers ([`client`])
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ DriverManager                            │
//! │  ┌──────────────┐   ┌─────────────────┐  │
//! │  │ ServerSession│   │ starter task    │  │  one per start(), cancellable
//! │  │  (process)   │   │  (driver queue) │  │
//! │  └──────┬───────┘   └───────┬─────────┘  │
//! │         │                   │ start_driver
//! │  ProcessLauncher      CommandPipe ──────────► indiserver FIFO
//! │  ProcessInspector     PropertyClient ───────► indi_getprop / indi_setprop
//! └──────────────────────────────────────────┘
//! ```
//!
//! `ProcessLauncher` and `ProcessInspector` are traits so tests can replace
//! the OS with in-memory fakes.

pub mod client;
pub mod error;
mod exec;
pub mod hooks;
pub mod inspect;
pub mod locate;
pub mod manager;
pub mod pipe;
pub mod process;
pub mod session;

pub use client::PropertyClient;
pub use error::{Error, Result};
pub use hooks::HookStage;
pub use inspect::{NoInspector, ProcessInspector, SysinfoInspector};
pub use locate::find_executable;
pub use manager::{DriverManager, DriverOutcome, ManagerConfig};
pub use pipe::CommandPipe;
pub use process::{LaunchSpec, ProcessLauncher, ServerProcess, TokioLauncher};
pub use session::{Liveness, ServerSession, ServerState};
