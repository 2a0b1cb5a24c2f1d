//! In-process agent loaded into the target process at startup.
//!
//! Built with `crate-type = ["rlib", "cdylib"]`: the `rlib` face is what
//! `reload-orchestrator`'s tests and any in-process embedding link against;
//! the `cdylib` face exports [`initialize`], the startup-hook entry point
//! the host process calls once at load.

pub mod loop_;
pub mod updater;

pub use loop_::{AgentError, AgentState, run};
pub use updater::{ApplyError, NullUpdater, RuntimeUpdater, UnboundUpdater};

use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_PIPE_NAME: &str = "netcore-hot-reload";

/// Startup-hook entry point invoked once by the host process.
///
/// Spawns a dedicated OS thread carrying its own single-threaded Tokio
/// runtime (the host process makes no guarantee it runs Tokio itself), then
/// runs the agent loop on that runtime until the pipe closes. Never blocks
/// the calling thread beyond the spawn itself.
///
/// # Safety
/// Exported with C linkage for the host's startup-hook loader to call with
/// no arguments. Must not be called more than once per process.
#[unsafe(no_mangle)]
pub extern "C" fn initialize() {
	std::thread::Builder::new()
		.name("reload-agent".to_string())
		.spawn(agent_thread_main)
		.expect("failed to spawn reload-agent thread");
}

fn agent_thread_main() {
	let runtime = match tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
	{
		Ok(runtime) => runtime,
		Err(err) => {
			tracing::warn!(error = %err, "reload-agent failed to start its runtime");
			return;
		}
	};

	runtime.block_on(async {
		let pipe_name = reload_wire::resolve_pipe_name(DEFAULT_PIPE_NAME);
		let updater = UnboundUpdater;
		if let Err(err) = run(&pipe_name, &updater, DEFAULT_CONNECT_TIMEOUT).await {
			tracing::warn!(error = %err, "reload-agent exited without ever applying a delta");
		}
	});
}
