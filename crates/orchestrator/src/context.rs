//! Per-iteration state shared between the workspace holder, the edit-session
//! driver, and the appliers.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::applier::BrowserRefreshChannel;

/// Environment entries to apply to the target process's next launch.
///
/// Mutated only during iteration 0's initialization; must not change while
/// the process is already launching.
#[derive(Debug, Clone, Default)]
pub struct ProcessSpec {
	pub env: std::collections::BTreeMap<String, String>,
}

impl ProcessSpec {
	/// Force the managed runtime into edit-and-continue-compatible codegen
	/// via `COMPLUS_ForceEnc=1`.
	pub fn enable_edit_and_continue(&mut self) {
		self.env.insert("COMPLUS_ForceEnc".to_string(), "1".to_string());
	}
}

/// Per-iteration state: which launch this is, where the project lives, what
/// environment the next launch carries, and (optionally) a browser refresh
/// channel for browser-hosted runtimes.
#[derive(Clone)]
pub struct Context {
	/// 0 on first launch; incremented on every restart after a blocked batch.
	pub iteration: u64,
	pub project_path: PathBuf,
	pub process_spec: ProcessSpec,
	pub browser_refresh: Option<Arc<dyn BrowserRefreshChannel>>,
	/// The process-wide shutdown token every iteration's `cancellation` is
	/// derived from, so cancelling it reaches in-flight orchestrator work
	/// across iterations, not just whatever drives the outer loop.
	shutdown: CancellationToken,
	/// Cancels every suspension point this iteration owns. Cancelling leaves
	/// the orchestrator unusable until the next iteration is constructed
	/// with a fresh token.
	pub cancellation: CancellationToken,
}

impl Context {
	/// Construct a standalone context with its own, unlinked shutdown token.
	/// For tests and callers that have no outer cancellation source; use
	/// [`Self::with_shutdown`] to wire a real one in.
	#[must_use]
	pub fn new(project_path: PathBuf) -> Self {
		Self::with_shutdown(project_path, CancellationToken::new())
	}

	/// Construct the first iteration's context, deriving `cancellation` from
	/// `shutdown` via [`CancellationToken::child_token`] so cancelling
	/// `shutdown` (e.g. on ctrl-c) aborts any pending read/write and other
	/// in-flight orchestrator work, not only the caller's own read loop.
	#[must_use]
	pub fn with_shutdown(project_path: PathBuf, shutdown: CancellationToken) -> Self {
		Self {
			iteration: 0,
			project_path,
			process_spec: ProcessSpec::default(),
			browser_refresh: None,
			cancellation: shutdown.child_token(),
			shutdown,
		}
	}

	/// Produce the context for the next iteration after a restart: carries
	/// forward configuration and the same root shutdown token, but derives a
	/// fresh per-iteration `cancellation` child token from it.
	#[must_use]
	pub fn next_iteration(&self) -> Self {
		Self {
			iteration: self.iteration + 1,
			project_path: self.project_path.clone(),
			process_spec: self.process_spec.clone(),
			browser_refresh: self.browser_refresh.clone(),
			cancellation: self.shutdown.child_token(),
			shutdown: self.shutdown.clone(),
		}
	}
}
