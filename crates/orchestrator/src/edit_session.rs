//! Per-change driver: seed the updated document, emit a delta, classify the
//! outcome, and hand a `Ready` batch to the applier.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reload_wire::UpdateStatus;
use tokio::sync::Mutex;

use crate::applier::Applier;
use crate::context::Context;
use crate::diagnostics;
use crate::file_read::read_with_backoff;
use crate::solution::Solution;
use crate::workspace::{WorkspaceError, WorkspaceHolder};

/// Tracks the single open edit session, enforcing the "only one session at
/// a time" invariant. There's no payload in an open session beyond the
/// fact it's open: the solution snapshot and emitted batch travel through
/// `handle_change`'s local state instead.
struct SessionGuard<'a>(tokio::sync::MutexGuard<'a, ()>);

impl<'a> SessionGuard<'a> {
	async fn open(lock: &'a Mutex<()>) -> SessionGuard<'a> {
		SessionGuard(lock.lock().await)
	}
}

/// Drives `handle_change` calls against a workspace and an applier.
///
/// `source_extensions` gates which changed paths are even considered;
/// everything else is reported as a handled no-op without touching the
/// workspace.
pub struct EditSessionDriver {
	workspace: WorkspaceHolder,
	applier: Arc<dyn Applier>,
	source_extensions: Vec<String>,
	session_lock: Mutex<()>,
	current_solution: Mutex<Option<Solution>>,
}

impl EditSessionDriver {
	#[must_use]
	pub fn new(
		workspace: WorkspaceHolder,
		applier: Arc<dyn Applier>,
		source_extensions: Vec<String>,
	) -> Self {
		Self {
			workspace,
			applier,
			source_extensions,
			session_lock: Mutex::new(()),
			current_solution: Mutex::new(None),
		}
	}

	fn is_handled_extension(&self, path: &Path) -> bool {
		let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
			return false;
		};
		self.source_extensions
			.iter()
			.any(|configured| configured.trim_start_matches('.').eq_ignore_ascii_case(ext))
	}

	/// Handle one changed file path end to end. Returns `true` when the
	/// change was handled (an unrelated extension is a no-op; a `None`
	/// status or a `Ready` batch with nothing to send still counts, even
	/// carrying compile-only diagnostics), `false` only when it was a rude
	/// edit, a blocked batch, or the file could not be located or read.
	pub async fn handle_change(&self, context: &Context, changed_path: &Path) -> bool {
		if !self.is_handled_extension(changed_path) {
			tracing::debug!(path = %changed_path.display(), "change not a source extension, ignoring");
			return true;
		}

		let workspace = match self.workspace.get().await {
			Ok(workspace) => workspace,
			Err(err) => {
				tracing::warn!(error = %err, "workspace unavailable, cannot handle change");
				return false;
			}
		};

		let text = match read_with_backoff(changed_path, &context.cancellation).await {
			Ok(text) => text,
			Err(err) => {
				tracing::warn!(path = %changed_path.display(), error = %err, "failed reading changed file");
				return false;
			}
		};

		let mut current = self.current_solution.lock().await;
		let base_solution = current.clone().unwrap_or_else(|| workspace.solution.clone());

		let Some((project_id, _location)) = base_solution.locate(changed_path).map(|(id, loc)| (id.to_string(), loc))
		else {
			tracing::warn!(path = %changed_path.display(), "document not found in solution");
			return false;
		};

		let Some(next_solution) = base_solution.with_document_replaced(changed_path, text) else {
			tracing::warn!(path = %changed_path.display(), "document disappeared during replace");
			return false;
		};

		let _session = SessionGuard::open(&self.session_lock).await;
		let batch = workspace.service.emit(&next_solution, &project_id).await;

		match batch.status {
			Some(UpdateStatus::Ready) if !batch.updates.is_empty() => {
				*current = Some(next_solution);
				drop(current);
				diagnostics::route(&batch.diagnostics, context.browser_refresh.as_deref()).await;
				self.applier.apply(context, &batch).await
			}
			Some(UpdateStatus::Blocked) => {
				tracing::info!(path = %changed_path.display(), "edit blocked, session discarded");
				diagnostics::route(&batch.diagnostics, context.browser_refresh.as_deref()).await;
				false
			}
			_ => {
				// None, or Ready with nothing to send: treat project's own
				// compiler diagnostics as the signal, not the batch status.
				let standalone = base_solution.compiler_diagnostics(&project_id);
				if !standalone.is_empty() {
					diagnostics::route(standalone, context.browser_refresh.as_deref()).await;
				}
				true
			}
		}
	}

	/// Current solution snapshot, if any change has committed one yet.
	pub async fn current_solution(&self) -> Option<Solution> {
		self.current_solution.lock().await.clone()
	}
}

/// Resolve a changed path against the project root, for callers (e.g. the
/// binary's stdin feed) that receive paths relative to the project.
#[must_use]
pub fn resolve_relative(project_path: &Path, changed: &str) -> PathBuf {
	let candidate = Path::new(changed);
	if candidate.is_absolute() {
		candidate.to_path_buf()
	} else {
		project_path.join(candidate)
	}
}
