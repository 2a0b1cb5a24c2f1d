//! Lazy, one-shot project load and the holder that exposes it to the rest
//! of the pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::compiler::EditContinuationService;
use crate::solution::Solution;

/// Errors from workspace discovery, load, or use after disposal.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
	/// Could not locate or register the host build system.
	#[error("failed to discover the project's build system")]
	DiscoveryFailed,
	/// Build system found, but the project itself failed to load.
	#[error("failed to load the project")]
	LoadFailed,
	/// The holder was used after its workspace was disposed.
	#[error("workspace has been disposed")]
	Disposed,
}

/// A loaded project: its current solution and the compiler session driving it.
pub struct Workspace {
	pub solution: Solution,
	pub service: Arc<dyn EditContinuationService>,
}

impl std::fmt::Debug for Workspace {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Workspace")
			.field("solution", &self.solution)
			.finish_non_exhaustive()
	}
}

/// Discovers the host build system and loads the target project into a
/// [`Workspace`]. A real implementation registers the build-system locator,
/// enumerates projects, warms document text, and starts a persistent
/// edit-continuation session; that machinery lives outside this crate's
/// scope and is represented here as a single async seam.
#[async_trait::async_trait]
pub trait ProjectLoader: Send + Sync {
	async fn load(&self, project_path: &Path) -> Result<Workspace, WorkspaceError>;
}

/// Lazy holder around one [`Workspace`]: the first call to [`Self::get`]
/// drives discovery and load; every later call reuses the result.
///
/// Disposal is by ownership, not by an explicit method: iteration N's holder
/// is simply dropped and a fresh one constructed for iteration N+1.
pub struct WorkspaceHolder {
	project_path: PathBuf,
	loader: Arc<dyn ProjectLoader>,
	cell: OnceCell<Workspace>,
	disposed: std::sync::atomic::AtomicBool,
}

impl WorkspaceHolder {
	#[must_use]
	pub fn new(project_path: PathBuf, loader: Arc<dyn ProjectLoader>) -> Self {
		Self {
			project_path,
			loader,
			cell: OnceCell::new(),
			disposed: std::sync::atomic::AtomicBool::new(false),
		}
	}

	/// Await the one-shot workspace load, initializing it on first call.
	///
	/// A failed load disposes the holder: `OnceCell` does not cache errors,
	/// so without this the next call would silently retry `loader.load`
	/// instead of staying degraded for the rest of the iteration.
	pub async fn get(&self) -> Result<&Workspace, WorkspaceError> {
		if self.disposed.load(std::sync::atomic::Ordering::Acquire) {
			return Err(WorkspaceError::Disposed);
		}
		match self
			.cell
			.get_or_try_init(|| async {
				tracing::info!(path = %self.project_path.display(), "discovering build system and loading project");
				self.loader.load(&self.project_path).await
			})
			.await
		{
			Ok(workspace) => Ok(workspace),
			Err(err) => {
				self.dispose();
				Err(err)
			}
		}
	}

	/// Mark this holder permanently unusable: a failed load degrades the
	/// orchestrator for the rest of this iteration rather than retrying.
	pub fn dispose(&self) {
		self.disposed.store(true, std::sync::atomic::Ordering::Release);
	}
}
