//! Compilation orchestrator: the workspace holder, edit-session driver,
//! diagnostics router, and the two applier variants that turn an
//! [`reload_wire::UpdateBatch`] into bytes on a transport.

pub mod applier;
pub mod browser_refresh;
pub mod compiler;
pub mod context;
pub mod diagnostics;
pub mod edit_session;
pub mod file_read;
pub mod solution;
pub mod workspace;

pub use applier::{Applier, BrowserRefreshChannel, PipeApplier};
pub use browser_refresh::BrowserRefreshApplier;
pub use compiler::{EditContinuationService, FakeEditContinuationService};
pub use context::{Context, ProcessSpec};
pub use edit_session::{EditSessionDriver, resolve_relative};
pub use solution::{AdditionalDocument, Document, DocumentLocation, Project, Solution};
pub use workspace::{ProjectLoader, Workspace, WorkspaceError, WorkspaceHolder};
