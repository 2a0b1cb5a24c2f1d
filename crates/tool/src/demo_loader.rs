//! A minimal, real-filesystem stand-in for the build-system discovery and
//! edit-continuation compiler this pipeline depends on but does not own.
//!
//! Real discovery means invoking an external build-system locator and a
//! managed compiler; this binary has neither. What it has instead is enough
//! to drive the pipeline end to end for local testing and demos: one flat
//! project over every configured-extension file under the project root,
//! and a compiler stand-in that treats "the concatenated source bytes
//! changed" as the whole delta.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use reload_orchestrator::{Document, EditContinuationService, Project, ProjectLoader, Solution, Workspace, WorkspaceError};
use reload_wire::{ModuleId, ModuleUpdate, UpdateBatch, UpdateStatus};

const DEMO_PROJECT_ID: &str = "Main";

pub struct DemoProjectLoader {
	pub source_extensions: Vec<String>,
}

impl DemoProjectLoader {
	fn is_source(&self, path: &Path) -> bool {
		let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
			return false;
		};
		self.source_extensions
			.iter()
			.any(|configured| configured.trim_start_matches('.').eq_ignore_ascii_case(ext))
	}
}

#[async_trait::async_trait]
impl ProjectLoader for DemoProjectLoader {
	async fn load(&self, project_path: &Path) -> Result<Workspace, WorkspaceError> {
		let mut entries = tokio::fs::read_dir(project_path)
			.await
			.map_err(|_| WorkspaceError::DiscoveryFailed)?;

		let mut documents = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|_| WorkspaceError::LoadFailed)?
		{
			let path = entry.path();
			if !self.is_source(&path) {
				continue;
			}
			let text = tokio::fs::read_to_string(&path)
				.await
				.map_err(|_| WorkspaceError::LoadFailed)?;
			tracing::debug!(path = %path.display(), "warmed document");
			documents.push(Document { path, text });
		}

		let project = Project {
			id: DEMO_PROJECT_ID.to_string(),
			documents,
			additional_documents: vec![],
			compiler_diagnostics: vec![],
		};
		Ok(Workspace {
			solution: Solution::new(vec![project]),
			service: std::sync::Arc::new(EchoEditContinuationService),
		})
	}
}

/// Treats the whole project's concatenated source bytes as one module's
/// intermediate-code delta. Not a real incremental compiler: it exists so
/// the pipeline has something to send end to end without one.
struct EchoEditContinuationService;

#[async_trait::async_trait]
impl EditContinuationService for EchoEditContinuationService {
	async fn emit(&self, solution: &Solution, changed_project_id: &str) -> UpdateBatch {
		let Some(project) = solution.project(changed_project_id) else {
			return UpdateBatch::none();
		};

		let mut hasher = DefaultHasher::new();
		project.id.hash(&mut hasher);
		let module_id = ModuleId::from_u128(u128::from(hasher.finish()));

		let il_delta: Vec<u8> = project
			.documents
			.iter()
			.flat_map(|doc| doc.text.bytes())
			.collect();
		if il_delta.is_empty() {
			return UpdateBatch::none();
		}

		UpdateBatch {
			status: Some(UpdateStatus::Ready),
			updates: vec![ModuleUpdate {
				module_id,
				metadata_delta: Vec::new(),
				il_delta,
			}],
			diagnostics: Vec::new(),
		}
	}
}
