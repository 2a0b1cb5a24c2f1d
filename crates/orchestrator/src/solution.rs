//! In-memory model of the user's projects: immutable-by-value, each edit
//! producing a new [`Solution`] rather than mutating one in place.

use std::path::{Path, PathBuf};

use reload_wire::Diagnostic;
use uuid::Uuid;

/// A primary source document that participates in compilation directly.
#[derive(Debug, Clone)]
pub struct Document {
	pub path: PathBuf,
	pub text: String,
}

/// A non-primary document (e.g. Razor markup) tracked by a stable identity
/// that survives text replacement.
#[derive(Debug, Clone)]
pub struct AdditionalDocument {
	pub id: Uuid,
	pub path: PathBuf,
	pub text: String,
}

/// One project: an ordered set of documents plus whatever standalone
/// compiler diagnostics its last build produced.
#[derive(Debug, Clone, Default)]
pub struct Project {
	pub id: String,
	pub documents: Vec<Document>,
	pub additional_documents: Vec<AdditionalDocument>,
	pub compiler_diagnostics: Vec<Diagnostic>,
}

/// Where a path was found when looking it up across a solution's projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentLocation {
	Primary,
	Additional,
}

/// The user's projects and documents at one point in time.
///
/// Only one `Solution` is ever "current"; replacing a document's text
/// produces a new value rather than mutating this one, so superseded
/// solutions can simply be dropped.
#[derive(Debug, Clone, Default)]
pub struct Solution {
	projects: Vec<Project>,
}

impl Solution {
	#[must_use]
	pub fn new(projects: Vec<Project>) -> Self {
		Self { projects }
	}

	#[must_use]
	pub fn projects(&self) -> &[Project] {
		&self.projects
	}

	#[must_use]
	pub fn project(&self, project_id: &str) -> Option<&Project> {
		self.projects.iter().find(|p| p.id == project_id)
	}

	/// Find which project owns `path` and whether it's a primary or
	/// additional document. A path present as both (which should not happen)
	/// is reported as `Primary`.
	#[must_use]
	pub fn locate(&self, path: &Path) -> Option<(&str, DocumentLocation)> {
		for project in &self.projects {
			if project.documents.iter().any(|d| d.path == path) {
				return Some((&project.id, DocumentLocation::Primary));
			}
		}
		for project in &self.projects {
			if project.additional_documents.iter().any(|d| d.path == path) {
				return Some((&project.id, DocumentLocation::Additional));
			}
		}
		None
	}

	/// Produce a new `Solution` with `path`'s text replaced, preserving
	/// document identity for additional documents. Returns `None` if `path`
	/// is not present anywhere.
	#[must_use]
	pub fn with_document_replaced(&self, path: &Path, new_text: String) -> Option<Self> {
		let (project_id, location) = self.locate(path)?;
		let project_id = project_id.to_string();
		let mut next = self.clone();
		let project = next
			.projects
			.iter_mut()
			.find(|p| p.id == project_id)
			.expect("project located above must still be present");
		match location {
			DocumentLocation::Primary => {
				let doc = project
					.documents
					.iter_mut()
					.find(|d| d.path == path)
					.expect("document located above must still be present");
				doc.text = new_text;
			}
			DocumentLocation::Additional => {
				let doc = project
					.additional_documents
					.iter_mut()
					.find(|d| d.path == path)
					.expect("additional document located above must still be present");
				doc.text = new_text;
			}
		}
		Some(next)
	}

	/// Standalone compiler diagnostics for one project, as tracked by its
	/// last build (the initial load warms these; the edit-continuation
	/// service refreshes them on each emit).
	#[must_use]
	pub fn compiler_diagnostics(&self, project_id: &str) -> &[Diagnostic] {
		self.project(project_id)
			.map_or(&[], |p| p.compiler_diagnostics.as_slice())
	}
}

#[cfg(test)]
mod tests {
	use reload_wire::Severity;

	use super::*;

	fn sample_solution() -> Solution {
		Solution::new(vec![Project {
			id: "Demo".to_string(),
			documents: vec![Document {
				path: PathBuf::from("src/A.cs"),
				text: "int F() => 1;".to_string(),
			}],
			additional_documents: vec![AdditionalDocument {
				id: Uuid::from_u128(1),
				path: PathBuf::from("src/Page.razor"),
				text: "<h1>hi</h1>".to_string(),
			}],
			compiler_diagnostics: vec![Diagnostic {
				project_id: "Demo".to_string(),
				severity: Severity::Error,
				formatted_message: "CS0000: bad".to_string(),
			}],
		}])
	}

	#[test]
	fn locates_primary_and_additional_documents() {
		let solution = sample_solution();
		assert_eq!(
			solution.locate(Path::new("src/A.cs")),
			Some(("Demo", DocumentLocation::Primary))
		);
		assert_eq!(
			solution.locate(Path::new("src/Page.razor")),
			Some(("Demo", DocumentLocation::Additional))
		);
		assert_eq!(solution.locate(Path::new("src/Missing.cs")), None);
	}

	#[test]
	fn replacing_additional_document_preserves_identity() {
		let solution = sample_solution();
		let next = solution
			.with_document_replaced(Path::new("src/Page.razor"), "<h1>bye</h1>".to_string())
			.unwrap();
		let project = next.project("Demo").unwrap();
		assert_eq!(project.additional_documents[0].id, Uuid::from_u128(1));
		assert_eq!(project.additional_documents[0].text, "<h1>bye</h1>");
		assert_eq!(solution.project("Demo").unwrap().additional_documents[0].text, "<h1>hi</h1>");
	}

	#[test]
	fn replacing_missing_path_returns_none() {
		let solution = sample_solution();
		assert!(
			solution
				.with_document_replaced(Path::new("src/Nope.cs"), "x".to_string())
				.is_none()
		);
	}
}
