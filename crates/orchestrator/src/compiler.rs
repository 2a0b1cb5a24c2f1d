//! The edit-continuation compiler contract.
//!
//! This is the seam the pipeline depends on but does not own: a real
//! implementation would drive an incremental build-system compiler session.
//! Out of scope here; tests exercise the driver against a scripted fake.

use reload_wire::{UpdateBatch, UpdateStatus};

use crate::solution::Solution;

/// A persistent, per-solution compilation session that turns a new
/// [`Solution`] value into an [`UpdateBatch`].
#[async_trait::async_trait]
pub trait EditContinuationService: Send + Sync {
	/// Emit an update for `solution`, given that `changed_project_id` is the
	/// project containing the just-edited document.
	async fn emit(&self, solution: &Solution, changed_project_id: &str) -> UpdateBatch;
}

/// A scripted [`EditContinuationService`] for tests: returns one batch per
/// call, in order, repeating the last scripted batch once exhausted.
pub struct FakeEditContinuationService {
	plan: std::sync::Mutex<std::collections::VecDeque<UpdateBatch>>,
}

impl FakeEditContinuationService {
	#[must_use]
	pub fn new(plan: impl IntoIterator<Item = UpdateBatch>) -> Self {
		Self {
			plan: std::sync::Mutex::new(plan.into_iter().collect()),
		}
	}

	/// A service that always reports no-op emits.
	#[must_use]
	pub fn always_none() -> Self {
		Self::new([UpdateBatch::none()])
	}
}

#[async_trait::async_trait]
impl EditContinuationService for FakeEditContinuationService {
	async fn emit(&self, _solution: &Solution, _changed_project_id: &str) -> UpdateBatch {
		let mut plan = self.plan.lock().expect("plan mutex poisoned");
		if plan.len() > 1 {
			plan.pop_front().unwrap_or_else(UpdateBatch::none)
		} else {
			plan.front().cloned().unwrap_or_else(UpdateBatch::none)
		}
	}
}
