//! The runtime-agnostic seam between the agent loop and whatever managed
//! runtime is actually hosting it.
//!
//! The agent loop only knows how to read payloads and write acks; it has no
//! opinion on how a delta gets applied to a loaded module. That's entirely
//! behind [`RuntimeUpdater`], so the loop itself stays testable without a
//! real managed runtime.

use reload_wire::ModuleId;

/// A delta failed to apply to its target module.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ApplyError(pub String);

/// Applies one module delta to a loaded runtime module.
///
/// Implementations own whatever lookup-by-[`ModuleId`] table the host
/// runtime exposes; the agent loop supplies only the raw delta bytes.
#[async_trait::async_trait]
pub trait RuntimeUpdater: Send + Sync {
	/// Apply one delta. `pdb_delta` is passed through empty by the current
	/// agent loop; the parameter exists so a real binding can fill it in
	/// without changing the trait.
	async fn apply(
		&self,
		module_id: ModuleId,
		metadata_delta: &[u8],
		il_delta: &[u8],
		pdb_delta: &[u8],
	) -> Result<(), ApplyError>;
}

/// The updater a freshly loaded agent starts with before any real runtime
/// binding is wired in.
///
/// This is what `initialize()` uses today: it demonstrates the agent's
/// connect/read/ack plumbing end-to-end without depending on a concrete
/// managed runtime, which is out of scope per the pipeline's purpose (we
/// depend only on the runtime's update *contract*, not its implementation).
pub struct UnboundUpdater;

#[async_trait::async_trait]
impl RuntimeUpdater for UnboundUpdater {
	async fn apply(
		&self,
		module_id: ModuleId,
		_metadata_delta: &[u8],
		_il_delta: &[u8],
		_pdb_delta: &[u8],
	) -> Result<(), ApplyError> {
		Err(ApplyError(format!(
			"no runtime updater bound; module {module_id} not applied"
		)))
	}
}

/// A scripted updater for tests: pops one outcome per call, repeating the
/// last scripted outcome once the plan is exhausted.
pub struct NullUpdater {
	plan: std::sync::Mutex<std::collections::VecDeque<bool>>,
}

impl NullUpdater {
	/// Build an updater that returns each outcome in `plan`, in order.
	#[must_use]
	pub fn new(plan: impl IntoIterator<Item = bool>) -> Self {
		Self {
			plan: std::sync::Mutex::new(plan.into_iter().collect()),
		}
	}

	/// An updater that applies every delta successfully.
	#[must_use]
	pub fn always_succeeds() -> Self {
		Self::new([true])
	}

	/// An updater that fails every delta.
	#[must_use]
	pub fn always_fails() -> Self {
		Self::new([false])
	}
}

#[async_trait::async_trait]
impl RuntimeUpdater for NullUpdater {
	async fn apply(
		&self,
		module_id: ModuleId,
		_metadata_delta: &[u8],
		_il_delta: &[u8],
		_pdb_delta: &[u8],
	) -> Result<(), ApplyError> {
		let mut plan = self.plan.lock().expect("plan mutex poisoned");
		let succeeds = if plan.len() > 1 {
			plan.pop_front().unwrap_or(true)
		} else {
			plan.front().copied().unwrap_or(true)
		};
		if succeeds {
			Ok(())
		} else {
			Err(ApplyError(format!("scripted failure for module {module_id}")))
		}
	}
}
