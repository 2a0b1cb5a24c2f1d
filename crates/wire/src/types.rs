//! Model types shared by the orchestrator and the in-process agent.
//!
//! These are the typed, Rust-native counterparts of the textual wire schema
//! defined in [`crate::codec`]. Orchestrator and agent code operates on these
//! types; the codec module is the only place that knows about JSON, base64,
//! or ack byte values.

use uuid::Uuid;

/// Identity of a loaded module: the runtime's 128-bit version id.
///
/// Module ids emitted by the compiler must equal the ids of modules loaded
/// in the target process when the compilation tree mirrors the target; the
/// agent uses this as the sole key to find the live module to patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(Uuid);

impl ModuleId {
	/// Wrap a raw 128-bit value as a module id.
	#[must_use]
	pub const fn from_u128(value: u128) -> Self {
		Self(Uuid::from_u128(value))
	}

	/// Wrap an existing RFC 4122 UUID as a module id.
	#[must_use]
	pub const fn from_uuid(uuid: Uuid) -> Self {
		Self(uuid)
	}

	/// The nil module id (all-zero), never a valid loaded module.
	#[must_use]
	pub const fn nil() -> Self {
		Self(Uuid::nil())
	}

	/// True if this is the nil id.
	#[must_use]
	pub fn is_nil(&self) -> bool {
		self.0.is_nil()
	}

	/// View the underlying UUID.
	#[must_use]
	pub const fn as_uuid(&self) -> Uuid {
		self.0
	}
}

impl std::fmt::Display for ModuleId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(&self.0, f)
	}
}

/// One module's incremental delta: metadata and intermediate-code bytes.
///
/// Both byte arrays are opaque to the pipeline; they are produced by the
/// edit-continuation compiler and consumed verbatim by the runtime's update
/// primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleUpdate {
	/// Identity of the module this delta targets.
	pub module_id: ModuleId,
	/// Metadata delta bytes, owned (copied out of the compiler's buffers).
	pub metadata_delta: Vec<u8>,
	/// Intermediate-code delta bytes, owned.
	pub il_delta: Vec<u8>,
}

/// Outcome of an edit-continuation emit for one changed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
	/// No change worth sending; the session ends as a no-op.
	None,
	/// The batch may be applied.
	Ready,
	/// A rude edit or hard compilation error blocks this batch.
	Blocked,
}

/// A complete emit result: status, zero or more module updates, diagnostics.
#[derive(Debug, Clone, Default)]
pub struct UpdateBatch {
	/// High-level disposition of this emit.
	pub status: Option<UpdateStatus>,
	/// Per-module deltas, in emission order. Empty unless `status == Ready`.
	pub updates: Vec<ModuleUpdate>,
	/// Diagnostics gathered alongside the emit, in no particular order.
	pub diagnostics: Vec<Diagnostic>,
}

impl UpdateBatch {
	/// Construct the canonical empty, no-op batch.
	#[must_use]
	pub fn none() -> Self {
		Self {
			status: Some(UpdateStatus::None),
			updates: Vec::new(),
			diagnostics: Vec::new(),
		}
	}

	/// True if this batch carries at least one module update to apply.
	#[must_use]
	pub fn is_ready(&self) -> bool {
		matches!(self.status, Some(UpdateStatus::Ready)) && !self.updates.is_empty()
	}

	/// True if any diagnostic in this batch is an error.
	#[must_use]
	pub fn has_errors(&self) -> bool {
		self.diagnostics
			.iter()
			.any(|d| d.severity == Severity::Error)
	}
}

/// Severity of a single diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
	/// Never surfaced to the user; kept for completeness with the compiler's model.
	Hidden,
	/// Informational.
	Info,
	/// Warning.
	Warning,
	/// Error: blocks the edit and is always forwarded.
	Error,
}

/// One diagnostic message attributed to a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
	/// Identity of the project the diagnostic was raised against.
	pub project_id: String,
	/// Severity of the message.
	pub severity: Severity,
	/// Fully formatted, human-readable message text.
	pub formatted_message: String,
}

/// The one-byte reply the agent sends after applying (or failing to apply) a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
	/// At least one delta in the batch failed to apply.
	Failed,
	/// All deltas applied.
	Success,
	/// All deltas applied and the host suggests a browser refresh.
	SuccessRefresh,
}

impl Ack {
	/// Wire byte value (a timeout on the caller's side has no `Ack` variant;
	/// callers that time out skip serialization entirely and treat the round
	/// as `Failed` without ever reading a byte).
	#[must_use]
	pub const fn to_byte(self) -> u8 {
		match self {
			Ack::Failed => 0x00,
			Ack::Success => 0x01,
			Ack::SuccessRefresh => 0x02,
		}
	}

	/// Parse a wire byte back into an `Ack`, if it's one of the three defined codes.
	#[must_use]
	pub const fn from_byte(byte: u8) -> Option<Self> {
		match byte {
			0x00 => Some(Ack::Failed),
			0x01 => Some(Ack::Success),
			0x02 => Some(Ack::SuccessRefresh),
			_ => None,
		}
	}
}
