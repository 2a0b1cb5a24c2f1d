//! Wire types and codec for the hot-reload delta protocol.
//!
//! This crate owns everything that both the compiling side (the
//! orchestrator) and the applying side (the agent) need to agree on: the
//! domain model ([`types`]), its JSON-over-a-duplex-pipe encoding
//! ([`codec`]), and how the transport's name is resolved ([`paths`]).

pub mod codec;
pub mod paths;
pub mod types;

pub use codec::{WireError, decode_diagnostics, decode_updates, encode_diagnostics, encode_updates, read_ack, read_line, write_ack, write_line};
pub use paths::{PIPE_NAME_ENV, resolve_pipe_name};
pub use types::{Ack, Diagnostic, ModuleId, ModuleUpdate, Severity, UpdateBatch, UpdateStatus};
