//! Named local duplex pipe endpoint: the transport the agent and the
//! orchestrator's applier speak over, independent of the JSON framing
//! defined in `reload-wire`.

pub mod endpoint;

pub use endpoint::{BoxedReader, BoxedWriter, PipeConnection, PipeError, PipeServer, PipeState, connect};
