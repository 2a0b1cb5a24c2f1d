//! Tool-side drivers for turning an [`UpdateBatch`] into bytes on the wire
//! and a pass/fail outcome.

use std::time::Duration;

use reload_wire::{Ack, UpdateBatch};

use crate::context::Context;

/// A capability interface over the two ways a batch can reach a running
/// target: the pipe (native hosts) or a browser refresh channel
/// (browser-hosted runtimes). Selected once at construction time.
#[async_trait::async_trait]
pub trait Applier: Send + Sync {
	/// Drive one request/response round for `batch`. Returns whether the
	/// batch is considered applied.
	async fn apply(&self, context: &Context, batch: &UpdateBatch) -> bool;
}

/// An opaque handle to a browser refresh server's message channel.
#[async_trait::async_trait]
pub trait BrowserRefreshChannel: Send + Sync {
	/// Send an already-encoded `HotReloadDelta` payload line.
	async fn send_update(&self, payload_line: &str);
	/// Send formatted error messages as a `HotReloadDiagnosticsv1` payload.
	async fn send_diagnostics(&self, messages: &[String]);
}

/// Drives one request/response round over a [`reload_pipe`] connection.
pub struct PipeApplier {
	connection: tokio::sync::Mutex<Option<(reload_pipe::BoxedReader, reload_pipe::BoxedWriter)>>,
	ack_timeout: Duration,
}

impl PipeApplier {
	#[must_use]
	pub fn new(ack_timeout: Duration) -> Self {
		Self {
			connection: tokio::sync::Mutex::new(None),
			ack_timeout,
		}
	}

	/// Register a freshly accepted connection as the one to apply through.
	pub async fn attach(&self, connection: reload_pipe::PipeConnection) {
		*self.connection.lock().await = Some(connection.split());
	}

	/// Drop the current connection, e.g. after the pipe server observes a
	/// disconnect.
	pub async fn detach(&self) {
		*self.connection.lock().await = None;
	}

	/// Whether a client is currently attached.
	pub async fn is_connected(&self) -> bool {
		self.connection.lock().await.is_some()
	}
}

#[async_trait::async_trait]
impl Applier for PipeApplier {
	async fn apply(&self, context: &Context, batch: &UpdateBatch) -> bool {
		let mut guard = self.connection.lock().await;
		if guard.is_none() {
			tracing::debug!("apply: no agent connected, treating as a no-op target");
			return false;
		}

		let line = reload_wire::encode_updates(&batch.updates, false);
		let write_result = {
			let (_, writer) = guard.as_mut().expect("checked above");
			reload_wire::write_line(writer, &line).await
		};
		if let Err(err) = write_result {
			tracing::warn!(error = %err, "apply: failed writing update payload");
			*guard = None;
			return false;
		}

		let ack_result = {
			let (reader, _) = guard.as_mut().expect("checked above");
			tokio::time::timeout(self.ack_timeout, reload_wire::read_ack(reader)).await
		};
		let ack = match ack_result {
			Ok(Ok(ack)) => ack,
			Ok(Err(err)) => {
				tracing::warn!(error = %err, "apply: failed reading ack");
				*guard = None;
				return false;
			}
			Err(_elapsed) => {
				tracing::warn!(timeout_ms = self.ack_timeout.as_millis(), "apply: ack timed out");
				return false;
			}
		};

		match ack {
			Ack::Failed => false,
			Ack::Success | Ack::SuccessRefresh => {
				if let Some(channel) = &context.browser_refresh {
					let browser_line = reload_wire::encode_updates(&batch.updates, true);
					channel.send_update(&browser_line).await;
				}
				true
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use reload_wire::{ModuleId, ModuleUpdate, UpdateStatus};

	use super::*;

	fn ready_batch() -> UpdateBatch {
		UpdateBatch {
			status: Some(UpdateStatus::Ready),
			updates: vec![ModuleUpdate {
				module_id: ModuleId::from_u128(5),
				metadata_delta: vec![1],
				il_delta: vec![2],
			}],
			diagnostics: vec![],
		}
	}

	#[tokio::test(flavor = "current_thread")]
	async fn no_connection_returns_false_immediately() {
		let applier = PipeApplier::new(Duration::from_secs(2));
		let context = Context::new("/tmp/demo".into());
		assert!(!applier.apply(&context, &ready_batch()).await);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn successful_round_trip_returns_true() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("applier.sock");
		let path_str = path.to_str().unwrap().to_string();

		let mut server = reload_pipe::PipeServer::bind(&path_str).await.unwrap();
		let connect_path = path_str.clone();
		let connect_task = tokio::spawn(async move { reload_pipe::connect(&connect_path).await });
		let server_conn = server.accept().await.unwrap();
		let client_conn = connect_task.await.unwrap().unwrap();

		let applier = PipeApplier::new(Duration::from_secs(2));
		applier.attach(server_conn).await;

		let (client_reader, mut client_writer) = client_conn.split();
		let mut client_reader = tokio::io::BufReader::new(client_reader);
		let responder = tokio::spawn(async move {
			let line = reload_wire::read_line(&mut client_reader).await.unwrap().unwrap();
			let updates = reload_wire::decode_updates(&line).unwrap();
			assert_eq!(updates.len(), 1);
			reload_wire::write_ack(&mut client_writer, Ack::Success).await.unwrap();
		});

		let context = Context::new("/tmp/demo".into());
		let applied = applier.apply(&context, &ready_batch()).await;
		responder.await.unwrap();
		assert!(applied);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn failed_ack_returns_false() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("applier2.sock");
		let path_str = path.to_str().unwrap().to_string();

		let mut server = reload_pipe::PipeServer::bind(&path_str).await.unwrap();
		let connect_path = path_str.clone();
		let connect_task = tokio::spawn(async move { reload_pipe::connect(&connect_path).await });
		let server_conn = server.accept().await.unwrap();
		let client_conn = connect_task.await.unwrap().unwrap();

		let applier = PipeApplier::new(Duration::from_secs(2));
		applier.attach(server_conn).await;

		let (client_reader, mut client_writer) = client_conn.split();
		let mut client_reader = tokio::io::BufReader::new(client_reader);
		let responder = tokio::spawn(async move {
			let _line = reload_wire::read_line(&mut client_reader).await.unwrap().unwrap();
			reload_wire::write_ack(&mut client_writer, Ack::Failed).await.unwrap();
		});

		let context = Context::new("/tmp/demo".into());
		let applied = applier.apply(&context, &ready_batch()).await;
		responder.await.unwrap();
		assert!(!applied);
	}
}
