//! The agent's connect-then-serve loop, run inside the target process.

use std::time::Duration;

use reload_wire::Ack;
use tokio::io::BufReader;

use crate::updater::RuntimeUpdater;

/// Lifecycle state of one agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
	/// Attempting to connect to the named pipe.
	Connecting,
	/// Connected; serving update payloads.
	Connected,
	/// The pipe closed or a read faulted; the loop has returned.
	Exited,
}

/// Errors the agent loop can surface.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
	/// Connecting took longer than the configured timeout.
	#[error("timed out connecting to the pipe")]
	ConnectTimeout,
	/// Underlying pipe transport error.
	#[error(transparent)]
	Pipe(#[from] reload_pipe::PipeError),
	/// Wire framing error.
	#[error(transparent)]
	Wire(#[from] reload_wire::WireError),
}

/// Connect to `pipe_name` and serve update payloads until the pipe closes.
///
/// Never blocks the caller's thread beyond the single `.await` points;
/// callers (see [`crate::initialize`]) run this on a dedicated task so the
/// host process's own main thread is untouched.
pub async fn run(
	pipe_name: &str,
	updater: &(dyn RuntimeUpdater),
	connect_timeout: Duration,
) -> Result<(), AgentError> {
	let mut state = AgentState::Connecting;
	tracing::info!(pipe_name, ?state, "agent connecting");

	let connection = tokio::time::timeout(connect_timeout, reload_pipe::connect(pipe_name))
		.await
		.map_err(|_elapsed| AgentError::ConnectTimeout)??;

	state = AgentState::Connected;
	tracing::info!(?state, "agent connected");

	let (reader, mut writer) = connection.split();
	let mut reader = BufReader::new(reader);

	loop {
		let Some(line) = reload_wire::read_line(&mut reader).await? else {
			break;
		};

		let ack = match reload_wire::decode_updates(&line) {
			Ok(updates) => apply_batch(updater, &updates).await,
			Err(err) => {
				tracing::warn!(error = %err, "malformed update payload, acking failure");
				Ack::Failed
			}
		};
		reload_wire::write_ack(&mut writer, ack).await?;
	}

	state = AgentState::Exited;
	tracing::info!(?state, "agent exited: pipe closed");
	Ok(())
}

/// Apply every delta in a batch independently, best-effort: one failure
/// still lets the rest attempt, but taints the batch's ack.
async fn apply_batch(updater: &(dyn RuntimeUpdater), updates: &[reload_wire::ModuleUpdate]) -> Ack {
	let mut all_ok = true;
	for update in updates {
		match updater
			.apply(update.module_id, &update.metadata_delta, &update.il_delta, &[])
			.await
		{
			Ok(()) => tracing::debug!(module_id = %update.module_id, "delta applied"),
			Err(err) => {
				tracing::warn!(module_id = %update.module_id, error = %err, "delta apply failed");
				all_ok = false;
			}
		}
	}
	if all_ok { Ack::Success } else { Ack::Failed }
}

#[cfg(test)]
mod tests {
	use reload_wire::{ModuleId, ModuleUpdate};
	use tokio::io::{AsyncReadExt, AsyncWriteExt};

	use super::*;
	use crate::updater::NullUpdater;

	#[tokio::test(flavor = "current_thread")]
	async fn happy_path_acks_success() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("agent.sock");
		let path_str = path.to_str().unwrap().to_string();

		let mut server = reload_pipe::PipeServer::bind(&path_str).await.unwrap();
		let agent_path = path_str.clone();
		let agent_task = tokio::spawn(async move {
			let updater = NullUpdater::always_succeeds();
			run(&agent_path, &updater, Duration::from_secs(1)).await
		});

		let server_conn = server.accept().await.unwrap();
		let (mut server_reader, mut server_writer) = server_conn.split();

		let update = ModuleUpdate {
			module_id: ModuleId::from_u128(7),
			metadata_delta: vec![1, 2],
			il_delta: vec![3, 4],
		};
		let line = reload_wire::encode_updates(&[update], false);
		reload_wire::write_line(&mut server_writer, &line).await.unwrap();
		let ack = reload_wire::read_ack(&mut server_reader).await.unwrap();
		assert_eq!(ack, Ack::Success);

		drop(server_writer);
		drop(server_reader);
		agent_task.await.unwrap().unwrap();
	}

	#[tokio::test(flavor = "current_thread")]
	async fn scripted_failure_acks_failed() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("agent.sock");
		let path_str = path.to_str().unwrap().to_string();

		let mut server = reload_pipe::PipeServer::bind(&path_str).await.unwrap();
		let agent_path = path_str.clone();
		let agent_task = tokio::spawn(async move {
			let updater = NullUpdater::always_fails();
			run(&agent_path, &updater, Duration::from_secs(1)).await
		});

		let server_conn = server.accept().await.unwrap();
		let (mut server_reader, mut server_writer) = server_conn.split();

		let update = ModuleUpdate {
			module_id: ModuleId::from_u128(1),
			metadata_delta: vec![9],
			il_delta: vec![9],
		};
		let line = reload_wire::encode_updates(&[update], false);
		reload_wire::write_line(&mut server_writer, &line).await.unwrap();
		let ack = reload_wire::read_ack(&mut server_reader).await.unwrap();
		assert_eq!(ack, Ack::Failed);

		drop(server_writer);
		drop(server_reader);
		agent_task.await.unwrap().unwrap();
	}

	#[tokio::test(flavor = "current_thread")]
	async fn connect_timeout_when_nothing_is_listening() {
		let updater = NullUpdater::always_succeeds();
		let err = run("/tmp/reload-agent-test-no-such-socket.sock", &updater, Duration::from_millis(50))
			.await
			.unwrap_err();
		assert!(matches!(err, AgentError::Pipe(_) | AgentError::ConnectTimeout));
	}

	#[tokio::test(flavor = "current_thread")]
	async fn malformed_line_acks_failed_and_continues() {
		let (mut client, server) = tokio::io::duplex(4096);
		let updater = NullUpdater::always_succeeds();

		let serve_task = tokio::spawn(async move {
			let (read_half, mut w) = tokio::io::split(server);
			let mut r = BufReader::new(read_half);
			loop {
				let Some(line) = reload_wire::read_line(&mut r).await.unwrap() else {
					break;
				};
				let ack = match reload_wire::decode_updates(&line) {
					Ok(updates) => apply_batch(&updater, &updates).await,
					Err(_) => Ack::Failed,
				};
				reload_wire::write_ack(&mut w, ack).await.unwrap();
			}
		});

		client.write_all(b"not json\n").await.unwrap();
		let mut ack_byte = [0u8; 1];
		client.read_exact(&mut ack_byte).await.unwrap();
		assert_eq!(Ack::from_byte(ack_byte[0]), Some(Ack::Failed));

		drop(client);
		serve_task.await.unwrap();
	}
}
