//! A named, single-instance duplex pipe: a Unix domain socket on Unix, a
//! named pipe on Windows. At most one client is ever connected at a time;
//! a second connection attempt while one is live is refused rather than
//! queued, mirroring the transport's single-instance contract.

use std::path::Path;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

/// Errors raised while binding, accepting, or connecting on the pipe.
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
	/// A client tried to connect while one was already connected.
	#[error("a client is already connected to this pipe")]
	AlreadyConnected,
	/// The endpoint was closed and can no longer accept or connect.
	#[error("pipe endpoint is closed")]
	Closed,
	/// Underlying transport error.
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

/// Lifecycle state of a [`PipeServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeState {
	/// Bound, but no client has ever connected.
	Disconnected,
	/// `accept` has been called and is waiting for a client.
	AwaitingClient,
	/// A client is connected and the duplex channel is live.
	Connected,
	/// The endpoint has been explicitly closed.
	Closed,
}

/// The server side of the pipe: binds once, then accepts one client at a time.
pub struct PipeServer {
	name: String,
	state: PipeState,
	#[cfg(unix)]
	listener: tokio::net::UnixListener,
	#[cfg(windows)]
	pipe_name: String,
}

/// A single accepted connection, split into independent read/write halves.
#[derive(Debug)]
pub struct PipeConnection {
	#[cfg(unix)]
	stream: tokio::net::UnixStream,
	#[cfg(windows)]
	stream: tokio::net::windows::named_pipe::NamedPipeServer,
}

impl PipeServer {
	/// Bind the endpoint under `name` (a filesystem path on Unix, a pipe name
	/// on Windows). Removes a stale socket file left behind by a prior run.
	pub async fn bind(name: &str) -> Result<Self, PipeError> {
		#[cfg(unix)]
		{
			let path = Path::new(name);
			if path.exists() {
				tokio::fs::remove_file(path).await.ok();
			}
			let listener = tokio::net::UnixListener::bind(path)?;
			info!(path = %path.display(), "pipe endpoint bound");
			Ok(Self {
				name: name.to_string(),
				state: PipeState::Disconnected,
				listener,
			})
		}
		#[cfg(windows)]
		{
			info!(name, "pipe endpoint registered");
			Ok(Self {
				name: name.to_string(),
				state: PipeState::Disconnected,
				pipe_name: name.to_string(),
			})
		}
	}

	/// Current lifecycle state.
	#[must_use]
	pub fn state(&self) -> PipeState {
		self.state
	}

	/// Name this endpoint was bound under.
	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Wait for and accept the next client.
	///
	/// Refuses with [`PipeError::AlreadyConnected`] if a client is already
	/// connected: the caller must `drop` the prior [`PipeConnection`] first.
	pub async fn accept(&mut self) -> Result<PipeConnection, PipeError> {
		match self.state {
			PipeState::Connected => return Err(PipeError::AlreadyConnected),
			PipeState::Closed => return Err(PipeError::Closed),
			PipeState::Disconnected | PipeState::AwaitingClient => {}
		}
		self.state = PipeState::AwaitingClient;

		#[cfg(unix)]
		let connection = {
			let (stream, _addr) = self.listener.accept().await?;
			PipeConnection { stream }
		};
		#[cfg(windows)]
		let connection = {
			use tokio::net::windows::named_pipe::ServerOptions;
			let server = ServerOptions::new()
				.max_instances(1)
				.create(&self.pipe_name)?;
			server.connect().await?;
			PipeConnection { stream: server }
		};

		self.state = PipeState::Connected;
		info!(name = %self.name, "client connected");
		Ok(connection)
	}

	/// Mark the connection slot free again after the caller drops a
	/// [`PipeConnection`], so the next `accept` can proceed.
	pub fn release(&mut self) {
		if self.state == PipeState::Connected {
			self.state = PipeState::Disconnected;
		}
	}

	/// Close the endpoint; no further `accept` calls will succeed.
	pub fn close(&mut self) {
		self.state = PipeState::Closed;
		warn!(name = %self.name, "pipe endpoint closed");
	}
}

/// A type-erased, ownable read half, storable in applier state across
/// platforms.
pub type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
/// A type-erased, ownable write half.
pub type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

impl PipeConnection {
	/// Split into independent, type-erased read/write halves for the wire
	/// codec. Boxed so callers (the applier, the agent loop) can hold a half
	/// in a struct field without naming the platform-specific stream type.
	pub fn split(self) -> (BoxedReader, BoxedWriter) {
		#[cfg(unix)]
		{
			let (reader, writer) = self.stream.into_split();
			(Box::new(reader), Box::new(writer))
		}
		#[cfg(windows)]
		{
			let (reader, writer) = tokio::io::split(self.stream);
			(Box::new(reader), Box::new(writer))
		}
	}
}

/// Connect to an existing [`PipeServer`] as a client.
pub async fn connect(name: &str) -> Result<PipeConnection, PipeError> {
	#[cfg(unix)]
	{
		let stream = tokio::net::UnixStream::connect(name).await?;
		Ok(PipeConnection { stream })
	}
	#[cfg(windows)]
	{
		let stream = tokio::net::windows::named_pipe::ClientOptions::new().open(name)?;
		Ok(PipeConnection { stream })
	}
}

#[cfg(all(test, unix))]
mod tests {
	use tokio::io::{AsyncReadExt, AsyncWriteExt};

	use super::*;

	#[tokio::test(flavor = "current_thread")]
	async fn accept_then_release_allows_a_second_client() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("test.sock");
		let path_str = path.to_str().unwrap().to_string();

		let mut server = PipeServer::bind(&path_str).await.unwrap();
		assert_eq!(server.state(), PipeState::Disconnected);

		let server_fut = server.accept();
		let client_fut = connect(&path_str);
		let (server_conn, client_conn) = tokio::join!(server_fut, client_fut);
		let mut server_conn = server_conn.unwrap();
		let client_conn = client_conn.unwrap();
		assert_eq!(server.state(), PipeState::Connected);

		let (mut r, mut w) = client_conn.split();
		w.write_all(b"ping").await.unwrap();
		drop(w);
		let (mut sr, _sw) = server_conn.split();
		let mut buf = [0u8; 4];
		sr.read_exact(&mut buf).await.unwrap();
		assert_eq!(&buf, b"ping");

		drop(r);
		server.release();
		assert_eq!(server.state(), PipeState::Disconnected);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn second_accept_while_connected_is_refused() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("test.sock");
		let path_str = path.to_str().unwrap().to_string();

		let mut server = PipeServer::bind(&path_str).await.unwrap();
		let (server_conn, _client_conn) =
			tokio::join!(server.accept(), connect(&path_str));
		let _server_conn = server_conn.unwrap();

		let err = server.accept().await.unwrap_err();
		assert!(matches!(err, PipeError::AlreadyConnected));
	}
}
