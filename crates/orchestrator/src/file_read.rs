//! Source reads that tolerate the watcher-vs-writer race: a watcher
//! routinely fires before the editor has released its write handle.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

const INITIAL_DELAY: Duration = Duration::from_millis(20);
const RETRY_DELAY: Duration = Duration::from_millis(100);
const MAX_ATTEMPTS: u32 = 10;
const SILENT_ATTEMPTS: u32 = 8;

fn cancelled() -> std::io::Error {
	std::io::Error::new(std::io::ErrorKind::Interrupted, "read cancelled")
}

/// Read `path` as UTF-8 text, retrying through early transient failures.
///
/// Sleeps 20ms up front, then attempts an open-for-read up to 10 times,
/// 100ms apart. The first 8 failures are swallowed at debug level; only a
/// failure on the final two attempts is logged as a warning, and persistent
/// failure after all 10 is surfaced to the caller. Every sleep races against
/// `cancellation` so a cancelled iteration doesn't keep retrying in the
/// background.
pub async fn read_with_backoff(
	path: &Path,
	cancellation: &CancellationToken,
) -> std::io::Result<String> {
	tokio::select! {
		() = cancellation.cancelled() => return Err(cancelled()),
		() = tokio::time::sleep(INITIAL_DELAY) => {}
	}

	let mut last_err = None;
	for attempt in 1..=MAX_ATTEMPTS {
		match tokio::fs::read_to_string(path).await {
			Ok(text) => return Ok(text),
			Err(err) => {
				if attempt <= SILENT_ATTEMPTS {
					tracing::debug!(path = %path.display(), attempt, error = %err, "read not ready yet");
				} else {
					tracing::warn!(path = %path.display(), attempt, error = %err, "read still failing");
				}
				last_err = Some(err);
			}
		}
		if attempt < MAX_ATTEMPTS {
			tokio::select! {
				() = cancellation.cancelled() => return Err(cancelled()),
				() = tokio::time::sleep(RETRY_DELAY) => {}
			}
		}
	}

	Err(last_err.expect("loop runs at least once"))
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[tokio::test(flavor = "current_thread")]
	async fn reads_a_file_that_exists_up_front() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("a.cs");
		std::fs::write(&path, "int F() => 1;").unwrap();

		let text = read_with_backoff(&path, &CancellationToken::new()).await.unwrap();
		assert_eq!(text, "int F() => 1;");
	}

	#[tokio::test(flavor = "current_thread")]
	async fn reads_a_file_that_appears_after_a_short_delay() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("b.cs");

		let write_path = path.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(150)).await;
			let mut file = std::fs::File::create(&write_path).unwrap();
			file.write_all(b"int F() => 2;").unwrap();
		});

		let text = read_with_backoff(&path, &CancellationToken::new()).await.unwrap();
		assert_eq!(text, "int F() => 2;");
	}

	#[tokio::test(flavor = "current_thread")]
	async fn gives_up_after_ten_attempts() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("never.cs");

		let started = tokio::time::Instant::now();
		let err = read_with_backoff(&path, &CancellationToken::new()).await.unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
		assert!(started.elapsed() >= INITIAL_DELAY + RETRY_DELAY * (MAX_ATTEMPTS - 1));
	}

	#[tokio::test(flavor = "current_thread")]
	async fn cancellation_short_circuits_the_backoff() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("never.cs");
		let token = CancellationToken::new();
		token.cancel();

		let err = read_with_backoff(&path, &token).await.unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::Interrupted);
	}
}
