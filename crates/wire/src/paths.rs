//! Resolution of the transport's name: the socket path on Unix, the named
//! pipe name on Windows.
//!
//! An environment variable override takes precedence, falling back to a
//! name derived from the runtime directory.

use std::path::PathBuf;

/// Environment variable that overrides the resolved pipe name outright.
pub const PIPE_NAME_ENV: &str = "RELOAD_PIPE_NAME";

/// Resolve the platform transport name for a given logical pipe name.
///
/// On Unix this is a socket path under the user's runtime directory (falling
/// back to a temp directory when no runtime directory is configured). On
/// Windows it is a `\\.\pipe\<name>` name, which carries no filesystem
/// component at all.
#[must_use]
pub fn resolve_pipe_name(logical_name: &str) -> String {
	if let Ok(overridden) = std::env::var(PIPE_NAME_ENV) {
		if !overridden.is_empty() {
			return overridden;
		}
	}
	platform_default(logical_name)
}

#[cfg(unix)]
fn platform_default(logical_name: &str) -> String {
	let dir = dirs::runtime_dir()
		.or_else(dirs::cache_dir)
		.unwrap_or_else(std::env::temp_dir);
	socket_path(dir, logical_name)
		.to_string_lossy()
		.into_owned()
}

#[cfg(unix)]
fn socket_path(dir: PathBuf, logical_name: &str) -> PathBuf {
	dir.join(format!("{logical_name}.sock"))
}

#[cfg(windows)]
fn platform_default(logical_name: &str) -> String {
	format!(r"\\.\pipe\{logical_name}")
}
