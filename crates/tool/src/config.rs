//! Process-wide configuration, resolved once at startup.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PIPE_LOGICAL_NAME: &str = "netcore-hot-reload";
const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &[".cs", ".razor"];
const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the tool process needs that isn't part of the wire protocol.
#[derive(Debug, Clone)]
pub struct ToolConfig {
	pub pipe_name: String,
	pub project_path: PathBuf,
	pub source_extensions: Vec<String>,
	pub ack_timeout: Duration,
	pub connect_timeout: Duration,
	pub verbose: bool,
}

impl ToolConfig {
	/// Resolve configuration from CLI args, following the same
	/// environment-variable-then-default order as [`reload_wire::resolve_pipe_name`].
	#[must_use]
	pub fn resolve(args: &crate::Args) -> Self {
		let pipe_name = args
			.pipe_name
			.clone()
			.unwrap_or_else(|| reload_wire::resolve_pipe_name(DEFAULT_PIPE_LOGICAL_NAME));
		let source_extensions = if args.source_extensions.is_empty() {
			DEFAULT_SOURCE_EXTENSIONS.iter().map(|s| (*s).to_string()).collect()
		} else {
			args.source_extensions.clone()
		};
		Self {
			pipe_name,
			project_path: args.project_path.clone(),
			source_extensions,
			ack_timeout: DEFAULT_ACK_TIMEOUT,
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			verbose: args.verbose,
		}
	}
}
