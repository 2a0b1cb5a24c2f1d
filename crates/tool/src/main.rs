//! Hot-reload delta pipeline tool process.
//!
//! Drives the iteration loop: bind the pipe, discover/load the project,
//! feed it changed file paths, and relaunch on a blocked edit. The real
//! file-system watcher and process launcher are external to this pipeline;
//! this binary accepts change paths on stdin, one per line, as the
//! integration point for local testing and demos.

mod config;
mod demo_loader;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use config::ToolConfig;
use demo_loader::DemoProjectLoader;
use reload_orchestrator::{Context, EditSessionDriver, PipeApplier, WorkspaceHolder, resolve_relative};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Command line arguments for `reload-tool`.
#[derive(Parser, Debug)]
#[command(name = "reload-tool")]
#[command(about = "Hot-reload delta pipeline tool process")]
pub struct Args {
	/// Project directory to watch and compile.
	#[arg(short, long, value_name = "PATH")]
	project_path: PathBuf,

	/// Override the named pipe (Unix) or pipe name (Windows) the agent connects to.
	#[arg(long, value_name = "NAME")]
	pipe_name: Option<String>,

	/// Source file extensions to treat as reloadable (repeatable). Defaults to `.cs`, `.razor`.
	#[arg(long = "ext", value_name = "EXT")]
	source_extensions: Vec<String>,

	/// Verbose logging.
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	let config = ToolConfig::resolve(&args);

	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::new(if config.verbose {
			"debug"
		} else {
			"info"
		}))
		.init();

	tracing::info!(
		pipe_name = %config.pipe_name,
		project = %config.project_path.display(),
		"starting reload-tool"
	);

	let shutdown = CancellationToken::new();
	{
		let shutdown = shutdown.clone();
		tokio::spawn(async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				tracing::info!("shutdown requested");
				shutdown.cancel();
			}
		});
	}

	run_iterations(&config, shutdown).await
}

/// Drive iterations until stdin closes or shutdown is requested. Each
/// iteration binds a fresh pipe server and workspace, disposing and
/// recreating the workspace for every iteration after the first.
async fn run_iterations(config: &ToolConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
	let mut context = Context::with_shutdown(config.project_path.clone(), shutdown.clone());
	context.process_spec.enable_edit_and_continue();

	loop {
		let mut server = reload_pipe::PipeServer::bind(&config.pipe_name).await?;
		let applier = Arc::new(PipeApplier::new(config.ack_timeout));
		let loader = Arc::new(DemoProjectLoader {
			source_extensions: config.source_extensions.clone(),
		});
		let workspace = WorkspaceHolder::new(config.project_path.clone(), loader);
		let driver = EditSessionDriver::new(workspace, applier.clone(), config.source_extensions.clone());

		let accept_applier = applier.clone();
		let accept_shutdown = shutdown.clone();
		let accept_task = tokio::spawn(async move {
			loop {
				tokio::select! {
					() = accept_shutdown.cancelled() => break,
					accepted = server.accept() => {
						match accepted {
							Ok(connection) => accept_applier.attach(connection).await,
							Err(err) => {
								tracing::warn!(error = %err, "pipe accept failed, no further clients this iteration");
								break;
							}
						}
					}
				}
			}
		});

		let restart = feed_stdin_changes(&driver, &context, &shutdown).await;
		accept_task.abort();

		if shutdown.is_cancelled() || !restart {
			break;
		}
		context = context.next_iteration();
		tracing::info!(iteration = context.iteration, "restarting iteration after a blocked edit");
	}

	Ok(())
}

/// Read change paths from stdin, one per line, feeding each to the driver.
/// Returns `true` if the loop ended because a change was not handled
/// cleanly (the outer loop's signal to restart), `false` if stdin closed or
/// shutdown was requested.
async fn feed_stdin_changes(driver: &EditSessionDriver, context: &Context, shutdown: &CancellationToken) -> bool {
	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	loop {
		tokio::select! {
			() = shutdown.cancelled() => return false,
			line = lines.next_line() => {
				match line {
					Ok(Some(raw)) => {
						let raw = raw.trim();
						if raw.is_empty() {
							continue;
						}
						let path = resolve_relative(&context.project_path, raw);
						if !driver.handle_change(context, &path).await {
							tracing::info!(path = %path.display(), "change not applied cleanly, requesting restart");
							return true;
						}
					}
					Ok(None) => return false,
					Err(err) => {
						tracing::warn!(error = %err, "error reading stdin, stopping");
						return false;
					}
				}
			}
		}
	}
}
