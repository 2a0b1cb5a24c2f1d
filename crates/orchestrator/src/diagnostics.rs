//! Formats and routes diagnostics gathered during an edit session.

use reload_wire::{Diagnostic, Severity};

use crate::applier::BrowserRefreshChannel;

/// Log every diagnostic at debug level, and forward error-severity ones
/// over the browser refresh channel (if attached) as plain formatted
/// strings. Compile errors are expected, routine output, not environmental
/// failures, so they never log at `warn!`; that level is reserved for
/// things like a workspace that failed to load or a pipe that disconnected.
pub async fn route(diagnostics: &[Diagnostic], browser_refresh: Option<&dyn BrowserRefreshChannel>) {
	for diagnostic in diagnostics {
		tracing::debug!(
			project_id = %diagnostic.project_id,
			severity = ?diagnostic.severity,
			message = %diagnostic.formatted_message,
			"compiler diagnostic"
		);
	}

	let errors: Vec<String> = diagnostics
		.iter()
		.filter(|d| d.severity == Severity::Error)
		.map(|d| d.formatted_message.clone())
		.collect();

	if errors.is_empty() {
		return;
	}
	if let Some(channel) = browser_refresh {
		channel.send_diagnostics(&errors).await;
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{Arc, Mutex};

	use super::*;

	struct RecordingChannel {
		sent: Arc<Mutex<Vec<Vec<String>>>>,
	}

	#[async_trait::async_trait]
	impl BrowserRefreshChannel for RecordingChannel {
		async fn send_update(&self, _line: &str) {}

		async fn send_diagnostics(&self, messages: &[String]) {
			self.sent.lock().unwrap().push(messages.to_vec());
		}
	}

	#[tokio::test(flavor = "current_thread")]
	async fn forwards_only_error_severity() {
		let sent = Arc::new(Mutex::new(Vec::new()));
		let channel = RecordingChannel { sent: sent.clone() };
		let diagnostics = vec![
			Diagnostic {
				project_id: "Demo".to_string(),
				severity: Severity::Warning,
				formatted_message: "unused variable".to_string(),
			},
			Diagnostic {
				project_id: "Demo".to_string(),
				severity: Severity::Error,
				formatted_message: "CS0000: bad".to_string(),
			},
		];

		route(&diagnostics, Some(&channel)).await;

		let recorded = sent.lock().unwrap();
		assert_eq!(recorded.len(), 1);
		assert_eq!(recorded[0], vec!["CS0000: bad".to_string()]);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn no_errors_means_no_forward() {
		let sent = Arc::new(Mutex::new(Vec::new()));
		let channel = RecordingChannel { sent: sent.clone() };
		let diagnostics = vec![Diagnostic {
			project_id: "Demo".to_string(),
			severity: Severity::Info,
			formatted_message: "note".to_string(),
		}];

		route(&diagnostics, Some(&channel)).await;
		assert!(sent.lock().unwrap().is_empty());
	}
}
