//! The browser-hosted runtime variant of the applier: same payload shape,
//! pushed over the refresh server's channel instead of the pipe, with no
//! ack and optimistic success reporting.

use std::sync::Arc;

use reload_wire::UpdateBatch;

use crate::applier::{Applier, BrowserRefreshChannel};
use crate::context::Context;

/// Pushes updates to a [`BrowserRefreshChannel`] and always reports success,
/// since there is no ack to wait on.
pub struct BrowserRefreshApplier {
	channel: Arc<dyn BrowserRefreshChannel>,
}

impl BrowserRefreshApplier {
	#[must_use]
	pub fn new(channel: Arc<dyn BrowserRefreshChannel>) -> Self {
		Self { channel }
	}
}

#[async_trait::async_trait]
impl Applier for BrowserRefreshApplier {
	async fn apply(&self, _context: &Context, batch: &UpdateBatch) -> bool {
		let line = reload_wire::encode_updates(&batch.updates, true);
		self.channel.send_update(&line).await;
		tracing::debug!(update_count = batch.updates.len(), "pushed delta to browser refresh channel");
		true
	}
}
