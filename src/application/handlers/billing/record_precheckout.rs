//! RecordPreCheckoutHandler - Command handler for pre-checkout notes.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PreCheckoutNote};
use crate::ports::EntitlementStore;

/// Command to record a user reaching the checkout step.
#[derive(Debug, Clone)]
pub struct RecordPreCheckoutCommand {
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    /// Client-reported date, stored verbatim.
    pub date: String,
    pub iq_value: Option<String>,
}

/// Handler recording checkout intent before the provider round-trip.
///
/// Fire-and-forget analytics: a storage failure is logged and swallowed
/// so it can never block the checkout flow that follows.
pub struct RecordPreCheckoutHandler {
    store: Arc<dyn EntitlementStore>,
}

impl RecordPreCheckoutHandler {
    pub fn new(store: Arc<dyn EntitlementStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: RecordPreCheckoutCommand) -> Result<(), BillingError> {
        let note = PreCheckoutNote::new(
            cmd.user_id,
            cmd.user_name,
            cmd.email,
            cmd.date,
            cmd.iq_value,
        );

        if let Err(err) = self.store.record_note(&note).await {
            tracing::warn!(error = %err, note_id = %note.id, "failed to record pre-checkout note");
        }
        Ok(())
    }
}
