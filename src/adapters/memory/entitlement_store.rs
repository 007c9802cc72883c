//! In-memory entitlement store.
//!
//! Mirrors the Postgres store's contract (upsert-by-email on save,
//! update-by-id) without a database. Used by handler unit tests and the
//! end-to-end reconciliation tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::billing::{BillingError, EntitlementRecord, PreCheckoutNote};
use crate::ports::EntitlementStore;

/// In-memory implementation of [`EntitlementStore`].
#[derive(Default)]
pub struct InMemoryEntitlementStore {
    inner: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    /// Records keyed by session id.
    records: HashMap<String, EntitlementRecord>,

    /// Insert-only note log.
    notes: Vec<PreCheckoutNote>,

    /// Error to return on the next call, for failure injection.
    next_error: Option<BillingError>,
}

impl InMemoryEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject an error to be returned by the next store call.
    pub fn fail_next(&self, err: BillingError) {
        self.inner.lock().unwrap().next_error = Some(err);
    }

    /// Snapshot all stored records.
    pub fn records(&self) -> Vec<EntitlementRecord> {
        self.inner.lock().unwrap().records.values().cloned().collect()
    }

    /// Snapshot all recorded notes.
    pub fn notes(&self) -> Vec<PreCheckoutNote> {
        self.inner.lock().unwrap().notes.clone()
    }

    fn take_error(state: &mut StoreState) -> Result<(), BillingError> {
        match state.next_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EntitlementStore for InMemoryEntitlementStore {
    async fn save(&self, record: &EntitlementRecord) -> Result<(), BillingError> {
        let mut state = self.inner.lock().unwrap();
        Self::take_error(&mut state)?;

        // Upsert by email: a repeat checkout replaces the earlier attempt.
        state.records.retain(|_, r| r.email != record.email);
        state.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &EntitlementRecord) -> Result<(), BillingError> {
        let mut state = self.inner.lock().unwrap();
        Self::take_error(&mut state)?;

        if !state.records.contains_key(&record.id) {
            return Err(BillingError::not_found(&record.email));
        }
        state.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<EntitlementRecord>, BillingError> {
        let mut state = self.inner.lock().unwrap();
        Self::take_error(&mut state)?;

        Ok(state.records.values().find(|r| r.email == email).cloned())
    }

    async fn record_note(&self, note: &PreCheckoutNote) -> Result<(), BillingError> {
        let mut state = self.inner.lock().unwrap();
        Self::take_error(&mut state)?;

        state.notes.push(note.clone());
        Ok(())
    }
}
