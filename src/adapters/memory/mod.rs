//! In-memory adapters for tests.

mod entitlement_store;

pub use entitlement_store::InMemoryEntitlementStore;
