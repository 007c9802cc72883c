//! PostgreSQL adapters.

mod entitlement_store;

pub use entitlement_store::PostgresEntitlementStore;
