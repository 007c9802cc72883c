//! IQ Billing - Checkout and Subscription Entitlement Backend
//!
//! This crate glues the IQ test web client to Stripe: it orchestrates
//! checkouts, reconciles webhook deliveries, and answers entitlement
//! queries, routing each request to an isolated production or
//! development Stripe environment based on its origin.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
