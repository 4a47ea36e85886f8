//! Repository layer: one module per table, one query per function.
//!
//! Functions that take part in multi-statement workflow updates are generic
//! over the executor so they run on the pool or inside a transaction.

pub mod addresses;
pub mod agents;
pub mod categories;
pub mod chat;
pub mod kyc;
pub mod markets;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod preferences;
pub mod products;
pub mod reviews;
pub mod shopping_lists;
pub mod status_changes;
pub mod support;
pub mod users;
