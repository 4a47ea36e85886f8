//! # souk-common
//!
//! Shared types, configuration, error handling, and status machines used across
//! all Souk crates. No I/O lives here beyond loading configuration.

pub mod any_row;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway_event;
pub mod ids;
pub mod models;
pub mod response;
pub mod validation;
