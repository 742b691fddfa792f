//! Timecard Gateway
//!
//! Exposes a remote HR/ERP backend's time-logging and leave APIs to
//! AI-assistant tool callers. The caller presents an identity assertion;
//! the gateway exchanges it for a backend session token, resolves
//! human-supplied names to backend ids, and reconciles logical writes
//! against a backend that has no native upsert primitive.

pub mod bulk;
pub mod config;
pub mod context;
pub mod executor;
pub mod leaves;
pub mod rate;
pub mod resolvers;
pub mod timelogs;
pub mod token;
pub mod tools;

pub use config::Config;
pub use context::Context;
pub use executor::ApiClient;
pub use rate::{WriteDomain, WriteRateGuard};
pub use timecard_core::{Error, Result};
pub use token::TokenExchanger;
