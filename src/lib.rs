//! ringline — sequential call-forwarding webhook service.

pub mod admission;
pub mod config;
pub mod engine;
pub mod error;
pub mod markup;
pub mod notify;
pub mod numbers;
pub mod routes;
pub mod signal;
pub mod store;
