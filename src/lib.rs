//! Consultation scheduling service for dental expert-witness requests.
//!
//! Clients submit case details and documents; administrators schedule,
//! complete or decline them. Everything is served as procedure-style RPC over
//! HTTP from a single in-memory store.

pub mod api;
pub mod auth;
pub mod config;
pub mod consultation;
pub mod core;
pub mod logging;
