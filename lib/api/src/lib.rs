//! # BioInsight API
//!
//! actix-web transport for the prediction and search services. Routing,
//! CORS and status-code mapping live here; every decision is delegated to
//! `bioinsight-core`.

pub mod rest;

pub use rest::{AppState, RestApi};
