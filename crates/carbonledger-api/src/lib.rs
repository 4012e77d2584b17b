//! CarbonLedger HTTP API
//!
//! Axum application exposing the organization/membership workflow, the
//! project/material/incident/upload CRUD surface, and the AI-assisted
//! analysis, prediction, and chat endpoints. Exposed as a library so the
//! integration tests can build the router without binding a socket.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
