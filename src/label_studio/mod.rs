//! Label Studio API module
//!
//! Contains types, the client seam, the HTTP client and JSON rendering
//! helpers for interacting with the Label Studio API.

pub mod api;
pub mod client;
pub mod serialize;
pub mod types;

pub use api::LabelStudioApi;
pub use client::{connect, LabelStudioClient};
