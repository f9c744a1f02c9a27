//! Label Studio MCP Server Library
//!
//! A Model Context Protocol (MCP) server for Label Studio.
//! Provides tools for inspecting and managing projects, tasks, annotations
//! and predictions through the Label Studio HTTP API.

pub mod config;
pub mod error;
pub mod label_studio;
pub mod mcp;

pub use config::Config;
pub use error::{LabelStudioMcpError, Result};
