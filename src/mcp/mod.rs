//! MCP (Model Context Protocol) module
//!
//! Implements the MCP server protocol for tool invocation.

pub mod guard;
pub mod presence;
pub mod server;
pub mod tools;
pub mod types;
