//! Data models for the Gemini API.
//!
//! Plain serde carriers for the content and tool context that gets cached
//! remotely (`gemini`).

// Author: kelexine (https://github.com/kelexine)

pub mod gemini;

pub use gemini::{Content, Part, ToolConfig, ToolDeclaration};
