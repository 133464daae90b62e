//! Type definitions module
//!
//! Core types for agent communication.

pub mod messages;

// Re-export commonly used types
pub use messages::{Message, SortTask};
