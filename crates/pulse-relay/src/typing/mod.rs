//! Typing-indicator state, scoped to channel groups.

pub mod registry;

pub use registry::TypingRegistry;
