//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own room state and its mutation rules so route handlers
//! can stay focused on protocol translation.

pub mod cursor;
pub mod op;
pub mod room;
