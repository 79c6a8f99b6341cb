/// State management module
///
/// This module handles all screen state, including:
/// - Shared data structures (data.rs)
/// - The capture/upload/result lifecycle (session.rs)

pub mod data;
pub mod session;
