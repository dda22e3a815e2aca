//! Utility functions
//!
//! This module provides helpers for field resolvers.

mod slug;

pub use slug::slugify;
