//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and the cached `Transform`
//! - Collections (slot allocation, handle maps)
//! - Logging utilities
//! - Frame timing

pub mod collections;
pub mod logging;
pub mod math;
pub mod time;
