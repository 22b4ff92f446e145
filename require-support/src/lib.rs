//! # Require Support
//!
//! Shared utilities for the require DI framework.
//!
//! This crate provides:
//! - Text rendering for error messages
//! - Qualified export name helpers

pub mod rendering;
