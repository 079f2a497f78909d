//! Stockroom Core - Shared domain types.
//!
//! This crate provides the types shared by every Stockroom component:
//! - `server` - The REST API for customers, staff, and administrators
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. Enable the `postgres` feature to get `sqlx` encode/decode
//! implementations for the ID newtypes and enums.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, email addresses, roles, statuses, OTP codes, and paging

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
