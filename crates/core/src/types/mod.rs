//! Core types for Stockroom.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod otp;
pub mod page;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use otp::{OTP_TTL_MINUTES, OtpCode, OtpCodeError};
pub use page::{Page, PageRequest};
pub use role::{ParseRoleError, Role, ThemePreference};
pub use status::*;
