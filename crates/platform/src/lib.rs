//! # sftpd platform
//!
//! Core platform types and traits shared by the sftpd crates.
//!
//! This crate provides:
//! - Unified error types (`SftpdError`, `SftpdResult`)
//! - The `Subsystem` trait used to match SSH channel subsystem requests
//!
//! # Examples
//!
//! ```
//! use sftpd_platform::{SftpdError, SftpdResult};
//!
//! fn check_limit(limit: usize) -> SftpdResult<usize> {
//!     if limit == 0 {
//!         return Err(SftpdError::Config("limit must be non-zero".to_string()));
//!     }
//!     Ok(limit)
//! }
//!
//! # fn main() -> SftpdResult<()> {
//! assert_eq!(check_limit(256)?, 256);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod error;
pub mod traits;

pub use error::{SftpdError, SftpdResult};
pub use traits::{is_ssh_string, Subsystem, SUBSYSTEM_REQUEST};

/// Platform version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
