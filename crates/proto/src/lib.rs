//! SFTP protocol engine for the sftpd ecosystem.
//!
//! This crate implements the server side of the SSH File Transfer Protocol
//! (version 3). It speaks the SFTP wire protocol over any async byte
//! channel and forwards every operation to a pluggable filesystem.
//!
//! - **Codec** - length-prefixed frames, bounds-checked field parsing
//! - **Engine** - one sequential request loop per channel
//! - **Handles** - per-session table of open files and directories
//! - **Provider** - async [`sftp::FileSystem`] trait implemented by backends
//!
//! SSH transport, authentication and channel multiplexing are out of scope;
//! the embedding SSH server hands the engine an already-open channel.
//!
//! # Features
//!
//! - `serde` - `Serialize`/`Deserialize` for configuration and attributes
//!
//! # Example
//!
//! ```rust
//! use sftpd_proto::sftp::{Attr, AttrFlags, SftpServerConfig};
//!
//! let attrs = Attr::new().with_size(12).with_permissions(0o100644);
//! assert!(attrs.has(AttrFlags::SIZE | AttrFlags::PERMISSIONS));
//!
//! let config = SftpServerConfig::default();
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Security
//!
//! - Frame sizes are checked before any buffer is allocated
//! - Read lengths, directory batches and open files are bounded per session
//! - Handles are generation-tagged, so a stale handle never reaches a new object
//! - Comprehensive testing including randomized input and fuzz testing
//!
//! # References
//!
//! - [SFTP Draft v3](https://datatracker.ietf.org/doc/html/draft-ietf-secsh-filexfer-02)
//! - [RFC 4254](https://datatracker.ietf.org/doc/html/rfc4254) - SSH Connection Protocol (subsystems)

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod sftp;
