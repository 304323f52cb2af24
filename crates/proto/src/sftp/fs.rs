//! Filesystem provider interface.
//!
//! The protocol engine never touches storage directly. Every request is
//! forwarded to a [`FileSystem`] implementation, and open files and
//! directories are represented by boxed [`File`] and [`Dir`] objects owned
//! by the session's handle table.
//!
//! All methods have defaults that fail with [`FsError::Unsupported`], so a
//! provider only implements what it supports. [`EmptyFs`] is a provider with
//! nothing implemented at all.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use sftpd_proto::sftp::{Attr, FileSystem, FsError, FsResult};
//!
//! struct RootOnly;
//!
//! #[async_trait]
//! impl FileSystem for RootOnly {
//!     async fn stat(&self, path: &str, _follow_symlinks: bool) -> FsResult<Attr> {
//!         match path {
//!             "/" => Ok(Attr::new().with_permissions(0o040755)),
//!             _ => Err(FsError::NotFound),
//!         }
//!     }
//! }
//! ```

use super::types::{Attr, NamedAttr};
use async_trait::async_trait;
use std::fmt;
use std::io;

/// Provider error.
///
/// Converted to a STATUS reply by the session; never fatal.
#[derive(Debug)]
pub enum FsError {
    /// End of file or end of directory listing
    Eof,
    /// No such file or directory
    NotFound,
    /// Permission denied
    PermissionDenied,
    /// Operation not implemented by the provider
    Unsupported,
    /// The session's open-file limit was reached
    TooManyOpenFiles,
    /// Underlying I/O error
    Io(io::Error),
    /// Anything else
    Other(String),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::Eof => write!(f, "End of file"),
            FsError::NotFound => write!(f, "No such file"),
            FsError::PermissionDenied => write!(f, "Permission denied"),
            FsError::Unsupported => write!(f, "Operation unsupported"),
            FsError::TooManyOpenFiles => write!(f, "Too many open files"),
            FsError::Io(e) => write!(f, "I/O error: {}", e),
            FsError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound,
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied,
            io::ErrorKind::Unsupported => FsError::Unsupported,
            _ => FsError::Io(err),
        }
    }
}

/// Result type for provider calls.
pub type FsResult<T> = Result<T, FsError>;

/// Maps the empty path and "." to "/", leaving anything else unchanged.
pub fn simple_real_path(path: &str) -> String {
    match path {
        "" | "." => "/".to_string(),
        _ => path.to_string(),
    }
}

/// A filesystem served over SFTP.
///
/// Shared by every session of a server, hence `Send + Sync`.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Opens a file. `flags` are the raw SSH_FXF_* bits; `attrs` are the
    /// initial attributes for a newly created file.
    async fn open_file(&self, path: &str, flags: u32, attrs: &Attr) -> FsResult<Box<dyn File>> {
        let _ = (path, flags, attrs);
        Err(FsError::Unsupported)
    }

    /// Opens a directory for listing.
    async fn open_dir(&self, path: &str) -> FsResult<Box<dyn Dir>> {
        let _ = path;
        Err(FsError::Unsupported)
    }

    /// Removes a file.
    async fn remove(&self, path: &str) -> FsResult<()> {
        let _ = path;
        Err(FsError::Unsupported)
    }

    /// Renames a file or directory.
    async fn rename(&self, old_path: &str, new_path: &str, flags: u32) -> FsResult<()> {
        let _ = (old_path, new_path, flags);
        Err(FsError::Unsupported)
    }

    /// Creates a directory.
    async fn mkdir(&self, path: &str, attrs: &Attr) -> FsResult<()> {
        let _ = (path, attrs);
        Err(FsError::Unsupported)
    }

    /// Removes a directory.
    async fn rmdir(&self, path: &str) -> FsResult<()> {
        let _ = path;
        Err(FsError::Unsupported)
    }

    /// Returns attributes for a path.
    async fn stat(&self, path: &str, follow_symlinks: bool) -> FsResult<Attr> {
        let _ = (path, follow_symlinks);
        Err(FsError::Unsupported)
    }

    /// Applies attributes to a path.
    async fn set_stat(&self, path: &str, attrs: &Attr) -> FsResult<()> {
        let _ = (path, attrs);
        Err(FsError::Unsupported)
    }

    /// Returns the target of a symbolic link.
    async fn read_link(&self, path: &str) -> FsResult<String> {
        let _ = path;
        Err(FsError::Unsupported)
    }

    /// Creates a link at `path` pointing to `target`.
    async fn create_link(&self, path: &str, target: &str, flags: u32) -> FsResult<()> {
        let _ = (path, target, flags);
        Err(FsError::Unsupported)
    }

    /// Canonicalizes a path.
    async fn real_path(&self, path: &str) -> FsResult<String> {
        Ok(simple_real_path(path))
    }
}

/// An open file.
#[async_trait]
pub trait File: Send {
    /// Releases the file. Called exactly once, when the handle is closed or
    /// the session ends.
    async fn close(&mut self) -> FsResult<()> {
        Ok(())
    }

    /// Reads into `buf` starting at `offset`, returning the byte count.
    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> FsResult<usize> {
        let _ = (buf, offset);
        Err(FsError::Unsupported)
    }

    /// Writes `buf` at `offset`, returning the byte count.
    async fn write_at(&mut self, buf: &[u8], offset: u64) -> FsResult<usize> {
        let _ = (buf, offset);
        Err(FsError::Unsupported)
    }

    /// Returns the file's attributes.
    async fn stat(&mut self) -> FsResult<Attr> {
        Err(FsError::Unsupported)
    }

    /// Applies attributes to the file.
    async fn set_stat(&mut self, attrs: &Attr) -> FsResult<()> {
        let _ = attrs;
        Err(FsError::Unsupported)
    }
}

/// An open directory listing.
#[async_trait]
pub trait Dir: Send {
    /// Releases the directory.
    async fn close(&mut self) -> FsResult<()> {
        Ok(())
    }

    /// Returns up to `max` further entries.
    ///
    /// `Err(FsError::Eof)` or an empty batch ends the listing.
    async fn readdir(&mut self, max: usize) -> FsResult<Vec<NamedAttr>> {
        let _ = max;
        Err(FsError::Unsupported)
    }
}

/// A filesystem where every operation fails.
///
/// Only `real_path` works, using [`simple_real_path`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyFs;

#[async_trait]
impl FileSystem for EmptyFs {}

/// A file where every operation except `close` fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyFile;

#[async_trait]
impl File for EmptyFile {}
