//! SFTP (SSH File Transfer Protocol) server.
//!
//! This module implements the server side of SFTP v3, the most widely
//! supported version.
//!
//! # Architecture
//!
//! SFTP runs as an SSH subsystem over an SSH channel. The SSH layer owns
//! the connection and hands each accepted "sftp" subsystem channel to
//! [`SftpServer::serve_channel`]:
//!
//! ```text
//! Client                          Server
//!   |                               |
//!   |-- SSH_MSG_CHANNEL_REQUEST --->|  (subsystem "sftp")
//!   |<- SSH_MSG_CHANNEL_SUCCESS ----|  is_sftp_request()
//!   |                               |
//!   |-- SSH_FXP_INIT -------------->|
//!   |<- SSH_FXP_VERSION ------------|
//!   |                               |
//!   |-- SSH_FXP_OPEN -------------->|  FileSystem::open_file
//!   |<- SSH_FXP_HANDLE -------------|  HandleTable::new_file
//!   |                               |
//!   |-- SSH_FXP_READ -------------->|  File::read_at
//!   |<- SSH_FXP_DATA ---------------|
//!   |                               |
//!   |-- SSH_FXP_CLOSE ------------->|  HandleTable::close
//!   |<- SSH_FXP_STATUS -------------|
//! ```
//!
//! Storage is abstracted by the [`FileSystem`], [`File`] and [`Dir`] traits.
//!
//! # Example
//!
//! ```rust
//! use sftpd_proto::sftp::{is_sftp_request, EmptyFs, SftpServer};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> sftpd_platform::SftpdResult<()> {
//! let server = SftpServer::new(Arc::new(EmptyFs));
//! assert!(is_sftp_request("subsystem", b"\x00\x00\x00\x04sftp"));
//!
//! // Serve an INIT over an in-memory channel
//! let (mut client, channel) = tokio::io::duplex(1024);
//! let session = tokio::spawn(async move { server.serve_channel(channel).await });
//!
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//! client.write_all(&[0, 0, 0, 5, 1, 0, 0, 0, 3]).await?;
//! let mut reply = [0u8; 9];
//! client.read_exact(&mut reply).await?;
//! assert_eq!(reply, [0, 0, 0, 5, 2, 0, 0, 0, 3]);
//!
//! drop(client);
//! session.await.unwrap()?;
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - [SFTP Draft v3](https://datatracker.ietf.org/doc/html/draft-ietf-secsh-filexfer-02)

pub mod codec;
pub mod config;
pub mod fs;
pub mod handle;
pub mod logging;
pub mod message;
pub mod server;
pub mod status;
pub mod types;

pub use config::SftpServerConfig;
pub use fs::{simple_real_path, Dir, EmptyFile, EmptyFs, File, FileSystem, FsError, FsResult};
pub use handle::HandleTable;
pub use message::{Request, Response, SftpMessageType, SFTP_VERSION};
pub use server::SftpServer;
pub use status::StatusMapping;
pub use types::{Attr, AttrFlags, FileMode, FileOpenFlags, FileType, NamedAttr, StatusCode};

/// Subsystem name carried by the SSH channel request.
pub const SFTP_SUBSYSTEM: &str = "sftp";

/// Returns true if an SSH channel request starts the SFTP subsystem.
///
/// The request type must be "subsystem" and the payload exactly the string
/// "sftp" in SSH wire encoding.
pub fn is_sftp_request(request_type: &str, payload: &[u8]) -> bool {
    request_type == sftpd_platform::SUBSYSTEM_REQUEST
        && sftpd_platform::is_ssh_string(payload, SFTP_SUBSYSTEM.as_bytes())
}
