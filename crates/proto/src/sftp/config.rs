//! SFTP server configuration.

use super::codec::DEFAULT_MAX_PACKET_LEN;
use super::status::StatusMapping;
use sftpd_platform::{SftpdError, SftpdResult};

/// Smallest accepted `max_packet_len`.
pub const MIN_MAX_PACKET_LEN: u32 = 1024;

/// SFTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SftpServerConfig {
    /// Maximum files open at once per session (directories not counted).
    pub max_open_files: usize,
    /// Largest byte count returned by a single READ.
    pub max_read_len: u32,
    /// Most entries returned by a single READDIR.
    pub max_readdir_entries: usize,
    /// Largest accepted frame payload.
    pub max_packet_len: u32,
    /// How provider errors are reported.
    pub status_mapping: StatusMapping,
}

impl Default for SftpServerConfig {
    fn default() -> Self {
        Self {
            max_open_files: 256,
            max_read_len: 64 * 1024,
            max_readdir_entries: 1024,
            max_packet_len: DEFAULT_MAX_PACKET_LEN,
            status_mapping: StatusMapping::Coarse,
        }
    }
}

impl SftpServerConfig {
    /// Checks the limits.
    ///
    /// # Errors
    ///
    /// Returns [`SftpdError::Config`] if a limit is zero or `max_packet_len`
    /// is below [`MIN_MAX_PACKET_LEN`].
    pub fn validate(&self) -> SftpdResult<()> {
        if self.max_open_files == 0 {
            return Err(SftpdError::Config(
                "max_open_files must be non-zero".to_string(),
            ));
        }
        if self.max_read_len == 0 {
            return Err(SftpdError::Config(
                "max_read_len must be non-zero".to_string(),
            ));
        }
        if self.max_readdir_entries == 0 {
            return Err(SftpdError::Config(
                "max_readdir_entries must be non-zero".to_string(),
            ));
        }
        if self.max_packet_len < MIN_MAX_PACKET_LEN {
            return Err(SftpdError::Config(format!(
                "max_packet_len must be at least {} (got {})",
                MIN_MAX_PACKET_LEN, self.max_packet_len
            )));
        }
        Ok(())
    }
}
