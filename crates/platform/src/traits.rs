//! Core traits for sftpd subsystems

use crate::SftpdResult;

/// SSH channel request type that starts a subsystem (RFC 4254 Section 6.5).
pub const SUBSYSTEM_REQUEST: &str = "subsystem";

/// A service started on an SSH session channel by a "subsystem" request.
///
/// The transport that owns the channel uses [`Subsystem::accepts`] to decide
/// whether a channel request should be handed to this subsystem.
pub trait Subsystem: Send + Sync {
    /// Subsystem name as sent in the channel request (e.g. "sftp")
    fn name(&self) -> &'static str;

    /// Protocol version spoken by the subsystem
    fn version(&self) -> u32;

    /// Human readable description
    fn description(&self) -> &'static str;

    /// Validate the subsystem before it starts serving channels
    ///
    /// # Errors
    ///
    /// Returns an error if the subsystem is misconfigured
    fn init(&self) -> SftpdResult<()> {
        Ok(())
    }

    /// Checks whether a channel request starts this subsystem.
    ///
    /// The request payload must be exactly the subsystem name encoded as an
    /// SSH string (`uint32` length followed by the name bytes).
    fn accepts(&self, request_type: &str, payload: &[u8]) -> bool {
        request_type == SUBSYSTEM_REQUEST && is_ssh_string(payload, self.name().as_bytes())
    }
}

/// Returns true if `payload` is exactly `value` encoded as an SSH string.
pub fn is_ssh_string(payload: &[u8], value: &[u8]) -> bool {
    if payload.len() != 4 + value.len() {
        return false;
    }
    let len = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
    len == value.len() && &payload[4..] == value
}
