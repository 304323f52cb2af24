//! Structured logging for SFTP sessions
//!
//! Thin wrappers over `tracing` so every event carries the same field names.
//!
//! # Log Levels
//!
//! - **TRACE**: Raw request payloads (hex)
//! - **DEBUG**: Requests, handle lifecycle, non-OK status replies
//! - **INFO**: Session start and end
//! - **WARN**: Errors that end a session, provider failures on close
//!
//! # Example
//!
//! ```no_run
//! use sftpd_proto::sftp::logging;
//!
//! tracing_subscriber::fmt()
//!     .with_env_filter("sftpd_proto::sftp=debug")
//!     .init();
//!
//! logging::log_session_start(256, 65536);
//! ```

use super::fs::FsError;
use super::types::StatusCode;
use sftpd_platform::SftpdError;
use tracing::{debug, info, trace, warn};

/// Log session start
///
/// # Arguments
///
/// * `max_open_files` - Open-file limit for the session
/// * `max_read_len` - Largest READ the session will serve
pub fn log_session_start(max_open_files: usize, max_read_len: u32) {
    info!(
        max_open_files = max_open_files,
        max_read_len = max_read_len,
        "SFTP session started"
    );
}

/// Log session end
///
/// # Arguments
///
/// * `requests` - Number of requests served
/// * `error` - The error that ended the session, if any
pub fn log_session_end(requests: u64, error: Option<&SftpdError>) {
    match error {
        None => info!(requests = requests, "SFTP session ended"),
        Some(e) => warn!(
            requests = requests,
            error = %e,
            "SFTP session terminated"
        ),
    }
}

/// Log the client's INIT
pub fn log_init(client_version: u32, server_version: u32) {
    debug!(
        client_version = client_version,
        server_version = server_version,
        "SFTP version negotiated"
    );
}

/// Log an incoming request
///
/// # Arguments
///
/// * `op` - Operation name (e.g. "open", "readdir")
/// * `id` - Request ID, if any
/// * `payload` - Raw payload (dumped at TRACE)
pub fn log_request(op: &str, id: Option<u32>, payload: &[u8]) {
    debug!(op = op, id = ?id, payload_len = payload.len(), "SFTP request");
    trace!(op = op, payload = %hex::encode(payload), "SFTP request payload");
}

/// Log a STATUS reply; OK replies are not logged
pub fn log_status(op: &str, id: u32, code: StatusCode, cause: Option<&FsError>) {
    if code == StatusCode::Ok {
        return;
    }
    match cause {
        Some(e) => debug!(op = op, id = id, status = %code, cause = %e, "SFTP status reply"),
        None => debug!(op = op, id = id, status = %code, "SFTP status reply"),
    }
}

/// Log a request type the server does not implement
pub fn log_unsupported(msg_type: u8, id: Option<u32>) {
    debug!(msg_type = msg_type, id = ?id, "Unsupported SFTP request");
}

/// Log an OPEN refused by the open-file limit
pub fn log_open_file_limit(limit: usize) {
    debug!(limit = limit, "Open-file limit reached");
}

/// Log a new handle
pub fn log_handle_opened(token: &str) {
    debug!(handle = token, "Handle opened");
}

/// Log a released handle
///
/// Provider errors on close are reported here and otherwise ignored.
pub fn log_handle_closed(token: &[u8], error: Option<&FsError>) {
    let token = String::from_utf8_lossy(token);
    match error {
        None => debug!(handle = %token, "Handle closed"),
        Some(e) => warn!(handle = %token, error = %e, "Handle close failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_functions() {
        // Smoke test without a subscriber
        log_session_start(256, 65536);
        log_session_end(10, None);
        log_session_end(3, Some(&SftpdError::Protocol("bad frame".to_string())));
        log_init(3, 3);
        log_request("open", Some(1), &[0, 0, 0, 1]);
        log_request("init", None, &[0, 0, 0, 3]);
        log_status("stat", 2, StatusCode::Ok, None);
        log_status("stat", 2, StatusCode::Failure, Some(&FsError::NotFound));
        log_unsupported(200, Some(4));
        log_open_file_limit(256);
        log_handle_opened("f0.1");
        log_handle_closed(b"f0.1", None);
        log_handle_closed(b"d1.2", Some(&FsError::Other("busy".to_string())));
    }
}
