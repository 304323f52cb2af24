//! Fuzz target for SFTP sessions.
//!
//! Serves one session whose inbound stream is the fuzz input, against a
//! filesystem that rejects everything. This exercises:
//! - Frame header and length validation
//! - Request decoding for every message type
//! - Attribute parsing
//! - Handle lookups with arbitrary tokens
//!
//! Run with:
//! ```bash
//! cd crates/proto
//! cargo +nightly fuzz run sftp_session -- -max_total_time=300
//! ```

#![no_main]
use libfuzzer_sys::fuzz_target;
use sftpd_proto::sftp::{EmptyFs, SftpServer};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Reads the fuzz input, discards everything written.
struct InputChannel<'a> {
    input: &'a [u8],
}

impl AsyncRead for InputChannel<'_> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.input).poll_read(cx, buf)
    }
}

impl AsyncWrite for InputChannel<'_> {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fuzz_target!(|data: &[u8]| {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let server = SftpServer::new(Arc::new(EmptyFs));

    // Any outcome is fine as long as the session neither panics nor hangs
    let _ = runtime.block_on(server.serve_channel(InputChannel { input: data }));
});
