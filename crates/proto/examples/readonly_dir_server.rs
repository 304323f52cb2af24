//! Read-only Directory SFTP Server Example
//!
//! This example demonstrates how to:
//! - Implement the `FileSystem`, `File` and `Dir` traits over a local directory
//! - Serve one SFTP session per accepted connection
//! - Install a `tracing` subscriber to watch the protocol
//!
//! There is no SSH layer here: each raw TCP connection is treated as an
//! already-open "sftp" subsystem channel. Use it for local testing only.
//!
//! Usage:
//!   cargo run --example readonly_dir_server [root_dir] [bind_address]
//!
//! Example:
//!   RUST_LOG=sftpd_proto=debug cargo run --example readonly_dir_server /tmp 127.0.0.1:2222
//!
//! Then let OpenSSH's sftp client talk to it directly, bypassing ssh:
//!   sftp -D "nc 127.0.0.1 2222"

use async_trait::async_trait;
use sftpd_proto::sftp::{
    Attr, Dir, File, FileOpenFlags, FileSystem, FsError, FsResult, NamedAttr, SftpServer,
};
use std::env;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Serves the files below `root`, read-only.
struct ReadOnlyDir {
    root: PathBuf,
}

impl ReadOnlyDir {
    /// Maps a client path below the root.
    ///
    /// Only rejects `..`; real servers need proper path normalization.
    fn resolve(&self, path: &str) -> FsResult<PathBuf> {
        if path.contains("..") {
            return Err(FsError::PermissionDenied);
        }
        Ok(self.root.join(path.trim_start_matches('/')))
    }
}

#[async_trait]
impl FileSystem for ReadOnlyDir {
    async fn open_file(&self, path: &str, flags: u32, _attrs: &Attr) -> FsResult<Box<dyn File>> {
        let flags = FileOpenFlags(flags);
        let writes = [
            FileOpenFlags::WRITE,
            FileOpenFlags::APPEND,
            FileOpenFlags::CREAT,
            FileOpenFlags::TRUNC,
        ];
        if writes.iter().any(|&flag| flags.contains(flag)) {
            return Err(FsError::PermissionDenied);
        }

        let file = tokio::fs::File::open(self.resolve(path)?).await?;
        Ok(Box::new(LocalFile { file }))
    }

    async fn open_dir(&self, path: &str) -> FsResult<Box<dyn Dir>> {
        let entries = tokio::fs::read_dir(self.resolve(path)?).await?;
        Ok(Box::new(LocalDir { entries }))
    }

    async fn stat(&self, path: &str, follow_symlinks: bool) -> FsResult<Attr> {
        let path = self.resolve(path)?;
        let meta = if follow_symlinks {
            tokio::fs::metadata(path).await?
        } else {
            tokio::fs::symlink_metadata(path).await?
        };
        Ok(Attr::from_metadata(&meta))
    }

    async fn read_link(&self, path: &str) -> FsResult<String> {
        let target = tokio::fs::read_link(self.resolve(path)?).await?;
        Ok(target.to_string_lossy().into_owned())
    }
}

struct LocalFile {
    file: tokio::fs::File,
}

#[async_trait]
impl File for LocalFile {
    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> FsResult<usize> {
        self.file.seek(SeekFrom::Start(offset)).await?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]).await? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(filled)
    }

    async fn stat(&mut self) -> FsResult<Attr> {
        let meta = self.file.metadata().await?;
        Ok(Attr::from_metadata(&meta))
    }
}

struct LocalDir {
    entries: tokio::fs::ReadDir,
}

#[async_trait]
impl Dir for LocalDir {
    async fn readdir(&mut self, max: usize) -> FsResult<Vec<NamedAttr>> {
        let mut batch = Vec::new();
        while batch.len() < max {
            let entry = match self.entries.next_entry().await? {
                Some(entry) => entry,
                None => break,
            };
            let meta = entry.metadata().await?;
            batch.push(NamedAttr::new(
                entry.file_name().to_string_lossy().into_owned(),
                Attr::from_metadata(&meta),
            ));
        }
        if batch.is_empty() {
            return Err(FsError::Eof);
        }
        Ok(batch)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sftpd_proto=info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let root = args.get(1).cloned().unwrap_or_else(|| ".".to_string());
    let bind_addr = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| "127.0.0.1:2222".to_string());

    let root = tokio::fs::canonicalize(&root).await?;
    let server = SftpServer::new(Arc::new(ReadOnlyDir { root: root.clone() }));

    let listener = TcpListener::bind(&bind_addr).await?;
    println!("=== sftpd Read-only Directory Server ===");
    println!("Serving {} on {}", root.display(), listener.local_addr()?);
    println!("Press Ctrl+C to stop");

    loop {
        let (stream, peer) = listener.accept().await?;
        let server = server.clone();
        tokio::spawn(async move {
            println!("Connection from {}", peer);
            match server.serve_channel(stream).await {
                Ok(()) => println!("Session with {} closed", peer),
                Err(e) => eprintln!("Session with {} failed: {}", peer, e),
            }
        });
    }
}
