//! Shared helpers for SFTP integration tests.
//!
//! - [`SyntheticFs`]: in-memory provider seeded with "foo" and "bar"
//! - [`TestClient`]: speaks raw SFTP frames over a `tokio::io::duplex` pipe

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use sftpd_platform::SftpdResult;
use sftpd_proto::sftp::codec::{PacketReader, PacketWriter};
use sftpd_proto::sftp::{
    Attr, Dir, File, FileMode, FileOpenFlags, FileSystem, FsError, FsResult, NamedAttr,
    SftpMessageType, SftpServer, SftpServerConfig, StatusCode,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

type Files = Arc<Mutex<BTreeMap<String, Vec<u8>>>>;

/// In-memory filesystem with a single flat root directory.
#[derive(Default)]
pub struct SyntheticFs {
    files: Files,
    /// Number of `open_file` calls that reached the provider
    pub open_calls: AtomicUsize,
    /// Number of files and directories closed
    pub closes: Arc<AtomicUsize>,
}

impl SyntheticFs {
    /// Creates a filesystem holding "foo" and "bar".
    pub fn new() -> Self {
        Self::default()
            .with_file("foo", b"foo contents".to_vec())
            .with_file("bar", b"bar contents".to_vec())
    }

    /// Adds a file.
    pub fn with_file(self, name: &str, content: Vec<u8>) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), content);
        self
    }

    /// Returns a file's current content.
    pub fn content(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(name).cloned()
    }
}

fn file_attrs(len: usize) -> Attr {
    Attr::new()
        .with_size(len as u64)
        .with_permissions(FileMode::REGULAR | 0o644)
}

fn strip_root(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

#[async_trait]
impl FileSystem for SyntheticFs {
    async fn open_file(&self, path: &str, flags: u32, _attrs: &Attr) -> FsResult<Box<dyn File>> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        let name = strip_root(path).to_string();
        let mut files = self.files.lock().unwrap();
        if !files.contains_key(&name) {
            if !FileOpenFlags(flags).contains(FileOpenFlags::CREAT) {
                return Err(FsError::NotFound);
            }
            files.insert(name.clone(), Vec::new());
        }
        Ok(Box::new(SyntheticFile {
            files: self.files.clone(),
            name,
            closes: self.closes.clone(),
        }))
    }

    async fn open_dir(&self, _path: &str) -> FsResult<Box<dyn Dir>> {
        let entries = self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(name, content)| NamedAttr::new(name.clone(), file_attrs(content.len())))
            .collect();
        Ok(Box::new(SyntheticDir {
            entries,
            closes: self.closes.clone(),
        }))
    }

    async fn stat(&self, path: &str, _follow_symlinks: bool) -> FsResult<Attr> {
        if matches!(path, "" | "/" | ".") {
            return Ok(Attr::new().with_permissions(FileMode::DIRECTORY | 0o755));
        }
        self.files
            .lock()
            .unwrap()
            .get(strip_root(path))
            .map(|content| file_attrs(content.len()))
            .ok_or(FsError::NotFound)
    }

    async fn remove(&self, path: &str) -> FsResult<()> {
        self.files
            .lock()
            .unwrap()
            .remove(strip_root(path))
            .map(|_| ())
            .ok_or(FsError::NotFound)
    }
}

struct SyntheticFile {
    files: Files,
    name: String,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl File for SyntheticFile {
    async fn close(&mut self) -> FsResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> FsResult<usize> {
        let files = self.files.lock().unwrap();
        let content = files.get(&self.name).ok_or(FsError::NotFound)?;
        let start = (offset as usize).min(content.len());
        let n = (content.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&content[start..start + n]);
        Ok(n)
    }

    async fn write_at(&mut self, buf: &[u8], offset: u64) -> FsResult<usize> {
        let mut files = self.files.lock().unwrap();
        let content = files.get_mut(&self.name).ok_or(FsError::NotFound)?;
        let start = offset as usize;
        if content.len() < start + buf.len() {
            content.resize(start + buf.len(), 0);
        }
        content[start..start + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }

    async fn stat(&mut self) -> FsResult<Attr> {
        let files = self.files.lock().unwrap();
        let content = files.get(&self.name).ok_or(FsError::NotFound)?;
        Ok(file_attrs(content.len()))
    }
}

struct SyntheticDir {
    entries: Vec<NamedAttr>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Dir for SyntheticDir {
    async fn close(&mut self) -> FsResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn readdir(&mut self, max: usize) -> FsResult<Vec<NamedAttr>> {
        if self.entries.is_empty() {
            return Err(FsError::Eof);
        }
        let n = max.min(self.entries.len());
        Ok(self.entries.drain(..n).collect())
    }
}

/// A decoded server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Version(u32),
    Status { id: u32, code: StatusCode },
    Handle { id: u32, handle: Bytes },
    Data { id: u32, data: Bytes },
    Name { id: u32, entries: Vec<(String, Attr)> },
    Attrs { id: u32, attrs: Attr },
}

/// Starts a session on one end of an in-memory pipe.
pub fn spawn_session<F: FileSystem + 'static>(
    fs: Arc<F>,
    config: SftpServerConfig,
) -> (TestClient, JoinHandle<SftpdResult<()>>) {
    let server = SftpServer::with_config(fs, config).expect("valid config");
    let (client, channel) = tokio::io::duplex(1 << 20);
    let task = tokio::spawn(async move { server.serve_channel(channel).await });
    (TestClient { stream: client }, task)
}

/// Client end of a test session.
pub struct TestClient {
    pub stream: DuplexStream,
}

impl TestClient {
    /// Writes raw bytes.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    /// Builds and sends a request frame.
    pub async fn send(&mut self, msg_type: SftpMessageType, build: impl FnOnce(&mut PacketWriter)) {
        let mut writer = PacketWriter::new(msg_type);
        build(&mut writer);
        let frame = writer.finish();
        self.send_raw(&frame).await;
    }

    /// Reads one raw reply frame. Returns `None` once the server hung up.
    pub async fn recv_raw(&mut self) -> Option<Vec<u8>> {
        let mut header = [0u8; 4];
        if self.stream.read_exact(&mut header).await.is_err() {
            return None;
        }
        let len = u32::from_be_bytes(header) as usize;
        let mut body = vec![0u8; len];
        self.stream.read_exact(&mut body).await.ok()?;
        let mut frame = header.to_vec();
        frame.extend(body);
        Some(frame)
    }

    /// Reads and decodes one reply.
    pub async fn recv(&mut self) -> Option<Reply> {
        let frame = self.recv_raw().await?;
        let msg_type = frame[4];
        let mut p = PacketReader::new(Bytes::from(frame).slice(5..));

        let reply = match SftpMessageType::from_u8(msg_type) {
            Some(SftpMessageType::Version) => Reply::Version(p.get_u32().unwrap()),
            Some(SftpMessageType::Status) => {
                let id = p.get_u32().unwrap();
                let code = StatusCode::from_u32(p.get_u32().unwrap()).unwrap();
                assert!(p.get_string().unwrap().is_empty());
                assert!(p.get_string().unwrap().is_empty());
                Reply::Status { id, code }
            }
            Some(SftpMessageType::Handle) => Reply::Handle {
                id: p.get_u32().unwrap(),
                handle: p.get_string().unwrap(),
            },
            Some(SftpMessageType::Data) => Reply::Data {
                id: p.get_u32().unwrap(),
                data: p.get_string().unwrap(),
            },
            Some(SftpMessageType::Name) => {
                let id = p.get_u32().unwrap();
                let count = p.get_u32().unwrap();
                let mut entries = Vec::new();
                for _ in 0..count {
                    let name = p.get_text().unwrap();
                    let long_name = p.get_text().unwrap();
                    assert_eq!(name, long_name);
                    entries.push((name, Attr::decode(&mut p).unwrap()));
                }
                Reply::Name { id, entries }
            }
            Some(SftpMessageType::Attrs) => Reply::Attrs {
                id: p.get_u32().unwrap(),
                attrs: Attr::decode(&mut p).unwrap(),
            },
            other => panic!("Unexpected reply type {} ({:?})", msg_type, other),
        };
        assert_eq!(p.remaining(), 0, "trailing bytes in reply");
        Some(reply)
    }

    /// Sends INIT and checks the VERSION reply.
    pub async fn init(&mut self) {
        self.send(SftpMessageType::Init, |w| w.put_u32(3)).await;
        assert_eq!(self.recv().await, Some(Reply::Version(3)));
    }

    /// Opens a file, returning the reply.
    pub async fn open(&mut self, id: u32, path: &str, pflags: u32) -> Reply {
        self.send(SftpMessageType::Open, |w| {
            w.put_u32(id);
            w.put_str(path);
            w.put_u32(pflags);
            w.put_u32(0);
        })
        .await;
        self.recv().await.expect("reply")
    }

    /// Opens a file and returns its handle.
    pub async fn open_handle(&mut self, id: u32, path: &str, pflags: u32) -> Bytes {
        match self.open(id, path, pflags).await {
            Reply::Handle { id: got, handle } => {
                assert_eq!(got, id);
                handle
            }
            other => panic!("Expected Handle, got {:?}", other),
        }
    }

    /// Opens a directory, returning the reply.
    pub async fn opendir(&mut self, id: u32, path: &str) -> Reply {
        self.send(SftpMessageType::OpenDir, |w| {
            w.put_u32(id);
            w.put_str(path);
        })
        .await;
        self.recv().await.expect("reply")
    }

    /// Sends a request with an id and a handle.
    pub async fn with_handle(&mut self, msg_type: SftpMessageType, id: u32, handle: &[u8]) -> Option<Reply> {
        self.send(msg_type, |w| {
            w.put_u32(id);
            w.put_string(handle);
        })
        .await;
        self.recv().await
    }

    /// Sends a request with an id and a path.
    pub async fn with_path(&mut self, msg_type: SftpMessageType, id: u32, path: &str) -> Option<Reply> {
        self.send(msg_type, |w| {
            w.put_u32(id);
            w.put_str(path);
        })
        .await;
        self.recv().await
    }

    /// Reads from a file handle.
    pub async fn read(&mut self, id: u32, handle: &[u8], offset: u64, len: u32) -> Option<Reply> {
        self.send(SftpMessageType::Read, |w| {
            w.put_u32(id);
            w.put_string(handle);
            w.put_u64(offset);
            w.put_u32(len);
        })
        .await;
        self.recv().await
    }

    /// Writes to a file handle.
    pub async fn write(&mut self, id: u32, handle: &[u8], offset: u64, data: &[u8]) -> Option<Reply> {
        self.send(SftpMessageType::Write, |w| {
            w.put_u32(id);
            w.put_string(handle);
            w.put_u64(offset);
            w.put_string(data);
        })
        .await;
        self.recv().await
    }

    /// Closes the client side of the pipe.
    pub async fn hang_up(mut self) {
        self.stream.shutdown().await.unwrap();
    }
}
