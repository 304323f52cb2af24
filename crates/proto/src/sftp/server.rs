//! SFTP server.
//!
//! [`SftpServer`] serves SFTP v3 sessions over any byte channel, typically
//! the channel of an SSH "subsystem" request. Each call to
//! [`SftpServer::serve_channel`] runs one session to completion:
//!
//! 1. read one frame
//! 2. decode it into a [`Request`]
//! 3. dispatch it against the [`FileSystem`]
//! 4. write and flush the reply
//!
//! Requests are handled strictly one at a time. Provider failures become
//! STATUS replies. Channel errors, malformed frames and references to
//! handles that do not exist end the session with an error. Whatever the
//! outcome, every handle the session still holds is closed before
//! `serve_channel` returns.
//!
//! # Example
//!
//! ```rust,no_run
//! use sftpd_proto::sftp::{EmptyFs, SftpServer};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! # async fn run() -> sftpd_platform::SftpdResult<()> {
//! let server = SftpServer::new(Arc::new(EmptyFs));
//! let listener = TcpListener::bind("127.0.0.1:2222").await?;
//!
//! loop {
//!     let (stream, _) = listener.accept().await?;
//!     let server = server.clone();
//!     tokio::spawn(async move {
//!         let _ = server.serve_channel(stream).await;
//!     });
//! }
//! # }
//! ```

use super::codec::FrameReader;
use super::config::SftpServerConfig;
use super::fs::{FileSystem, FsError, FsResult};
use super::handle::HandleTable;
use super::logging;
use super::message::{Request, Response, SFTP_VERSION};
use super::types::{Attr, StatusCode};
use super::SFTP_SUBSYSTEM;
use bytes::{Bytes, BytesMut};
use sftpd_platform::{SftpdError, SftpdResult, Subsystem};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// SFTP server backed by a [`FileSystem`].
///
/// Cloning is cheap; clones share the filesystem and configuration.
pub struct SftpServer<F: ?Sized> {
    fs: Arc<F>,
    config: Arc<SftpServerConfig>,
}

impl<F: ?Sized> Clone for SftpServer<F> {
    fn clone(&self) -> Self {
        Self {
            fs: self.fs.clone(),
            config: self.config.clone(),
        }
    }
}

impl<F: ?Sized> std::fmt::Debug for SftpServer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpServer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<F: FileSystem + ?Sized> SftpServer<F> {
    /// Creates a server with the default configuration.
    pub fn new(fs: Arc<F>) -> Self {
        Self {
            fs,
            config: Arc::new(SftpServerConfig::default()),
        }
    }

    /// Creates a server with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SftpdError::Config`] if the configuration is invalid.
    pub fn with_config(fs: Arc<F>, config: SftpServerConfig) -> SftpdResult<Self> {
        config.validate()?;
        Ok(Self {
            fs,
            config: Arc::new(config),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SftpServerConfig {
        &self.config
    }

    /// Serves one SFTP session on `stream` until the client disconnects.
    ///
    /// Returns `Ok(())` when the stream ends cleanly between frames.
    ///
    /// # Errors
    ///
    /// - [`SftpdError::Io`] if the channel fails or closes inside a frame
    /// - [`SftpdError::Protocol`] if a frame or field is malformed
    /// - [`SftpdError::InvalidHandle`] if the client uses a handle that is
    ///   not open for READ, WRITE, FSTAT, FSETSTAT or READDIR
    pub async fn serve_channel<S>(&self, stream: S) -> SftpdResult<()>
    where
        S: AsyncRead + AsyncWrite,
    {
        let (read_half, mut write_half) = tokio::io::split(stream);
        let mut reader = FrameReader::new(BufReader::new(read_half), self.config.max_packet_len);
        let mut session = Session::new(&*self.fs, &self.config);

        logging::log_session_start(self.config.max_open_files, self.config.max_read_len);

        let result = session.run(&mut reader, &mut write_half).await;

        session.handles.close_all().await;
        // The peer may already be gone
        let _ = write_half.shutdown().await;

        logging::log_session_end(session.requests, result.as_ref().err());
        result
    }
}

impl<F: FileSystem + ?Sized> Subsystem for SftpServer<F> {
    fn name(&self) -> &'static str {
        SFTP_SUBSYSTEM
    }

    fn version(&self) -> u32 {
        SFTP_VERSION
    }

    fn description(&self) -> &'static str {
        "SSH File Transfer Protocol version 3 server"
    }

    fn init(&self) -> SftpdResult<()> {
        self.config.validate()
    }
}

/// State of one session.
struct Session<'a, F: ?Sized> {
    fs: &'a F,
    config: &'a SftpServerConfig,
    handles: HandleTable,
    requests: u64,
}

impl<'a, F: FileSystem + ?Sized> Session<'a, F> {
    fn new(fs: &'a F, config: &'a SftpServerConfig) -> Self {
        Self {
            fs,
            config,
            handles: HandleTable::new(),
            requests: 0,
        }
    }

    async fn run<R, W>(&mut self, reader: &mut FrameReader<R>, writer: &mut W) -> SftpdResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while let Some(frame) = reader.next_frame().await? {
            self.requests += 1;
            let request = Request::decode(&frame)?;
            logging::log_request(request.name(), request.id(), &frame.payload);

            if let Some(response) = self.dispatch(request).await? {
                writer.write_all(&response.encode()).await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }

    /// Handles one request. `Ok(None)` means no reply is sent.
    async fn dispatch(&mut self, request: Request) -> SftpdResult<Option<Response>> {
        let op = request.name();
        let response = match request {
            Request::Init { version } => {
                logging::log_init(version, SFTP_VERSION);
                Response::Version {
                    version: SFTP_VERSION,
                }
            }
            Request::Open {
                id,
                path,
                pflags,
                attrs,
            } => self.open(id, &path, pflags, &attrs).await,
            Request::Close { id, handle } => {
                self.handles.close(&handle).await;
                Response::Status {
                    id,
                    code: StatusCode::Ok,
                }
            }
            Request::Read {
                id,
                handle,
                offset,
                len,
            } => self.read(id, &handle, offset, len).await?,
            Request::Write {
                id,
                handle,
                offset,
                data,
            } => {
                let file = self
                    .handles
                    .get_file(&handle)
                    .ok_or_else(|| invalid_handle(&handle))?;
                let result = file.write_at(&data, offset).await;
                self.status(op, id, result)
            }
            Request::LStat { id, path } => {
                let result = self.fs.stat(&path, false).await;
                self.attrs(op, id, result)
            }
            Request::Stat { id, path } => {
                let result = self.fs.stat(&path, true).await;
                self.attrs(op, id, result)
            }
            Request::FStat { id, handle } => {
                let file = self
                    .handles
                    .get_file(&handle)
                    .ok_or_else(|| invalid_handle(&handle))?;
                let result = file.stat().await;
                self.attrs(op, id, result)
            }
            Request::SetStat { id, path, attrs } => {
                let result = self.fs.set_stat(&path, &attrs).await;
                self.status(op, id, result)
            }
            Request::FSetStat { id, handle, attrs } => {
                let file = self
                    .handles
                    .get_file(&handle)
                    .ok_or_else(|| invalid_handle(&handle))?;
                let result = file.set_stat(&attrs).await;
                self.status(op, id, result)
            }
            Request::OpenDir { id, path } => match self.fs.open_dir(&path).await {
                Ok(dir) => Response::Handle {
                    id,
                    handle: self.handles.new_dir(dir),
                },
                Err(e) => self.status_err(op, id, e),
            },
            Request::ReadDir { id, handle } => self.readdir(id, &handle).await?,
            Request::Remove { id, path } => {
                let result = self.fs.remove(&path).await;
                self.status(op, id, result)
            }
            Request::MkDir { id, path, attrs } => {
                let result = self.fs.mkdir(&path, &attrs).await;
                self.status(op, id, result)
            }
            Request::RmDir { id, path } => {
                let result = self.fs.rmdir(&path).await;
                self.status(op, id, result)
            }
            Request::RealPath { id, path } => match self.fs.real_path(&path).await {
                Ok(path) => Response::single_name(id, path),
                Err(e) => self.status_err(op, id, e),
            },
            Request::ReadLink { id, path } => match self.fs.read_link(&path).await {
                Ok(target) => Response::single_name(id, target),
                Err(e) => self.status_err(op, id, e),
            },
            Request::Rename { id } | Request::Symlink { id } => {
                logging::log_status(op, id, StatusCode::Failure, None);
                Response::Status {
                    id,
                    code: StatusCode::Failure,
                }
            }
            Request::Unsupported { msg_type, id } => {
                logging::log_unsupported(msg_type, id);
                return Ok(id.map(|id| Response::Status {
                    id,
                    code: StatusCode::OpUnsupported,
                }));
            }
        };
        Ok(Some(response))
    }

    async fn open(&mut self, id: u32, path: &str, pflags: u32, attrs: &Attr) -> Response {
        if self.handles.file_count() >= self.config.max_open_files {
            logging::log_open_file_limit(self.config.max_open_files);
            return self.status_err("open", id, FsError::TooManyOpenFiles);
        }
        match self.fs.open_file(path, pflags, attrs).await {
            Ok(file) => Response::Handle {
                id,
                handle: self.handles.new_file(file),
            },
            Err(e) => self.status_err("open", id, e),
        }
    }

    async fn read(&mut self, id: u32, handle: &[u8], offset: u64, len: u32) -> SftpdResult<Response> {
        let file = self
            .handles
            .get_file(handle)
            .ok_or_else(|| invalid_handle(handle))?;

        let len = len.min(self.config.max_read_len) as usize;
        if len == 0 {
            return Ok(Response::Data {
                id,
                data: Bytes::new(),
            });
        }

        let mut buf = BytesMut::zeroed(len);
        let result = file.read_at(&mut buf, offset).await;
        let response = match result {
            Ok(0) => self.status_err("read", id, FsError::Eof),
            Ok(n) => {
                buf.truncate(n.min(len));
                Response::Data {
                    id,
                    data: buf.freeze(),
                }
            }
            Err(e) => self.status_err("read", id, e),
        };
        Ok(response)
    }

    async fn readdir(&mut self, id: u32, handle: &[u8]) -> SftpdResult<Response> {
        let dir = self
            .handles
            .get_dir(handle)
            .ok_or_else(|| invalid_handle(handle))?;

        let result = dir.readdir(self.config.max_readdir_entries).await;
        let response = match result {
            Ok(entries) if entries.is_empty() => self.status_err("readdir", id, FsError::Eof),
            Ok(entries) => Response::Name { id, entries },
            Err(e) => self.status_err("readdir", id, e),
        };
        Ok(response)
    }

    fn attrs(&self, op: &str, id: u32, result: FsResult<Attr>) -> Response {
        match result {
            Ok(attrs) => Response::Attrs { id, attrs },
            Err(e) => self.status_err(op, id, e),
        }
    }

    fn status<T>(&self, op: &str, id: u32, result: FsResult<T>) -> Response {
        let code = self.config.status_mapping.code_for_result(&result);
        logging::log_status(op, id, code, result.as_ref().err());
        Response::Status { id, code }
    }

    fn status_err(&self, op: &str, id: u32, err: FsError) -> Response {
        let code = self.config.status_mapping.code_for(&err);
        logging::log_status(op, id, code, Some(&err));
        Response::Status { id, code }
    }
}

fn invalid_handle(handle: &[u8]) -> SftpdError {
    SftpdError::InvalidHandle(String::from_utf8_lossy(handle).into_owned())
}
