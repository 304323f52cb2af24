//! SFTP protocol messages.
//!
//! Requests are decoded once into a typed [`Request`] before dispatch, and
//! replies are built as a typed [`Response`] before encoding.

use super::codec::{Frame, PacketReader, PacketWriter};
use super::types::{Attr, NamedAttr, StatusCode};
use bytes::Bytes;
use sftpd_platform::SftpdResult;

/// SFTP protocol version (v3).
pub const SFTP_VERSION: u32 = 3;

/// SFTP message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SftpMessageType {
    /// SSH_FXP_INIT - Initialize SFTP session
    Init = 1,
    /// SSH_FXP_VERSION - Version response
    Version = 2,
    /// SSH_FXP_OPEN - Open file
    Open = 3,
    /// SSH_FXP_CLOSE - Close file/directory
    Close = 4,
    /// SSH_FXP_READ - Read from file
    Read = 5,
    /// SSH_FXP_WRITE - Write to file
    Write = 6,
    /// SSH_FXP_LSTAT - Get file attributes (no follow symlinks)
    LStat = 7,
    /// SSH_FXP_FSTAT - Get file attributes by handle
    FStat = 8,
    /// SSH_FXP_SETSTAT - Set file attributes
    SetStat = 9,
    /// SSH_FXP_FSETSTAT - Set file attributes by handle
    FSetStat = 10,
    /// SSH_FXP_OPENDIR - Open directory
    OpenDir = 11,
    /// SSH_FXP_READDIR - Read directory
    ReadDir = 12,
    /// SSH_FXP_REMOVE - Remove file
    Remove = 13,
    /// SSH_FXP_MKDIR - Create directory
    MkDir = 14,
    /// SSH_FXP_RMDIR - Remove directory
    RmDir = 15,
    /// SSH_FXP_REALPATH - Canonicalize path
    RealPath = 16,
    /// SSH_FXP_STAT - Get file attributes
    Stat = 17,
    /// SSH_FXP_RENAME - Rename file/directory
    Rename = 18,
    /// SSH_FXP_READLINK - Read symbolic link
    ReadLink = 19,
    /// SSH_FXP_SYMLINK - Create symbolic link
    Symlink = 20,

    // Response messages
    /// SSH_FXP_STATUS - Status response
    Status = 101,
    /// SSH_FXP_HANDLE - File handle response
    Handle = 102,
    /// SSH_FXP_DATA - Data response
    Data = 103,
    /// SSH_FXP_NAME - Name response
    Name = 104,
    /// SSH_FXP_ATTRS - Attributes response
    Attrs = 105,

    // Extended messages
    /// SSH_FXP_EXTENDED - Extended request
    Extended = 200,
    /// SSH_FXP_EXTENDED_REPLY - Extended response
    ExtendedReply = 201,
}

impl SftpMessageType {
    /// Convert from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Init),
            2 => Some(Self::Version),
            3 => Some(Self::Open),
            4 => Some(Self::Close),
            5 => Some(Self::Read),
            6 => Some(Self::Write),
            7 => Some(Self::LStat),
            8 => Some(Self::FStat),
            9 => Some(Self::SetStat),
            10 => Some(Self::FSetStat),
            11 => Some(Self::OpenDir),
            12 => Some(Self::ReadDir),
            13 => Some(Self::Remove),
            14 => Some(Self::MkDir),
            15 => Some(Self::RmDir),
            16 => Some(Self::RealPath),
            17 => Some(Self::Stat),
            18 => Some(Self::Rename),
            19 => Some(Self::ReadLink),
            20 => Some(Self::Symlink),
            101 => Some(Self::Status),
            102 => Some(Self::Handle),
            103 => Some(Self::Data),
            104 => Some(Self::Name),
            105 => Some(Self::Attrs),
            200 => Some(Self::Extended),
            201 => Some(Self::ExtendedReply),
            _ => None,
        }
    }
}

/// A decoded client request.
///
/// Handles are kept as the raw bytes the client sent; the handle table
/// decides whether they name a live object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// SSH_FXP_INIT
    Init {
        /// Client protocol version
        version: u32,
    },
    /// SSH_FXP_OPEN
    Open {
        /// Request ID
        id: u32,
        /// File path
        path: String,
        /// SSH_FXF_* open flags
        pflags: u32,
        /// Initial attributes for created files
        attrs: Attr,
    },
    /// SSH_FXP_CLOSE
    Close {
        /// Request ID
        id: u32,
        /// File or directory handle
        handle: Bytes,
    },
    /// SSH_FXP_READ
    Read {
        /// Request ID
        id: u32,
        /// File handle
        handle: Bytes,
        /// Byte offset
        offset: u64,
        /// Requested length
        len: u32,
    },
    /// SSH_FXP_WRITE
    Write {
        /// Request ID
        id: u32,
        /// File handle
        handle: Bytes,
        /// Byte offset
        offset: u64,
        /// Data to write
        data: Bytes,
    },
    /// SSH_FXP_LSTAT
    LStat {
        /// Request ID
        id: u32,
        /// Path, symlinks not followed
        path: String,
    },
    /// SSH_FXP_FSTAT
    FStat {
        /// Request ID
        id: u32,
        /// File handle
        handle: Bytes,
    },
    /// SSH_FXP_SETSTAT
    SetStat {
        /// Request ID
        id: u32,
        /// Path
        path: String,
        /// Attributes to apply
        attrs: Attr,
    },
    /// SSH_FXP_FSETSTAT
    FSetStat {
        /// Request ID
        id: u32,
        /// File handle
        handle: Bytes,
        /// Attributes to apply
        attrs: Attr,
    },
    /// SSH_FXP_OPENDIR
    OpenDir {
        /// Request ID
        id: u32,
        /// Directory path
        path: String,
    },
    /// SSH_FXP_READDIR
    ReadDir {
        /// Request ID
        id: u32,
        /// Directory handle
        handle: Bytes,
    },
    /// SSH_FXP_REMOVE
    Remove {
        /// Request ID
        id: u32,
        /// File path
        path: String,
    },
    /// SSH_FXP_MKDIR
    MkDir {
        /// Request ID
        id: u32,
        /// Directory path
        path: String,
        /// Initial attributes
        attrs: Attr,
    },
    /// SSH_FXP_RMDIR
    RmDir {
        /// Request ID
        id: u32,
        /// Directory path
        path: String,
    },
    /// SSH_FXP_REALPATH
    RealPath {
        /// Request ID
        id: u32,
        /// Path to canonicalize
        path: String,
    },
    /// SSH_FXP_STAT
    Stat {
        /// Request ID
        id: u32,
        /// Path, symlinks followed
        path: String,
    },
    /// SSH_FXP_RENAME (only the id is decoded)
    Rename {
        /// Request ID
        id: u32,
    },
    /// SSH_FXP_READLINK
    ReadLink {
        /// Request ID
        id: u32,
        /// Link path
        path: String,
    },
    /// SSH_FXP_SYMLINK (only the id is decoded)
    Symlink {
        /// Request ID
        id: u32,
    },
    /// Any type byte that is not a v3 request.
    Unsupported {
        /// Raw type byte
        msg_type: u8,
        /// Leading request ID, if the payload is long enough to hold one
        id: Option<u32>,
    },
}

impl Request {
    /// Decodes a frame into a typed request.
    ///
    /// Trailing bytes after the last field are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`sftpd_platform::SftpdError::Protocol`] if a field is
    /// truncated or an attribute record is malformed.
    pub fn decode(frame: &Frame) -> SftpdResult<Self> {
        let mut p = PacketReader::new(frame.payload.clone());

        let msg_type = match SftpMessageType::from_u8(frame.msg_type) {
            Some(t) => t,
            None => return Ok(Self::unsupported(frame.msg_type, &mut p)),
        };

        let request = match msg_type {
            SftpMessageType::Init => Self::Init {
                version: p.get_u32()?,
            },
            SftpMessageType::Open => Self::Open {
                id: p.get_u32()?,
                path: p.get_text()?,
                pflags: p.get_u32()?,
                attrs: Attr::decode(&mut p)?,
            },
            SftpMessageType::Close => Self::Close {
                id: p.get_u32()?,
                handle: p.get_string()?,
            },
            SftpMessageType::Read => Self::Read {
                id: p.get_u32()?,
                handle: p.get_string()?,
                offset: p.get_u64()?,
                len: p.get_u32()?,
            },
            SftpMessageType::Write => {
                let id = p.get_u32()?;
                let handle = p.get_string()?;
                let offset = p.get_u64()?;
                let len = p.get_u32()? as usize;
                Self::Write {
                    id,
                    handle,
                    offset,
                    data: p.get_bytes(len)?,
                }
            }
            SftpMessageType::LStat => Self::LStat {
                id: p.get_u32()?,
                path: p.get_text()?,
            },
            SftpMessageType::FStat => Self::FStat {
                id: p.get_u32()?,
                handle: p.get_string()?,
            },
            SftpMessageType::SetStat => Self::SetStat {
                id: p.get_u32()?,
                path: p.get_text()?,
                attrs: Attr::decode(&mut p)?,
            },
            SftpMessageType::FSetStat => Self::FSetStat {
                id: p.get_u32()?,
                handle: p.get_string()?,
                attrs: Attr::decode(&mut p)?,
            },
            SftpMessageType::OpenDir => Self::OpenDir {
                id: p.get_u32()?,
                path: p.get_text()?,
            },
            SftpMessageType::ReadDir => Self::ReadDir {
                id: p.get_u32()?,
                handle: p.get_string()?,
            },
            SftpMessageType::Remove => Self::Remove {
                id: p.get_u32()?,
                path: p.get_text()?,
            },
            SftpMessageType::MkDir => Self::MkDir {
                id: p.get_u32()?,
                path: p.get_text()?,
                attrs: Attr::decode(&mut p)?,
            },
            SftpMessageType::RmDir => Self::RmDir {
                id: p.get_u32()?,
                path: p.get_text()?,
            },
            SftpMessageType::RealPath => Self::RealPath {
                id: p.get_u32()?,
                path: p.get_text()?,
            },
            SftpMessageType::Stat => Self::Stat {
                id: p.get_u32()?,
                path: p.get_text()?,
            },
            SftpMessageType::Rename => Self::Rename { id: p.get_u32()? },
            SftpMessageType::ReadLink => Self::ReadLink {
                id: p.get_u32()?,
                path: p.get_text()?,
            },
            SftpMessageType::Symlink => Self::Symlink { id: p.get_u32()? },
            SftpMessageType::Version
            | SftpMessageType::Status
            | SftpMessageType::Handle
            | SftpMessageType::Data
            | SftpMessageType::Name
            | SftpMessageType::Attrs
            | SftpMessageType::Extended
            | SftpMessageType::ExtendedReply => Self::unsupported(frame.msg_type, &mut p),
        };

        Ok(request)
    }

    fn unsupported(msg_type: u8, p: &mut PacketReader) -> Self {
        Self::Unsupported {
            msg_type,
            id: p.get_u32().ok(),
        }
    }

    /// Returns the request ID, if the request carries one.
    pub fn id(&self) -> Option<u32> {
        match self {
            Self::Init { .. } => None,
            Self::Open { id, .. }
            | Self::Close { id, .. }
            | Self::Read { id, .. }
            | Self::Write { id, .. }
            | Self::LStat { id, .. }
            | Self::FStat { id, .. }
            | Self::SetStat { id, .. }
            | Self::FSetStat { id, .. }
            | Self::OpenDir { id, .. }
            | Self::ReadDir { id, .. }
            | Self::Remove { id, .. }
            | Self::MkDir { id, .. }
            | Self::RmDir { id, .. }
            | Self::RealPath { id, .. }
            | Self::Stat { id, .. }
            | Self::Rename { id }
            | Self::ReadLink { id, .. }
            | Self::Symlink { id } => Some(*id),
            Self::Unsupported { id, .. } => *id,
        }
    }

    /// Short operation name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Open { .. } => "open",
            Self::Close { .. } => "close",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::LStat { .. } => "lstat",
            Self::FStat { .. } => "fstat",
            Self::SetStat { .. } => "setstat",
            Self::FSetStat { .. } => "fsetstat",
            Self::OpenDir { .. } => "opendir",
            Self::ReadDir { .. } => "readdir",
            Self::Remove { .. } => "remove",
            Self::MkDir { .. } => "mkdir",
            Self::RmDir { .. } => "rmdir",
            Self::RealPath { .. } => "realpath",
            Self::Stat { .. } => "stat",
            Self::Rename { .. } => "rename",
            Self::ReadLink { .. } => "readlink",
            Self::Symlink { .. } => "symlink",
            Self::Unsupported { .. } => "unsupported",
        }
    }
}

/// A reply to be sent to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// SSH_FXP_VERSION
    Version {
        /// Server protocol version
        version: u32,
    },
    /// SSH_FXP_STATUS
    Status {
        /// Request ID
        id: u32,
        /// Status code
        code: StatusCode,
    },
    /// SSH_FXP_HANDLE
    Handle {
        /// Request ID
        id: u32,
        /// Opaque handle token
        handle: String,
    },
    /// SSH_FXP_DATA
    Data {
        /// Request ID
        id: u32,
        /// Bytes read
        data: Bytes,
    },
    /// SSH_FXP_NAME
    Name {
        /// Request ID
        id: u32,
        /// Entries; each name is sent as both filename and longname
        entries: Vec<NamedAttr>,
    },
    /// SSH_FXP_ATTRS
    Attrs {
        /// Request ID
        id: u32,
        /// Attributes
        attrs: Attr,
    },
}

impl Response {
    /// Creates a NAME reply with a single entry and no attributes.
    pub fn single_name(id: u32, name: String) -> Self {
        Self::Name {
            id,
            entries: vec![NamedAttr::new(name, Attr::new())],
        }
    }

    /// Serializes to a complete frame.
    ///
    /// STATUS replies are fixed-size: id, code, and empty message and
    /// language-tag strings.
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Version { version } => {
                let mut w = PacketWriter::with_capacity(SftpMessageType::Version, 4);
                w.put_u32(*version);
                w.finish()
            }
            Self::Status { id, code } => {
                let mut w = PacketWriter::with_capacity(SftpMessageType::Status, 16);
                w.put_u32(*id);
                w.put_u32(*code as u32);
                w.put_string(b"");
                w.put_string(b"");
                w.finish()
            }
            Self::Handle { id, handle } => {
                let mut w =
                    PacketWriter::with_capacity(SftpMessageType::Handle, 8 + handle.len());
                w.put_u32(*id);
                w.put_str(handle);
                w.finish()
            }
            Self::Data { id, data } => {
                let mut w = PacketWriter::with_capacity(SftpMessageType::Data, 8 + data.len());
                w.put_u32(*id);
                w.put_string(data);
                w.finish()
            }
            Self::Name { id, entries } => {
                let mut w = PacketWriter::new(SftpMessageType::Name);
                w.put_u32(*id);
                w.put_u32(entries.len() as u32);
                for entry in entries {
                    w.put_str(&entry.name);
                    w.put_str(&entry.name);
                    entry.attrs.encode(&mut w);
                }
                w.finish()
            }
            Self::Attrs { id, attrs } => {
                let mut w = PacketWriter::new(SftpMessageType::Attrs);
                w.put_u32(*id);
                attrs.encode(&mut w);
                w.finish()
            }
        }
    }
}
