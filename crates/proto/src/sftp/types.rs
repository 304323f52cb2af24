//! SFTP data types and the attribute wire encoding.

use super::codec::{PacketReader, PacketWriter};
use sftpd_platform::{SftpdError, SftpdResult};

/// Maximum number of extended attribute pairs accepted in one record.
pub const MAX_EXTENDED_PAIRS: u32 = 0xFF;

/// SFTP status codes (SSH_FX_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StatusCode {
    /// SSH_FX_OK - Success
    Ok = 0,
    /// SSH_FX_EOF - End of file
    Eof = 1,
    /// SSH_FX_NO_SUCH_FILE - No such file
    NoSuchFile = 2,
    /// SSH_FX_PERMISSION_DENIED - Permission denied
    PermissionDenied = 3,
    /// SSH_FX_FAILURE - General failure
    Failure = 4,
    /// SSH_FX_BAD_MESSAGE - Bad message
    BadMessage = 5,
    /// SSH_FX_NO_CONNECTION - No connection
    NoConnection = 6,
    /// SSH_FX_CONNECTION_LOST - Connection lost
    ConnectionLost = 7,
    /// SSH_FX_OP_UNSUPPORTED - Operation not supported
    OpUnsupported = 8,
}

impl StatusCode {
    /// Convert from u32.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::Eof),
            2 => Some(Self::NoSuchFile),
            3 => Some(Self::PermissionDenied),
            4 => Some(Self::Failure),
            5 => Some(Self::BadMessage),
            6 => Some(Self::NoConnection),
            7 => Some(Self::ConnectionLost),
            8 => Some(Self::OpUnsupported),
            _ => None,
        }
    }

    /// Returns status message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Ok => "Success",
            Self::Eof => "End of file",
            Self::NoSuchFile => "No such file or directory",
            Self::PermissionDenied => "Permission denied",
            Self::Failure => "Failure",
            Self::BadMessage => "Bad message",
            Self::NoConnection => "No connection",
            Self::ConnectionLost => "Connection lost",
            Self::OpUnsupported => "Operation not supported",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), *self as u32)
    }
}

/// File open flags (SSH_FXF_*), passed through to the filesystem provider.
#[derive(Debug, Clone, Copy)]
pub struct FileOpenFlags(pub u32);

impl FileOpenFlags {
    /// SSH_FXF_READ - Open for reading
    pub const READ: u32 = 0x00000001;
    /// SSH_FXF_WRITE - Open for writing
    pub const WRITE: u32 = 0x00000002;
    /// SSH_FXF_APPEND - Force writes to append
    pub const APPEND: u32 = 0x00000004;
    /// SSH_FXF_CREAT - Create if doesn't exist
    pub const CREAT: u32 = 0x00000008;
    /// SSH_FXF_TRUNC - Truncate to 0 length
    pub const TRUNC: u32 = 0x00000010;
    /// SSH_FXF_EXCL - Fail if file exists
    pub const EXCL: u32 = 0x00000020;

    /// Returns true if every bit of `flag` is set.
    pub fn contains(&self, flag: u32) -> bool {
        self.0 & flag == flag
    }
}

/// File mode (type and permission bits, POSIX `st_mode` layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(pub u32);

impl FileMode {
    /// Owner read
    pub const USER_READ: u32 = 0o400;
    /// Owner write
    pub const USER_WRITE: u32 = 0o200;
    /// Owner execute
    pub const USER_EXEC: u32 = 0o100;
    /// Group read
    pub const GROUP_READ: u32 = 0o040;
    /// Group write
    pub const GROUP_WRITE: u32 = 0o020;
    /// Group execute
    pub const GROUP_EXEC: u32 = 0o010;
    /// Others read
    pub const OTHER_READ: u32 = 0o004;
    /// Others write
    pub const OTHER_WRITE: u32 = 0o002;
    /// Others execute
    pub const OTHER_EXEC: u32 = 0o001;

    /// File type mask
    pub const TYPE_MASK: u32 = 0o170000;
    /// Directory type bits
    pub const DIRECTORY: u32 = 0o040000;
    /// Regular file type bits
    pub const REGULAR: u32 = 0o100000;
    /// Symbolic link type bits
    pub const SYMLINK: u32 = 0o120000;

    /// Default file permissions (0644 = rw-r--r--)
    pub const DEFAULT_FILE: u32 = 0o644;
    /// Default directory permissions (0755 = rwxr-xr-x)
    pub const DEFAULT_DIR: u32 = 0o755;

    /// Returns the file type described by the type bits.
    pub fn file_type(&self) -> FileType {
        match self.0 & Self::TYPE_MASK {
            Self::DIRECTORY => FileType::Directory,
            Self::REGULAR => FileType::Regular,
            Self::SYMLINK => FileType::Symlink,
            0 => FileType::Unknown,
            _ => FileType::Special,
        }
    }

    /// Permission bits only.
    pub fn permissions(&self) -> u32 {
        self.0 & 0o7777
    }
}

/// File type flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Regular file
    Regular,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Special file
    Special,
    /// Unknown type
    Unknown,
}

/// File attribute flags.
#[derive(Debug, Clone, Copy)]
pub struct AttrFlags(pub u32);

impl AttrFlags {
    /// SSH_FILEXFER_ATTR_SIZE
    pub const SIZE: u32 = 0x00000001;
    /// SSH_FILEXFER_ATTR_UIDGID
    pub const UIDGID: u32 = 0x00000002;
    /// SSH_FILEXFER_ATTR_PERMISSIONS
    pub const PERMISSIONS: u32 = 0x00000004;
    /// SSH_FILEXFER_ATTR_ACMODTIME
    pub const ACMODTIME: u32 = 0x00000008;
    /// SSH_FILEXFER_ATTR_EXTENDED
    pub const EXTENDED: u32 = 0x80000000;
}

/// File attributes.
///
/// `flags` governs which fields are meaningful: a field is written to and
/// read from the wire if and only if its flag bit is set. Fields whose bit is
/// clear are absent from the encoding, not zero-filled. Unknown bits are
/// kept as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attr {
    /// SSH_FILEXFER_ATTR_* bits
    pub flags: u32,
    /// File size in bytes
    pub size: u64,
    /// User ID
    pub uid: u32,
    /// Group ID
    pub gid: u32,
    /// Type and permission bits
    pub permissions: u32,
    /// Access time (Unix timestamp)
    pub atime: u32,
    /// Modification time (Unix timestamp)
    pub mtime: u32,
    /// Extended (name, data) pairs
    pub extended: Vec<(String, String)>,
}

impl Attr {
    /// Creates empty attributes (no flags set).
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if every bit of `flag` is set.
    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag == flag
    }

    /// Sets the size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.flags |= AttrFlags::SIZE;
        self.size = size;
        self
    }

    /// Sets the owner.
    pub fn with_uid_gid(mut self, uid: u32, gid: u32) -> Self {
        self.flags |= AttrFlags::UIDGID;
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// Sets type and permission bits.
    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.flags |= AttrFlags::PERMISSIONS;
        self.permissions = permissions;
        self
    }

    /// Sets access and modification times.
    pub fn with_times(mut self, atime: u32, mtime: u32) -> Self {
        self.flags |= AttrFlags::ACMODTIME;
        self.atime = atime;
        self.mtime = mtime;
        self
    }

    /// Appends an extended pair.
    pub fn with_extended(mut self, name: impl Into<String>, data: impl Into<String>) -> Self {
        self.flags |= AttrFlags::EXTENDED;
        self.extended.push((name.into(), data.into()));
        self
    }

    /// Returns the size if present.
    pub fn size(&self) -> Option<u64> {
        self.has(AttrFlags::SIZE).then_some(self.size)
    }

    /// Returns the mode if present.
    pub fn mode(&self) -> Option<FileMode> {
        self.has(AttrFlags::PERMISSIONS)
            .then_some(FileMode(self.permissions))
    }

    /// Builds attributes from local file metadata.
    ///
    /// Size and type/permission bits are always filled. On Unix, owner and
    /// access/modification times are filled as well.
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let file_type = meta.file_type();
        let type_bits = if file_type.is_dir() {
            FileMode::DIRECTORY
        } else if file_type.is_symlink() {
            FileMode::SYMLINK
        } else if file_type.is_file() {
            FileMode::REGULAR
        } else {
            0
        };

        let attrs = Self::new().with_size(meta.len());

        #[cfg(unix)]
        let attrs = {
            use std::os::unix::fs::MetadataExt;

            attrs
                .with_uid_gid(meta.uid(), meta.gid())
                .with_permissions(type_bits | (meta.mode() & 0o7777))
                .with_times(meta.atime() as u32, meta.mtime() as u32)
        };

        #[cfg(not(unix))]
        let attrs = {
            let perms = if meta.permissions().readonly() {
                0o444
            } else {
                0o644
            };
            attrs.with_permissions(type_bits | perms)
        };

        attrs
    }

    /// Encodes the flags word followed by every flagged field.
    ///
    /// Format:
    /// ```text
    /// uint32    flags
    /// uint64    size            present if SIZE
    /// uint32    uid, gid        present if UIDGID
    /// uint32    permissions     present if PERMISSIONS
    /// uint32    atime, mtime    present if ACMODTIME
    /// uint32    extended_count  present if EXTENDED
    /// string    name, data      repeated extended_count times
    /// ```
    pub fn encode(&self, out: &mut PacketWriter) {
        out.put_u32(self.flags);
        if self.has(AttrFlags::SIZE) {
            out.put_u64(self.size);
        }
        if self.has(AttrFlags::UIDGID) {
            out.put_u32(self.uid);
            out.put_u32(self.gid);
        }
        if self.has(AttrFlags::PERMISSIONS) {
            out.put_u32(self.permissions);
        }
        if self.has(AttrFlags::ACMODTIME) {
            out.put_u32(self.atime);
            out.put_u32(self.mtime);
        }
        if self.has(AttrFlags::EXTENDED) {
            out.put_u32(self.extended.len() as u32);
            for (name, data) in &self.extended {
                out.put_str(name);
                out.put_str(data);
            }
        }
    }

    /// Decodes attributes, reading only the fields whose flag bit is set.
    ///
    /// # Errors
    ///
    /// Returns [`SftpdError::Protocol`] if a flagged field is truncated or the
    /// extended pair count exceeds [`MAX_EXTENDED_PAIRS`].
    pub fn decode(input: &mut PacketReader) -> SftpdResult<Self> {
        let mut attrs = Self {
            flags: input.get_u32()?,
            ..Self::default()
        };

        if attrs.has(AttrFlags::SIZE) {
            attrs.size = input.get_u64()?;
        }
        if attrs.has(AttrFlags::UIDGID) {
            attrs.uid = input.get_u32()?;
            attrs.gid = input.get_u32()?;
        }
        if attrs.has(AttrFlags::PERMISSIONS) {
            attrs.permissions = input.get_u32()?;
        }
        if attrs.has(AttrFlags::ACMODTIME) {
            attrs.atime = input.get_u32()?;
            attrs.mtime = input.get_u32()?;
        }
        if attrs.has(AttrFlags::EXTENDED) {
            let count = input.get_u32()?;
            if count > MAX_EXTENDED_PAIRS {
                return Err(SftpdError::Protocol(format!(
                    "Too many extended attributes: {} (maximum {})",
                    count, MAX_EXTENDED_PAIRS
                )));
            }
            let mut extended = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let name = input.get_text()?;
                let data = input.get_text()?;
                extended.push((name, data));
            }
            attrs.extended = extended;
        }

        Ok(attrs)
    }
}

/// A directory entry: file name plus attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamedAttr {
    /// File name (no directory component)
    pub name: String,
    /// Attributes
    pub attrs: Attr,
}

impl NamedAttr {
    /// Creates a named entry.
    pub fn new(name: impl Into<String>, attrs: Attr) -> Self {
        Self {
            name: name.into(),
            attrs,
        }
    }
}
