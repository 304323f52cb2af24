//! Per-session handle table.
//!
//! Open files and directories live in an arena of slots. A handle token
//! names a slot together with the generation it was issued under:
//!
//! ```text
//! f3.1c     file in slot 3, generation 0x1c
//! d0.2      directory in slot 0, generation 0x2
//! ```
//!
//! Generations come from a single counter shared by files and directories
//! and bumped on every allocation. A vacated slot is reused under a fresh
//! generation, so a token that outlived its object never resolves again.

use super::fs::{Dir, File};
use super::logging;

const FILE_PREFIX: char = 'f';
const DIR_PREFIX: char = 'd';

enum Entry {
    File(Box<dyn File>),
    Dir(Box<dyn Dir>),
}

impl Entry {
    fn prefix(&self) -> char {
        match self {
            Entry::File(_) => FILE_PREFIX,
            Entry::Dir(_) => DIR_PREFIX,
        }
    }
}

struct Slot {
    generation: u64,
    entry: Option<Entry>,
}

/// Open files and directories of one session.
#[derive(Default)]
pub struct HandleTable {
    slots: Vec<Slot>,
    free: Vec<usize>,
    generation: u64,
    files: usize,
    dirs: usize,
}

impl std::fmt::Debug for HandleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleTable")
            .field("slots", &self.slots.len())
            .field("files", &self.files)
            .field("dirs", &self.dirs)
            .finish()
    }
}

impl HandleTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an open file and returns its handle token.
    pub fn new_file(&mut self, file: Box<dyn File>) -> String {
        self.files += 1;
        self.insert(Entry::File(file))
    }

    /// Registers an open directory and returns its handle token.
    pub fn new_dir(&mut self, dir: Box<dyn Dir>) -> String {
        self.dirs += 1;
        self.insert(Entry::Dir(dir))
    }

    /// Looks up a live file handle.
    pub fn get_file(&mut self, token: &[u8]) -> Option<&mut (dyn File + 'static)> {
        match self.lookup(token)? {
            Entry::File(file) => Some(file.as_mut()),
            Entry::Dir(_) => None,
        }
    }

    /// Looks up a live directory handle.
    pub fn get_dir(&mut self, token: &[u8]) -> Option<&mut (dyn Dir + 'static)> {
        match self.lookup(token)? {
            Entry::Dir(dir) => Some(dir.as_mut()),
            Entry::File(_) => None,
        }
    }

    /// Closes and forgets a handle.
    ///
    /// Empty, malformed, stale and unknown tokens are ignored. Returns true
    /// if a live object was closed.
    pub async fn close(&mut self, token: &[u8]) -> bool {
        let index = match self.resolve(token) {
            Some(index) => index,
            None => return false,
        };
        match self.take(index) {
            Some(entry) => {
                Self::close_entry(token, entry).await;
                true
            }
            None => false,
        }
    }

    /// Closes every remaining handle.
    pub async fn close_all(&mut self) {
        for index in 0..self.slots.len() {
            let generation = self.slots[index].generation;
            if let Some(entry) = self.take(index) {
                let token = format_token(entry.prefix(), index, generation);
                Self::close_entry(token.as_bytes(), entry).await;
            }
        }
    }

    /// Number of open files.
    pub fn file_count(&self) -> usize {
        self.files
    }

    /// Number of open directories.
    pub fn dir_count(&self) -> usize {
        self.dirs
    }

    fn insert(&mut self, entry: Entry) -> String {
        self.generation += 1;
        let generation = self.generation;
        let prefix = entry.prefix();

        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Slot {
                    generation,
                    entry: Some(entry),
                };
                index
            }
            None => {
                self.slots.push(Slot {
                    generation,
                    entry: Some(entry),
                });
                self.slots.len() - 1
            }
        };

        let token = format_token(prefix, index, generation);
        logging::log_handle_opened(&token);
        token
    }

    /// Returns the slot index of a live handle whose kind matches its prefix.
    fn resolve(&self, token: &[u8]) -> Option<usize> {
        let (prefix, index, generation) = parse_token(token)?;
        let slot = self.slots.get(index)?;
        if slot.generation != generation {
            return None;
        }
        match &slot.entry {
            Some(entry) if entry.prefix() == prefix => Some(index),
            _ => None,
        }
    }

    fn lookup(&mut self, token: &[u8]) -> Option<&mut Entry> {
        let index = self.resolve(token)?;
        self.slots[index].entry.as_mut()
    }

    fn take(&mut self, index: usize) -> Option<Entry> {
        let entry = self.slots.get_mut(index)?.entry.take()?;
        match entry {
            Entry::File(_) => self.files -= 1,
            Entry::Dir(_) => self.dirs -= 1,
        }
        self.free.push(index);
        Some(entry)
    }

    async fn close_entry(token: &[u8], entry: Entry) {
        let result = match entry {
            Entry::File(mut file) => file.close().await,
            Entry::Dir(mut dir) => dir.close().await,
        };
        logging::log_handle_closed(token, result.err().as_ref());
    }
}

fn format_token(prefix: char, index: usize, generation: u64) -> String {
    format!("{}{:x}.{:x}", prefix, index, generation)
}

fn parse_token(token: &[u8]) -> Option<(char, usize, u64)> {
    let text = std::str::from_utf8(token).ok()?;
    let mut chars = text.chars();
    let prefix = chars.next()?;
    if prefix != FILE_PREFIX && prefix != DIR_PREFIX {
        return None;
    }
    let (index, generation) = chars.as_str().split_once('.')?;
    let index = usize::from_str_radix(index, 16).ok()?;
    let generation = u64::from_str_radix(generation, 16).ok()?;

    // Only the canonical spelling names a handle
    if format_token(prefix, index, generation) != text {
        return None;
    }
    Some((prefix, index, generation))
}
