#![forbid(unsafe_code)]

//! Framed, versioned serialisation of command histories.
//!
//! A saved file is `START_BYTE`, one `PROTOCOL_VERSION` byte, a big-endian
//! `u32` command count, that many self-describing command records, and
//! `END_BYTE`. Readers verify both magic bytes and refuse any version other
//! than the one this build writes.
//!
//! Command records are tagged: a create carries its component type and its
//! requirement key/value pairs, a delete its requirement pairs, and a
//! composite-gate create its description plus a nested command sequence.
//! Strings are length-prefixed UTF-8. Changing any of this requires bumping
//! [`PROTOCOL_VERSION`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::command::{Command, ComponentType, EncodedParts};
use crate::error::PersistError;
use crate::logging::{debug, warn};
use crate::requirement::Requirements;

/// First byte of every saved file.
pub const START_BYTE: u8 = 10;
/// Last byte of every saved file.
pub const END_BYTE: u8 = 42;
/// The store protocol version this build reads and writes.
pub const PROTOCOL_VERSION: u8 = 1;
/// Extension of saved circuit files, without the dot.
pub const FILE_EXTENSION: &str = "scad";

const TAG_CREATE: u8 = 1;
const TAG_DELETE: u8 = 2;
const TAG_CREATE_GATE: u8 = 3;

/// Nested composite-gate scripts deeper than this are treated as corrupt.
const MAX_SCRIPT_DEPTH: u32 = 64;

/// The flat directory saved circuits live in. Created on demand.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// A workspace rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Workspace { root: root.into() }
    }

    /// The workspace directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the workspace directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Underlying filesystem failures.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    /// The path a flat filename resolves to.
    #[must_use]
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// The saved circuit files in the workspace, sorted by name. Creates
    /// the directory when absent, so a fresh install lists an empty set.
    ///
    /// # Errors
    ///
    /// Underlying filesystem failures.
    pub fn saved_files(&self) -> Result<Vec<String>, PersistError> {
        self.ensure_dir()?;
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push(name.to_string());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Write a command history to `filename` inside the workspace.
///
/// # Errors
///
/// Underlying filesystem failures.
pub fn save(
    workspace: &Workspace,
    filename: &str,
    commands: &[Command],
) -> Result<(), PersistError> {
    workspace.ensure_dir()?;
    let mut buf = Vec::new();
    buf.push(START_BYTE);
    buf.push(PROTOCOL_VERSION);
    write_u32(&mut buf, commands.len() as u32);
    for command in commands {
        encode_command(&mut buf, command);
    }
    buf.push(END_BYTE);

    let path = workspace.file_path(filename);
    fs::write(&path, buf)?;
    debug!(file = %path.display(), commands = commands.len(), "saved");
    Ok(())
}

/// Read a command history from `filename` inside the workspace. The
/// returned commands are pristine and executable against any editor.
///
/// # Errors
///
/// [`PersistError::FileNotFound`] when the file is absent,
/// [`PersistError::FileCorrupted`] for bad frame bytes or an undecodable
/// payload, [`PersistError::IncompatibleFile`] for a version mismatch.
pub fn load(workspace: &Workspace, filename: &str) -> Result<Vec<Command>, PersistError> {
    let path = workspace.file_path(filename);
    if !path.exists() {
        return Err(PersistError::FileNotFound(path));
    }
    let data = fs::read(&path)?;
    decode_file(&data, &path)
}

fn decode_file(data: &[u8], path: &Path) -> Result<Vec<Command>, PersistError> {
    let corrupt = || PersistError::FileCorrupted(path.to_path_buf());
    let mut reader = Reader::new(data);

    if reader.u8() != Some(START_BYTE) {
        return Err(corrupt());
    }
    let version = reader.u8().ok_or_else(corrupt)?;
    if version != PROTOCOL_VERSION {
        warn!(
            file = %path.display(),
            found = version,
            expected = PROTOCOL_VERSION,
            "refusing incompatible file"
        );
        return Err(PersistError::IncompatibleFile {
            path: path.to_path_buf(),
            found: version,
            expected: PROTOCOL_VERSION,
        });
    }

    let count = reader.u32().ok_or_else(corrupt)?;
    let mut commands = Vec::new();
    for _ in 0..count {
        commands.push(decode_command(&mut reader, 0).ok_or_else(corrupt)?);
    }
    if reader.u8() != Some(END_BYTE) {
        return Err(corrupt());
    }
    debug!(file = %path.display(), commands = commands.len(), "loaded");
    Ok(commands)
}

// ── Encoding ────────────────────────────────────────────────────────────

fn encode_command(buf: &mut Vec<u8>, command: &Command) {
    match command.encode_parts() {
        EncodedParts::Create(ty, reqs) => {
            buf.push(TAG_CREATE);
            buf.push(type_byte(ty));
            encode_reqs(buf, reqs);
        }
        EncodedParts::Delete(reqs) => {
            buf.push(TAG_DELETE);
            encode_reqs(buf, reqs);
        }
        EncodedParts::CreateGate(script, description) => {
            buf.push(TAG_CREATE_GATE);
            write_string(buf, description);
            write_u32(buf, script.len() as u32);
            for command in script {
                encode_command(buf, command);
            }
        }
    }
}

fn encode_reqs(buf: &mut Vec<u8>, reqs: &Requirements) {
    let filled: Vec<(&str, &str)> = reqs
        .iter()
        .filter_map(|slot| slot.text().map(|value| (slot.key(), value)))
        .collect();
    write_u32(buf, filled.len() as u32);
    for (key, value) in filled {
        write_string(buf, key);
        write_string(buf, value);
    }
}

fn type_byte(ty: ComponentType) -> u8 {
    match ty {
        ComponentType::InputPin => 1,
        ComponentType::OutputPin => 2,
        ComponentType::AndGate => 3,
        ComponentType::OrGate => 4,
        ComponentType::NotGate => 5,
        ComponentType::Branch => 6,
    }
}

fn type_from_byte(byte: u8) -> Option<ComponentType> {
    match byte {
        1 => Some(ComponentType::InputPin),
        2 => Some(ComponentType::OutputPin),
        3 => Some(ComponentType::AndGate),
        4 => Some(ComponentType::OrGate),
        5 => Some(ComponentType::NotGate),
        6 => Some(ComponentType::Branch),
        _ => None,
    }
}

fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn write_string(buf: &mut Vec<u8>, value: &str) {
    write_u32(buf, value.len() as u32);
    buf.extend_from_slice(value.as_bytes());
}

// ── Decoding ────────────────────────────────────────────────────────────

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    fn u8(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn u32(&mut self) -> Option<u32> {
        let bytes = self.take(4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn string(&mut self) -> Option<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).ok()
    }
}

fn decode_command(reader: &mut Reader<'_>, depth: u32) -> Option<Command> {
    if depth > MAX_SCRIPT_DEPTH {
        return None;
    }
    match reader.u8()? {
        TAG_CREATE => {
            let ty = type_from_byte(reader.u8()?)?;
            let mut command = Command::create(ty);
            decode_reqs(reader, &mut command)?;
            Some(command)
        }
        TAG_DELETE => {
            let mut command = Command::delete();
            decode_reqs(reader, &mut command)?;
            Some(command)
        }
        TAG_CREATE_GATE => {
            let description = reader.string()?;
            let count = reader.u32()?;
            let mut script = Vec::new();
            for _ in 0..count {
                script.push(decode_command(reader, depth + 1)?);
            }
            Some(Command::create_gate(script, description))
        }
        _ => None,
    }
}

fn decode_reqs(reader: &mut Reader<'_>, command: &mut Command) -> Option<()> {
    let count = reader.u32()?;
    for _ in 0..count {
        let key = reader.string()?;
        let value = reader.string()?;
        command.specify(&key, value).ok()?;
    }
    Some(())
}
