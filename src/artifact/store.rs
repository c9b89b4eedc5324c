use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ForgeError;

/// Written into every JSON artifact so readers can detect format changes.
pub const SCHEMA_VERSION: u32 = 1;

/// A text file read from disk, identified by its file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Hex SHA-1 of some bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Parse a required JSON input. Missing files and malformed JSON are both errors.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ForgeError> {
    let content = std::fs::read_to_string(path).map_err(|e| ForgeError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| ForgeError::json(format!("parsing {}", path.display()), e))
}

/// Replace `path` wholesale. Writes a sibling temp file first, then renames it.
pub fn write_json_replace<T: Serialize>(path: &Path, value: &T) -> Result<(), ForgeError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ForgeError::json(format!("serializing {}", path.display()), e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ForgeError::io(parent, e))?;
    }

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json.as_bytes()).map_err(|e| ForgeError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| ForgeError::io(path, e))?;

    debug!(path = %path.display(), bytes = json.len(), "replaced artifact");
    Ok(())
}

/// Write `<stem>.json` into `dir` without ever touching an existing file.
///
/// On a name clash the stem gets a `-1`, `-2`, ... suffix.
pub fn write_json_new<T: Serialize>(dir: &Path, stem: &str, value: &T) -> Result<PathBuf, ForgeError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ForgeError::json(format!("serializing {}", stem), e))?;

    std::fs::create_dir_all(dir).map_err(|e| ForgeError::io(dir, e))?;

    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{}.json", stem)
        } else {
            format!("{}-{}.json", stem, attempt)
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(json.as_bytes())
                    .map_err(|e| ForgeError::io(&path, e))?;
                debug!(path = %path.display(), "wrote new artifact");
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(ForgeError::io(&path, e)),
        }
    }
}

/// Write a text artifact, replacing any previous version.
pub fn write_text(path: &Path, content: &str) -> Result<(), ForgeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ForgeError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| ForgeError::io(path, e))
}

/// Write a text artifact, first copying a different previous version aside.
///
/// The copy is `<name>.bak.<utc>` next to the target, created with the same
/// never-overwrite rule as [`write_json_new`]. Identical content is left
/// untouched. Returns the backup path when one was made.
pub fn write_text_with_backup(path: &Path, content: &str) -> Result<Option<PathBuf>, ForgeError> {
    let current = match std::fs::read_to_string(path) {
        Ok(current) => current,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            write_text(path, content)?;
            return Ok(None);
        }
        Err(e) => return Err(ForgeError::io(path, e)),
    };
    if current == content {
        debug!(path = %path.display(), "unchanged, not rewritten");
        return Ok(None);
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let dir = path.parent().unwrap_or(Path::new(""));

    let mut attempt = 0u32;
    let backup = loop {
        let candidate = if attempt == 0 {
            dir.join(format!("{}.bak.{}", name, stamp))
        } else {
            dir.join(format!("{}.bak.{}-{}", name, stamp, attempt))
        };
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut file) => {
                file.write_all(current.as_bytes())
                    .map_err(|e| ForgeError::io(&candidate, e))?;
                break candidate;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(ForgeError::io(&candidate, e)),
        }
    };

    write_text(path, content)?;
    info!(path = %path.display(), backup = %backup.display(), "replaced file, previous version kept");
    Ok(Some(backup))
}

/// Read every file in `dir` ending in `.<extension>`, sorted by name.
///
/// A missing directory is not fatal: it is logged and yields no files.
pub fn read_dir_sources(dir: &Path, extension: &str) -> Result<Vec<SourceFile>, ForgeError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "directory not found, nothing to read");
            return Ok(Vec::new());
        }
        Err(e) => return Err(ForgeError::io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ForgeError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != extension) {
            continue;
        }
        let content = std::fs::read_to_string(&path).map_err(|e| ForgeError::io(&path, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        files.push(SourceFile { name, content });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}
