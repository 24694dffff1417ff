use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, thiserror::Error)]
pub enum FileToolError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendOutcome {
    pub changed_file: String,
    pub appended_text: String,
}

fn ensure_parent(path: &Path) -> Result<(), FileToolError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| FileToolError::CreateDir {
            path: parent.display().to_string(),
            source,
        })?;
    }
    Ok(())
}

/// Appends `text` as a new line, creating the file and its parents when missing.
///
/// When the existing file is non-empty and lacks a trailing newline, exactly one
/// `\n` is written first so the appended text always starts on its own line.
pub fn append_text(path: &Path, text: &str) -> Result<AppendOutcome, FileToolError> {
    ensure_parent(path)?;

    let prefix = if path.exists() {
        let current = fs::read_to_string(path).map_err(|source| FileToolError::Read {
            path: path.display().to_string(),
            source,
        })?;
        if current.is_empty() || current.ends_with('\n') {
            ""
        } else {
            "\n"
        }
    } else {
        ""
    };

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| FileToolError::Write {
            path: path.display().to_string(),
            source,
        })?;
    writeln!(file, "{prefix}{text}").map_err(|source| FileToolError::Write {
        path: path.display().to_string(),
        source,
    })?;

    Ok(AppendOutcome {
        changed_file: path.display().to_string(),
        appended_text: text.to_string(),
    })
}

/// Replaces `path` with `content` via a staged sibling file and a rename, so
/// readers see either the old report or the new one.
pub fn write_text(path: &Path, content: &str) -> Result<(), FileToolError> {
    ensure_parent(path)?;
    let write_error = |source| FileToolError::Write {
        path: path.display().to_string(),
        source,
    };
    let staged = staging_path(path);
    if let Err(source) = write_synced(&staged, content.as_bytes()) {
        let _ = fs::remove_file(&staged);
        return Err(write_error(source));
    }
    if let Err(source) = fs::rename(&staged, path) {
        let _ = fs::remove_file(&staged);
        return Err(write_error(source));
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0);
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    path.with_file_name(format!(".{name}.tmp-{}-{stamp}", std::process::id()))
}

fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)?;
    file.write_all(content)?;
    file.sync_all()
}
