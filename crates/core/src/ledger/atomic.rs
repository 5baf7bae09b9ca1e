//! Crash-safe whole-file replacement.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Replace `path` with `bytes` so readers only ever observe the old or the
/// new contents.
///
/// The data goes to a fresh sibling temp file, is synced, then renamed over
/// the destination; the parent directory is synced afterwards so the rename
/// itself survives a crash. The destination is never opened for writing.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let tmp_path = temp_path_for(path, &parent);
    let result = write_synced(&tmp_path, bytes).and_then(|()| fs::rename(&tmp_path, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    if let Ok(dir) = File::open(&parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}

fn temp_path_for(path: &Path, parent: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("ledger");
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    parent.join(format!(".{name}.tmp.{}.{seq}", std::process::id()))
}

fn write_synced(tmp_path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut temp = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(tmp_path)?;
    temp.write_all(bytes)?;
    temp.sync_all()
}
