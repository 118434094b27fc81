// crashlog-sleuth - platform/fs.rs
//
// Filesystem helpers shared by analyzers that read arbitrary on-disk text
// (INI files, load order lists) where the encoding isn't guaranteed.

use std::io;
use std::path::Path;

/// Read the full content of a file as a string.
///
/// For files with invalid UTF-8, uses lossy conversion.
pub fn read_file_lossy(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    // Try zero-copy UTF-8 first (most log/ini files are valid UTF-8),
    // falling back to lossy conversion only when genuinely invalid bytes
    // are found. This avoids the unconditional buffer copy that
    // from_utf8_lossy().into_owned() performs even on valid input.
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}
