//! Write-temp-then-rename file replacement.

use std::io::Write;
use std::path::Path;

/// Replace `path` with `bytes` atomically.
///
/// The temp file is created in the destination directory so the final
/// rename never crosses a filesystem boundary. The file is fsynced
/// before the rename, so after a crash either the old or the new
/// version is fully present; never a truncated mix.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
