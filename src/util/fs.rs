//! File replacement through a temporary sibling.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use super::{Error, Result};

/// Write a file through `fill`, then rename it over `path`.
///
/// The data lands in a temporary file next to `path` first. If `fill` or
/// any write fails, `path` is left as it was. An existing file keeps its
/// permissions.
pub fn replace_file<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir).map_err(|e| Error::from_open(e, dir))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        fill(&mut writer)?;
        writer.flush()?;
    }
    if let Ok(meta) = fs::metadata(path) {
        temp.as_file().set_permissions(meta.permissions())?;
    }
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
