use crate::manifest::value_span;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Replace the value of the first `key=...` assignment in `contents`.
///
/// Quoting, indentation, trailing comments and line endings are preserved.
/// Returns `None` if no line assigns `key`; `contents` is never partially
/// rewritten.
pub fn rewrite_field(contents: &str, key: &str, value: &str) -> Option<String> {
    let mut out = String::with_capacity(contents.len() + value.len());
    let mut replaced = false;

    for line in contents.split_inclusive('\n') {
        if !replaced {
            if let Some(span) = value_span(line, key) {
                out.push_str(&line[..span.start]);
                out.push_str(value);
                out.push_str(&line[span.end..]);
                replaced = true;
                continue;
            }
        }
        out.push_str(line);
    }

    replaced.then_some(out)
}

/// Write `content` to `dest` via a temp file in the same directory, so
/// readers never observe a half-written file.
pub fn write_atomic(dest: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    let dir = dest.parent().unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(dest) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(dest).map_err(|e| e.error)?;
    // Fsync parent directory to ensure rename durability on power loss.
    if let Ok(f) = fs::File::open(dir) {
        let _ = f.sync_all();
    }
    Ok(())
}
