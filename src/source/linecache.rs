//! Line-range reads from source files with cached line offsets.

use crate::io::{IOLimits, SafeReader};
use crate::source::SourceError;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

/// A mapped source file and the offset of each line start.
#[derive(Debug)]
struct SourceFile {
    text: Bytes,
    /// Start of every line, plus the end of the file. A trailing newline
    /// does not start another line.
    offsets: Vec<usize>,
}

impl SourceFile {
    fn load(path: &Path, limits: &IOLimits) -> Result<Self, SourceError> {
        let text = SafeReader::open(path, limits)
            .map_err(|e| SourceError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .into_bytes();
        let mut offsets = vec![0];
        offsets.extend(memchr::memchr_iter(b'\n', &text).map(|nl| nl + 1));
        if offsets.last() != Some(&text.len()) {
            offsets.push(text.len());
        }
        debug!(path = %path.display(), lines = offsets.len() - 1, "Indexed source file");
        Ok(Self { text, offsets })
    }
}

type Cell = Arc<OnceLock<Result<Arc<SourceFile>, SourceError>>>;

/// Reads ranges of lines, indexing each file once.
#[derive(Debug, Default)]
pub struct LineCache {
    limits: IOLimits,
    files: Mutex<HashMap<PathBuf, Cell>>,
}

impl LineCache {
    pub fn new(limits: IOLimits) -> Self {
        Self {
            limits,
            files: Mutex::new(HashMap::new()),
        }
    }

    fn file(&self, path: &Path) -> Result<Arc<SourceFile>, SourceError> {
        let cell = {
            let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
            files.entry(path.to_path_buf()).or_default().clone()
        };
        cell.get_or_init(|| SourceFile::load(path, &self.limits).map(Arc::new))
            .clone()
    }

    /// Returns `n_lines` lines starting at 1-based `line_start`, including
    /// their newlines. Lines before 1 and past the end are dropped.
    pub fn get(&self, path: &Path, line_start: i64, n_lines: i64) -> Result<Bytes, SourceError> {
        let (mut line_start, mut n_lines) = (line_start, n_lines);
        if line_start < 1 {
            n_lines += line_start - 1;
            line_start = 1;
        }
        if n_lines <= 0 {
            return Ok(Bytes::new());
        }

        let file = self.file(path)?;
        let offsets = &file.offsets;
        let first = (line_start - 1) as usize;
        if first >= offsets.len() {
            return Ok(Bytes::new());
        }
        let mut n = n_lines as usize;
        if first + n >= offsets.len() {
            n = offsets.len() - first - 1;
        }
        Ok(file.text.slice(offsets[first]..offsets[first + n]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
        path
    }

    #[test]
    fn line_ranges() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "file", "line1\nline2\nline3\n");
        let no_nl = write(&dir, "noNL", "line1\nline2\nline3");
        let big = write(&dir, "big", &format!("{}\nline2\n", "x".repeat(10000)));
        let lc = LineCache::default();
        let get = |p: &PathBuf, start, n| String::from_utf8(lc.get(p, start, n).unwrap().to_vec()).unwrap();

        assert_eq!(get(&file, 1, 3), "line1\nline2\nline3\n");
        assert_eq!(get(&file, 1, 2), "line1\nline2\n");
        assert_eq!(get(&file, 3, 1), "line3\n");

        assert_eq!(get(&file, 1, 0), "");
        assert_eq!(get(&file, -1, 1), "");
        assert_eq!(get(&file, 0, 2), "line1\n");
        assert_eq!(get(&file, 4, 1), "");
        assert_eq!(get(&file, 5, 1), "");
        assert_eq!(get(&file, 2, 100), "line2\nline3\n");

        assert_eq!(get(&no_nl, 1, 3), "line1\nline2\nline3");
        assert_eq!(get(&no_nl, 3, 1), "line3");
        assert_eq!(get(&no_nl, 4, 1), "");
        assert_eq!(get(&no_nl, 5, 1), "");

        assert_eq!(get(&big, 2, 1), "line2\n");
    }

    #[test]
    fn errors_are_cached() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.go");
        let lc = LineCache::default();
        assert!(matches!(lc.get(&missing, 1, 1), Err(SourceError::Read { .. })));

        // Creating the file afterwards does not clear the cached failure.
        write(&dir, "missing.go", "package main\n");
        assert!(lc.get(&missing, 1, 1).is_err());
    }

    #[test]
    fn empty_file() {
        let dir = TempDir::new().unwrap();
        let empty = write(&dir, "empty", "");
        let lc = LineCache::default();
        assert!(lc.get(&empty, 1, 5).unwrap().is_empty());
    }
}
