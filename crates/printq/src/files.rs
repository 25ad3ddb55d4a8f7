//! Directory listing for the file pane.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Synthetic first row that stages or unstages every printable file.
    ToggleAll,
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size_bytes: i64,
    pub printable: bool,
    /// Printable and matched by the current pattern.
    pub matched: bool,
}

#[derive(Debug)]
pub struct FileBrowser {
    dir: PathBuf,
    entries: Vec<FileEntry>,
    error: Option<String>,
    extensions: Vec<String>,
    pattern: String,
    matcher: Option<GlobSet>,
}

impl FileBrowser {
    pub fn new(dir: PathBuf, extensions: Vec<String>) -> Self {
        let mut browser = Self {
            dir,
            entries: Vec::new(),
            error: None,
            extensions,
            pattern: String::new(),
            matcher: None,
        };
        browser.reload();
        browser
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.entries.get(index)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_printable(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| *allowed == ext))
    }

    pub fn printable_files(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter(|entry| entry.printable)
    }

    pub fn matched_files(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter(|entry| entry.matched)
    }

    /// Whitespace-separated globs matched against file names. An invalid
    /// pattern matches nothing and is reported inline.
    pub fn set_pattern(&mut self, pattern: &str) {
        self.pattern = pattern.to_string();
        self.matcher = None;
        if !pattern.trim().is_empty() {
            match compile_patterns(pattern) {
                Ok(set) => self.matcher = Some(set),
                Err(err) => {
                    debug!(pattern, "invalid glob: {err}");
                    self.error = Some(format!("Invalid pattern: {err}"));
                    self.apply_matches();
                    return;
                }
            }
        }
        if self
            .error
            .as_deref()
            .is_some_and(|err| err.starts_with("Invalid pattern"))
        {
            self.error = None;
        }
        self.apply_matches();
    }

    pub fn change_dir(&mut self, dir: PathBuf) {
        self.dir = dir;
        self.reload();
    }

    /// Moves to the parent directory. Returns false at the filesystem root.
    pub fn go_parent(&mut self) -> bool {
        let Some(parent) = self.dir.parent().map(Path::to_path_buf) else {
            return false;
        };
        self.change_dir(parent);
        true
    }

    pub fn reload(&mut self) {
        self.error = None;
        self.entries.clear();
        let read = match fs::read_dir(&self.dir) {
            Ok(read) => read,
            Err(err) => {
                self.error = Some(format!("Cannot read directory: {err}"));
                return;
            }
        };

        let mut listed = Vec::new();
        for entry in read.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(_) => continue,
            };
            let is_dir = metadata.is_dir();
            let printable = !is_dir && self.is_printable(&path);
            listed.push(FileEntry {
                name,
                path,
                kind: if is_dir {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                size_bytes: i64::try_from(metadata.len()).unwrap_or(i64::MAX),
                printable,
                matched: false,
            });
        }
        listed.sort_by(|a, b| {
            let a_dir = a.kind == EntryKind::Directory;
            let b_dir = b.kind == EntryKind::Directory;
            b_dir
                .cmp(&a_dir)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then_with(|| a.name.cmp(&b.name))
        });

        let printable = listed.iter().filter(|entry| entry.printable).count();
        if printable > 0 {
            self.entries.push(FileEntry {
                name: format!("[Select/Deselect All {printable} Printable Files]"),
                path: self.dir.clone(),
                kind: EntryKind::ToggleAll,
                size_bytes: 0,
                printable: false,
                matched: false,
            });
        }
        self.entries.extend(listed);
        self.apply_matches();
    }

    fn apply_matches(&mut self) {
        for entry in &mut self.entries {
            entry.matched = entry.printable
                && self
                    .matcher
                    .as_ref()
                    .is_some_and(|set| set.is_match(&entry.name));
        }
    }
}

fn compile_patterns(pattern: &str) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for part in pattern.split_whitespace() {
        builder.add(Glob::new(part)?);
    }
    builder.build()
}

/// Splits a command-line pattern such as `~/docs/*.pdf` into the directory to
/// browse and the file-name glob. Patterns without a usable directory keep
/// `fallback`.
pub fn split_pattern(pattern: &str, fallback: &Path, home: &Path) -> (PathBuf, String) {
    let expanded = match pattern.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(pattern),
    };
    match (expanded.parent(), expanded.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            let dir = if parent.is_absolute() {
                parent.to_path_buf()
            } else {
                fallback.join(parent)
            };
            if dir.is_dir() {
                return (dir, name.to_string_lossy().into_owned());
            }
            (fallback.to_path_buf(), pattern.to_string())
        }
        _ => (fallback.to_path_buf(), pattern.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extensions() -> Vec<String> {
        vec!["pdf".to_string(), "txt".to_string()]
    }

    fn populated() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.pdf", "A.txt", "notes.md", ".hidden.pdf"] {
            fs::write(dir.path().join(name), "x").expect("write file");
        }
        fs::create_dir(dir.path().join("zeta")).expect("mkdir");
        fs::create_dir(dir.path().join("alpha")).expect("mkdir");
        dir
    }

    #[test]
    fn listing_puts_toggle_then_dirs_then_files() {
        let dir = populated();
        let browser = FileBrowser::new(dir.path().to_path_buf(), extensions());
        let names: Vec<&str> = browser.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "[Select/Deselect All 2 Printable Files]",
                "alpha",
                "zeta",
                "A.txt",
                "b.pdf",
                "notes.md",
            ]
        );
        assert_eq!(browser.printable_files().count(), 2);
        assert!(browser.error().is_none());
    }

    #[test]
    fn no_toggle_row_without_printable_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("readme.md"), "x").expect("write");
        let browser = FileBrowser::new(dir.path().to_path_buf(), extensions());
        assert_eq!(browser.len(), 1);
        assert_eq!(browser.get(0).map(|e| e.kind), Some(EntryKind::File));
    }

    #[test]
    fn pattern_highlights_printable_matches_only() {
        let dir = populated();
        let mut browser = FileBrowser::new(dir.path().to_path_buf(), extensions());
        browser.set_pattern("*.pdf *.md");
        let matched: Vec<&str> = browser.matched_files().map(|e| e.name.as_str()).collect();
        assert_eq!(matched, vec!["b.pdf"]);

        browser.set_pattern("[");
        assert_eq!(browser.matched_files().count(), 0);
        assert!(browser.error().is_some());
        browser.set_pattern("");
        assert!(browser.error().is_none());
    }

    #[test]
    fn unreadable_directory_reports_inline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let browser = FileBrowser::new(dir.path().join("missing"), extensions());
        assert!(browser.entries().is_empty());
        assert!(browser.error().expect("error").starts_with("Cannot read directory"));
    }

    #[test]
    fn navigation_between_directories() {
        let dir = populated();
        let mut browser = FileBrowser::new(dir.path().join("alpha"), extensions());
        assert!(browser.entries().is_empty());
        assert!(browser.go_parent());
        assert_eq!(browser.dir(), dir.path());
    }

    #[test]
    fn split_pattern_extracts_directory() {
        let dir = populated();
        let (target, glob) = split_pattern("alpha/*.pdf", dir.path(), Path::new("/home/none"));
        assert_eq!(target, dir.path().join("alpha"));
        assert_eq!(glob, "*.pdf");

        let (target, glob) = split_pattern("*.pdf", dir.path(), Path::new("/home/none"));
        assert_eq!(target, dir.path());
        assert_eq!(glob, "*.pdf");

        let (_, glob) = split_pattern("missing/*.pdf", dir.path(), Path::new("/home/none"));
        assert_eq!(glob, "missing/*.pdf");
    }
}
