//! Root-relative path values.
//!
//! Paths inside the source tree start with `//`; anything starting with a
//! single `/` is a system-absolute path. Output files are relative to the
//! build directory and never carry a leading slash.

use std::fmt;

const SEP: char = '/';

/// A directory in the source tree, always ending with a slash (`//foo/`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceDir(String);

/// A file in the source tree (`//foo/bar.cc`) or an absolute system file.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceFile(String);

/// A file relative to the build directory (`obj/foo/bar.o`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct OutputFile(String);

impl SourceDir {
    pub fn new(path: impl AsRef<str>) -> Self {
        let mut path = path.as_ref().replace('\\', "/");
        if !path.ends_with(SEP) {
            path.push(SEP);
        }
        Self(path)
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn is_source_absolute(&self) -> bool {
        self.0.starts_with("//")
    }

    pub fn is_system_absolute(&self) -> bool {
        !self.is_source_absolute() && self.0.starts_with(SEP)
    }

    /// The directory without its `//` prefix or trailing slash (`foo/bar`).
    pub fn root_relative(&self) -> &str {
        let path = self.0.strip_prefix("//").unwrap_or(&self.0);
        path.trim_end_matches(SEP)
    }

    /// Resolves `name` against this directory, keeping `//` and `/` roots.
    pub fn resolve_file(&self, name: &str) -> SourceFile {
        if name.starts_with(SEP) {
            return SourceFile::new(name);
        }
        SourceFile::new(format!("{}{}", self.0, name))
    }

    pub fn resolve_dir(&self, name: &str) -> SourceDir {
        if name.starts_with(SEP) {
            return SourceDir::new(name);
        }
        SourceDir::new(format!("{}{}", self.0, name))
    }
}

impl SourceFile {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(path.as_ref().replace('\\', "/"))
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn is_system_absolute(&self) -> bool {
        !self.0.starts_with("//") && self.0.starts_with(SEP)
    }

    /// Everything after the last slash (`bar.cc`).
    pub fn file_part(&self) -> &str {
        match self.0.rfind(SEP) {
            Some(i) => &self.0[i + 1..],
            None => &self.0,
        }
    }

    /// The file part without its extension (`bar`).
    pub fn name_part(&self) -> &str {
        let file = self.file_part();
        match file.rfind('.') {
            Some(i) => &file[..i],
            None => file,
        }
    }

    /// The text after the last dot of the file part, if any.
    pub fn extension(&self) -> Option<&str> {
        let file = self.file_part();
        file.rfind('.').map(|i| &file[i + 1..])
    }

    pub fn dir(&self) -> SourceDir {
        match self.0.rfind(SEP) {
            Some(i) => SourceDir(self.0[..=i].into()),
            None => SourceDir::new("//"),
        }
    }
}

impl OutputFile {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(path.as_ref().replace('\\', "/"))
    }

    /// A source file expressed relative to the build directory.
    pub fn from_source_file(build_dir: &SourceDir, file: &SourceFile) -> Self {
        Self(rebase(file.value(), build_dir))
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn push_str(&mut self, s: &str) {
        self.0.push_str(s);
    }

    /// Byte offset just past the last dot of the file part.
    pub fn extension_offset(&self) -> Option<usize> {
        let search_start = self.0.rfind(SEP).map(|i| i + 1).unwrap_or(0);
        self.0[search_start..]
            .rfind('.')
            .map(|i| search_start + i + 1)
    }

    /// Replaces the extension, dot included, with `suffix`.
    pub fn replace_extension(&self, suffix: &str) -> Self {
        match self.extension_offset() {
            Some(offset) => Self(format!("{}{}", &self.0[..offset - 1], suffix)),
            None => Self(format!("{}{}", self.0, suffix)),
        }
    }
}

/// Rebases a `//`-rooted path so it is relative to `build_dir`.
///
/// System-absolute paths are returned unchanged. A trailing slash on `path`
/// is kept; callers strip it for directories.
pub fn rebase(path: &str, build_dir: &SourceDir) -> String {
    let Some(rel) = path.strip_prefix("//") else {
        return path.into();
    };
    let Some(build) = build_dir.value().strip_prefix("//") else {
        // A build dir outside the source root: the only stable spelling is
        // the source-absolute one.
        return path.into();
    };

    let build_parts: Vec<&str> = build.split(SEP).filter(|s| !s.is_empty()).collect();
    let mut rest = rel;
    let mut common = 0;
    for part in &build_parts {
        match rest.strip_prefix(part) {
            Some(tail) if tail.starts_with(SEP) => {
                rest = &tail[1..];
                common += 1;
            }
            Some("") => {
                rest = "";
                common += 1;
            }
            _ => break,
        }
    }

    let mut result = "../".repeat(build_parts.len() - common);
    result.push_str(rest);
    result
}

/// Rebases a directory and drops its trailing slash; `.` when it is the
/// build dir itself.
pub fn rebase_dir(dir: &SourceDir, build_dir: &SourceDir) -> String {
    let rebased = rebase(dir.value(), build_dir);
    let trimmed = rebased.trim_end_matches(SEP);
    if trimmed.is_empty() {
        if dir.is_system_absolute() {
            return "/".into();
        }
        return ".".into();
    }
    trimmed.into()
}

macro_rules! path_fmt {
    ($ty:ident) => {
        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self.0)
            }
        }
    };
}

path_fmt!(SourceDir);
path_fmt!(SourceFile);
path_fmt!(OutputFile);
