use std::fmt;

use crate::path::SourceDir;

/// A target or toolchain name: a source directory plus a short name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    dir: SourceDir,
    name: String,
}

impl Label {
    pub fn new(dir: SourceDir, name: impl Into<String>) -> Self {
        Self {
            dir,
            name: name.into(),
        }
    }

    /// Parses `//dir:name`, or `//dir` as shorthand for `//dir:dir`.
    pub fn parse(s: &str) -> Option<Self> {
        if !s.starts_with("//") {
            return None;
        }
        let (dir, name) = match s.rsplit_once(':') {
            Some((dir, name)) => (dir, name),
            None => {
                let name = s.trim_end_matches('/').rsplit('/').next()?;
                (s, name)
            }
        };
        if name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(SourceDir::new(dir), name))
    }

    pub fn dir(&self) -> &SourceDir {
        &self.dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = self.dir.value();
        let dir = if dir.len() > 2 {
            dir.trim_end_matches('/')
        } else {
            dir
        };
        write!(f, "{}:{}", dir, self.name)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({self})")
    }
}
