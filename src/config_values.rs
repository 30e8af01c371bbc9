use std::fmt;

use crate::path::{SourceDir, SourceFile};
use crate::substitution::SubstitutionType;

/// A library to link: a file in the tree, or a name for the linker to search.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum LibFile {
    Path(SourceFile),
    Name(String),
}

impl LibFile {
    /// Strings containing a slash are paths, resolved against `dir`;
    /// everything else is a bare library name.
    pub fn parse(value: &str, dir: &SourceDir) -> Self {
        if value.contains('/') {
            LibFile::Path(dir.resolve_file(value))
        } else {
            LibFile::Name(value.into())
        }
    }

    pub fn source_file(&self) -> Option<&SourceFile> {
        match self {
            LibFile::Path(file) => Some(file),
            LibFile::Name(_) => None,
        }
    }
}

impl fmt::Debug for LibFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibFile::Path(file) => write!(f, "LibFile({file})"),
            LibFile::Name(name) => write!(f, "LibFile(-l{name})"),
        }
    }
}

/// Compiler and linker settings carried by a target or one of its configs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigValues {
    pub defines: Vec<String>,
    pub include_dirs: Vec<SourceDir>,
    pub asmflags: Vec<String>,
    pub cflags: Vec<String>,
    pub cflags_c: Vec<String>,
    pub cflags_cc: Vec<String>,
    pub cppflags: Vec<String>,
    pub cppflags_c: Vec<String>,
    pub cppflags_cc: Vec<String>,
    pub ldflags: Vec<String>,
    pub libs: Vec<LibFile>,
    pub lib_dirs: Vec<SourceDir>,
    /// The header as spelled in `#include`, e.g. `build/precompile.h`.
    pub precompiled_header: Option<String>,
    pub precompiled_source: Option<SourceFile>,
}

impl ConfigValues {
    pub fn has_precompiled_headers(&self) -> bool {
        self.precompiled_header.is_some() && self.precompiled_source.is_some()
    }

    /// The flag list a flags variable is built from; empty for variables
    /// that aren't plain flag lists.
    pub fn flags(&self, ty: SubstitutionType) -> &[String] {
        match ty {
            SubstitutionType::Asmflags => &self.asmflags,
            SubstitutionType::Cflags => &self.cflags,
            SubstitutionType::CflagsC => &self.cflags_c,
            SubstitutionType::CflagsCc => &self.cflags_cc,
            SubstitutionType::Cppflags => &self.cppflags,
            SubstitutionType::CppflagsC => &self.cppflags_c,
            SubstitutionType::CppflagsCc => &self.cppflags_cc,
            SubstitutionType::Ldflags => &self.ldflags,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lib_file_parse() {
        let dir = SourceDir::new("//foo/");
        assert_eq!(
            LibFile::parse("third_party/libz.a", &dir),
            LibFile::Path(SourceFile::new("//foo/third_party/libz.a"))
        );
        assert_eq!(
            LibFile::parse("//base/libbase.a", &dir),
            LibFile::Path(SourceFile::new("//base/libbase.a"))
        );
        assert_eq!(LibFile::parse("pthread", &dir), LibFile::Name("pthread".into()));
    }

    #[test]
    fn test_flags_by_variable() {
        let values = ConfigValues {
            cflags_cc: vec!["-fno-rtti".into()],
            ldflags: vec!["-pie".into()],
            ..ConfigValues::default()
        };
        assert_eq!(values.flags(SubstitutionType::CflagsCc), ["-fno-rtti"]);
        assert_eq!(values.flags(SubstitutionType::Ldflags), ["-pie"]);
        assert!(values.flags(SubstitutionType::Defines).is_empty());
    }
}
