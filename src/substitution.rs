//! `{{placeholder}}` patterns used by tool commands and output templates.

use std::fmt;

use crate::error::{Result, WriterError};
use crate::path::{self, SourceFile};
use crate::settings::Settings;
use crate::target::Target;
use crate::tool::Tool;

macro_rules! substitution_types {
    ($($variant:ident => $name:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum SubstitutionType {
            $($variant,)*
        }

        impl SubstitutionType {
            pub const ALL: &'static [SubstitutionType] = &[$(SubstitutionType::$variant,)*];
            pub const COUNT: usize = Self::ALL.len();

            /// The name used both inside `{{...}}` and as the Ninja variable.
            pub fn ninja_name(self) -> &'static str {
                match self {
                    $(SubstitutionType::$variant => $name,)*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(SubstitutionType::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

// Declaration order is the order per-source and shared variables are written.
substitution_types! {
    Output => "output",
    Label => "label",
    LabelName => "label_name",
    RootGenDir => "root_gen_dir",
    RootOutDir => "root_out_dir",
    TargetGenDir => "target_gen_dir",
    TargetOutDir => "target_out_dir",
    TargetOutputName => "target_output_name",
    Source => "source",
    SourceNamePart => "source_name_part",
    SourceFilePart => "source_file_part",
    SourceDir => "source_dir",
    SourceRootRelativeDir => "source_root_relative_dir",
    SourceGenDir => "source_gen_dir",
    SourceOutDir => "source_out_dir",
    Asmflags => "asmflags",
    Cflags => "cflags",
    CflagsC => "cflags_c",
    CflagsCc => "cflags_cc",
    Cppflags => "cppflags",
    CppflagsC => "cppflags_c",
    CppflagsCc => "cppflags_cc",
    Defines => "defines",
    IncludeDirs => "include_dirs",
    LinkerInputs => "inputs",
    Ldflags => "ldflags",
    Libs => "libs",
    OutputExtension => "output_extension",
    Solibs => "solibs",
}

impl SubstitutionType {
    fn index(self) -> usize {
        self as usize
    }

    /// Values that depend only on the target being written.
    pub fn is_target_type(self) -> bool {
        matches!(
            self,
            SubstitutionType::Label
                | SubstitutionType::LabelName
                | SubstitutionType::RootGenDir
                | SubstitutionType::RootOutDir
                | SubstitutionType::TargetGenDir
                | SubstitutionType::TargetOutDir
                | SubstitutionType::TargetOutputName
        )
    }

    /// Values that depend on the source file being compiled.
    pub fn is_source_type(self) -> bool {
        matches!(
            self,
            SubstitutionType::Source
                | SubstitutionType::SourceNamePart
                | SubstitutionType::SourceFilePart
                | SubstitutionType::SourceDir
                | SubstitutionType::SourceRootRelativeDir
                | SubstitutionType::SourceGenDir
                | SubstitutionType::SourceOutDir
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstitutionBits {
    used: [bool; SubstitutionType::COUNT],
}

impl Default for SubstitutionBits {
    fn default() -> Self {
        Self {
            used: [false; SubstitutionType::COUNT],
        }
    }
}

impl SubstitutionBits {
    pub fn set(&mut self, ty: SubstitutionType) {
        self.used[ty.index()] = true;
    }

    pub fn used(&self, ty: SubstitutionType) -> bool {
        self.used[ty.index()]
    }

    pub fn merge(&mut self, other: &SubstitutionBits) {
        for (mine, theirs) in self.used.iter_mut().zip(other.used.iter()) {
            *mine |= *theirs;
        }
    }

    /// The used types, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = SubstitutionType> + '_ {
        SubstitutionType::ALL
            .iter()
            .copied()
            .filter(|ty| self.used(*ty))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Range {
    Literal(String),
    Substitution(SubstitutionType),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubstitutionPattern {
    ranges: Vec<Range>,
}

impl SubstitutionPattern {
    pub fn parse(s: &str) -> Result<Self> {
        let mut ranges = Vec::new();
        let mut rest = s;
        while let Some(start) = rest.find("{{") {
            if start > 0 {
                ranges.push(Range::Literal(rest[..start].into()));
            }
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                return Err(WriterError::Pattern(
                    format!("unterminated {{{{ in \"{s}\"").into(),
                ));
            };
            let name = &after[..end];
            let ty = SubstitutionType::from_name(name).ok_or_else(|| {
                WriterError::Pattern(format!("unknown substitution {{{{{name}}}}} in \"{s}\"").into())
            })?;
            ranges.push(Range::Substitution(ty));
            rest = &after[end + 2..];
        }
        if !rest.is_empty() {
            ranges.push(Range::Literal(rest.into()));
        }
        Ok(Self { ranges })
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn required_types(&self) -> impl Iterator<Item = SubstitutionType> + '_ {
        self.ranges.iter().filter_map(|r| match r {
            Range::Substitution(ty) => Some(*ty),
            Range::Literal(_) => None,
        })
    }

    pub fn fill_bits(&self, bits: &mut SubstitutionBits) {
        for ty in self.required_types() {
            bits.set(ty);
        }
    }

    /// Expands the pattern. Types the context cannot supply expand to nothing;
    /// tools reject such output patterns when they are added to a toolchain.
    pub fn apply(&self, ctx: &SubstitutionContext<'_>) -> String {
        let mut result = String::new();
        for range in &self.ranges {
            match range {
                Range::Literal(s) => result.push_str(s),
                Range::Substitution(ty) => {
                    if let Some(value) = ctx.value(*ty) {
                        result.push_str(&value);
                    }
                }
            }
        }
        result
    }
}

impl fmt::Display for SubstitutionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for range in &self.ranges {
            match range {
                Range::Literal(s) => write!(f, "{s}")?,
                Range::Substitution(ty) => write!(f, "{{{{{}}}}}", ty.ninja_name())?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubstitutionList {
    list: Vec<SubstitutionPattern>,
}

impl SubstitutionList {
    pub fn parse<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let list = patterns
            .iter()
            .map(|p| SubstitutionPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { list })
    }

    pub fn list(&self) -> &[SubstitutionPattern] {
        &self.list
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn fill_bits(&self, bits: &mut SubstitutionBits) {
        for pattern in &self.list {
            pattern.fill_bits(bits);
        }
    }
}

/// Supplies values for one expansion: always a target, optionally the source
/// being compiled and the tool doing the work.
pub struct SubstitutionContext<'a> {
    settings: Settings<'a>,
    target: &'a Target,
    source: Option<&'a SourceFile>,
    tool: Option<&'a Tool>,
}

impl<'a> SubstitutionContext<'a> {
    pub fn new(settings: Settings<'a>, target: &'a Target) -> Self {
        Self {
            settings,
            target,
            source: None,
            tool: None,
        }
    }

    pub fn with_source(mut self, source: &'a SourceFile) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_tool(mut self, tool: &'a Tool) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn value(&self, ty: SubstitutionType) -> Option<String> {
        let build_dir = self.settings.build_dir();
        let label = self.target.label();
        match ty {
            SubstitutionType::Label => Some(label.to_string()),
            SubstitutionType::LabelName => Some(label.name().into()),
            SubstitutionType::RootGenDir => Some(self.settings.root_gen_dir()),
            SubstitutionType::RootOutDir => Some(self.settings.root_out_dir()),
            SubstitutionType::TargetGenDir => Some(dir_value(self.settings.gen_dir_for(label.dir()).value())),
            SubstitutionType::TargetOutDir => Some(dir_value(self.settings.out_dir_for(label.dir()).value())),
            SubstitutionType::TargetOutputName => Some(self.target.computed_output_name()),
            SubstitutionType::Source => self.source.map(|s| path::rebase(s.value(), build_dir)),
            SubstitutionType::SourceNamePart => self.source.map(|s| s.name_part().into()),
            SubstitutionType::SourceFilePart => self.source.map(|s| s.file_part().into()),
            SubstitutionType::SourceDir => self.source.map(|s| path::rebase_dir(&s.dir(), build_dir)),
            SubstitutionType::SourceRootRelativeDir => {
                self.source.map(|s| s.dir().root_relative().into())
            }
            SubstitutionType::SourceGenDir => self
                .source
                .map(|s| dir_value(self.settings.gen_dir_for(&s.dir()).value())),
            SubstitutionType::SourceOutDir => self
                .source
                .map(|s| dir_value(self.settings.out_dir_for(&s.dir()).value())),
            SubstitutionType::OutputExtension => {
                self.tool.map(|tool| self.target.computed_output_extension(tool))
            }
            // Command-line only values, provided by Ninja at build time.
            SubstitutionType::Output
            | SubstitutionType::Asmflags
            | SubstitutionType::Cflags
            | SubstitutionType::CflagsC
            | SubstitutionType::CflagsCc
            | SubstitutionType::Cppflags
            | SubstitutionType::CppflagsC
            | SubstitutionType::CppflagsCc
            | SubstitutionType::Defines
            | SubstitutionType::IncludeDirs
            | SubstitutionType::LinkerInputs
            | SubstitutionType::Ldflags
            | SubstitutionType::Libs
            | SubstitutionType::Solibs => None,
        }
    }
}

/// Output directories are kept with a trailing slash for concatenation but
/// written without one.
fn dir_value(dir: &str) -> String {
    dir.trim_end_matches('/').into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let pattern =
            SubstitutionPattern::parse("{{source_out_dir}}/{{target_output_name}}.{{source_name_part}}.o")
                .unwrap();
        let types: Vec<_> = pattern.required_types().collect();
        assert_eq!(
            types,
            vec![
                SubstitutionType::SourceOutDir,
                SubstitutionType::TargetOutputName,
                SubstitutionType::SourceNamePart,
            ]
        );
        assert_eq!(
            pattern.to_string(),
            "{{source_out_dir}}/{{target_output_name}}.{{source_name_part}}.o"
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            SubstitutionPattern::parse("cc {{source"),
            Err(WriterError::Pattern(_))
        ));
        assert!(matches!(
            SubstitutionPattern::parse("cc {{sauce}}"),
            Err(WriterError::Pattern(_))
        ));
    }

    #[test]
    fn test_bits_iterate_in_declaration_order() {
        let mut bits = SubstitutionBits::default();
        SubstitutionPattern::parse("{{source_out_dir}} {{source_name_part}} {{cflags}}")
            .unwrap()
            .fill_bits(&mut bits);
        let used: Vec<_> = bits.iter().collect();
        assert_eq!(
            used,
            vec![
                SubstitutionType::SourceNamePart,
                SubstitutionType::SourceOutDir,
                SubstitutionType::Cflags,
            ]
        );
    }
}
