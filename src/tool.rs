use crate::error::Result;
use crate::substitution::{SubstitutionBits, SubstitutionList, SubstitutionPattern};

/// How a compiler tool consumes precompiled headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecompiledHeaderType {
    #[default]
    None,
    /// `/Yc` builds a `.pch` next to an object file; `/Yu` consumes it.
    Msvc,
    /// The header is compiled to a `.gch` picked up through `-include`.
    Gcc,
}

/// One command template of a toolchain: a compiler, a linker, a stamp...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    command: SubstitutionPattern,
    outputs: SubstitutionList,
    link_output: Option<SubstitutionPattern>,
    depend_output: Option<SubstitutionPattern>,
    output_prefix: String,
    default_output_extension: String,
    lib_switch: String,
    lib_dir_switch: String,
    precompiled_header_type: PrecompiledHeaderType,
    substitution_bits: SubstitutionBits,
}

impl Tool {
    pub fn new(command: &str) -> Result<Self> {
        let mut tool = Self {
            command: SubstitutionPattern::parse(command)?,
            outputs: SubstitutionList::default(),
            link_output: None,
            depend_output: None,
            output_prefix: String::new(),
            default_output_extension: String::new(),
            lib_switch: "-l".into(),
            lib_dir_switch: "-L".into(),
            precompiled_header_type: PrecompiledHeaderType::None,
            substitution_bits: SubstitutionBits::default(),
        };
        tool.update_bits();
        Ok(tool)
    }

    pub fn with_outputs<S: AsRef<str>>(mut self, outputs: &[S]) -> Result<Self> {
        self.outputs = SubstitutionList::parse(outputs)?;
        self.update_bits();
        Ok(self)
    }

    /// For shared libraries: the file dependents pass to their linker, when
    /// it differs from the first output.
    pub fn with_link_output(mut self, pattern: &str) -> Result<Self> {
        self.link_output = Some(SubstitutionPattern::parse(pattern)?);
        self.update_bits();
        Ok(self)
    }

    /// For shared libraries: the file dependents depend on, e.g. a `.TOC`
    /// that only changes when the exported symbols change.
    pub fn with_depend_output(mut self, pattern: &str) -> Result<Self> {
        self.depend_output = Some(SubstitutionPattern::parse(pattern)?);
        self.update_bits();
        Ok(self)
    }

    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    pub fn with_default_output_extension(mut self, extension: impl Into<String>) -> Self {
        self.default_output_extension = extension.into();
        self
    }

    pub fn with_lib_switch(mut self, switch: impl Into<String>) -> Self {
        self.lib_switch = switch.into();
        self
    }

    pub fn with_lib_dir_switch(mut self, switch: impl Into<String>) -> Self {
        self.lib_dir_switch = switch.into();
        self
    }

    pub fn with_precompiled_header_type(mut self, ty: PrecompiledHeaderType) -> Self {
        self.precompiled_header_type = ty;
        self
    }

    fn update_bits(&mut self) {
        let mut bits = SubstitutionBits::default();
        self.command.fill_bits(&mut bits);
        self.outputs.fill_bits(&mut bits);
        for pattern in self.link_output.iter().chain(self.depend_output.iter()) {
            pattern.fill_bits(&mut bits);
        }
        self.substitution_bits = bits;
    }

    pub fn outputs(&self) -> &SubstitutionList {
        &self.outputs
    }

    pub fn link_output(&self) -> Option<&SubstitutionPattern> {
        self.link_output.as_ref()
    }

    pub fn depend_output(&self) -> Option<&SubstitutionPattern> {
        self.depend_output.as_ref()
    }

    pub fn output_prefix(&self) -> &str {
        &self.output_prefix
    }

    pub fn default_output_extension(&self) -> &str {
        &self.default_output_extension
    }

    pub fn lib_switch(&self) -> &str {
        &self.lib_switch
    }

    pub fn lib_dir_switch(&self) -> &str {
        &self.lib_dir_switch
    }

    pub fn precompiled_header_type(&self) -> PrecompiledHeaderType {
        self.precompiled_header_type
    }

    pub fn substitution_bits(&self) -> &SubstitutionBits {
        &self.substitution_bits
    }
}
