use hashbrown::HashMap;

use crate::error::{Result, bail_toolchain_error};
use crate::label::Label;
use crate::source_file_type::SourceFileType;
use crate::substitution::{SubstitutionBits, SubstitutionType};
use crate::target::OutputType;
use crate::tool::Tool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolType {
    Cc,
    Cxx,
    Asm,
    Alink,
    Solink,
    SolinkModule,
    Link,
    Stamp,
    Copy,
}

impl ToolType {
    /// The Ninja rule name, before the toolchain prefix.
    pub fn name(self) -> &'static str {
        match self {
            ToolType::Cc => "cc",
            ToolType::Cxx => "cxx",
            ToolType::Asm => "asm",
            ToolType::Alink => "alink",
            ToolType::Solink => "solink",
            ToolType::SolinkModule => "solink_module",
            ToolType::Link => "link",
            ToolType::Stamp => "stamp",
            ToolType::Copy => "copy",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "cc" => ToolType::Cc,
            "cxx" => ToolType::Cxx,
            "asm" => ToolType::Asm,
            "alink" => ToolType::Alink,
            "solink" => ToolType::Solink,
            "solink_module" => ToolType::SolinkModule,
            "link" => ToolType::Link,
            "stamp" => ToolType::Stamp,
            "copy" => ToolType::Copy,
            _ => return None,
        })
    }

    pub fn is_compiler(self) -> bool {
        matches!(self, ToolType::Cc | ToolType::Cxx | ToolType::Asm)
    }

    pub fn is_linker(self) -> bool {
        matches!(
            self,
            ToolType::Alink | ToolType::Solink | ToolType::SolinkModule | ToolType::Link
        )
    }
}

const DEFAULT_ASM_EXTENSIONS: &[&str] = &["asm", "s"];

#[derive(Debug, Clone)]
pub struct Toolchain {
    label: Label,
    tools: HashMap<ToolType, Tool>,
    asm_extensions: Vec<String>,
    substitution_bits: SubstitutionBits,
}

impl Toolchain {
    pub fn new(label: Label) -> Self {
        Self {
            label,
            tools: HashMap::new(),
            asm_extensions: DEFAULT_ASM_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            substitution_bits: SubstitutionBits::default(),
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Adds `tool`, checking its output patterns only use values that are
    /// known when the outputs are computed.
    pub fn set_tool(&mut self, tool_type: ToolType, tool: Tool) -> Result<&mut Self> {
        let allowed: fn(SubstitutionType) -> bool = if tool_type.is_compiler() {
            |ty| ty.is_source_type() || ty.is_target_type()
        } else if tool_type.is_linker() {
            |ty| ty.is_target_type() || ty == SubstitutionType::OutputExtension
        } else {
            |ty| ty.is_target_type() || ty.is_source_type() || ty == SubstitutionType::Output
        };

        if (tool_type.is_compiler() || tool_type.is_linker()) && tool.outputs().is_empty() {
            bail_toolchain_error!(
                "the \"{}\" tool of {} has no outputs",
                tool_type.name(),
                self.label
            );
        }

        let patterns = tool
            .outputs()
            .list()
            .iter()
            .chain(tool.link_output())
            .chain(tool.depend_output());
        for pattern in patterns {
            if let Some(ty) = pattern.required_types().find(|ty| !allowed(*ty)) {
                bail_toolchain_error!(
                    "{{{{{}}}}} is not allowed in the outputs of the \"{}\" tool of {}",
                    ty.ninja_name(),
                    tool_type.name(),
                    self.label
                );
            }
        }

        self.substitution_bits.merge(tool.substitution_bits());
        self.tools.insert(tool_type, tool);
        Ok(self)
    }

    pub fn tool(&self, tool_type: ToolType) -> Option<&Tool> {
        self.tools.get(&tool_type)
    }

    pub fn set_asm_extensions<S: Into<String>>(&mut self, extensions: impl IntoIterator<Item = S>) {
        self.asm_extensions = extensions.into_iter().map(Into::into).collect();
    }

    pub fn asm_extensions(&self) -> &[String] {
        &self.asm_extensions
    }

    /// Every substitution any tool of this toolchain refers to.
    pub fn substitution_bits(&self) -> &SubstitutionBits {
        &self.substitution_bits
    }

    pub fn tool_type_for_source_type(&self, ty: SourceFileType) -> Option<ToolType> {
        match ty {
            SourceFileType::C => Some(ToolType::Cc),
            SourceFileType::Cpp => Some(ToolType::Cxx),
            SourceFileType::Asm => Some(ToolType::Asm),
            SourceFileType::PreprocessedAsm
            | SourceFileType::Header
            | SourceFileType::ObjC
            | SourceFileType::Rc
            | SourceFileType::Object
            | SourceFileType::Def
            | SourceFileType::Unknown => None,
        }
    }

    pub fn tool_type_for_target_final_output(&self, ty: OutputType) -> ToolType {
        match ty {
            OutputType::Executable => ToolType::Link,
            OutputType::SharedLibrary => ToolType::Solink,
            OutputType::LoadableModule => ToolType::SolinkModule,
            OutputType::StaticLibrary => ToolType::Alink,
            OutputType::Copy => ToolType::Copy,
            OutputType::SourceSet
            | OutputType::Action
            | OutputType::ActionForeach
            | OutputType::Group => ToolType::Stamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WriterError;

    fn label() -> Label {
        Label::parse("//toolchain:test").unwrap()
    }

    #[test]
    fn test_compiler_outputs_may_not_use_linker_values() {
        let mut toolchain = Toolchain::new(label());
        let tool = Tool::new("cc {{source}} -o {{output}}")
            .unwrap()
            .with_outputs(&["{{source_out_dir}}/{{source_name_part}}{{output_extension}}"])
            .unwrap();
        let err = toolchain.set_tool(ToolType::Cc, tool).unwrap_err();
        assert!(matches!(err, WriterError::Toolchain(_)));
    }

    #[test]
    fn test_linker_needs_outputs() {
        let mut toolchain = Toolchain::new(label());
        let tool = Tool::new("ld -o {{output}} {{inputs}}").unwrap();
        assert!(toolchain.set_tool(ToolType::Link, tool).is_err());
    }

    #[test]
    fn test_bits_are_merged() {
        let mut toolchain = Toolchain::new(label());
        let cc = Tool::new("cc {{source}} {{cflags}} {{cflags_c}} -o {{output}}")
            .unwrap()
            .with_outputs(&["{{source_out_dir}}/{{target_output_name}}.{{source_name_part}}.o"])
            .unwrap();
        toolchain.set_tool(ToolType::Cc, cc).unwrap();
        let stamp = Tool::new("touch {{output}}").unwrap();
        toolchain.set_tool(ToolType::Stamp, stamp).unwrap();

        let bits = toolchain.substitution_bits();
        assert!(bits.used(SubstitutionType::Cflags));
        assert!(bits.used(SubstitutionType::CflagsC));
        assert!(bits.used(SubstitutionType::TargetOutputName));
        assert!(!bits.used(SubstitutionType::CflagsCc));
        assert!(!bits.used(SubstitutionType::Defines));
    }
}
