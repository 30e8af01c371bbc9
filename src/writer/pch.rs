//! Precompiled-header build steps.
//!
//! For every language present in a target whose compiler supports it, one
//! extra compile edge builds the precompiled header, and every ordinary
//! compile of that language depends on it.

use crate::path::OutputFile;
use crate::settings::Settings;
use crate::source_file_type::{SourceFileType, SourceFileTypeSet};
use crate::substitution::{SubstitutionContext, SubstitutionType};
use crate::target::Target;
use crate::tool::PrecompiledHeaderType;
use crate::toolchain::ToolType;

/// One precompiled-header compile edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PchEdge {
    pub tool_type: ToolType,
    pub header_type: PrecompiledHeaderType,
    pub output: OutputFile,
}

/// Languages that can have a precompiled header, in writing order.
const PCH_LANGUAGES: &[(ToolType, SourceFileType)] = &[
    (ToolType::Cc, SourceFileType::C),
    (ToolType::Cxx, SourceFileType::Cpp),
];

pub fn lang_suffix(tool_type: ToolType) -> &'static str {
    match tool_type {
        ToolType::Cc => "c",
        ToolType::Cxx => "cc",
        _ => "",
    }
}

/// The `-x` language GCC needs, since a header's extension doesn't say.
pub fn gcc_lang(tool_type: ToolType) -> &'static str {
    match tool_type {
        ToolType::Cc => "c-header",
        ToolType::Cxx => "c++-header",
        _ => "",
    }
}

/// The per-language flags variable a PCH edge overrides.
pub fn flag_type(tool_type: ToolType) -> SubstitutionType {
    match tool_type {
        ToolType::Cxx => SubstitutionType::CflagsCc,
        _ => SubstitutionType::CflagsC,
    }
}

/// The file the PCH edge for `tool_type` produces.
///
/// This is the tool's first output for the precompiled source, re-suffixed
/// with the language so C and C++ builds of the same source don't collide:
/// `x.precompile.o` becomes `x.precompile.cc.o` (MSVC) or
/// `x.precompile.h-cc.gch` (GCC; minus `.gch` it is what `-include` names).
pub fn output_file(settings: Settings<'_>, target: &Target, tool_type: ToolType) -> Option<OutputFile> {
    let tool = target.toolchain().tool(tool_type)?;
    let source = target.config_values.precompiled_source.as_ref()?;
    let pattern = tool.outputs().list().first()?;

    let ctx = SubstitutionContext::new(settings, target)
        .with_source(source)
        .with_tool(tool);
    let output = OutputFile::new(pattern.apply(&ctx));
    let Some(offset) = output.extension_offset() else {
        return Some(output);
    };

    let suffix = lang_suffix(tool_type);
    let extension = match tool.precompiled_header_type() {
        PrecompiledHeaderType::Msvc => format!(".{suffix}{}", &output.value()[offset - 1..]),
        PrecompiledHeaderType::Gcc => format!(".h-{suffix}.gch"),
        PrecompiledHeaderType::None => return None,
    };
    Some(output.replace_extension(&extension))
}

/// The `.pch` MSVC writes next to the object: `{target_out_dir}/{name}_{lang}.pch`.
pub fn windows_pch_file(settings: Settings<'_>, target: &Target, tool_type: ToolType) -> OutputFile {
    let mut file = settings.out_dir_for(target.label().dir());
    file.push_str(target.label().name());
    file.push_str("_");
    file.push_str(lang_suffix(tool_type));
    file.push_str(".pch");
    file
}

/// The PCH edges `target` needs given the kinds of sources it has.
pub fn plan(settings: Settings<'_>, target: &Target, used_types: &SourceFileTypeSet) -> Vec<PchEdge> {
    if !target.has_precompiled_headers() {
        return Vec::new();
    }

    PCH_LANGUAGES
        .iter()
        .filter(|(_, source_type)| used_types.get(*source_type))
        .filter_map(|&(tool_type, _)| {
            let tool = target.toolchain().tool(tool_type)?;
            let header_type = tool.precompiled_header_type();
            if header_type == PrecompiledHeaderType::None {
                return None;
            }
            let output = output_file(settings, target, tool_type)?;
            Some(PchEdge {
                tool_type,
                header_type,
                output,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::SourceFile;
    use crate::target::OutputType;
    use crate::test_util::TestSetup;

    fn pch_target(setup: &TestSetup, header_type: PrecompiledHeaderType, source: &str) -> Target {
        let toolchain = setup.pch_toolchain(header_type);
        let mut target = setup.target_in("//foo:pch_target", OutputType::SourceSet, toolchain);
        target.config_values.precompiled_header = Some("build/precompile.h".into());
        target.config_values.precompiled_source = Some(SourceFile::new(source));
        target
    }

    #[test]
    fn test_msvc_output_names() {
        let setup = TestSetup::new();
        let target = pch_target(&setup, PrecompiledHeaderType::Msvc, "//build/precompile.cc");
        let settings = target.settings(&setup.build_settings);
        assert_eq!(
            output_file(settings, &target, ToolType::Cc).unwrap().value(),
            "withpch/obj/build/pch_target.precompile.c.o"
        );
        assert_eq!(
            output_file(settings, &target, ToolType::Cxx).unwrap().value(),
            "withpch/obj/build/pch_target.precompile.cc.o"
        );
        assert_eq!(
            windows_pch_file(settings, &target, ToolType::Cxx).value(),
            "withpch/obj/foo/pch_target_cc.pch"
        );
    }

    #[test]
    fn test_gcc_output_names() {
        let setup = TestSetup::new();
        let target = pch_target(&setup, PrecompiledHeaderType::Gcc, "//build/precompile.h");
        let settings = target.settings(&setup.build_settings);
        assert_eq!(
            output_file(settings, &target, ToolType::Cc).unwrap().value(),
            "withpch/obj/build/pch_target.precompile.h-c.gch"
        );
    }

    #[test]
    fn test_plan_skips_absent_languages() {
        let setup = TestSetup::new();
        let target = pch_target(&setup, PrecompiledHeaderType::Gcc, "//build/precompile.h");
        let settings = target.settings(&setup.build_settings);

        let only_cpp: SourceFileTypeSet = [SourceFileType::Cpp].into_iter().collect();
        let edges = plan(settings, &target, &only_cpp);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].tool_type, ToolType::Cxx);

        let none = SourceFileTypeSet::default();
        assert!(plan(settings, &target, &none).is_empty());
    }
}
