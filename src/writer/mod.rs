//! Ninja edges for one binary target.
//!
//! A binary target is an executable, a shared or static library, a loadable
//! module or a source set. Its text has a fixed shape: a block of variables,
//! an optional input-deps stamp, the precompiled-header edges, one compile
//! edge per compiled source, and finally the link, archive or stamp edge.
//! The whole text is built in a buffer and only handed to the caller when
//! nothing went wrong.

mod deps;
mod pch;

use std::slice;

use hashbrown::HashSet;
use log::{debug, trace};

pub use deps::{Deps, InputDeps};
use pch::PchEdge;

use crate::config_values::LibFile;
use crate::error::{ErrorContext, Result, WriterError, bail_target_error};
use crate::escape::{EscapeMode, escape_to};
use crate::path::{self, OutputFile, SourceFile};
use crate::scheduler::FailureState;
use crate::settings::{BuildSettings, Settings};
use crate::source_file_type::{SourceFileType, SourceFileTypeSet};
use crate::substitution::{SubstitutionContext, SubstitutionType};
use crate::target::{OutputType, Target, TargetGraph, TargetId};
use crate::tool::{PrecompiledHeaderType, Tool};
use crate::toolchain::ToolType;

/// What compiling one source of a target produces.
pub(crate) enum SourceOutputs {
    Compiled {
        tool_type: ToolType,
        outputs: Vec<OutputFile>,
    },
    /// A prebuilt object, linked as is.
    Object(OutputFile),
    Def,
    /// Headers, unknown kinds, and kinds the toolchain has no tool for.
    Skipped,
}

impl SourceOutputs {
    pub(crate) fn compute(build: &BuildSettings, target: &Target, source: &SourceFile) -> Self {
        let toolchain = target.toolchain();
        let source_type = SourceFileType::classify(source, toolchain);
        match source_type {
            SourceFileType::Object => {
                Self::Object(OutputFile::from_source_file(build.build_dir(), source))
            }
            SourceFileType::Def => Self::Def,
            _ => {
                let Some(tool_type) = toolchain.tool_type_for_source_type(source_type) else {
                    return Self::Skipped;
                };
                let Some(tool) = toolchain.tool(tool_type) else {
                    return Self::Skipped;
                };
                let ctx = SubstitutionContext::new(target.settings(build), target)
                    .with_source(source)
                    .with_tool(tool);
                let outputs = tool
                    .outputs()
                    .list()
                    .iter()
                    .map(|pattern| OutputFile::new(pattern.apply(&ctx)))
                    .collect();
                Self::Compiled { tool_type, outputs }
            }
        }
    }
}

struct CompileEdge<'a> {
    source: &'a SourceFile,
    tool_type: ToolType,
    outputs: Vec<OutputFile>,
}

/// `Foo` for a library named `Foo.framework`, compared case-insensitively.
fn framework_name(name: &str) -> Option<&str> {
    const SUFFIX: &str = ".framework";
    let split = name.len().checked_sub(SUFFIX.len())?;
    let suffix = name.get(split..)?;
    suffix.eq_ignore_ascii_case(SUFFIX).then(|| &name[..split])
}

pub struct NinjaBinaryTargetWriter<'a> {
    graph: &'a TargetGraph,
    build: &'a BuildSettings,
    id: TargetId,
    target: &'a Target,
    settings: Settings<'a>,
    failures: &'a FailureState,
    rule_prefix: String,
    out: String,
}

impl<'a> NinjaBinaryTargetWriter<'a> {
    pub fn new(
        graph: &'a TargetGraph,
        build: &'a BuildSettings,
        id: TargetId,
        failures: &'a FailureState,
    ) -> Result<Self> {
        let target = graph.target(id)?;
        let settings = target.settings(build);
        Ok(Self {
            graph,
            build,
            id,
            target,
            settings,
            failures,
            rule_prefix: settings.rule_prefix(),
            out: String::new(),
        })
    }

    /// Appends the target's edges to `out`. On error `out` is left untouched.
    pub fn run(mut self, out: &mut String) -> Result<()> {
        let target = self.target;
        if !target.output_type().is_binary() {
            bail_target_error!(
                "{} is a {}, not a binary target",
                target.label(),
                target.output_type().name()
            );
        }
        let values = &target.config_values;
        if values.precompiled_header.is_some() != values.precompiled_source.is_some() {
            bail_target_error!(
                "{} must set both precompiled_header and precompiled_source, or neither",
                target.label()
            );
        }
        debug!("writing {} ({})", target.label(), target.output_type().name());

        let toolchain = target.toolchain();
        let used_types: SourceFileTypeSet = target
            .sources
            .iter()
            .map(|source| SourceFileType::classify(source, toolchain))
            .collect();
        let pch_edges = pch::plan(self.settings, target, &used_types);

        let mut compiles = Vec::new();
        let mut object_files = Vec::new();
        let mut def_file = None;
        for source in &target.sources {
            match SourceOutputs::compute(self.build, target, source) {
                SourceOutputs::Compiled { tool_type, outputs } => {
                    object_files.extend(outputs.first().cloned());
                    compiles.push(CompileEdge {
                        source,
                        tool_type,
                        outputs,
                    });
                }
                SourceOutputs::Object(file) => object_files.push(file),
                SourceOutputs::Def => {
                    def_file.get_or_insert(source);
                }
                SourceOutputs::Skipped => trace!("{}: skipping {}", target.label(), source),
            }
        }

        let is_source_set = target.output_type() == OutputType::SourceSet;
        if is_source_set {
            object_files.extend(
                pch_edges
                    .iter()
                    .filter(|edge| edge.header_type == PrecompiledHeaderType::Msvc)
                    .map(|edge| edge.output.clone()),
            );
        }
        self.check_for_duplicates(&object_files)?;

        let deps = Deps::compute(self.graph, self.build, self.id)?;
        let input_deps = InputDeps::compute(self.graph, self.id)?;

        self.write_compiler_vars(&used_types);
        let input_dep = self.write_input_deps_stamp(&input_deps)?;
        self.write_pch_commands(&pch_edges, input_dep.as_ref());
        self.write_sources(&compiles, &pch_edges, input_dep.as_ref());
        if is_source_set {
            self.write_source_set_stamp(&object_files, &deps)?;
        } else {
            self.write_linker_stuff(&object_files, def_file, &deps)?;
        }

        out.push_str(&self.out);
        Ok(())
    }

    fn check_for_duplicates(&self, object_files: &[OutputFile]) -> Result<()> {
        let mut seen = HashSet::new();
        for file in object_files {
            if !seen.insert(file) {
                let err = WriterError::DuplicateObjectFile {
                    label: self.target.label().clone(),
                    path: file.value().into(),
                };
                self.failures.record(err.to_string());
                return Err(err);
            }
        }
        Ok(())
    }

    fn write_path(&mut self, file: &OutputFile) {
        self.out.push(' ');
        escape_to(&mut self.out, file.value(), EscapeMode::Ninja);
    }

    fn write_flags(&mut self, ty: SubstitutionType) {
        let target = self.target;
        for values in target.all_config_values() {
            for flag in values.flags(ty) {
                self.out.push(' ');
                escape_to(&mut self.out, flag, EscapeMode::NinjaFlag);
            }
        }
    }

    fn write_compiler_vars(&mut self, used_types: &SourceFileTypeSet) {
        let target = self.target;
        let build_dir = self.build.build_dir();
        let bits = target.toolchain().substitution_bits();
        let start = self.out.len();

        if bits.used(SubstitutionType::Defines) {
            self.out.push_str("defines =");
            for values in target.all_config_values() {
                for define in &values.defines {
                    self.out.push_str(" -D");
                    escape_to(&mut self.out, define, EscapeMode::NinjaCommand);
                }
            }
            self.out.push('\n');
        }

        if bits.used(SubstitutionType::IncludeDirs) {
            self.out.push_str("include_dirs =");
            for values in target.all_config_values() {
                for dir in &values.include_dirs {
                    self.out.push_str(" -I");
                    escape_to(&mut self.out, &path::rebase_dir(dir, build_dir), EscapeMode::NinjaCommand);
                }
            }
            self.out.push('\n');
        }

        if used_types.asm_used() {
            self.write_flag_var(SubstitutionType::Asmflags, None);
        }
        if used_types.c_family_used() {
            self.write_flag_var(SubstitutionType::Cflags, None);
            self.write_flag_var(SubstitutionType::Cppflags, None);
        }
        if used_types.get(SourceFileType::C) {
            self.write_flag_var(SubstitutionType::CflagsC, Some(ToolType::Cc));
            self.write_flag_var(SubstitutionType::CppflagsC, None);
        }
        if used_types.get(SourceFileType::Cpp) {
            self.write_flag_var(SubstitutionType::CflagsCc, Some(ToolType::Cxx));
            self.write_flag_var(SubstitutionType::CppflagsCc, None);
        }

        let ctx = SubstitutionContext::new(self.settings, target);
        for ty in [
            SubstitutionType::Label,
            SubstitutionType::RootGenDir,
            SubstitutionType::RootOutDir,
            SubstitutionType::TargetGenDir,
            SubstitutionType::TargetOutDir,
            SubstitutionType::TargetOutputName,
        ] {
            if bits.used(ty)
                && let Some(value) = ctx.value(ty)
            {
                self.out.push_str(ty.ninja_name());
                self.out.push_str(" = ");
                escape_to(&mut self.out, &value, EscapeMode::Ninja);
                self.out.push('\n');
            }
        }

        if self.out.len() > start {
            self.out.push('\n');
        }
    }

    /// One flags variable of the target block. `pch_tool` names the compiler
    /// whose precompiled-header flags go with it.
    fn write_flag_var(&mut self, ty: SubstitutionType, pch_tool: Option<ToolType>) {
        let target = self.target;
        if !target.toolchain().substitution_bits().used(ty) {
            return;
        }
        self.out.push_str(ty.ninja_name());
        self.out.push_str(" =");

        let pch = pch_tool
            .filter(|_| target.has_precompiled_headers())
            .and_then(|tool_type| {
                let tool = target.toolchain().tool(tool_type)?;
                Some((tool_type, tool.precompiled_header_type()))
            });

        if let Some((tool_type, PrecompiledHeaderType::Msvc)) = pch {
            let pch_file = pch::windows_pch_file(self.settings, target, tool_type);
            self.out.push_str(" /Fp");
            escape_to(&mut self.out, pch_file.value(), EscapeMode::NinjaCommand);
            self.out.push_str(" /Yu");
            let header = target.config_values.precompiled_header.as_deref().unwrap_or_default();
            escape_to(&mut self.out, header, EscapeMode::NinjaCommand);
        }

        self.write_flags(ty);

        if let Some((tool_type, PrecompiledHeaderType::Gcc)) = pch
            && let Some(gch) = pch::output_file(self.settings, target, tool_type)
        {
            let include = gch.value().strip_suffix(".gch").unwrap_or(gch.value());
            self.out.push_str(" -include ");
            escape_to(&mut self.out, include, EscapeMode::NinjaCommand);
        }
        self.out.push('\n');
    }

    /// Collapses the compile steps' extra dependencies into one file,
    /// writing a stamp edge when there is more than one.
    fn write_input_deps_stamp(&mut self, input_deps: &InputDeps) -> Result<Option<OutputFile>> {
        if input_deps.is_empty() {
            return Ok(None);
        }

        let build_dir = self.build.build_dir();
        let mut files: Vec<OutputFile> = input_deps
            .files
            .iter()
            .map(|file| OutputFile::from_source_file(build_dir, file))
            .collect();
        for &id in input_deps.targets.iter() {
            files.push(self.graph.target(id)?.dependency_output_file(self.build)?);
        }
        if files.len() == 1 {
            return Ok(files.pop());
        }

        let label = self.target.label();
        let mut stamp = self.settings.out_dir_for(label.dir());
        stamp.push_str(label.name());
        stamp.push_str(".inputdeps.stamp");

        self.out.push_str("build");
        self.write_path(&stamp);
        self.out.push_str(": ");
        self.out.push_str(&self.rule_prefix);
        self.out.push_str(ToolType::Stamp.name());
        for file in &files {
            self.write_path(file);
        }
        self.out.push('\n');
        Ok(Some(stamp))
    }

    fn write_compile_line(
        &mut self,
        source: &SourceFile,
        tool_type: ToolType,
        outputs: &[OutputFile],
        implicit: &[&OutputFile],
        order_only: Option<&OutputFile>,
    ) {
        self.out.push_str("build");
        for output in outputs {
            self.write_path(output);
        }
        self.out.push_str(": ");
        self.out.push_str(&self.rule_prefix);
        self.out.push_str(tool_type.name());
        self.write_path(&OutputFile::from_source_file(self.build.build_dir(), source));
        if !implicit.is_empty() {
            self.out.push_str(" |");
            for file in implicit {
                self.write_path(file);
            }
        }
        if let Some(file) = order_only {
            self.out.push_str(" ||");
            self.write_path(file);
        }
        self.out.push('\n');

        let target = self.target;
        let Some(tool) = target.toolchain().tool(tool_type) else {
            return;
        };
        let ctx = SubstitutionContext::new(self.settings, target)
            .with_source(source)
            .with_tool(tool);
        for ty in tool.substitution_bits().iter() {
            if ty == SubstitutionType::Source || !ty.is_source_type() {
                continue;
            }
            if let Some(value) = ctx.value(ty) {
                self.out.push_str("  ");
                self.out.push_str(ty.ninja_name());
                self.out.push_str(" = ");
                escape_to(&mut self.out, &value, EscapeMode::Ninja);
                self.out.push('\n');
            }
        }
    }

    fn write_pch_commands(&mut self, edges: &[PchEdge], input_dep: Option<&OutputFile>) {
        let target = self.target;
        let Some(source) = target.config_values.precompiled_source.as_ref() else {
            return;
        };
        let header = target.config_values.precompiled_header.as_deref().unwrap_or_default();

        for edge in edges {
            self.write_compile_line(
                source,
                edge.tool_type,
                slice::from_ref(&edge.output),
                &[],
                input_dep,
            );

            let flag_type = pch::flag_type(edge.tool_type);
            let flag_name = flag_type.ninja_name();
            self.out.push_str("  ");
            self.out.push_str(flag_name);
            self.out.push_str(" =");
            match edge.header_type {
                PrecompiledHeaderType::Msvc => {
                    // Keep the target's flags and add the create switch.
                    self.out.push_str(" ${");
                    self.out.push_str(flag_name);
                    self.out.push_str("} /Yc");
                    escape_to(&mut self.out, header, EscapeMode::NinjaCommand);
                }
                PrecompiledHeaderType::Gcc => {
                    self.write_flags(flag_type);
                    self.out.push_str(" -x ");
                    self.out.push_str(pch::gcc_lang(edge.tool_type));
                }
                PrecompiledHeaderType::None => {}
            }
            self.out.push_str("\n\n");
        }
    }

    fn write_sources(&mut self, compiles: &[CompileEdge<'_>], pch_edges: &[PchEdge], input_dep: Option<&OutputFile>) {
        for compile in compiles {
            let implicit: Vec<&OutputFile> = pch_edges
                .iter()
                .filter(|edge| edge.tool_type == compile.tool_type)
                .map(|edge| &edge.output)
                .collect();
            self.write_compile_line(
                compile.source,
                compile.tool_type,
                &compile.outputs,
                &implicit,
                input_dep,
            );
        }
        self.out.push('\n');
    }

    fn write_order_only_deps(&mut self, ids: &[TargetId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.out.push_str(" ||");
        for &id in ids {
            let file = self.graph.target(id)?.dependency_output_file(self.build)?;
            self.write_path(&file);
        }
        Ok(())
    }

    fn write_source_set_stamp(&mut self, object_files: &[OutputFile], deps: &Deps) -> Result<()> {
        let stamp = self.target.dependency_output_file(self.build)?;
        self.out.push_str("build");
        self.write_path(&stamp);
        self.out.push_str(": ");
        self.out.push_str(&self.rule_prefix);
        self.out.push_str(ToolType::Stamp.name());
        for file in object_files {
            self.write_path(file);
        }
        self.write_order_only_deps(&deps.non_linkable_deps)?;
        self.out.push('\n');
        Ok(())
    }

    fn write_linker_stuff(
        &mut self,
        object_files: &[OutputFile],
        def_file: Option<&SourceFile>,
        deps: &Deps,
    ) -> Result<()> {
        let target = self.target;
        let build_dir = self.build.build_dir();
        let tool_type = target.final_tool_type();
        let tool = target.final_tool().with_context_toolchain(|| {
            format!(
                "{} has no \"{}\" tool, needed by {}",
                target.toolchain().label(),
                tool_type.name(),
                target.label()
            )
        })?;
        let outputs = target.link_outputs(self.build)?;

        self.out.push_str("build");
        for output in &outputs {
            self.write_path(output);
        }
        self.out.push_str(": ");
        self.out.push_str(&self.rule_prefix);
        self.out.push_str(tool_type.name());
        for file in object_files.iter().chain(deps.extra_object_files.iter()) {
            self.write_path(file);
        }

        let mut implicit = Vec::new();
        let mut solibs = Vec::new();
        for &id in deps.linkable_deps.iter() {
            let dep = self.graph.target(id)?;
            let link_file = dep.link_output_file(self.build)?;
            self.write_path(&link_file);
            if dep.output_type() == OutputType::SharedLibrary {
                let dep_file = dep.dependency_output_file(self.build)?;
                if dep_file != link_file {
                    implicit.push(dep_file);
                    solibs.push(link_file);
                }
            }
        }

        let def_file = def_file.map(|file| OutputFile::from_source_file(build_dir, file));
        implicit.extend(def_file.clone());
        for lib in deps.all_libs.iter() {
            if let LibFile::Path(file) = lib {
                implicit.push(OutputFile::from_source_file(build_dir, file));
            }
        }
        if !implicit.is_empty() {
            self.out.push_str(" |");
            for file in &implicit {
                self.write_path(file);
            }
        }
        self.write_order_only_deps(&deps.non_linkable_deps)?;
        self.out.push('\n');

        if target.output_type() != OutputType::StaticLibrary {
            self.write_ldflags(tool, def_file.as_ref(), deps);
            self.write_libs(tool, deps);
        }

        self.out.push_str("  output_extension = ");
        self.out.push_str(&target.computed_output_extension(tool));
        self.out.push('\n');

        if !solibs.is_empty() {
            self.out.push_str("  solibs =");
            for file in &solibs {
                self.write_path(file);
            }
            self.out.push('\n');
        }

        trace!(
            "{}: {} objects, {} linked deps",
            target.label(),
            object_files.len() + deps.extra_object_files.len(),
            deps.linkable_deps.len()
        );
        Ok(())
    }

    fn write_ldflags(&mut self, tool: &Tool, def_file: Option<&OutputFile>, deps: &Deps) {
        let build_dir = self.build.build_dir();
        self.out.push_str("  ldflags =");
        self.write_flags(SubstitutionType::Ldflags);
        for dir in deps.all_lib_dirs.iter() {
            self.out.push(' ');
            self.out.push_str(tool.lib_dir_switch());
            escape_to(&mut self.out, &path::rebase_dir(dir, build_dir), EscapeMode::NinjaCommand);
        }
        if let Some(file) = def_file {
            self.out.push_str(" /DEF:");
            escape_to(&mut self.out, file.value(), EscapeMode::Ninja);
        }
        self.out.push('\n');
    }

    fn write_libs(&mut self, tool: &Tool, deps: &Deps) {
        let build_dir = self.build.build_dir();
        self.out.push_str("  libs =");
        for lib in deps.all_libs.iter() {
            match lib {
                LibFile::Path(file) => {
                    self.write_path(&OutputFile::from_source_file(build_dir, file));
                }
                LibFile::Name(name) => {
                    if let Some(framework) = framework_name(name) {
                        self.out.push_str(" -framework ");
                        escape_to(&mut self.out, framework, EscapeMode::NinjaCommand);
                    } else {
                        self.out.push(' ');
                        self.out.push_str(tool.lib_switch());
                        escape_to(&mut self.out, name, EscapeMode::NinjaCommand);
                    }
                }
            }
        }
        self.out.push('\n');
    }
}
