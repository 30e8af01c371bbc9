use std::sync::Arc;

use crate::config_values::ConfigValues;
use crate::error::{ErrorContext, Result, bail_toolchain_error};
use crate::label::Label;
use crate::path::{OutputFile, SourceFile};
use crate::settings::{BuildSettings, Settings};
use crate::substitution::{SubstitutionContext, SubstitutionPattern};
use crate::tool::Tool;
use crate::toolchain::{ToolType, Toolchain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputType {
    Executable,
    SharedLibrary,
    StaticLibrary,
    LoadableModule,
    SourceSet,
    Action,
    ActionForeach,
    Group,
    Copy,
}

impl OutputType {
    pub fn name(self) -> &'static str {
        match self {
            OutputType::Executable => "executable",
            OutputType::SharedLibrary => "shared_library",
            OutputType::StaticLibrary => "static_library",
            OutputType::LoadableModule => "loadable_module",
            OutputType::SourceSet => "source_set",
            OutputType::Action => "action",
            OutputType::ActionForeach => "action_foreach",
            OutputType::Group => "group",
            OutputType::Copy => "copy",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "executable" => OutputType::Executable,
            "shared_library" => OutputType::SharedLibrary,
            "static_library" => OutputType::StaticLibrary,
            "loadable_module" => OutputType::LoadableModule,
            "source_set" => OutputType::SourceSet,
            "action" => OutputType::Action,
            "action_foreach" => OutputType::ActionForeach,
            "group" => OutputType::Group,
            "copy" => OutputType::Copy,
            _ => return None,
        })
    }

    /// Targets that compile sources and are handled by the binary writer.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            OutputType::Executable
                | OutputType::SharedLibrary
                | OutputType::StaticLibrary
                | OutputType::LoadableModule
                | OutputType::SourceSet
        )
    }
}

/// Index of a target in its [`TargetGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(usize);

impl TargetId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTargetPair {
    pub label: Label,
    pub target: TargetId,
}

impl LabelTargetPair {
    pub fn new(label: Label, target: TargetId) -> Self {
        Self { label, target }
    }
}

#[derive(Debug, Clone)]
pub struct Target {
    label: Label,
    output_type: OutputType,
    toolchain: Arc<Toolchain>,
    pub sources: Vec<SourceFile>,
    /// Extra files the compile steps depend on without compiling them.
    pub inputs: Vec<SourceFile>,
    pub public_deps: Vec<LabelTargetPair>,
    pub private_deps: Vec<LabelTargetPair>,
    pub data_deps: Vec<LabelTargetPair>,
    pub output_name: Option<String>,
    /// `None` uses the tool default; `Some("")` means no extension at all.
    pub output_extension: Option<String>,
    pub complete_static_lib: bool,
    pub config_values: ConfigValues,
    /// Values of the configs applied to this target, in application order.
    pub configs: Vec<ConfigValues>,
}

impl Target {
    pub fn new(label: Label, output_type: OutputType, toolchain: Arc<Toolchain>) -> Self {
        Self {
            label,
            output_type,
            toolchain,
            sources: Vec::new(),
            inputs: Vec::new(),
            public_deps: Vec::new(),
            private_deps: Vec::new(),
            data_deps: Vec::new(),
            output_name: None,
            output_extension: None,
            complete_static_lib: false,
            config_values: ConfigValues::default(),
            configs: Vec::new(),
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn output_type(&self) -> OutputType {
        self.output_type
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Public then private dependencies; both are linked the same way.
    pub fn linked_deps(&self) -> impl Iterator<Item = &LabelTargetPair> {
        self.public_deps.iter().chain(self.private_deps.iter())
    }

    /// The target's own values followed by its configs'.
    pub fn all_config_values(&self) -> impl Iterator<Item = &ConfigValues> {
        core::iter::once(&self.config_values).chain(self.configs.iter())
    }

    /// Targets that absorb the code of the libraries and source sets below
    /// them.
    pub fn is_final(&self) -> bool {
        match self.output_type {
            OutputType::Executable | OutputType::SharedLibrary | OutputType::LoadableModule => true,
            OutputType::StaticLibrary => self.complete_static_lib,
            OutputType::SourceSet
            | OutputType::Action
            | OutputType::ActionForeach
            | OutputType::Group
            | OutputType::Copy => false,
        }
    }

    pub fn is_linkable(&self) -> bool {
        matches!(
            self.output_type,
            OutputType::StaticLibrary | OutputType::SharedLibrary
        )
    }

    /// Targets whose outputs may be needed to compile dependents' sources.
    pub fn is_hard_dep(&self) -> bool {
        matches!(
            self.output_type,
            OutputType::Action | OutputType::ActionForeach | OutputType::Copy
        )
    }

    pub fn final_tool_type(&self) -> ToolType {
        self.toolchain.tool_type_for_target_final_output(self.output_type)
    }

    pub fn final_tool(&self) -> Option<&Tool> {
        self.toolchain.tool(self.final_tool_type())
    }

    /// `output_name` or the label name, with the final tool's prefix unless
    /// the name already carries it.
    pub fn computed_output_name(&self) -> String {
        let name = self.output_name.as_deref().unwrap_or(self.label.name());
        let prefix = self.final_tool().map(Tool::output_prefix).unwrap_or("");
        if name.starts_with(prefix) {
            name.into()
        } else {
            format!("{prefix}{name}")
        }
    }

    pub fn computed_output_extension(&self, tool: &Tool) -> String {
        match self.output_extension.as_deref() {
            None => tool.default_output_extension().into(),
            Some("") => String::new(),
            Some(ext) => format!(".{ext}"),
        }
    }

    pub fn has_precompiled_headers(&self) -> bool {
        self.config_values.has_precompiled_headers()
    }

    pub fn settings<'a>(&'a self, build: &'a BuildSettings) -> Settings<'a> {
        Settings::new(build, &self.toolchain)
    }

    /// `{target_out_dir}/{output name}.stamp`, used by targets that produce
    /// nothing linkable.
    fn stamp_file(&self, build: &BuildSettings) -> OutputFile {
        let mut stamp = self.settings(build).out_dir_for(self.label.dir());
        stamp.push_str(&self.computed_output_name());
        stamp.push_str(".stamp");
        stamp
    }

    fn apply_linker_pattern(
        &self,
        build: &BuildSettings,
        tool: &Tool,
        pattern: &SubstitutionPattern,
    ) -> OutputFile {
        let ctx = SubstitutionContext::new(self.settings(build), self).with_tool(tool);
        OutputFile::new(pattern.apply(&ctx))
    }

    /// Every file the final tool writes.
    pub fn link_outputs(&self, build: &BuildSettings) -> Result<Vec<OutputFile>> {
        let tool_type = self.final_tool_type();
        if matches!(tool_type, ToolType::Stamp | ToolType::Copy) {
            return Ok(vec![self.stamp_file(build)]);
        }
        let tool = self.final_tool().with_context_toolchain(|| {
            format!(
                "{} has no \"{}\" tool, needed by {}",
                self.toolchain.label(),
                tool_type.name(),
                self.label
            )
        })?;
        let outputs: Vec<_> = tool
            .outputs()
            .list()
            .iter()
            .map(|pattern| self.apply_linker_pattern(build, tool, pattern))
            .collect();
        if outputs.is_empty() {
            bail_toolchain_error!("the \"{}\" tool has no outputs", tool_type.name());
        }
        Ok(outputs)
    }

    /// The file dependents order themselves after.
    pub fn dependency_output_file(&self, build: &BuildSettings) -> Result<OutputFile> {
        match self.output_type {
            OutputType::SourceSet
            | OutputType::Action
            | OutputType::ActionForeach
            | OutputType::Group
            | OutputType::Copy => Ok(self.stamp_file(build)),
            OutputType::SharedLibrary => {
                if let Some(tool) = self.final_tool()
                    && let Some(pattern) = tool.depend_output()
                {
                    return Ok(self.apply_linker_pattern(build, tool, pattern));
                }
                self.first_link_output(build)
            }
            OutputType::Executable | OutputType::LoadableModule | OutputType::StaticLibrary => {
                self.first_link_output(build)
            }
        }
    }

    /// The file dependents pass to their linker. Only meaningful for
    /// linkable targets.
    pub fn link_output_file(&self, build: &BuildSettings) -> Result<OutputFile> {
        if let Some(tool) = self.final_tool()
            && self.output_type == OutputType::SharedLibrary
            && let Some(pattern) = tool.link_output()
        {
            return Ok(self.apply_linker_pattern(build, tool, pattern));
        }
        self.first_link_output(build)
    }

    fn first_link_output(&self, build: &BuildSettings) -> Result<OutputFile> {
        let mut outputs = self.link_outputs(build)?;
        Ok(outputs.swap_remove(0))
    }
}

/// Arena of resolved targets. Edges are [`TargetId`]s into this arena.
#[derive(Debug, Clone, Default)]
pub struct TargetGraph {
    targets: Vec<Target>,
}

impl TargetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, target: Target) -> TargetId {
        self.targets.push(target);
        TargetId(self.targets.len() - 1)
    }

    pub fn get(&self, id: TargetId) -> Option<&Target> {
        self.targets.get(id.0)
    }

    pub fn get_mut(&mut self, id: TargetId) -> Option<&mut Target> {
        self.targets.get_mut(id.0)
    }

    pub fn target(&self, id: TargetId) -> Result<&Target> {
        self.get(id)
            .with_context_graph(|| format!("no target with index {}", id.0))
    }

    /// A dependency edge pointing at `id`.
    pub fn pair(&self, id: TargetId) -> Result<LabelTargetPair> {
        Ok(LabelTargetPair::new(self.target(id)?.label().clone(), id))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetId, &Target)> {
        self.targets.iter().enumerate().map(|(i, t)| (TargetId(i), t))
    }
}
