//! The JSON build description the driver reads.
//!
//! Paths and labels may be written relative to the target's directory;
//! `//`-rooted and system-absolute values are taken as is.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use hashbrown::HashMap;
use picogn::path::SourceDir;
use picogn::{
    BuildSettings, ConfigValues, Label, LabelTargetPair, LibFile, OutputType, PrecompiledHeaderType,
    Target, TargetGraph, TargetId, Tool, ToolType, Toolchain,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub build_dir: String,
    pub default_toolchain: String,
    pub toolchains: Vec<ToolchainDesc>,
    pub targets: Vec<TargetDesc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainDesc {
    pub label: String,
    pub asm_extensions: Option<Vec<String>>,
    pub tools: BTreeMap<String, ToolDesc>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PchDesc {
    #[default]
    None,
    Msvc,
    Gcc,
}

impl From<PchDesc> for PrecompiledHeaderType {
    fn from(desc: PchDesc) -> Self {
        match desc {
            PchDesc::None => PrecompiledHeaderType::None,
            PchDesc::Msvc => PrecompiledHeaderType::Msvc,
            PchDesc::Gcc => PrecompiledHeaderType::Gcc,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolDesc {
    pub command: String,
    #[serde(default)]
    pub outputs: Vec<String>,
    pub link_output: Option<String>,
    pub depend_output: Option<String>,
    #[serde(default)]
    pub output_prefix: String,
    #[serde(default)]
    pub default_output_extension: String,
    pub lib_switch: Option<String>,
    pub lib_dir_switch: Option<String>,
    #[serde(default)]
    pub precompiled_header_type: PchDesc,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigDesc {
    pub defines: Vec<String>,
    pub include_dirs: Vec<String>,
    pub asmflags: Vec<String>,
    pub cflags: Vec<String>,
    pub cflags_c: Vec<String>,
    pub cflags_cc: Vec<String>,
    pub cppflags: Vec<String>,
    pub cppflags_c: Vec<String>,
    pub cppflags_cc: Vec<String>,
    pub ldflags: Vec<String>,
    pub libs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub precompiled_header: Option<String>,
    pub precompiled_source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetDesc {
    pub label: String,
    #[serde(rename = "type")]
    pub output_type: String,
    pub toolchain: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub public_deps: Vec<String>,
    #[serde(default)]
    pub private_deps: Vec<String>,
    #[serde(default)]
    pub data_deps: Vec<String>,
    pub output_name: Option<String>,
    pub output_extension: Option<String>,
    #[serde(default)]
    pub complete_static_lib: bool,
    #[serde(default)]
    pub config_values: ConfigDesc,
    #[serde(default)]
    pub configs: Vec<ConfigDesc>,
}

/// A loaded build: settings, the target arena and a label index into it.
pub struct Build {
    pub settings: BuildSettings,
    pub graph: TargetGraph,
    pub ids: HashMap<Label, TargetId>,
}

fn parse_label(s: &str) -> anyhow::Result<Label> {
    Label::parse(s).with_context(|| format!("Invalid label `{s}`"))
}

/// `:name` refers to a target in `dir`.
fn resolve_label(s: &str, dir: &SourceDir) -> anyhow::Result<Label> {
    match s.strip_prefix(':') {
        Some(name) => Ok(Label::new(dir.clone(), name)),
        None => parse_label(s),
    }
}

impl ToolDesc {
    fn resolve(&self) -> anyhow::Result<Tool> {
        let mut tool = Tool::new(&self.command)?
            .with_outputs(&self.outputs)?
            .with_output_prefix(self.output_prefix.as_str())
            .with_default_output_extension(self.default_output_extension.as_str())
            .with_precompiled_header_type(self.precompiled_header_type.into());
        if let Some(pattern) = &self.link_output {
            tool = tool.with_link_output(pattern)?;
        }
        if let Some(pattern) = &self.depend_output {
            tool = tool.with_depend_output(pattern)?;
        }
        if let Some(switch) = &self.lib_switch {
            tool = tool.with_lib_switch(switch.as_str());
        }
        if let Some(switch) = &self.lib_dir_switch {
            tool = tool.with_lib_dir_switch(switch.as_str());
        }
        Ok(tool)
    }
}

impl ToolchainDesc {
    fn resolve(&self) -> anyhow::Result<Toolchain> {
        let mut toolchain = Toolchain::new(parse_label(&self.label)?);
        if let Some(extensions) = &self.asm_extensions {
            toolchain.set_asm_extensions(extensions.iter().cloned());
        }
        for (name, desc) in &self.tools {
            let tool_type = ToolType::from_name(name)
                .with_context(|| format!("Unknown tool `{name}` in {}", self.label))?;
            let tool = desc
                .resolve()
                .with_context(|| format!("Invalid tool `{name}` in {}", self.label))?;
            toolchain.set_tool(tool_type, tool)?;
        }
        Ok(toolchain)
    }
}

impl ConfigDesc {
    fn resolve(&self, dir: &SourceDir) -> ConfigValues {
        let dirs = |names: &[String]| names.iter().map(|name| dir.resolve_dir(name)).collect();
        ConfigValues {
            defines: self.defines.clone(),
            include_dirs: dirs(&self.include_dirs),
            asmflags: self.asmflags.clone(),
            cflags: self.cflags.clone(),
            cflags_c: self.cflags_c.clone(),
            cflags_cc: self.cflags_cc.clone(),
            cppflags: self.cppflags.clone(),
            cppflags_c: self.cppflags_c.clone(),
            cppflags_cc: self.cppflags_cc.clone(),
            ldflags: self.ldflags.clone(),
            libs: self.libs.iter().map(|lib| LibFile::parse(lib, dir)).collect(),
            lib_dirs: dirs(&self.lib_dirs),
            precompiled_header: self.precompiled_header.clone(),
            precompiled_source: self.precompiled_source.as_deref().map(|s| dir.resolve_file(s)),
        }
    }
}

impl Manifest {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Builds the target graph, resolving every dependency label to its
    /// target.
    pub fn resolve(self) -> anyhow::Result<Build> {
        let default_toolchain = parse_label(&self.default_toolchain)?;
        let settings = BuildSettings::new(SourceDir::new(&self.build_dir), default_toolchain.clone());

        let mut toolchains = HashMap::new();
        for desc in &self.toolchains {
            let toolchain = desc.resolve()?;
            toolchains.insert(toolchain.label().clone(), Arc::new(toolchain));
        }

        let mut graph = TargetGraph::new();
        let mut ids = HashMap::new();
        let mut edges = Vec::new();
        for desc in self.targets {
            let label = parse_label(&desc.label)?;
            let dir = label.dir().clone();

            let toolchain_label = match &desc.toolchain {
                Some(name) => parse_label(name)?,
                None => default_toolchain.clone(),
            };
            let toolchain = toolchains
                .get(&toolchain_label)
                .with_context(|| format!("{label} uses unknown toolchain {toolchain_label}"))?
                .clone();
            let output_type = OutputType::from_name(&desc.output_type)
                .with_context(|| format!("{label} has unknown type `{}`", desc.output_type))?;

            let mut target = Target::new(label.clone(), output_type, toolchain);
            target.sources = desc.sources.iter().map(|s| dir.resolve_file(s)).collect();
            target.inputs = desc.inputs.iter().map(|s| dir.resolve_file(s)).collect();
            target.output_name = desc.output_name;
            target.output_extension = desc.output_extension;
            target.complete_static_lib = desc.complete_static_lib;
            target.config_values = desc.config_values.resolve(&dir);
            target.configs = desc.configs.iter().map(|c| c.resolve(&dir)).collect();

            let id = graph.add(target);
            if ids.insert(label.clone(), id).is_some() {
                bail!("Target {label} is defined twice");
            }
            edges.push((id, dir, desc.public_deps, desc.private_deps, desc.data_deps));
        }

        let pairs = |names: &[String], dir: &SourceDir| -> anyhow::Result<Vec<LabelTargetPair>> {
            names
                .iter()
                .map(|name| -> anyhow::Result<LabelTargetPair> {
                    let label = resolve_label(name, dir)?;
                    let id = *ids.get(&label).with_context(|| format!("Unknown dependency {label}"))?;
                    Ok(LabelTargetPair::new(label, id))
                })
                .collect()
        };
        let mut resolved = Vec::with_capacity(edges.len());
        for (id, dir, public, private, data) in &edges {
            let public = pairs(public, dir)?;
            let private = pairs(private, dir)?;
            let data = pairs(data, dir)?;
            resolved.push((*id, public, private, data));
        }
        for (id, public, private, data) in resolved {
            let target = graph.get_mut(id).context("Target vanished from the graph")?;
            target.public_deps = public;
            target.private_deps = private;
            target.data_deps = data;
        }

        Ok(Build {
            settings,
            graph,
            ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use picogn::path::SourceFile;
    use tempfile::NamedTempFile;

    const MANIFEST: &str = r#"{
        "build_dir": "//out/Debug/",
        "default_toolchain": "//toolchain:default",
        "toolchains": [{
            "label": "//toolchain:default",
            "tools": {
                "cxx": {
                    "command": "c++ {{source}} {{cflags}} {{cflags_cc}} {{defines}} -o {{output}}",
                    "outputs": ["{{source_out_dir}}/{{target_output_name}}.{{source_name_part}}.o"]
                },
                "link": {
                    "command": "ld -o {{output}} {{inputs}} {{ldflags}} {{libs}}",
                    "outputs": ["{{root_out_dir}}/{{target_output_name}}"]
                },
                "stamp": { "command": "touch {{output}}" }
            }
        }],
        "targets": [
            {
                "label": "//base:base",
                "type": "source_set",
                "sources": ["strings.cc"],
                "config_values": { "libs": ["pthread"] }
            },
            {
                "label": "//app:app",
                "type": "executable",
                "sources": ["main.cc"],
                "public_deps": ["//base:base"],
                "config_values": { "defines": ["NDEBUG"] }
            }
        ]
    }"#;

    fn manifest_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_and_write() {
        let file = manifest_file();
        let build = Manifest::from_path(file.path()).unwrap().resolve().unwrap();
        assert_eq!(build.graph.len(), 2);

        let app = build.ids[&Label::parse("//app:app").unwrap()];
        let target = build.graph.target(app).unwrap();
        assert_eq!(target.sources, [SourceFile::new("//app/main.cc")]);
        assert_eq!(target.public_deps[0].label.to_string(), "//base:base");

        let failures = picogn::FailureState::new();
        let mut out = String::new();
        picogn::write_binary_target(&build.graph, &build.settings, app, &failures, &mut out).unwrap();
        assert_eq!(
            out,
            "defines = -DNDEBUG\n\
             cflags =\n\
             cflags_cc =\n\
             root_out_dir = .\n\
             target_output_name = app\n\
             \n\
             build obj/app/app.main.o: cxx ../../app/main.cc\n  \
             source_name_part = main\n  \
             source_out_dir = obj/app\n\
             \n\
             build ./app: link obj/app/app.main.o obj/base/base.strings.o || obj/base/base.stamp\n  \
             ldflags =\n  \
             libs = -lpthread\n  \
             output_extension = \n"
        );
    }

    #[test]
    fn test_unknown_dependency() {
        let manifest: Manifest = serde_json::from_str(
            r#"{
                "build_dir": "//out/",
                "default_toolchain": "//tc:tc",
                "toolchains": [{ "label": "//tc:tc", "tools": {} }],
                "targets": [{ "label": "//a:a", "type": "group", "public_deps": [":missing"] }]
            }"#,
        )
        .unwrap();
        let err = manifest.resolve().err().unwrap();
        assert!(err.to_string().contains("Unknown dependency //a:missing"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = serde_json::from_str::<ConfigDesc>(r#"{ "cflag": ["-O2"] }"#);
        assert!(result.is_err());
    }
}
