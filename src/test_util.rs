use std::sync::Arc;

use crate::error::Result;
use crate::label::Label;
use crate::path::SourceDir;
use crate::scheduler::FailureState;
use crate::settings::BuildSettings;
use crate::target::{LabelTargetPair, OutputType, Target, TargetGraph, TargetId};
use crate::tool::{PrecompiledHeaderType, Tool};
use crate::toolchain::{ToolType, Toolchain};
use crate::writer::NinjaBinaryTargetWriter;

const OBJECT_OUTPUT: &str = "{{source_out_dir}}/{{target_output_name}}.{{source_name_part}}.o";

/// A build in `//out/Debug/` with a conventional GCC-like default toolchain.
pub struct TestSetup {
    pub build_settings: BuildSettings,
    pub toolchain: Arc<Toolchain>,
    pub graph: TargetGraph,
    pub failures: FailureState,
}

fn compiler(command: &str) -> Tool {
    Tool::new(command).unwrap().with_outputs(&[OBJECT_OUTPUT]).unwrap()
}

fn default_toolchain() -> Toolchain {
    let mut toolchain = Toolchain::new(Label::parse("//toolchain:default").unwrap());
    toolchain.set_asm_extensions(["asm", "s", "arm"]);

    toolchain
        .set_tool(
            ToolType::Cc,
            compiler(
                "cc {{source}} {{cflags}} {{cppflags}} {{cflags_c}} {{cppflags_c}} \
                 {{defines}} {{include_dirs}} -o {{output}}",
            ),
        )
        .unwrap()
        .set_tool(
            ToolType::Cxx,
            compiler(
                "cxx {{source}} {{cflags}} {{cppflags}} {{cflags_cc}} {{cppflags_cc}} \
                 {{defines}} {{include_dirs}} -o {{output}}",
            ),
        )
        .unwrap()
        .set_tool(ToolType::Asm, compiler("as {{source}} {{asmflags}} -o {{output}}"))
        .unwrap();

    let alink = Tool::new("ar {{output}} {{source}}")
        .unwrap()
        .with_outputs(&["{{target_out_dir}}/{{target_output_name}}.a"])
        .unwrap()
        .with_output_prefix("lib");
    toolchain.set_tool(ToolType::Alink, alink).unwrap();

    let shared_outputs = ["{{root_out_dir}}/{{target_output_name}}{{output_extension}}"];
    let solink = Tool::new("ld -shared -o {{target_output_name}}.so {{inputs}} {{ldflags}} {{libs}}")
        .unwrap()
        .with_outputs(&shared_outputs)
        .unwrap()
        .with_output_prefix("lib")
        .with_default_output_extension(".so");
    toolchain.set_tool(ToolType::Solink, solink).unwrap();

    let solink_module = Tool::new("ld -bundle -o {{target_output_name}}.so {{inputs}} {{ldflags}} {{libs}}")
        .unwrap()
        .with_outputs(&shared_outputs)
        .unwrap()
        .with_output_prefix("lib")
        .with_default_output_extension(".so");
    toolchain.set_tool(ToolType::SolinkModule, solink_module).unwrap();

    let link = Tool::new("ld -o {{target_output_name}} {{source}} {{ldflags}} {{libs}}")
        .unwrap()
        .with_outputs(&shared_outputs)
        .unwrap();
    toolchain.set_tool(ToolType::Link, link).unwrap();

    toolchain
        .set_tool(ToolType::Stamp, Tool::new("touch {{output}}").unwrap())
        .unwrap()
        .set_tool(ToolType::Copy, Tool::new("cp {{source}} {{output}}").unwrap())
        .unwrap();

    toolchain
}

impl TestSetup {
    pub fn new() -> Self {
        let toolchain = default_toolchain();
        let build_settings = BuildSettings::new(SourceDir::new("//out/Debug/"), toolchain.label().clone());
        Self {
            build_settings,
            toolchain: Arc::new(toolchain),
            graph: TargetGraph::new(),
            failures: FailureState::new(),
        }
    }

    /// A secondary toolchain `//toolchain:withpch` whose C and C++ compilers
    /// build precompiled headers the given way. It has no stamp tool.
    pub fn pch_toolchain(&self, header_type: PrecompiledHeaderType) -> Arc<Toolchain> {
        let mut toolchain = Toolchain::new(Label::parse("//toolchain:withpch").unwrap());
        toolchain
            .set_tool(
                ToolType::Cxx,
                compiler("c++ {{source}} {{cflags}} {{cflags_cc}} {{defines}} {{include_dirs}} -o {{output}}")
                    .with_precompiled_header_type(header_type),
            )
            .unwrap()
            .set_tool(
                ToolType::Cc,
                compiler("cc {{source}} {{cflags}} {{cflags_c}} {{defines}} {{include_dirs}} -o {{output}}")
                    .with_precompiled_header_type(header_type),
            )
            .unwrap();
        Arc::new(toolchain)
    }

    pub fn target(&self, label: &str, output_type: OutputType) -> Target {
        self.target_in(label, output_type, self.toolchain.clone())
    }

    pub fn target_in(&self, label: &str, output_type: OutputType, toolchain: Arc<Toolchain>) -> Target {
        Target::new(Label::parse(label).unwrap(), output_type, toolchain)
    }

    pub fn add(&mut self, target: Target) -> TargetId {
        self.graph.add(target)
    }

    pub fn pair(&self, id: TargetId) -> LabelTargetPair {
        self.graph.pair(id).unwrap()
    }

    pub fn try_write(&self, id: TargetId) -> Result<String> {
        let mut out = String::new();
        NinjaBinaryTargetWriter::new(&self.graph, &self.build_settings, id, &self.failures)?.run(&mut out)?;
        Ok(out)
    }

    pub fn write(&self, id: TargetId) -> String {
        self.try_write(id).unwrap()
    }
}
