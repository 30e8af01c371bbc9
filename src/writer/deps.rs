//! Flattening of a target's dependency graph into what its edges reference.

use hashbrown::HashSet;
use log::trace;

use crate::config_values::LibFile;
use crate::error::{Result, bail_graph_error};
use crate::path::{OutputFile, SourceDir, SourceFile};
use crate::settings::BuildSettings;
use crate::target::{OutputType, Target, TargetGraph, TargetId};
use crate::unique_vec::UniqueVec;

use super::SourceOutputs;

/// What a target's link or stamp edge pulls in from its dependencies.
#[derive(Debug, Default)]
pub struct Deps {
    /// Objects of source sets absorbed by a linking target.
    pub extra_object_files: UniqueVec<OutputFile>,
    /// Libraries passed to the linker.
    pub linkable_deps: UniqueVec<TargetId>,
    /// Targets only ordered before this one.
    pub non_linkable_deps: UniqueVec<TargetId>,
    pub all_libs: UniqueVec<LibFile>,
    pub all_lib_dirs: UniqueVec<SourceDir>,
}

/// Whether the traversal continues below a dependency of this kind.
fn passes_through(dep: &Target) -> bool {
    match dep.output_type() {
        OutputType::SourceSet | OutputType::Group => true,
        OutputType::StaticLibrary => !dep.complete_static_lib,
        _ => false,
    }
}

struct Flattener<'a> {
    graph: &'a TargetGraph,
    build: &'a BuildSettings,
    can_link: bool,
    stack: Vec<TargetId>,
    expanded: HashSet<TargetId>,
    deps: Deps,
}

impl Flattener<'_> {
    fn collect_libs(&mut self, target: &Target) {
        for values in target.all_config_values() {
            self.deps.all_libs.extend(values.libs.iter().cloned());
            self.deps.all_lib_dirs.extend(values.lib_dirs.iter().cloned());
        }
    }

    fn visit(&mut self, current: &Target, depth: usize) -> Result<()> {
        for pair in current.linked_deps() {
            let id = pair.target;
            let dep = self.graph.target(id)?;
            if self.stack.contains(&id) {
                bail_graph_error!("dependency cycle through {} from {}", pair.label, current.label());
            }

            if depth == 0
                || matches!(
                    dep.output_type(),
                    OutputType::SourceSet | OutputType::StaticLibrary | OutputType::SharedLibrary
                )
            {
                self.classify(id, dep);
            }

            if passes_through(dep) && self.expanded.insert(id) {
                self.collect_libs(dep);
                self.stack.push(id);
                self.visit(dep, depth + 1)?;
                self.stack.pop();
            }
        }
        Ok(())
    }

    fn classify(&mut self, id: TargetId, dep: &Target) {
        if dep.output_type() == OutputType::SourceSet {
            if self.can_link {
                let objects = object_files(self.build, dep);
                self.deps.extra_object_files.extend(objects);
            }
            self.deps.non_linkable_deps.push(id);
        } else if self.can_link && dep.is_linkable() {
            self.deps.linkable_deps.push(id);
        } else {
            self.deps.non_linkable_deps.push(id);
        }
    }
}

/// The objects a source set contributes to whatever links it.
fn object_files(build: &BuildSettings, target: &Target) -> Vec<OutputFile> {
    let mut result = Vec::new();
    for source in &target.sources {
        match SourceOutputs::compute(build, target, source) {
            SourceOutputs::Compiled { mut outputs, .. } if !outputs.is_empty() => {
                result.push(outputs.swap_remove(0));
            }
            SourceOutputs::Object(file) => result.push(file),
            _ => {}
        }
    }
    result
}

impl Deps {
    pub fn compute(graph: &TargetGraph, build: &BuildSettings, id: TargetId) -> Result<Self> {
        let target = graph.target(id)?;
        let mut flattener = Flattener {
            graph,
            build,
            can_link: target.is_final(),
            stack: vec![id],
            expanded: HashSet::new(),
            deps: Deps::default(),
        };

        flattener.collect_libs(target);
        flattener.visit(target, 0)?;

        for pair in &target.data_deps {
            graph.target(pair.target)?;
            flattener.deps.non_linkable_deps.push(pair.target);
        }

        let deps = flattener.deps;
        trace!(
            "{}: {} extra objects, {} linkable, {} non-linkable",
            target.label(),
            deps.extra_object_files.len(),
            deps.linkable_deps.len(),
            deps.non_linkable_deps.len()
        );
        Ok(deps)
    }
}

/// Things the compile steps must wait for.
#[derive(Debug, Default)]
pub struct InputDeps {
    pub files: Vec<SourceFile>,
    pub targets: UniqueVec<TargetId>,
}

impl InputDeps {
    pub fn compute(graph: &TargetGraph, id: TargetId) -> Result<Self> {
        let target = graph.target(id)?;
        let mut input_deps = InputDeps {
            files: target.inputs.clone(),
            targets: UniqueVec::new(),
        };
        let mut stack = vec![id];
        let mut expanded = HashSet::new();
        input_deps.visit(graph, target, &mut stack, &mut expanded)?;
        Ok(input_deps)
    }

    fn visit(
        &mut self,
        graph: &TargetGraph,
        current: &Target,
        stack: &mut Vec<TargetId>,
        expanded: &mut HashSet<TargetId>,
    ) -> Result<()> {
        for pair in current.linked_deps() {
            let id = pair.target;
            let dep = graph.target(id)?;
            if stack.contains(&id) {
                bail_graph_error!("dependency cycle through {} from {}", pair.label, current.label());
            }
            if dep.is_hard_dep() {
                self.targets.push(id);
            }
            if expanded.insert(id) {
                stack.push(id);
                self.visit(graph, dep, stack, expanded)?;
                stack.pop();
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
