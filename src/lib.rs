mod config_values;
mod error;
mod escape;
mod label;
pub mod path;
mod scheduler;
mod settings;
mod source_file_type;
mod substitution;
mod target;
mod tool;
mod toolchain;
mod unique_vec;
mod writer;

#[cfg(test)]
mod test_util;

pub use config_values::{ConfigValues, LibFile};
pub use error::{Result, WriterError};
pub use escape::{EscapeMode, escape};
pub use label::Label;
pub use scheduler::FailureState;
pub use settings::{BuildSettings, Settings};
pub use source_file_type::SourceFileType;
pub use substitution::{SubstitutionContext, SubstitutionPattern, SubstitutionType};
pub use target::{LabelTargetPair, OutputType, Target, TargetGraph, TargetId};
pub use tool::{PrecompiledHeaderType, Tool};
pub use toolchain::{ToolType, Toolchain};
pub use unique_vec::UniqueVec;
pub use writer::{Deps, InputDeps, NinjaBinaryTargetWriter};

/// Writes the edges of the binary target `id` to `out`.
///
/// Duplicate object files are also recorded in `failures`. Other targets
/// can still be written; check `failures` once all of them are done.
pub fn write_binary_target(
    graph: &TargetGraph,
    build: &BuildSettings,
    id: TargetId,
    failures: &FailureState,
    out: &mut String,
) -> Result<()> {
    NinjaBinaryTargetWriter::new(graph, build, id, failures)?.run(out)
}
