use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, bail};
use log::{debug, info};
use picogn::{FailureState, TargetId, WriterError};
use rayon::prelude::*;

mod cli;
mod manifest;

use cli::Args;
use manifest::{Build, Manifest};

/// The targets to write: every binary target, or the requested ones in
/// graph order.
fn select_targets(build: &Build, args: &Args) -> anyhow::Result<Vec<TargetId>> {
    if args.target.is_empty() {
        return Ok(build
            .graph
            .iter()
            .filter(|(_, target)| target.output_type().is_binary())
            .map(|(id, _)| id)
            .collect());
    }

    let mut ids = Vec::with_capacity(args.target.len());
    for label in &args.target {
        let id = *build
            .ids
            .get(&label.0)
            .with_context(|| format!("Unknown target {}", label.0))?;
        ids.push(id);
    }
    ids.sort();
    ids.dedup();
    Ok(ids)
}

fn emit(build: &Build, ids: &[TargetId], jobs: Option<usize>) -> anyhow::Result<Vec<(TargetId, String)>> {
    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = jobs {
        pool = pool.num_threads(jobs);
    }
    let pool = pool.build().context("Failed to start the worker pool")?;

    let failures = FailureState::new();
    let written: Vec<(TargetId, String)> = pool.install(|| {
        ids.par_iter()
            .filter_map(|&id| {
                let mut out = String::new();
                match picogn::write_binary_target(&build.graph, &build.settings, id, &failures, &mut out) {
                    Ok(()) => Some((id, out)),
                    // Already recorded by the writer.
                    Err(WriterError::DuplicateObjectFile { .. }) => None,
                    Err(err) => {
                        let label = build.graph.get(id).map(|target| target.label().to_string());
                        failures.record(format!("{}: {err}", label.unwrap_or_default()));
                        None
                    }
                }
            })
            .collect()
    });

    if failures.is_failed() {
        bail!(
            "{} ({} error(s))",
            failures.first_error().unwrap_or("Generation failed"),
            failures.error_count()
        );
    }
    Ok(written)
}

pub fn run(args: &Args) -> anyhow::Result<()> {
    let build = Manifest::from_path(&args.manifest)?.resolve()?;
    info!(
        "Loaded {} targets from {}",
        build.graph.len(),
        args.manifest.display()
    );

    let ids = select_targets(&build, args)?;
    let mut written = emit(&build, &ids, args.jobs)?;
    written.sort_by_key(|(id, _)| *id);

    let Some(output_dir) = &args.output_dir else {
        let mut stdout = io::stdout().lock();
        for (_, text) in &written {
            stdout.write_all(text.as_bytes())?;
        }
        return Ok(());
    };

    for (id, text) in &written {
        let target = build.graph.target(*id)?;
        let label = target.label();
        let dir = target.settings(&build.settings).out_dir_for(label.dir());
        let path: PathBuf = output_dir.join(dir.value()).join(format!("{}.ninja", label.name()));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Wrote {}", path.display());
    }
    info!("Wrote {} targets to {}", written.len(), output_dir.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = cli::parse();
    pretty_env_logger::formatted_builder()
        .filter_level(args.log_level())
        .parse_env("RUST_LOG")
        .init();

    run(&args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const MANIFEST: &str = r#"{
        "build_dir": "//out/",
        "default_toolchain": "//tc:gcc",
        "toolchains": [{
            "label": "//tc:gcc",
            "tools": {
                "cc": {
                    "command": "cc {{source}} -o {{output}}",
                    "outputs": ["{{source_out_dir}}/{{target_output_name}}.{{source_name_part}}.o"]
                },
                "alink": {
                    "command": "ar {{output}} {{inputs}}",
                    "outputs": ["{{target_out_dir}}/{{target_output_name}}.a"],
                    "output_prefix": "lib"
                },
                "link": {
                    "command": "ld -o {{output}} {{inputs}} {{libs}}",
                    "outputs": ["{{root_out_dir}}/{{target_output_name}}"]
                }
            }
        }],
        "targets": [
            { "label": "//lib:util", "type": "static_library", "sources": ["util.c"] },
            { "label": "//gen:proto", "type": "action" },
            {
                "label": "//app:main",
                "type": "executable",
                "sources": ["main.c", "main.c"],
                "private_deps": ["//lib:util"]
            },
            { "label": "//app:tool", "type": "executable", "sources": ["tool.c"], "private_deps": ["//lib:util"] }
        ]
    }"#;

    fn args(dir: &tempfile::TempDir, extra: &[&str]) -> Args {
        let manifest = dir.path().join("build.json");
        fs::write(&manifest, MANIFEST).unwrap();
        let mut argv = vec!["picogn".to_string()];
        argv.extend(extra.iter().map(|s| s.to_string()));
        argv.push(manifest.display().to_string());
        Args::parse_from(argv)
    }

    #[test]
    fn test_writes_one_file_per_target() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let args = args(&dir, &["--output-dir", out.to_str().unwrap(), "--target", "//app:tool", "-j", "2"]);
        run(&args).unwrap();

        let text = fs::read_to_string(out.join("obj/app/tool.ninja")).unwrap();
        assert!(text.contains("build obj/app/tool.tool.o: cc ../app/tool.c\n"));
        assert!(text.contains("build ./tool: link obj/app/tool.tool.o obj/lib/libutil.a\n"));
        assert!(!out.join("obj/lib/util.ninja").exists());
    }

    #[test]
    fn test_duplicate_object_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(&dir, &["-j", "1"]);
        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("Duplicate object file"));
    }

    #[test]
    fn test_every_failing_target_is_reported() {
        let mut manifest: serde_json::Value = serde_json::from_str(MANIFEST).unwrap();
        manifest["targets"] = serde_json::json!([
            { "label": "//a:a", "type": "executable", "sources": ["x.c", "x.c"] },
            { "label": "//b:b", "type": "executable", "sources": ["y.c", "y.c"] },
            { "label": "//c:c", "type": "executable", "sources": ["z.c"] },
            { "label": "//d:d", "type": "executable", "sources": ["w.c", "w.c"] }
        ]);
        let build = serde_json::from_value::<Manifest>(manifest).unwrap().resolve().unwrap();
        let ids: Vec<TargetId> = build.graph.iter().map(|(id, _)| id).collect();

        let err = emit(&build, &ids, Some(1)).unwrap_err();
        assert!(err.to_string().starts_with("Duplicate object file"));
        assert!(err.to_string().ends_with("(3 error(s))"));
    }

    #[test]
    fn test_selects_binary_targets_in_graph_order() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(&dir, &["--target", "//app:tool", "--target", "//lib:util", "--target", "//app:tool"]);
        let build = Manifest::from_path(&args.manifest).unwrap().resolve().unwrap();
        let ids = select_targets(&build, &args).unwrap();
        let labels: Vec<String> = ids
            .iter()
            .map(|id| build.graph.target(*id).unwrap().label().to_string())
            .collect();
        assert_eq!(labels, ["//lib:util", "//app:tool"]);

        let all = select_targets(&build, &Args::parse_from(["picogn", "build.json"])).unwrap();
        assert_eq!(all.len(), 3);
    }
}
