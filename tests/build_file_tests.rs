//! End-to-end tests for collection and emission over toy processors.
#![allow(clippy::expect_used, reason = "tests use expect for ease of debugging")]

use std::sync::Arc;

use camino::Utf8PathBuf;
use kumiko::codebase::c::{Executable, Source, SourceLang};
use kumiko::ir::{BuildGraph, Dep, Rule, Target};
use kumiko::ninja_gen;
use kumiko::toolchain::Toolchain;
use rstest::rstest;

/// A minimal object-file/link toolchain: `cc` compiles one source, `ld`
/// links every target its executable's sources produced.
fn toy_toolchain() -> Toolchain {
    let cc = Arc::new(Rule::new("cc", "cc -c $in -o $out"));
    let ld = Arc::new(Rule::new("ld", "cc -o $out $in"));

    let mut tools = Toolchain::new(".", "build");
    tools
        .register::<Source, _>(move |_, src| {
            let target = Arc::new(
                Target::new(format!("obj/{}.o", src.path), Arc::clone(&cc))
                    .with_deps([Dep::from(src.path.as_str())]),
            );
            Ok(vec![target])
        })
        .expect("register source processor");
    tools
        .register::<Executable, _>(move |tc, exe| {
            let mut produced = Vec::new();
            for src in &exe.srcs {
                produced.extend(tc.process(src)?);
            }
            let deps: Vec<Dep> = produced.iter().map(Dep::from).collect();
            let target =
                Arc::new(Target::new(exe.name.clone(), Arc::clone(&ld)).with_deps(deps));
            Ok(vec![target])
        })
        .expect("register executable processor");
    tools
}

fn app() -> Executable {
    Executable::new("app").with_srcs([Source::with_lang("main.c", SourceLang::C)])
}

#[rstest]
fn source_round_trips_through_object_processor() {
    let tools = toy_toolchain();
    let src = Source::with_lang("main.c", SourceLang::C);

    let targets = tools.process(&src).expect("process source");
    let target = targets.first().expect("object target");

    assert_eq!(targets.len(), 1);
    assert_eq!(target.name(), "obj/main.c.o");
    assert_eq!(target.rule().name, "cc");
    assert_eq!(target.deps().first().map(Dep::name), Some("main.c"));
}

#[rstest]
fn executable_round_trips_to_two_build_statements() {
    let tools = toy_toolchain();

    let targets = tools.process(&app()).expect("process executable");
    let graph = BuildGraph::collect(&targets).expect("collect");
    let text = ninja_gen::generate(&graph);

    assert!(text.contains("build obj/main.c.o : cc main.c\n"));
    assert!(text.contains("build app : ld obj/main.c.o\n"));
    assert_eq!(text.matches("rule cc\n").count(), 1);
    assert_eq!(text.matches("rule ld\n").count(), 1);
}

#[rstest]
fn phony_target_aggregates_without_a_rule_block() {
    let tools = toy_toolchain();
    let targets = tools.process(&app()).expect("process");

    let all = Arc::new(
        Target::new("all", Arc::new(Rule::phony()))
            .with_deps(targets.iter().map(Dep::from)),
    );
    let graph = BuildGraph::collect([&all]).expect("collect");
    let text = ninja_gen::generate(&graph);

    assert!(text.contains("build all : phony app\n"));
    assert!(!text.contains("rule phony"));
}

#[rstest]
fn independent_runs_emit_identical_bytes() {
    let render = || {
        let tools = toy_toolchain();
        let targets = tools.process(&app()).expect("process");
        let graph = BuildGraph::collect(&targets).expect("collect");
        ninja_gen::generate(&graph)
    };

    assert_eq!(render(), render());
}

#[rstest]
fn build_file_lands_on_disk_byte_for_byte() -> anyhow::Result<()> {
    let tools = toy_toolchain();
    let targets = tools.process(&app())?;
    let graph = BuildGraph::collect(&targets)?;

    let dir = tempfile::tempdir()?;
    let path = Utf8PathBuf::from_path_buf(dir.path().join("build.ninja"))
        .map_err(|p| anyhow::anyhow!("non-UTF-8 temp path: {}", p.display()))?;
    ninja_gen::write_build_file(&path, &graph)?;

    assert_eq!(std::fs::read_to_string(&path)?, ninja_gen::generate(&graph));
    Ok(())
}
