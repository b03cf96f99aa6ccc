use pretty_assertions::assert_eq;

use crate::sql_engine::dependency::Dependency;
use crate::sql_engine::graph::DependencyGraph;
use crate::sql_engine::makefile::{make_word, render_makefile, shell_word, MakefileOptions};

fn dep(file: &str, targets: &[&str], sources: &[&str]) -> Dependency {
    Dependency::new(
        file,
        targets.iter().map(|s| s.to_string()).collect(),
        sources.iter().map(|s| s.to_string()).collect(),
    )
}

fn options() -> MakefileOptions {
    MakefileOptions {
        run_command: "run".to_string(),
        sentinel_prefix: "done.".to_string(),
        script_root: String::new(),
    }
}

#[test]
fn test_render_chain() {
    let graph = DependencyGraph::build(vec![
        dep("a.sql", &["t1"], &["raw.base"]),
        dep("b.sql", &["t2"], &["t1"]),
        dep("d.sql", &[], &["t1", "t2"]),
    ])
    .unwrap();

    let expected = "\
.PHONY: all

all: done.a.sql done.b.sql done.d.sql

done.a.sql:
\trun a.sql
\ttouch $@

done.b.sql: done.a.sql
\trun b.sql
\ttouch $@

done.d.sql: done.a.sql done.b.sql
\trun d.sql
\ttouch $@
";
    assert_eq!(render_makefile(&graph, &options()), expected);
}

#[test]
fn test_render_empty_corpus() {
    let graph = DependencyGraph::build(Vec::new()).unwrap();
    assert_eq!(render_makefile(&graph, &options()), ".PHONY: all\n\nall:\n");
}

#[test]
fn test_default_options() {
    let graph = DependencyGraph::build(vec![dep("a.sql", &["t1"], &[])]).unwrap();
    let rendered = render_makefile(&graph, &MakefileOptions::default());

    assert!(rendered.contains("\tbq query --use_legacy_sql=false < a.sql\n"));
    assert!(rendered.contains("\ndone.a.sql:\n"));
}

#[test]
fn test_custom_sentinel_prefix() {
    let graph = DependencyGraph::build(vec![
        dep("a.sql", &["t1"], &[]),
        dep("b.sql", &[], &["t1"]),
    ])
    .unwrap();
    let opts = MakefileOptions {
        sentinel_prefix: ".built/".to_string(),
        ..options()
    };

    let rendered = render_makefile(&graph, &opts);
    assert!(rendered.contains("all: .built/a.sql .built/b.sql\n"));
    assert!(rendered.contains(".built/b.sql: .built/a.sql\n"));
}

#[test]
fn test_render_is_stable() {
    let build = || {
        DependencyGraph::build(vec![
            dep("p.sql", &["tp"], &[]),
            dep("q.sql", &["tq"], &[]),
            dep("r.sql", &[], &["tq", "tp", "tq"]),
        ])
        .unwrap()
    };

    let first = render_makefile(&build(), &options());
    let second = render_makefile(&build(), &options());
    assert_eq!(first, second);
    assert!(first.contains("done.r.sql: done.p.sql done.q.sql\n"));
}

#[test]
fn test_scripts_are_referenced_from_script_root() {
    let graph = DependencyGraph::build(vec![
        dep("a.sql", &["t1"], &[]),
        dep("nested/b.sql", &[], &["t1"]),
    ])
    .unwrap();
    let opts = MakefileOptions {
        script_root: "../sql/".to_string(),
        ..options()
    };

    let rendered = render_makefile(&graph, &opts);
    assert!(rendered.contains("\ndone.a.sql:\n\trun ../sql/a.sql\n"));
    assert!(rendered.contains("\ndone.nested/b.sql: done.a.sql\n\trun ../sql/nested/b.sql\n"));
    assert_eq!(opts.script_path("a.sql"), "../sql/a.sql");
    assert_eq!(options().script_path("a.sql"), "a.sql");
}

#[test]
fn test_awkward_file_names_are_escaped() {
    let graph = DependencyGraph::build(vec![
        dep("my report.sql", &["t1"], &[]),
        dep("cost$.sql", &[], &["t1"]),
    ])
    .unwrap();

    let rendered = render_makefile(&graph, &options());
    assert!(rendered.contains("all: done.my\\ report.sql done.cost$$.sql\n"));
    assert!(rendered.contains("\ndone.my\\ report.sql:\n\trun 'my report.sql'\n"));
    assert!(rendered.contains("\ndone.cost$$.sql: done.my\\ report.sql\n\trun 'cost$$.sql'\n"));
}

#[test]
fn test_make_and_shell_words() {
    assert_eq!(make_word("a.sql"), "a.sql");
    assert_eq!(make_word("x:y #1"), "x\\:y\\ \\#1");
    assert_eq!(shell_word("sql/a.sql"), "sql/a.sql");
    assert_eq!(shell_word("it's.sql"), r"'it'\''s.sql'");
}
