use std::collections::BTreeSet;

use crate::sql_engine::dependency::Dependency;
use crate::sql_engine::error::GraphError;
use crate::sql_engine::graph::DependencyGraph;

fn dep(file: &str, targets: &[&str], sources: &[&str]) -> Dependency {
    Dependency::new(
        file,
        targets.iter().map(|s| s.to_string()).collect(),
        sources.iter().map(|s| s.to_string()).collect(),
    )
}

fn files(deps: &[&Dependency]) -> Vec<String> {
    deps.iter().map(|d| d.file.clone()).collect()
}

#[test]
fn test_external_sources_are_dropped() {
    let graph = DependencyGraph::build(vec![
        dep("a.sql", &["t1"], &["raw.base"]),
        dep("b.sql", &["t2"], &["t1", "raw.other", "t1"]),
    ])
    .unwrap();

    let deps = graph.dependencies();
    assert!(deps[0].sources.is_empty());
    assert_eq!(deps[1].sources, vec!["t1".to_string(), "t1".to_string()]);
    assert_eq!(deps[1].targets, vec!["t2".to_string()]);
    assert_eq!(graph.prerequisites(&deps[1]), vec!["a.sql"]);
    assert!(graph.prerequisites(&deps[0]).is_empty());
}

#[test]
fn test_filtered_sources_are_owned_targets() {
    let graph = DependencyGraph::build(vec![
        dep("a.sql", &["t1"], &["raw.x", "t3"]),
        dep("b.sql", &["t2"], &["t1", "raw.y"]),
        dep("c.sql", &["t3"], &["t2", "t1", "raw.z"]),
        dep("d.sql", &[], &["t3"]),
    ])
    .unwrap();

    let all_targets: BTreeSet<&str> = graph
        .dependencies()
        .iter()
        .flat_map(|d| d.targets.iter().map(String::as_str))
        .collect();

    for d in graph.dependencies() {
        for source in &d.sources {
            assert!(all_targets.contains(source.as_str()));
            assert!(graph.owner_map().contains_key(source));
        }
    }
    assert_eq!(graph.owner_of("t3"), Some("c.sql"));
    assert_eq!(graph.owner_of("raw.z"), None);
}

#[test]
fn test_duplicate_targets_are_fatal() {
    let err = DependencyGraph::build(vec![
        dep("a.sql", &["t1"], &[]),
        dep("b.sql", &["t1"], &[]),
        dep("c.sql", &["t2", "t2"], &[]),
        dep("d.sql", &["t3"], &[]),
    ])
    .unwrap_err();

    assert_eq!(err.duplicate_tables(), vec!["t1", "t2"]);
    match &err {
        GraphError::DuplicateTarget(dups) => {
            assert_eq!(dups[0].files, vec!["a.sql".to_string(), "b.sql".to_string()]);
            assert_eq!(dups[1].files, vec!["c.sql".to_string(), "c.sql".to_string()]);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(
        err.to_string(),
        "duplicate target table(s): t1 (a.sql, b.sql), t2 (c.sql, c.sql)"
    );
}

#[test]
fn test_prerequisites_are_deduplicated_and_sorted() {
    let graph = DependencyGraph::build(vec![
        dep("z.sql", &["tz"], &[]),
        dep("a.sql", &["ta", "ta2"], &[]),
        dep("m.sql", &["tm"], &["tz", "ta2", "ta", "tz"]),
    ])
    .unwrap();

    assert_eq!(graph.prerequisites(&graph.dependencies()[2]), vec!["a.sql", "z.sql"]);
}

#[test]
fn test_reading_own_target_adds_no_edge() {
    let graph = DependencyGraph::build(vec![dep("a.sql", &["t1"], &["t1"])]).unwrap();

    assert_eq!(graph.owner_of("t1"), Some("a.sql"));
    assert!(graph.prerequisites(&graph.dependencies()[0]).is_empty());
    assert!(graph.detect_cycles().is_empty());
}

#[test]
fn test_plain_reader_depends_on_producer() {
    let graph = DependencyGraph::build(vec![
        dep("a.sql", &["t1"], &["raw.base"]),
        dep("d.sql", &[], &["t1"]),
    ])
    .unwrap();
    assert_eq!(graph.prerequisites(&graph.dependencies()[1]), vec!["a.sql"]);
}

#[test]
fn test_cycles_are_detected() {
    let graph = DependencyGraph::build(vec![
        dep("x.sql", &["tx"], &["ty"]),
        dep("y.sql", &["ty"], &["tx"]),
        dep("z.sql", &["tz"], &["tx"]),
    ])
    .unwrap();

    assert_eq!(
        graph.detect_cycles(),
        vec![vec!["x.sql".to_string(), "y.sql".to_string()]]
    );
    assert!(matches!(
        graph.ensure_acyclic(),
        Err(GraphError::CircularDependency(_))
    ));
    assert!(graph.execution_order().is_err());
}

#[test]
fn test_execution_order_prefers_input_order() {
    let graph = DependencyGraph::build(vec![
        dep("c.sql", &["tc"], &["ta"]),
        dep("b.sql", &["tb"], &[]),
        dep("a.sql", &["ta"], &["tb"]),
    ])
    .unwrap();

    let order = graph.execution_order().unwrap();
    assert_eq!(files(&order), vec!["b.sql", "a.sql", "c.sql"]);
    assert!(graph.ensure_acyclic().is_ok());
}

#[test]
fn test_dot_graph() {
    let graph = DependencyGraph::build(vec![
        dep("b.sql", &["t2"], &["t1"]),
        dep("a.sql", &["t1"], &[]),
    ])
    .unwrap();

    let dot = graph.to_dot_graph();
    assert!(dot.starts_with("digraph files {"));
    assert!(dot.contains("  \"a.sql\";\n  \"b.sql\";\n"));
    assert!(dot.contains("  \"a.sql\" -> \"b.sql\";\n"));
}
