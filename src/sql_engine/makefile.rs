//! Rendering of the dependency graph as a Makefile
use super::graph::DependencyGraph;

pub const DEFAULT_RUN_COMMAND: &str = "bq query --use_legacy_sql=false <";
pub const DEFAULT_SENTINEL_PREFIX: &str = "done.";

/// How rule bodies and sentinel names are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakefileOptions {
    /// Command each rule runs, followed by the script's path
    pub run_command: String,
    pub sentinel_prefix: String,
    /// Directory of the scripts as seen from the Makefile's directory, empty when they coincide
    pub script_root: String,
}

impl Default for MakefileOptions {
    fn default() -> Self {
        Self {
            run_command: DEFAULT_RUN_COMMAND.to_string(),
            sentinel_prefix: DEFAULT_SENTINEL_PREFIX.to_string(),
            script_root: String::new(),
        }
    }
}

impl MakefileOptions {
    pub fn sentinel(&self, file: &str) -> String {
        format!("{}{}", self.sentinel_prefix, file)
    }

    /// Path of a script relative to the directory make runs in
    pub fn script_path(&self, file: &str) -> String {
        let root = self.script_root.trim_end_matches('/');
        if root.is_empty() || root == "." {
            file.to_string()
        } else {
            format!("{}/{}", root, file)
        }
    }
}

/// Render the phony aggregate followed by one rule per file, in input order
pub fn render_makefile(graph: &DependencyGraph, options: &MakefileOptions) -> String {
    let sentinels: Vec<String> = graph
        .dependencies()
        .iter()
        .map(|dep| options.sentinel(&dep.file))
        .collect();

    let mut result = String::from(".PHONY: all\n\n");
    result.push_str(&format!("{}\n", rule_head("all", &sentinels)));

    for dep in graph.dependencies() {
        let prerequisites: Vec<String> = graph
            .prerequisites(dep)
            .into_iter()
            .map(|owner| options.sentinel(owner))
            .collect();

        result.push('\n');
        result.push_str(&format!(
            "{}\n",
            rule_head(&options.sentinel(&dep.file), &prerequisites)
        ));
        result.push_str(&format!(
            "\t{} {}\n",
            options.run_command,
            shell_word(&options.script_path(&dep.file))
        ));
        result.push_str("\ttouch $@\n");
    }

    result
}

fn rule_head(target: &str, prerequisites: &[String]) -> String {
    let target = make_word(target);
    if prerequisites.is_empty() {
        format!("{}:", target)
    } else {
        let prerequisites: Vec<String> = prerequisites.iter().map(|p| make_word(p)).collect();
        format!("{}: {}", target, prerequisites.join(" "))
    }
}

/// Escape a name for a rule's target or prerequisite list
pub fn make_word(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '$' => escaped.push_str("$$"),
            ' ' | ':' | '#' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Quote a path for a recipe line: single-quoted for the shell when needed, `$` doubled for make
pub fn shell_word(path: &str) -> String {
    let plain = path
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._-/+,@%=".contains(c));
    let quoted = if plain {
        path.to_string()
    } else {
        format!("'{}'", path.replace('\'', r"'\''"))
    };
    quoted.replace('$', "$$")
}
