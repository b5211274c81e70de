//! Import rewriting for host-provided modules
//!
//! Extensions are authored as ES modules importing `react` and a small
//! closed set of markdown/math libraries that the host page already bundles.
//! There is no module resolver at evaluation time, so those imports are
//! rewritten into `const` declarations reading from host-installed globals
//! (`__PYXIS_REACT__`, `__PYXIS_MARKDOWN__.*`) before the code is evaluated.
//!
//! The rewrite is a single linear pass and idempotent: its output contains
//! no import statement for an allow-listed module, so a second pass is a
//! no-op. Imports of modules outside the allow-list are left untouched.
//! Occurrences inside strings or comments that lexically match an import
//! form are also rewritten; the rewriter runs on pre-compiled output where
//! such occurrences do not appear.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Allow-listed modules and the host global expression each resolves to.
const HOST_MODULES: &[(&str, &str)] = &[
    ("react", "__PYXIS_REACT__"),
    ("react-markdown", "__PYXIS_MARKDOWN__.reactMarkdown"),
    ("remark-gfm", "__PYXIS_MARKDOWN__.remarkGfm"),
    ("remark-math", "__PYXIS_MARKDOWN__.remarkMath"),
    ("rehype-katex", "__PYXIS_MARKDOWN__.rehypeKatex"),
    ("rehype-raw", "__PYXIS_MARKDOWN__.rehypeRaw"),
    ("katex", "__PYXIS_MARKDOWN__.katex"),
];

fn host_global(module: &str) -> Option<&'static str> {
    HOST_MODULES
        .iter()
        .find(|(name, _)| *name == module)
        .map(|(_, global)| *global)
}

fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?m)^(?P<indent>[ \t]*)import\s+(?:\*\s*as\s+(?P<ns>\w+)|(?P<def2>\w+)\s*,\s*\{(?P<named2>[^}]*)\}|\{(?P<named>[^}]*)\}|(?P<def>\w+))\s+from\s+['"](?P<module>[^'"]+)['"][ \t]*;?"#,
        )
        .expect("import pattern is valid")
    })
}

/// Turn an import binding list into destructuring fields (`a as b` → `a: b`).
fn destructure_fields(bindings: &str) -> String {
    bindings
        .split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(|binding| match binding.split_once(" as ") {
            Some((orig, alias)) => format!("{}: {}", orig.trim(), alias.trim()),
            None => binding.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rewrite allow-listed host-module imports into global destructurings.
pub fn rewrite_host_imports(source: &str) -> String {
    import_pattern()
        .replace_all(source, |caps: &Captures<'_>| {
            let module = &caps["module"];
            let Some(global) = host_global(module) else {
                return caps[0].to_string();
            };
            let indent = &caps["indent"];

            if let Some(ns) = caps.name("ns") {
                return format!("{}const {} = {};", indent, ns.as_str(), global);
            }
            if let Some(def) = caps.name("def2") {
                let fields = destructure_fields(&caps["named2"]);
                return format!(
                    "{indent}const {} = {global};\n{indent}const {{ {} }} = {global};",
                    def.as_str(),
                    fields,
                );
            }
            if let Some(named) = caps.name("named") {
                return format!(
                    "{}const {{ {} }} = {};",
                    indent,
                    destructure_fields(named.as_str()),
                    global
                );
            }
            format!("{}const {} = {};", indent, &caps["def"], global)
        })
        .into_owned()
}
