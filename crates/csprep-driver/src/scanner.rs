//! Caller-side directive scanner feeding the csprep-core parser boundary.
//!
//! Understands the line-oriented `//css_*` directive family plus plain
//! `using` directives. This is deliberately not a language parser: anything
//! it does not recognize is ignored, and the core never depends on it.

use std::fs;
use std::path::Path;

use csprep_core::{DirectiveParser, ImportInfo, ParsedSource};

/// Line-oriented scanner for `//css_*` directives.
///
/// Recognized forms:
///
/// ```text
/// //css_import file[(rename_namespace(Old, New), preserve_main)];
/// //css_ref assembly;
/// //css_res file;
/// //css_nuget package;
/// //css_precompiler file;
/// //css_co /compiler:option;
/// //css_ignore_ns namespace;
/// using Namespace.Name;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CssDirectiveScanner;

impl DirectiveParser for CssDirectiveScanner {
    fn parse(&self, path: &Path) -> Result<ParsedSource, String> {
        let source = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        Ok(scan(&source, &path.to_string_lossy()))
    }
}

/// Scan `source`, attributing directives to `parent_script`.
pub fn scan(source: &str, parent_script: &str) -> ParsedSource {
    let mut parsed = ParsedSource::default();

    for line in source.lines() {
        let line = line.trim();
        if let Some(args) = directive_args(line, "//css_import") {
            if let Some(info) = parse_import(line, args, parent_script) {
                parsed.imports.push(info);
            }
        } else if let Some(args) = directive_args(line, "//css_ref") {
            parsed.assemblies.push(args.to_string());
        } else if let Some(args) = directive_args(line, "//css_res") {
            parsed.resources.push(args.to_string());
        } else if let Some(args) = directive_args(line, "//css_nuget") {
            parsed.packages.push(args.to_string());
        } else if let Some(args) = directive_args(line, "//css_precompiler") {
            parsed.precompilers.push(args.to_string());
        } else if let Some(args) = directive_args(line, "//css_co") {
            parsed.compiler_options.push(args.to_string());
        } else if let Some(args) = directive_args(line, "//css_ignore_ns") {
            parsed.ignore_namespaces.push(args.to_string());
        } else if let Some(ns) = using_namespace(line) {
            parsed.namespaces.push(ns.to_string());
        }
    }

    parsed
}

/// Argument text of a directive line, with the trailing `;` removed.
/// `None` when the line is not that directive.
fn directive_args<'a>(line: &'a str, directive: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(directive)?;
    // Require a separator so `//css_res` does not swallow `//css_result`.
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    Some(rest.trim().trim_end_matches(';').trim())
}

/// Namespace referenced by a plain `using` directive. Aliases and static
/// usings are not namespace references.
fn using_namespace(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("using ")?;
    let rest = rest.trim().trim_end_matches(';').trim();
    if rest.is_empty()
        || rest.contains('=')
        || rest.starts_with("static ")
        || !rest
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '_')
    {
        return None;
    }
    Some(rest)
}

/// Parse `file[(rename_namespace(Old, New), preserve_main)]`.
fn parse_import(line: &str, args: &str, parent_script: &str) -> Option<ImportInfo> {
    if args.is_empty() {
        return None;
    }

    let mut info = ImportInfo {
        raw_statement: line.to_string(),
        parent_script: parent_script.to_string(),
        ..Default::default()
    };

    let Some(open) = args.find('(') else {
        info.file = args.trim().to_string();
        return Some(info);
    };

    info.file = args[..open].trim().to_string();
    let inner = args[open + 1..].strip_suffix(')').unwrap_or(&args[open + 1..]);

    for option in split_top_level(inner) {
        let option = option.trim();
        if option == "preserve_main" {
            info.preserve_main = true;
        } else if let Some(pair) = option
            .strip_prefix("rename_namespace")
            .map(str::trim_start)
            .and_then(|p| p.strip_prefix('('))
            .and_then(|p| p.strip_suffix(')'))
        {
            let mut names = pair.splitn(2, ',');
            let from = names.next()?.trim();
            let to = names.next()?.trim();
            if !from.is_empty() && !to.is_empty() {
                info.renaming.push((from.to_string(), to.to_string()));
            }
        }
    }

    if info.file.is_empty() {
        return None;
    }
    Some(info)
}

/// Split on commas that are not nested inside parentheses.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
