//! Boundary to the external language-directive parser.
//!
//! The core never parses source text itself. Callers inject an
//! implementation of [`DirectiveParser`] that extracts import statements and
//! referenced artifacts from a file; the core consumes the fixed record
//! shape below and nothing else.

use std::path::Path;

/// A single import statement extracted from a script.
#[derive(Debug, Clone, Default)]
pub struct ImportInfo {
    /// Target file exactly as written in the directive (may be a bare name,
    /// a relative path or a glob pattern).
    pub file: String,
    /// The directive text as it appeared in the source, used for error
    /// context when the import later fails to resolve.
    pub raw_statement: String,
    /// Namespace renaming pairs `(from, to)`, in directive order.
    pub renaming: Vec<(String, String)>,
    /// Keep the imported file's entry point instead of stripping it.
    pub preserve_main: bool,
    /// Name of the script the directive was found in.
    pub parent_script: String,
}

/// Everything the external parser reports for one source file.
#[derive(Debug, Clone, Default)]
pub struct ParsedSource {
    pub imports: Vec<ImportInfo>,
    /// Referenced namespaces, unfiltered; the unit removes the ignored ones.
    pub namespaces: Vec<String>,
    pub assemblies: Vec<String>,
    pub resources: Vec<String>,
    pub packages: Vec<String>,
    pub precompilers: Vec<String>,
    pub compiler_options: Vec<String>,
    /// Namespaces the script asked to exclude from the referenced set.
    pub ignore_namespaces: Vec<String>,
}

/// External directive parser, supplied by the caller.
pub trait DirectiveParser {
    /// Extract the directive record from the file at `path`.
    fn parse(&self, path: &Path) -> Result<ParsedSource, String>;
}
