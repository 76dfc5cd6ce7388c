//! Per-file processing unit: resolution, directive parsing, import
//! descriptors, and cached rewrites of imported sources

use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::CacheWriter;
use crate::descriptor::{ImportDescriptor, RenameRuleSet, UnitKey};
use crate::directives::DirectiveParser;
use crate::error::UnitError;
use crate::resolver::ResolveFiles;
use crate::transform;

/// One script file being prepared for compilation.
///
/// Construction resolves the name to a file on disk; [`ScriptUnit::process`]
/// extracts its directives, builds an [`ImportDescriptor`] per import and,
/// for imported units whose rename rules change the source, materializes a
/// cached copy. The caller drives recursion by constructing a new unit per
/// descriptor.
#[derive(Debug)]
pub struct ScriptUnit {
    original_path: PathBuf,
    search_dirs: Vec<PathBuf>,
    rules: Option<RenameRuleSet>,
    imported: bool,
    cached_path: Option<PathBuf>,
    imports: Vec<ImportDescriptor>,
    referenced_namespaces: Vec<String>,
    ignored_namespaces: Vec<String>,
    referenced_assemblies: Vec<String>,
    referenced_resources: Vec<String>,
    packages: Vec<String>,
    precompilers: Vec<String>,
    compiler_options: Vec<String>,
}

impl ScriptUnit {
    /// Resolve `name` and build an unprocessed unit.
    ///
    /// The unit's search directories are `search_dirs` deduplicated in
    /// first-seen order, with the resolved file's own directory appended
    /// once at the end.
    pub fn new(
        name: &str,
        rules: Option<RenameRuleSet>,
        imported: bool,
        search_dirs: &[PathBuf],
        resolver: &dyn ResolveFiles,
        fail_on_missing: bool,
    ) -> Result<Self, UnitError> {
        let original_path = resolver.resolve_file(name, search_dirs, fail_on_missing)?;

        let mut dirs = dedup_dirs(search_dirs);
        if let Some(parent) = original_path.parent() {
            if !parent.as_os_str().is_empty() && !dirs.iter().any(|d| d == parent) {
                dirs.push(parent.to_path_buf());
            }
        }

        Ok(Self {
            original_path,
            search_dirs: dirs,
            rules,
            imported,
            cached_path: None,
            imports: Vec::new(),
            referenced_namespaces: Vec::new(),
            ignored_namespaces: Vec::new(),
            referenced_assemblies: Vec::new(),
            referenced_resources: Vec::new(),
            packages: Vec::new(),
            precompilers: Vec::new(),
            compiler_options: Vec::new(),
        })
    }

    /// Parse the resolved file and populate the unit.
    ///
    /// Safe to call again after a file change: all accumulated state is
    /// cleared before repopulating.
    pub fn process(
        &mut self,
        parser: &dyn DirectiveParser,
        cache: &CacheWriter,
    ) -> Result<(), UnitError> {
        self.imports.clear();
        self.referenced_namespaces.clear();
        self.ignored_namespaces.clear();
        self.referenced_assemblies.clear();
        self.referenced_resources.clear();
        self.packages.clear();
        self.precompilers.clear();
        self.compiler_options.clear();
        self.cached_path = None;

        let parsed = parser.parse(&self.original_path).map_err(UnitError::Parse)?;

        for info in &parsed.imports {
            self.imports.push(ImportDescriptor::from_info(info));
        }

        self.referenced_namespaces = parsed
            .namespaces
            .into_iter()
            .filter(|ns| !parsed.ignore_namespaces.contains(ns))
            .collect();
        self.ignored_namespaces = parsed.ignore_namespaces;
        self.referenced_assemblies = parsed.assemblies;
        self.referenced_resources = parsed.resources;
        self.packages = parsed.packages;
        self.precompilers = parsed.precompilers;
        self.compiler_options = parsed.compiler_options;

        if self.imported {
            if let Some(rules) = &self.rules {
                let source =
                    fs::read_to_string(&self.original_path).map_err(|source| UnitError::Read {
                        path: self.original_path.clone(),
                        source,
                    })?;
                if let Some(text) = transform::apply(&source, rules) {
                    self.cached_path = Some(cache.write(&self.original_path, &text)?);
                }
            }
        }

        Ok(())
    }

    /// The file a compiler should consume: the cached rewrite when one was
    /// produced, the original otherwise.
    pub fn effective_path(&self) -> &Path {
        self.cached_path.as_deref().unwrap_or(&self.original_path)
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    pub fn imported(&self) -> bool {
        self.imported
    }

    pub fn rules(&self) -> Option<&RenameRuleSet> {
        self.rules.as_ref()
    }

    /// Dedup identity used by the import graph.
    pub fn key(&self) -> UnitKey {
        UnitKey::new(&self.original_path, self.rules.as_ref())
    }

    pub fn imports(&self) -> &[ImportDescriptor] {
        &self.imports
    }

    pub fn referenced_namespaces(&self) -> &[String] {
        &self.referenced_namespaces
    }

    pub fn ignored_namespaces(&self) -> &[String] {
        &self.ignored_namespaces
    }

    pub fn referenced_assemblies(&self) -> &[String] {
        &self.referenced_assemblies
    }

    pub fn referenced_resources(&self) -> &[String] {
        &self.referenced_resources
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn precompilers(&self) -> &[String] {
        &self.precompilers
    }

    pub fn compiler_options(&self) -> &[String] {
        &self.compiler_options
    }
}

/// First-seen-order deduplication of the caller's search directories.
fn dedup_dirs(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::with_capacity(dirs.len() + 1);
    for dir in dirs {
        if !out.iter().any(|d| d == dir) {
            out.push(dir.clone());
        }
    }
    out
}
