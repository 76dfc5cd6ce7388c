use std::collections::{HashSet, VecDeque};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};

use csprep_core::{
    CacheWriter, ImportDescriptor, ImportGraph, ResolveFiles, ScriptResolver, ScriptUnit, UnitKey,
};

mod scanner;
use scanner::CssDirectiveScanner;

#[derive(Parser)]
#[command(
    name = "csprep",
    version = "0.1.0",
    about = "Script import resolution and caching",
    long_about = "Resolves a script's import graph and materializes cached,\ntransformed copies of imported files ahead of compilation."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a script name against the search directories
    Resolve {
        /// Script name, with or without extension
        name: String,

        /// Additional search directory (repeatable)
        #[arg(short = 'I', long = "search-dir")]
        search_dirs: Vec<PathBuf>,

        /// Print every match instead of the first
        #[arg(long)]
        all: bool,

        /// Print a best-guess path instead of failing when nothing matches
        #[arg(long)]
        lenient: bool,
    },

    /// List a script's dependencies in dependency-first order
    Deps {
        /// Entry script
        script: String,

        /// Additional search directory (repeatable)
        #[arg(short = 'I', long = "search-dir")]
        search_dirs: Vec<PathBuf>,

        /// Cache directory for transformed imports
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Resolve, transform and cache a script's imports
    Prep {
        /// Entry script
        script: String,

        /// Additional search directory (repeatable)
        #[arg(short = 'I', long = "search-dir")]
        search_dirs: Vec<PathBuf>,

        /// Cache directory for transformed imports
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            name,
            search_dirs,
            all,
            lenient,
        } => resolve_command(name, search_dirs, all, lenient),
        Commands::Deps {
            script,
            search_dirs,
            cache_dir,
        } => deps_command(script, search_dirs, cache_dir),
        Commands::Prep {
            script,
            search_dirs,
            cache_dir,
            verbose,
        } => prep_command(script, search_dirs, cache_dir, verbose),
    }
}

fn resolve_command(
    name: String,
    search_dirs: Vec<PathBuf>,
    all: bool,
    lenient: bool,
) -> ExitCode {
    let resolver = ScriptResolver;
    match resolver.resolve_files(&name, &search_dirs, !lenient) {
        Ok(files) => {
            if all {
                for file in &files {
                    println!("{}", file.display());
                }
            } else if let Some(file) = files.first() {
                println!("{}", file.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn deps_command(
    script: String,
    search_dirs: Vec<PathBuf>,
    cache_dir: Option<PathBuf>,
) -> ExitCode {
    let cache = CacheWriter::new(cache_dir.unwrap_or_else(default_cache_dir));

    let walked = match walk_imports(&script, &search_dirs, &cache, false) {
        Ok(walked) => walked,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let order = match walked.graph.ordered() {
        Ok(order) => order,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    for key in &order {
        println!("{}", key.path().display());
    }
    ExitCode::SUCCESS
}

fn prep_command(
    script: String,
    search_dirs: Vec<PathBuf>,
    cache_dir: Option<PathBuf>,
    verbose: bool,
) -> ExitCode {
    let cache = CacheWriter::new(cache_dir.unwrap_or_else(default_cache_dir));

    if verbose {
        println!("Preparing: {script}");
        println!("Cache directory: {}", cache.cache_root().display());
    }

    let walked = match walk_imports(&script, &search_dirs, &cache, verbose) {
        Ok(walked) => walked,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let order = match walked.graph.ordered() {
        Ok(order) => order,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if verbose {
        println!("Discovered {} script(s)", order.len());
    }

    for key in &order {
        let Some(unit) = walked.units.iter().find(|u| u.key() == *key) else {
            continue;
        };
        if verbose && unit.effective_path() != unit.original_path() {
            println!(
                "  {} -> {}",
                unit.original_path().display(),
                unit.effective_path().display()
            );
        } else {
            println!("{}", unit.effective_path().display());
        }
    }
    ExitCode::SUCCESS
}

struct Walked {
    units: Vec<ScriptUnit>,
    graph: ImportGraph,
}

/// Breadth-first walk of the import graph starting at `script`.
///
/// Each import descriptor spawns a child unit resolved against the parent's
/// search directories; the (path, rule-set) visited set keeps mutual imports
/// from recursing forever, and the resulting graph rejects them as cycles.
fn walk_imports(
    script: &str,
    search_dirs: &[PathBuf],
    cache: &CacheWriter,
    verbose: bool,
) -> Result<Walked, String> {
    let resolver = ScriptResolver;
    let scanner = CssDirectiveScanner;
    let mut graph = ImportGraph::new();
    let mut units: Vec<ScriptUnit> = Vec::new();

    let mut root = ScriptUnit::new(script, None, false, search_dirs, &resolver, true)
        .map_err(|e| e.to_string())?;
    root.process(&scanner, cache).map_err(|e| e.to_string())?;
    graph.set_entry(root.key());

    let mut visited: HashSet<UnitKey> = HashSet::new();
    visited.insert(root.key());
    units.push(root);

    let mut pending: VecDeque<usize> = VecDeque::new();
    pending.push_back(0);

    while let Some(index) = pending.pop_front() {
        let descriptors: Vec<ImportDescriptor> = units[index].imports().to_vec();
        let parent_dirs: Vec<PathBuf> = units[index].search_dirs().to_vec();
        let parent_path = units[index].original_path().to_path_buf();
        let parent_key = units[index].key();
        let mut child_keys = Vec::new();

        for descriptor in &descriptors {
            if verbose {
                println!("  [import] {} <- {}", descriptor.file, parent_path.display());
            }

            let mut child = match ScriptUnit::new(
                &descriptor.file,
                Some(descriptor.rules.clone()),
                true,
                &parent_dirs,
                &resolver,
                true,
            ) {
                Ok(unit) => unit,
                Err(err) => {
                    report_import_error(&parent_path, &descriptor.file, &err.to_string());
                    return Err(descriptor.import_context.clone());
                }
            };

            let key = child.key();
            child_keys.push(key.clone());

            if visited.insert(key) {
                child
                    .process(&scanner, cache)
                    .map_err(|err| format!("{} {err}", descriptor.import_context))?;
                units.push(child);
                pending.push_back(units.len() - 1);
            }
        }

        graph.add_unit(parent_key, child_keys);
    }

    Ok(Walked { units, graph })
}

/// Render an unresolved-import report labeled at the import statement in the
/// importing script.
fn report_import_error(parent: &Path, imported_file: &str, message: &str) {
    let source = fs::read_to_string(parent).unwrap_or_default();
    let name = parent.to_string_lossy().to_string();
    let span = find_import_span(&source, imported_file).unwrap_or(0..0);

    Report::build(ReportKind::Error, (name.as_str(), span.clone()))
        .with_code("E0404")
        .with_message("unresolved import")
        .with_label(
            Label::new((name.as_str(), span))
                .with_message(message)
                .with_color(Color::Red),
        )
        .finish()
        .print((name.as_str(), Source::from(source.as_str())))
        .ok();
}

/// Byte range of `file` inside the first import directive that mentions it.
fn find_import_span(source: &str, file: &str) -> Option<std::ops::Range<usize>> {
    let mut offset = 0;
    for line in source.lines() {
        if line.trim_start().starts_with("//css_import") {
            if let Some(at) = line.find(file) {
                let start = offset + at;
                return Some(start..start + file.len());
            }
        }
        offset += line.len() + 1;
    }
    None
}

fn default_cache_dir() -> PathBuf {
    env::temp_dir().join("csprep").join("cache")
}
