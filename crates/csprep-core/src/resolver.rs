//! Script file resolution: search-directory probing and glob matching

use std::env;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::ResolveError;

/// Pluggable resolution strategy turning a script name plus an ordered list
/// of search directories into concrete file paths.
///
/// The default algorithm is [`ScriptResolver`]; callers needing different
/// probing rules inject their own implementation.
pub trait ResolveFiles {
    /// Resolve `name` to every matching path, in search order.
    ///
    /// With `fail_on_missing` set, an exhausted search is an error; otherwise
    /// a single unverified best-guess name is returned instead.
    fn resolve_files(
        &self,
        name: &str,
        search_dirs: &[PathBuf],
        fail_on_missing: bool,
    ) -> Result<Vec<PathBuf>, ResolveError>;

    /// First match of [`ResolveFiles::resolve_files`].
    fn resolve_file(
        &self,
        name: &str,
        search_dirs: &[PathBuf],
        fail_on_missing: bool,
    ) -> Result<PathBuf, ResolveError> {
        self.resolve_files(name, search_dirs, fail_on_missing)?
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NotFound {
                name: name.to_string(),
            })
    }
}

/// Default resolution algorithm. Search order, stopping at the first
/// non-empty result:
///
/// 1. the name verbatim (absolute names to existing files short-circuit)
/// 2. the current directory, unless it is already one of the search dirs
/// 3. each search directory, in order
/// 4. each directory on the process `PATH`
///
/// A name without an extension is retried with `.cs` appended, then with
/// `.csl` (a script-link indirection file).
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptResolver;

impl ResolveFiles for ScriptResolver {
    fn resolve_files(
        &self,
        name: &str,
        search_dirs: &[PathBuf],
        fail_on_missing: bool,
    ) -> Result<Vec<PathBuf>, ResolveError> {
        let mut found = resolve_pass(name, search_dirs, "");

        if found.is_empty() && Path::new(name).extension().is_none() {
            found = resolve_pass(name, search_dirs, ".cs");
            if found.is_empty() {
                found = resolve_pass(name, search_dirs, ".csl");
            }
        }

        if found.is_empty() {
            if fail_on_missing {
                return Err(ResolveError::NotFound {
                    name: name.to_string(),
                });
            }
            // Best guess, not verified against the filesystem.
            let guess = if name.ends_with(".cs") {
                name.to_string()
            } else {
                format!("{name}.cs")
            };
            found.push(PathBuf::from(guess));
        }

        Ok(found)
    }
}

/// One probing pass over all search locations with `extension` appended to
/// extensionless names.
fn resolve_pass(name: &str, search_dirs: &[PathBuf], extension: &str) -> Vec<PathBuf> {
    let mut file = name.to_string();
    if Path::new(name).extension().is_none() {
        file.push_str(extension);
    }

    let candidate = Path::new(&file);
    if candidate.is_absolute() && candidate.is_file() {
        return vec![candidate.to_path_buf()];
    }

    if let Ok(cwd) = env::current_dir() {
        if !search_dirs.iter().any(|d| *d == cwd) {
            let files = locate_files(&cwd, &file);
            if !files.is_empty() {
                return files;
            }
        }
    }

    for dir in search_dirs {
        let files = locate_files(dir, &file);
        if !files.is_empty() {
            return files;
        }
    }

    for dir in path_dirs() {
        let files = locate_files(&dir, &file);
        if !files.is_empty() {
            return files;
        }
    }

    Vec::new()
}

/// Directories on the process `PATH`, quote characters stripped before
/// splitting on the platform path-list separator.
fn path_dirs() -> Vec<PathBuf> {
    match env::var("PATH") {
        Ok(var) => env::split_paths(&var.replace('"', "")).collect(),
        Err(_) => Vec::new(),
    }
}

/// Look up `pattern` under `dir`.
///
/// A pattern without wildcard characters is a literal file name (possibly
/// with subdirectories). Otherwise every file under `dir` is enumerated, any
/// depth; the pattern's file part is matched against the candidate's name
/// and its directory part against the candidate's relative directory, where
/// `*` matches a run of non-separator characters, `?` a single one, and a
/// `**` segment any number of directories.
///
/// A missing `dir` or a filesystem error during enumeration yields no
/// matches; the cause is reported on the debug log channel only.
pub fn locate_files(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    if !pattern.contains('*') && !pattern.contains('?') {
        let file = dir.join(pattern);
        if file.is_file() {
            return vec![absolute(&file)];
        }
        return Vec::new();
    }

    let (dir_pattern, file_pattern) = split_pattern(pattern);

    let (Some(dir_matcher), Some(file_matcher)) = (
        wildcard_to_regex(&dir_pattern),
        wildcard_to_regex(&file_pattern),
    ) else {
        return Vec::new();
    };

    let mut result = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("glob enumeration under {} skipped: {err}", dir.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let rel_dir = relative
            .parent()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        let name = entry.file_name().to_string_lossy();
        if dir_matcher.is_match(&rel_dir) && file_matcher.is_match(&name) {
            result.push(absolute(entry.path()));
        }
    }
    result
}

/// Split a wildcard pattern into its directory part and file part. The bare
/// `"**"` pattern means every file at any depth.
fn split_pattern(pattern: &str) -> (String, String) {
    if pattern == "**" {
        return ("**".to_string(), "*".to_string());
    }

    let path = Path::new(pattern);
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut dir = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(stripped) = dir.strip_prefix("./").or_else(|| dir.strip_prefix(".\\")) {
        dir = stripped.to_string();
    }

    (dir, file)
}

/// Translate a wildcard pattern into an anchored regex over `/`-separated
/// relative paths. An empty pattern matches only the empty path (i.e. direct
/// children when used as a directory pattern).
fn wildcard_to_regex(pattern: &str) -> Option<Regex> {
    let normalized = pattern.replace('\\', "/");
    if normalized == "**" {
        return Regex::new("^.*$").ok();
    }

    let mut re = String::from("^");
    if !normalized.is_empty() {
        let mut need_separator = false;
        for segment in normalized.split('/') {
            if segment == "**" {
                if need_separator {
                    re.push_str("(?:/[^/]+)*");
                } else {
                    re.push_str("(?:[^/]+/)*");
                    need_separator = false;
                }
                continue;
            }
            if need_separator {
                re.push('/');
            }
            for ch in segment.chars() {
                match ch {
                    '*' => re.push_str("[^/]*"),
                    '?' => re.push_str("[^/]"),
                    ch => re.push_str(&regex::escape(&ch.to_string())),
                }
            }
            need_separator = true;
        }
    }
    re.push('$');

    Regex::new(&re).ok()
}

/// Absolute form of `path` without requiring it to exist.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "// test file").unwrap();
    }

    // Fixture names are deliberately improbable: the resolver also probes
    // the current directory and PATH, and a name like "script" collides
    // with real binaries there.

    #[test]
    fn test_resolves_bare_name_with_cs_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("csprep_probe.cs"));

        let resolver = ScriptResolver;
        let resolved = resolver
            .resolve_file("csprep_probe", &[dir.path().to_path_buf()], true)
            .unwrap();
        assert!(resolved.ends_with("csprep_probe.cs"));
        assert!(resolved.is_absolute());
    }

    #[test]
    fn test_extension_inference_order() {
        // Literal name wins over .cs, .cs wins over .csl.
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("csprep_ext_probe"));
        touch(&dir.path().join("csprep_ext_probe.cs"));
        touch(&dir.path().join("csprep_ext_probe.csl"));
        let dirs = [dir.path().to_path_buf()];

        let resolver = ScriptResolver;
        let resolved = resolver.resolve_file("csprep_ext_probe", &dirs, true).unwrap();
        assert!(
            resolved.ends_with("csprep_ext_probe"),
            "literal name first: {resolved:?}"
        );

        fs::remove_file(dir.path().join("csprep_ext_probe")).unwrap();
        let resolved = resolver.resolve_file("csprep_ext_probe", &dirs, true).unwrap();
        assert!(
            resolved.ends_with("csprep_ext_probe.cs"),
            ".cs next: {resolved:?}"
        );

        fs::remove_file(dir.path().join("csprep_ext_probe.cs")).unwrap();
        let resolved = resolver.resolve_file("csprep_ext_probe", &dirs, true).unwrap();
        assert!(
            resolved.ends_with("csprep_ext_probe.csl"),
            ".csl last: {resolved:?}"
        );
    }

    #[test]
    fn test_search_dirs_probed_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(&first.path().join("csprep_dup.cs"));
        touch(&second.path().join("csprep_dup.cs"));

        let resolver = ScriptResolver;
        let resolved = resolver
            .resolve_file(
                "csprep_dup",
                &[first.path().to_path_buf(), second.path().to_path_buf()],
                true,
            )
            .unwrap();
        assert!(resolved.starts_with(first.path()));
    }

    #[test]
    fn test_absolute_existing_path_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("abs.cs");
        touch(&file);

        let resolver = ScriptResolver;
        let resolved = resolver
            .resolve_file(&file.to_string_lossy(), &[], true)
            .unwrap();
        assert_eq!(resolved, file);
    }

    #[test]
    fn test_missing_file_fails_with_not_found() {
        let resolver = ScriptResolver;
        let err = resolver
            .resolve_file("csprep_no_such_script_anywhere", &[], true)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("csprep_no_such_script_anywhere"));
        assert!(message.contains("probing directories"));
    }

    #[test]
    fn test_missing_file_lenient_returns_best_guess() {
        let resolver = ScriptResolver;
        let files = resolver
            .resolve_files("csprep_no_such_script_anywhere", &[], false)
            .unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("csprep_no_such_script_anywhere.cs")]
        );

        // A name already ending in .cs is guessed verbatim.
        let files = resolver
            .resolve_files("csprep_no_such_script_anywhere.cs", &[], false)
            .unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("csprep_no_such_script_anywhere.cs")]
        );
    }

    #[test]
    fn test_locate_files_literal() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("lib/inner.cs"));

        let found = locate_files(dir.path(), "lib/inner.cs");
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("lib/inner.cs"));

        assert!(locate_files(dir.path(), "lib/other.cs").is_empty());
    }

    #[test]
    fn test_locate_files_star_matches_direct_children_only() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.cs"));
        touch(&dir.path().join("b.txt"));
        touch(&dir.path().join("sub/c.cs"));

        let found = locate_files(dir.path(), "*.cs");
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("a.cs"));
    }

    #[test]
    fn test_locate_files_double_star_matches_any_depth() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.cs"));
        touch(&dir.path().join("sub/b.cs"));
        touch(&dir.path().join("sub/deep/c.txt"));

        let mut found = locate_files(dir.path(), "**");
        found.sort();
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_locate_files_directory_glob() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("sub/b.cs"));
        touch(&dir.path().join("sub/deep/c.cs"));
        touch(&dir.path().join("other/d.cs"));

        let found = locate_files(dir.path(), "sub/*.cs");
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("sub/b.cs"));

        let mut found = locate_files(dir.path(), "**/*.cs");
        found.sort();
        assert_eq!(found.len(), 3);

        let found = locate_files(dir.path(), "./sub/*.cs");
        assert_eq!(found.len(), 1, "leading ./ is stripped");
    }

    #[test]
    fn test_locate_files_question_mark() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.cs"));
        touch(&dir.path().join("ab.cs"));

        let found = locate_files(dir.path(), "?.cs");
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("a.cs"));
    }

    #[test]
    fn test_locate_files_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(locate_files(&missing, "*.cs").is_empty());
        assert!(locate_files(&missing, "a.cs").is_empty());
    }

    #[test]
    fn test_wildcard_regex_segments() {
        let re = wildcard_to_regex("a/**/b").unwrap();
        assert!(re.is_match("a/b"));
        assert!(re.is_match("a/x/b"));
        assert!(re.is_match("a/x/y/b"));
        assert!(!re.is_match("a/x"));

        let re = wildcard_to_regex("").unwrap();
        assert!(re.is_match(""));
        assert!(!re.is_match("sub"));

        let re = wildcard_to_regex("s?b").unwrap();
        assert!(re.is_match("sub"));
        assert!(!re.is_match("sub/deep"));
    }
}
