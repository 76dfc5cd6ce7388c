//! Import descriptors and the ordering rules used to deduplicate the graph

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::directives::ImportInfo;

/// Ordered namespace-renaming rules attached to one imported file.
///
/// Identity (equality, ordering, hashing) covers the rule sequence only:
/// lengths are compared first, then the pairs element-wise, each pair as an
/// ordered pair of case-sensitive strings. `preserve_main` does not
/// participate, so two imports of the same file differing only in that flag
/// collapse to one graph node.
#[derive(Debug, Clone, Default)]
pub struct RenameRuleSet {
    rules: Vec<(String, String)>,
    pub preserve_main: bool,
}

impl RenameRuleSet {
    pub fn new(rules: Vec<(String, String)>, preserve_main: bool) -> Self {
        Self {
            rules,
            preserve_main,
        }
    }

    pub fn rules(&self) -> &[(String, String)] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl PartialEq for RenameRuleSet {
    fn eq(&self, other: &Self) -> bool {
        self.rules == other.rules
    }
}

impl Eq for RenameRuleSet {}

impl Ord for RenameRuleSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rules
            .len()
            .cmp(&other.rules.len())
            .then_with(|| self.rules.cmp(&other.rules))
    }
}

impl PartialOrd for RenameRuleSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for RenameRuleSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rules.hash(state);
    }
}

/// Descriptor built for each parsed import statement.
///
/// Read-only; owned by the unit that parsed it. The caller decides whether
/// to recurse into the target.
#[derive(Debug, Clone)]
pub struct ImportDescriptor {
    /// Target file name as written in the directive.
    pub file: String,
    /// Renaming rules the target must be processed with.
    pub rules: RenameRuleSet,
    /// Pre-formatted context naming the importing script and the statement,
    /// reported only if this import later fails to resolve.
    pub import_context: String,
}

impl ImportDescriptor {
    pub fn from_info(info: &ImportInfo) -> Self {
        Self {
            file: info.file.clone(),
            rules: RenameRuleSet::new(info.renaming.clone(), info.preserve_main),
            import_context: format!(
                "Cannot import \"{}\" from the \"{}\" script.",
                info.raw_statement, info.parent_script
            ),
        }
    }
}

/// Dedup identity of a processing unit: resolved path compared
/// case-insensitively, ties broken by the rule-set ordering. A unit with no
/// rule set sorts before one with any.
#[derive(Debug, Clone)]
pub struct UnitKey {
    path: PathBuf,
    folded: String,
    rules: Option<RenameRuleSet>,
}

impl UnitKey {
    pub fn new(path: &Path, rules: Option<&RenameRuleSet>) -> Self {
        Self {
            path: path.to_path_buf(),
            folded: path.to_string_lossy().to_lowercase(),
            rules: rules.cloned(),
        }
    }

    /// The resolved path as it was seen, case preserved.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rules(&self) -> Option<&RenameRuleSet> {
        self.rules.as_ref()
    }
}

impl PartialEq for UnitKey {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded && self.rules == other.rules
    }
}

impl Eq for UnitKey {}

impl Ord for UnitKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded
            .cmp(&other.folded)
            .then_with(|| self.rules.cmp(&other.rules))
    }
}

impl PartialOrd for UnitKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for UnitKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
        self.rules.hash(state);
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
