//! Source transform applied to imported scripts: namespace renaming and
//! entry-point stripping

use regex::{NoExpand, Regex};

use crate::descriptor::RenameRuleSet;

/// Apply `rules` to `source`.
///
/// Every identifier-bounded occurrence of each `from` namespace is rewritten
/// to its `to` counterpart, in rule order. Unless the rule set preserves it,
/// the `Main`-equivalent entry point is removed so the imported file cannot
/// compete with the host script's own entry point.
///
/// Returns `None` when the result is byte-identical to the input; importing
/// an unmodified file does not require a private copy.
pub fn apply(source: &str, rules: &RenameRuleSet) -> Option<String> {
    let mut text = source.to_string();

    for (from, to) in rules.rules() {
        let pattern = format!(r"\b{}\b", regex::escape(from));
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        text = re.replace_all(&text, NoExpand(to)).into_owned();
    }

    if !rules.preserve_main {
        if let Some(stripped) = strip_entry_point(&text) {
            text = stripped;
        }
    }

    (text != source).then_some(text)
}

/// Remove the first `static ... Main(...)` method, attributes included,
/// whether block- or expression-bodied. Returns `None` when no entry point
/// is found or its body cannot be delimited.
fn strip_entry_point(text: &str) -> Option<String> {
    let signature = Regex::new(
        r"(?m)^[ \t]*(?:\[[^\]\r\n]*\][ \t]*\r?\n[ \t]*)*(?:(?:public|private|protected|internal|static|async|unsafe)[ \t]+)+(?:void|int|Task(?:<int>)?)[ \t]+Main[ \t]*\(",
    )
    .ok()?;
    let found = signature.find(text)?;

    let bytes = text.as_bytes();

    // Closing parenthesis of the parameter list; the match ends just past '('.
    let mut i = found.end();
    let mut depth = 1usize;
    while i < bytes.len() && depth > 0 {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    if depth != 0 {
        return None;
    }

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }

    let end = if bytes.get(i) == Some(&b'{') {
        let mut depth = 1usize;
        let mut j = i + 1;
        while j < bytes.len() && depth > 0 {
            match bytes[j] {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                _ => {}
            }
            j += 1;
        }
        if depth != 0 {
            return None;
        }
        j
    } else if text[i..].starts_with("=>") {
        i + text[i..].find(';')? + 1
    } else {
        return None;
    };

    let mut out = String::with_capacity(text.len() - (end - found.start()));
    out.push_str(&text[..found.start()]);
    out.push_str(&text[end..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(pairs: &[(&str, &str)], preserve_main: bool) -> RenameRuleSet {
        RenameRuleSet::new(
            pairs
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
            preserve_main,
        )
    }

    #[test]
    fn test_renames_all_occurrences() {
        let source = "using Old.Helpers;\nnamespace Old\n{\n    class C { }\n}\n";
        let result = apply(source, &rules(&[("Old", "New")], true)).unwrap();
        assert_eq!(
            result,
            "using New.Helpers;\nnamespace New\n{\n    class C { }\n}\n"
        );
    }

    #[test]
    fn test_rename_respects_identifier_boundaries() {
        let source = "namespace Old { class Older { Old.Older f; } }";
        let result = apply(source, &rules(&[("Old", "New")], true)).unwrap();
        assert_eq!(result, "namespace New { class Older { New.Older f; } }");
    }

    #[test]
    fn test_dotted_namespace_rename() {
        let source = "using Corp.Utils;\nnamespace Corp.Utils { }";
        let result = apply(source, &rules(&[("Corp.Utils", "Vendor")], true)).unwrap();
        assert_eq!(result, "using Vendor;\nnamespace Vendor { }");
    }

    #[test]
    fn test_unchanged_source_yields_none() {
        let source = "namespace Kept { class C { } }";
        assert!(apply(source, &rules(&[("Absent", "New")], true)).is_none());
        assert!(apply(source, &rules(&[], true)).is_none());
    }

    #[test]
    fn test_entry_point_removed_by_default() {
        let source = "class App\n{\n    static void Main(string[] args)\n    {\n        if (true) { Run(); }\n    }\n\n    static void Run() { }\n}\n";
        let result = apply(source, &rules(&[], false)).unwrap();
        assert!(!result.contains("Main"));
        assert!(result.contains("static void Run() { }"));
    }

    #[test]
    fn test_entry_point_kept_with_preserve_main() {
        let source = "class App\n{\n    static void Main()\n    {\n    }\n}\n";
        assert!(apply(source, &rules(&[], true)).is_none());
    }

    #[test]
    fn test_expression_bodied_entry_point() {
        let source = "class App\n{\n    static int Main() => Run();\n    static int Run() => 0;\n}\n";
        let result = apply(source, &rules(&[], false)).unwrap();
        assert!(!result.contains("Main"));
        assert!(result.contains("static int Run() => 0;"));
    }

    #[test]
    fn test_attributed_async_entry_point() {
        let source =
            "class App\n{\n    [STAThread]\n    public static async Task Main(string[] args)\n    {\n        await Run();\n    }\n}\n";
        let result = apply(source, &rules(&[], false)).unwrap();
        assert!(!result.contains("Main"));
        assert!(!result.contains("STAThread"));
    }

    #[test]
    fn test_rename_and_strip_combine() {
        let source = "namespace Old\n{\n    class App\n    {\n        static void Main() { }\n    }\n}\n";
        let result = apply(source, &rules(&[("Old", "New")], false)).unwrap();
        assert!(result.contains("namespace New"));
        assert!(!result.contains("Main"));
    }

    #[test]
    fn test_replacement_text_is_literal() {
        // '$' in the target namespace must not be treated as a capture group.
        let source = "namespace Old { }";
        let result = apply(source, &rules(&[("Old", "New$1")], true)).unwrap();
        assert_eq!(result, "namespace New$1 { }");
    }
}
