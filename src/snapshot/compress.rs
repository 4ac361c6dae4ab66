//! Textual code compression
//!
//! Three fidelity levels over raw source text. The compressor never
//! parses: declaration detection and identifier renaming are regex and
//! line-scanner passes, so syntactically broken input degrades instead
//! of failing.

use crate::snapshot::types::{CompressedCode, CompressionLevel};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

/// Declaration prefixes kept by the Minimal level
static DECLARATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // exported/async/default functions
        r"^(?:export\s+)?(?:default\s+)?(?:async\s+)?function\b",
        // classes, abstract classes
        r"^(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\b",
        r"^(?:export\s+)?interface\b",
        r"^(?:export\s+)?type\s+[A-Za-z_$][\w$]*\s*=",
        r"^(?:export\s+)?(?:const\s+)?enum\b",
        // const arrow functions
        r"^(?:export\s+)?const\s+[A-Za-z_$][\w$]*\s*(?::[^=]*)?=\s*(?:async\s*)?\(",
        // class methods with a leading modifier
        r"^(?:(?:public|private|protected|static|readonly|abstract|async|override)\s+)+[A-Za-z_$][\w$]*\s*\(",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("declaration pattern"))
    .collect()
});

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

/// Binding keyword followed by the introduced name
static LOCAL_BINDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:let|const|var)\s+([a-z][A-Za-z0-9_]*)\b").unwrap());

/// Identifiers never renamed at Full: language keywords plus runtime
/// globals and ubiquitous short names.
static RESERVED_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // keywords
        "break", "case", "catch", "class", "const", "continue", "debugger", "default",
        "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
        "function", "if", "import", "in", "instanceof", "let", "new", "null", "of",
        "return", "static", "super", "switch", "this", "throw", "true", "try", "typeof",
        "var", "void", "while", "with", "yield", "async", "await", "get", "set",
        "implements", "package", "private", "protected", "public",
        // globals and ambient types
        "Array", "Boolean", "Date", "Error", "Function", "JSON", "Math", "Number",
        "Object", "Promise", "RegExp", "String", "Symbol", "console", "window",
        "document", "process", "require", "module", "exports", "__dirname",
        "__filename", "type", "interface", "namespace", "declare", "abstract", "as",
        "readonly", "keyof", "infer", "unknown", "never", "any",
        // common names too load-bearing to shorten
        "id", "name", "data", "value", "index", "item", "key", "result", "error",
        "response", "request", "params", "options", "config", "props", "state",
        "context", "event", "callback",
    ]
    .into_iter()
    .collect()
});

/// Compress `source` at the requested level
pub fn compress(source: &str, level: CompressionLevel) -> CompressedCode {
    let original_lines = source.lines().count() as u32;

    let (body, symbol_map) = match level {
        CompressionLevel::Minimal => (minimal_pass(source), None),
        CompressionLevel::Medium => (medium_pass(source), None),
        CompressionLevel::Full => {
            let medium = medium_pass(source);
            let (renamed, map) = rename_locals(&medium);
            (renamed, Some(map))
        }
    };

    let compressed_lines = body.lines().count() as u32;
    CompressedCode {
        body,
        symbol_map,
        original_lines,
        compressed_lines,
        extra: Default::default(),
    }
}

/// Invert the Full-level renaming: substitute each alias back to its
/// original identifier, whole-word.
pub fn expand_aliases(body: &str, symbol_map: &BTreeMap<String, String>) -> String {
    let mut restored = body.to_string();
    for (alias, original) in symbol_map {
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(alias)))
            .expect("alias pattern");
        restored = pattern.replace_all(&restored, original.as_str()).into_owned();
    }
    restored
}

// ---------------------------------------------------------------------------
// Minimal
// ---------------------------------------------------------------------------

/// Keep declarations only: each detected declaration is accumulated
/// until brace depth returns to its starting level, then emitted as a
/// single joined line.
fn minimal_pass(source: &str) -> String {
    let mut output: Vec<String> = Vec::new();
    let mut in_block_comment = false;
    let mut depth: i32 = 0;
    let mut collecting: Option<(Vec<String>, i32)> = None;

    for raw_line in source.lines() {
        let line = raw_line.trim();

        if in_block_comment {
            if let Some(end) = line.find("*/") {
                in_block_comment = false;
                let rest = line[end + 2..].trim();
                if rest.is_empty() {
                    continue;
                }
            } else {
                continue;
            }
        }
        if line.starts_with("/*") && !line.contains("*/") {
            in_block_comment = true;
            continue;
        }
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if collecting.is_none() && DECLARATION_PATTERNS.iter().any(|p| p.is_match(line)) {
            collecting = Some((Vec::new(), depth));
        }

        let opens = line.matches('{').count() as i32;
        let closes = line.matches('}').count() as i32;
        depth += opens - closes;

        if let Some((lines, start_depth)) = collecting.as_mut() {
            lines.push(line.to_string());
            if depth <= *start_depth {
                output.push(lines.join(" "));
                collecting = None;
            }
        }
    }

    // Unterminated declaration at EOF still surfaces
    if let Some((lines, _)) = collecting {
        output.push(lines.join(" "));
    }

    output.join("\n")
}

// ---------------------------------------------------------------------------
// Medium
// ---------------------------------------------------------------------------

/// Strip comments, drop empty lines, collapse whitespace runs
fn medium_pass(source: &str) -> String {
    let mut output: Vec<String> = Vec::new();
    let mut in_block_comment = false;

    for raw_line in source.lines() {
        let stripped = strip_comments(raw_line, &mut in_block_comment);
        let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
        let trimmed = collapsed.trim();
        if !trimmed.is_empty() {
            output.push(trimmed.to_string());
        }
    }

    output.join("\n")
}

/// Remove `/* */` and `//` comments from one line. A `//` immediately
/// preceded by `:` is a URL, not a comment.
fn strip_comments(line: &str, in_block_comment: &mut bool) -> String {
    let bytes = line.as_bytes();
    let mut output = String::with_capacity(line.len());
    let mut i = 0;

    while i < bytes.len() {
        if *in_block_comment {
            if bytes[i] == b'*' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
                *in_block_comment = false;
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }

        if bytes[i] == b'/' && i + 1 < bytes.len() {
            if bytes[i + 1] == b'*' {
                *in_block_comment = true;
                i += 2;
                continue;
            }
            if bytes[i + 1] == b'/' {
                let preceded_by_colon = i > 0 && bytes[i - 1] == b':';
                if !preceded_by_colon {
                    break;
                }
            }
        }

        // Advance one UTF-8 character
        let char_len = match bytes[i] {
            b if b < 0x80 => 1,
            b if b < 0xE0 => 2,
            b if b < 0xF0 => 3,
            _ => 4,
        };
        output.push_str(&line[i..(i + char_len).min(line.len())]);
        i += char_len;
    }

    output
}

// ---------------------------------------------------------------------------
// Full
// ---------------------------------------------------------------------------

/// Rename local bindings to short aliases. Candidates are introduced by
/// `let`/`const`/`var`, lowercase-starting, longer than one character
/// and not reserved. Returns the rewritten text and the alias map.
fn rename_locals(text: &str) -> (String, BTreeMap<String, String>) {
    let mut candidates: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for capture in LOCAL_BINDING.captures_iter(text) {
        let name = capture.get(1).expect("binding name").as_str();
        if name.len() <= 1 || RESERVED_NAMES.contains(name) {
            continue;
        }
        if seen.insert(name) {
            candidates.push(name.to_string());
        }
    }

    let mut renamed = text.to_string();
    let mut symbol_map: BTreeMap<String, String> = BTreeMap::new();
    for (counter, original) in candidates.iter().enumerate() {
        let alias = short_alias(counter);
        let pattern =
            Regex::new(&format!(r"\b{}\b", regex::escape(original))).expect("rename pattern");
        renamed = pattern.replace_all(&renamed, alias.as_str()).into_owned();
        symbol_map.insert(alias, original.clone());
    }

    (renamed, symbol_map)
}

/// Alias sequence `a, b, .., z, aa, ab, ..`
fn short_alias(mut counter: usize) -> String {
    let mut alias = String::new();
    loop {
        alias.insert(0, (b'a' + (counter % 26) as u8) as char);
        counter /= 26;
        if counter == 0 {
            break;
        }
        counter -= 1;
    }
    alias
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_one_line_function() {
        let source = "export function add(a: number, b: number): number { return a + b; }";
        let code = compress(source, CompressionLevel::Minimal);
        assert_eq!(code.body, source);
        assert_eq!(code.original_lines, 1);
        assert_eq!(code.compressed_lines, 1);
        assert!(code.symbol_map.is_none());
    }

    #[test]
    fn test_minimal_keeps_declarations_only() {
        let source = r#"import { x } from "./x";

// helper
export class Greeter {
    greet() {
        return "hi";
    }
}

const internal = 1;
export const handler = async (req) => {
    return internal;
};
"#;
        let code = compress(source, CompressionLevel::Minimal);
        assert!(code.body.contains("export class Greeter"));
        assert!(code.body.contains("export const handler"));
        assert!(!code.body.contains("import"));
        assert!(!code.body.contains("const internal"));
    }

    #[test]
    fn test_minimal_multiline_comment_skipped() {
        let source = "/*\nexport function fake() {}\n*/\nexport function real() { return 1; }\n";
        let code = compress(source, CompressionLevel::Minimal);
        assert!(code.body.contains("real"));
        assert!(!code.body.contains("fake"));
    }

    #[test]
    fn test_medium_strips_comments_and_blanks() {
        let source = "const a = 1; // trailing\n\n/* block\n   comment */\nconst   b\t=\t2;\n";
        let code = compress(source, CompressionLevel::Medium);
        assert_eq!(code.body, "const a = 1;\nconst b = 2;");
        assert_eq!(code.original_lines, 5);
        assert_eq!(code.compressed_lines, 2);
    }

    #[test]
    fn test_medium_preserves_urls() {
        let source = "const url = \"https://example.com/path\"; // see docs\n";
        let code = compress(source, CompressionLevel::Medium);
        assert!(code.body.contains("https://example.com/path"));
        assert!(!code.body.contains("see docs"));
    }

    #[test]
    fn test_medium_monotone_line_count() {
        let source = "const a = 1;\n\n\nconst b = 2;\n";
        let code = compress(source, CompressionLevel::Medium);
        assert!(code.compressed_lines <= code.original_lines);
    }

    #[test]
    fn test_full_renames_and_inverts() {
        let source = "const greetingMessage = \"hi\"; console.log(greetingMessage);";
        let code = compress(source, CompressionLevel::Full);

        let map = code.symbol_map.as_ref().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a").map(String::as_str), Some("greetingMessage"));
        assert_eq!(code.body, "const a = \"hi\"; console.log(a);");
        assert!(!code.body.contains("greetingMessage"));

        let restored = expand_aliases(&code.body, map);
        assert_eq!(
            restored,
            "const greetingMessage = \"hi\"; console.log(greetingMessage);"
        );
    }

    #[test]
    fn test_full_respects_deny_list() {
        let source = "const data = load(); let result = data; var config = result;";
        let code = compress(source, CompressionLevel::Full);
        // All three names are reserved; nothing is renamed
        assert!(code.symbol_map.as_ref().unwrap().is_empty());
        assert!(code.body.contains("data"));
    }

    #[test]
    fn test_full_skips_short_and_uppercase_names() {
        let source = "const x = 1; const MyThing = 2; const longerName = 3;";
        let code = compress(source, CompressionLevel::Full);
        let map = code.symbol_map.unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a").map(String::as_str), Some("longerName"));
    }

    #[test]
    fn test_alias_sequence() {
        assert_eq!(short_alias(0), "a");
        assert_eq!(short_alias(25), "z");
        assert_eq!(short_alias(26), "aa");
        assert_eq!(short_alias(27), "ab");
        assert_eq!(short_alias(51), "az");
        assert_eq!(short_alias(52), "ba");
    }

    #[test]
    fn test_alias_counter_spans_many_bindings() {
        let mut source = String::new();
        for i in 0..30 {
            source.push_str(&format!("const binding{:02} = {};\n", i, i));
        }
        let code = compress(&source, CompressionLevel::Full);
        let map = code.symbol_map.unwrap();
        assert_eq!(map.len(), 30);
        assert!(map.contains_key("a"));
        assert!(map.contains_key("z"));
        assert!(map.contains_key("aa"));
    }

    #[test]
    fn test_invalid_input_does_not_panic() {
        let source = "const = } { ))) /* unterminated\nlet 123bad = ;";
        for level in [
            CompressionLevel::Minimal,
            CompressionLevel::Medium,
            CompressionLevel::Full,
        ] {
            let _ = compress(source, level);
        }
    }

    #[test]
    fn test_empty_source() {
        let code = compress("", CompressionLevel::Full);
        assert_eq!(code.body, "");
        assert_eq!(code.original_lines, 0);
        assert_eq!(code.compressed_lines, 0);
        assert!(code.symbol_map.unwrap().is_empty());
    }
}
