// PromptShelf — Editor context detection
//
// Classifies what the cursor is near (selection, diagnostic, test, function,
// class, import, comment or plain file) from an editor snapshot.

pub mod project;

pub use project::{language_from_path, ProjectType};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// How far above the cursor declarations are searched for.
const SCAN_WINDOW: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
    Hint,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnostic {
    /// Zero-based line.
    pub line: usize,
    #[serde(default)]
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
}

impl Diagnostic {
    /// Parse `LINE:CODE:MESSAGE` (1-based line) as typed on the command line.
    pub fn parse_cli(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, ':');
        let line: usize = parts.next()?.trim().parse().ok()?;
        let code = parts.next()?.trim().to_string();
        let message = parts.next().unwrap_or("").trim().to_string();
        Some(Self {
            line: line.saturating_sub(1),
            code,
            message,
            severity: Severity::Error,
        })
    }
}

/// Raw editor state handed over by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EditorSnapshot {
    pub file_name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub text: String,
    /// Zero-based line of the cursor.
    #[serde(default)]
    pub cursor_line: usize,
    #[serde(default)]
    pub selection: Option<String>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
}

impl EditorSnapshot {
    /// Build a snapshot by reading `path` from disk.
    pub fn from_file(path: &Path, cursor_line: usize) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self {
            file_name: path.to_string_lossy().to_string(),
            text,
            cursor_line,
            ..Default::default()
        })
    }
}

/// What the cursor is near, with the data specific to that situation.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextKind {
    Selection { text: String },
    Error { diagnostics: Vec<Diagnostic> },
    Test { name: String },
    Function { name: String },
    Class { name: String },
    Import { modules: Vec<String> },
    Comment { text: String },
    File,
}

impl ContextKind {
    pub fn name(&self) -> &'static str {
        match self {
            ContextKind::Selection { .. } => "selection",
            ContextKind::Error { .. } => "error",
            ContextKind::Test { .. } => "test",
            ContextKind::Function { .. } => "function",
            ContextKind::Class { .. } => "class",
            ContextKind::Import { .. } => "import",
            ContextKind::Comment { .. } => "comment",
            ContextKind::File => "file",
        }
    }
}

/// A classified snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorContext {
    pub kind: ContextKind,
    pub file_path: String,
    pub language: String,
    pub project_type: Option<ProjectType>,
    pub current_line: String,
    /// One-based, as shown in editors.
    pub line_number: usize,
}

impl EditorContext {
    pub fn file_name(&self) -> &str {
        Path::new(&self.file_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.file_path)
    }

    pub fn selection(&self) -> Option<&str> {
        match &self.kind {
            ContextKind::Selection { text } => Some(text),
            _ => None,
        }
    }

    pub fn function_name(&self) -> Option<&str> {
        match &self.kind {
            ContextKind::Function { name } | ContextKind::Test { name } => Some(name),
            _ => None,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match &self.kind {
            ContextKind::Class { name } => Some(name),
            _ => None,
        }
    }

    pub fn test_name(&self) -> Option<&str> {
        match &self.kind {
            ContextKind::Test { name } => Some(name),
            _ => None,
        }
    }

    /// First diagnostic at the cursor, formatted as `CODE: message`.
    pub fn error_at_cursor(&self) -> Option<String> {
        match &self.kind {
            ContextKind::Error { diagnostics } => diagnostics.first().map(|d| {
                if d.code.is_empty() {
                    d.message.clone()
                } else {
                    format!("{}: {}", d.code, d.message)
                }
            }),
            _ => None,
        }
    }

    pub fn imports(&self) -> Option<String> {
        match &self.kind {
            ContextKind::Import { modules } if !modules.is_empty() => Some(modules.join(", ")),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

static TEST_DECL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^\s*(?:pub\s+)?(?:async\s+)?fn\s+(test_\w+)",
        r"^\s*(?:async\s+)?def\s+(test\w*)",
        r#"^\s*(?:it|test|describe)\s*\(\s*['"`]([^'"`]+)"#,
        r"^func\s+(Test\w+)\s*\(",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TEST_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:#\[(?:tokio::)?test|#\[rstest|@Test\b|@pytest)").unwrap());

static FUNCTION_DECL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(\w+)",
        r"^\s*(?:async\s+)?def\s+(\w+)",
        r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)",
        r"^\s*(?:export\s+)?(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s+)?(?:\([^)]*\)|\w+)\s*=>",
        r"^func\s+(?:\([^)]*\)\s*)?(\w+)\s*\(",
        r"^\s*(?:(?:public|private|protected|static|final|abstract|override|virtual|async)\s+)+[\w<>\[\],]+\s+(\w+)\s*\(",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static CLASS_DECL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait|union)\s+(\w+)",
        r"^\s*impl(?:<[^>]*>)?\s+(?:[\w:]+(?:<[^>]*>)?\s+for\s+)?(\w+)",
        r"^\s*(?:export\s+)?(?:default\s+)?(?:(?:public|private|internal|abstract|static|final|sealed)\s+)*(?:class|interface)\s+(\w+)",
        r"^type\s+(\w+)\s+(?:struct|interface)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(?:use\s+([\w:]+)|import\s+(?:[\w{}*,\s]+\s+from\s+)?['"]?([\w./@-]+)|from\s+([\w.]+)\s+import|#include\s*[<"]([^>"]+)|extern\s+crate\s+(\w+)|(?:const|let|var)\s+\w+\s*=\s*require\(\s*['"]([^'"]+))"#,
    )
    .unwrap()
});

/// Classify a snapshot. Priority: selection, error, test, function, class,
/// import, comment, file.
pub fn detect(snapshot: &EditorSnapshot) -> EditorContext {
    let lines: Vec<&str> = snapshot.text.lines().collect();
    let cursor = snapshot.cursor_line.min(lines.len().saturating_sub(1));
    let current_line = lines.get(cursor).copied().unwrap_or("").to_string();

    let language = snapshot
        .language
        .clone()
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| language_from_path(&snapshot.file_name).to_string());

    let project_type = snapshot
        .workspace_root
        .as_deref()
        .or_else(|| Path::new(&snapshot.file_name).parent())
        .and_then(ProjectType::detect);

    let kind = classify(snapshot, &lines, cursor, &current_line);
    // Without text there is nothing to clamp against, keep the editor's line.
    let line_number = if lines.is_empty() {
        snapshot.cursor_line + 1
    } else {
        cursor + 1
    };
    tracing::debug!(kind = kind.name(), line = line_number, "Context detected");

    EditorContext {
        kind,
        file_path: snapshot.file_name.clone(),
        language,
        project_type,
        current_line,
        line_number,
    }
}

fn classify(snapshot: &EditorSnapshot, lines: &[&str], cursor: usize, current: &str) -> ContextKind {
    if let Some(text) = snapshot.selection.as_ref().filter(|s| !s.trim().is_empty()) {
        return ContextKind::Selection { text: text.clone() };
    }

    let at_cursor: Vec<Diagnostic> = snapshot
        .diagnostics
        .iter()
        .filter(|d| d.line == snapshot.cursor_line || d.line == cursor)
        .filter(|d| matches!(d.severity, Severity::Error | Severity::Warning))
        .cloned()
        .collect();
    if !at_cursor.is_empty() {
        return ContextKind::Error {
            diagnostics: at_cursor,
        };
    }

    if let Some(kind) = enclosing_declaration(lines, cursor) {
        return kind;
    }

    if IMPORT_LINE.is_match(current) {
        return ContextKind::Import {
            modules: imported_modules(lines),
        };
    }

    if let Some(text) = comment_text(current) {
        return ContextKind::Comment { text };
    }

    ContextKind::File
}

/// Nearest test, function or class declaration at or above the cursor.
fn enclosing_declaration(lines: &[&str], cursor: usize) -> Option<ContextKind> {
    if lines.is_empty() {
        return None;
    }
    let start = cursor.saturating_sub(SCAN_WINDOW);
    for idx in (start..=cursor).rev() {
        let line = lines[idx];

        if let Some(name) = first_capture(&TEST_DECL, line) {
            return Some(ContextKind::Test { name });
        }
        if let Some(name) = first_capture(&FUNCTION_DECL, line) {
            let attributed = idx > 0 && TEST_ATTR.is_match(lines[idx - 1]);
            return Some(if attributed {
                ContextKind::Test { name }
            } else {
                ContextKind::Function { name }
            });
        }
        if let Some(name) = first_capture(&CLASS_DECL, line) {
            return Some(ContextKind::Class { name });
        }
    }
    None
}

fn first_capture(patterns: &[Regex], line: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Module paths of every import statement in the file, in order.
pub fn imported_modules(lines: &[&str]) -> Vec<String> {
    let mut modules: Vec<String> = Vec::new();
    for line in lines {
        if let Some(caps) = IMPORT_LINE.captures(line) {
            if let Some(m) = caps.iter().skip(1).flatten().next() {
                let name = m.as_str().trim_end_matches("::").to_string();
                if !modules.contains(&name) {
                    modules.push(name);
                }
            }
        }
    }
    modules
}

fn comment_text(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("#[") || trimmed.starts_with("#!") || trimmed.starts_with("#include") {
        return None;
    }
    for marker in ["///", "//!", "//", "/**", "/*", "<!--", "\"\"\"", "--", "#", "*"] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            let text = rest
                .trim()
                .trim_end_matches("*/")
                .trim_end_matches("-->")
                .trim_end_matches("\"\"\"")
                .trim()
                .to_string();
            return Some(text);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(text: &str, line: usize) -> EditorSnapshot {
        EditorSnapshot {
            file_name: "/nonexistent/src/lib.rs".into(),
            text: text.into(),
            cursor_line: line,
            ..Default::default()
        }
    }

    const RUST: &str = "use std::collections::HashMap;\nuse serde::Serialize;\n\n// Cache of parsed values\npub struct Cache {\n    map: HashMap<String, String>,\n}\n\nimpl Cache {\n    pub fn get(&self, key: &str) -> Option<&String> {\n        self.map.get(key)\n    }\n}\n\n#[test]\nfn lookup_works() {\n    assert!(true);\n}\n";

    #[test]
    fn test_selection_wins() {
        let mut snap = snapshot(RUST, 10);
        snap.selection = Some("self.map.get(key)".into());
        snap.diagnostics.push(Diagnostic {
            line: 10,
            code: "E0308".into(),
            message: "mismatched types".into(),
            severity: Severity::Error,
        });
        let ctx = detect(&snap);
        assert_eq!(ctx.selection(), Some("self.map.get(key)"));
        assert_eq!(ctx.language, "rust");
    }

    #[test]
    fn test_error_at_cursor() {
        let mut snap = snapshot(RUST, 10);
        snap.diagnostics.push(Diagnostic {
            line: 10,
            code: "E0308".into(),
            message: "mismatched types".into(),
            severity: Severity::Error,
        });
        snap.diagnostics.push(Diagnostic {
            line: 3,
            code: "W1".into(),
            message: "elsewhere".into(),
            severity: Severity::Warning,
        });
        let ctx = detect(&snap);
        assert_eq!(ctx.kind.name(), "error");
        assert_eq!(ctx.error_at_cursor().as_deref(), Some("E0308: mismatched types"));
    }

    #[test]
    fn test_function_class_and_test() {
        let ctx = detect(&snapshot(RUST, 10));
        assert_eq!(ctx.kind, ContextKind::Function { name: "get".into() });
        assert_eq!(ctx.line_number, 11);

        let ctx = detect(&snapshot(RUST, 5));
        assert_eq!(ctx.class_name(), Some("Cache"));

        let ctx = detect(&snapshot(RUST, 16));
        assert_eq!(ctx.test_name(), Some("lookup_works"));
        assert_eq!(ctx.function_name(), Some("lookup_works"));
    }

    #[test]
    fn test_import_and_comment() {
        let ctx = detect(&snapshot(RUST, 1));
        assert_eq!(
            ctx.kind,
            ContextKind::Import {
                modules: vec!["std::collections::HashMap".into(), "serde::Serialize".into()]
            }
        );
        assert_eq!(ctx.imports().as_deref(), Some("std::collections::HashMap, serde::Serialize"));

        let ctx = detect(&snapshot(RUST, 3));
        assert_eq!(ctx.kind, ContextKind::Comment { text: "Cache of parsed values".into() });
    }

    #[test]
    fn test_python_and_js_declarations() {
        let py = "import os\n\nclass Loader:\n    def load(self, path):\n        return open(path)\n\ndef test_load():\n    pass\n";
        let mut snap = snapshot(py, 4);
        snap.file_name = "loader.py".into();
        let ctx = detect(&snap);
        assert_eq!(ctx.language, "python");
        assert_eq!(ctx.function_name(), Some("load"));
        snap.cursor_line = 7;
        assert_eq!(detect(&snap).test_name(), Some("test_load"));

        let js = "const fs = require('fs');\ndescribe('parser', () => {\n  it('parses', () => {});\n});\n";
        let mut snap = snapshot(js, 2);
        snap.file_name = "parser.test.js".into();
        assert_eq!(detect(&snap).test_name(), Some("parses"));
        snap.cursor_line = 0;
        assert_eq!(
            detect(&snap).kind,
            ContextKind::Import { modules: vec!["fs".into()] }
        );
    }

    #[test]
    fn test_plain_file_and_out_of_range_cursor() {
        let ctx = detect(&snapshot("just some words\nmore words\n", 99));
        assert_eq!(ctx.kind, ContextKind::File);
        assert_eq!(ctx.line_number, 2);

        let ctx = detect(&snapshot("", 0));
        assert_eq!(ctx.kind, ContextKind::File);
        assert_eq!(ctx.file_name(), "lib.rs");
    }

    fn error_on(line: usize) -> Diagnostic {
        Diagnostic {
            line,
            code: "E0382".into(),
            message: "borrow of moved value".into(),
            severity: Severity::Error,
        }
    }

    #[test]
    fn test_diagnostic_without_text() {
        let snap = EditorSnapshot {
            file_name: "untitled".into(),
            cursor_line: 11,
            diagnostics: vec![error_on(11)],
            ..Default::default()
        };
        let ctx = detect(&snap);
        assert_eq!(ctx.kind.name(), "error");
        assert_eq!(ctx.line_number, 12);
        assert_eq!(ctx.error_at_cursor().as_deref(), Some("E0382: borrow of moved value"));
    }

    #[test]
    fn test_diagnostic_with_cursor_past_end() {
        let mut snap = snapshot("let a = vec![1];
let b = a;
", 40);
        snap.diagnostics.push(error_on(40));
        assert_eq!(detect(&snap).kind.name(), "error");

        let mut snap = snapshot("let a = vec![1];
let b = a;
", 40);
        snap.diagnostics.push(error_on(0));
        assert_eq!(detect(&snap).kind.name(), "file");
    }

    #[test]
    fn test_parse_cli_diagnostic() {
        let d = Diagnostic::parse_cli("12:E0382:borrow of moved value: `x`").unwrap();
        assert_eq!(d.line, 11);
        assert_eq!(d.code, "E0382");
        assert_eq!(d.message, "borrow of moved value: `x`");
        assert!(Diagnostic::parse_cli("abc").is_none());
    }
}
