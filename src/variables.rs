// PromptShelf — `{{variable}}` extraction, resolution and substitution

use crate::context::EditorContext;
use crate::error::{Result, ShelfError};
use regex::Regex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][\w.-]*)\s*\}\}").unwrap());

/// Suggested answers for common free-form variables.
const DEFAULTS: &[(&str, &str)] = &[
    ("level", "intermediate"),
    ("format", "markdown"),
    ("tone", "professional"),
    ("audience", "developers"),
    ("length", "concise"),
    ("count", "3"),
    ("style", "idiomatic"),
    ("framework", "none"),
];

/// Distinct placeholder names in first-occurrence order. Names differing only
/// in case count as one.
pub fn extract_variables(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| seen.insert(name.to_lowercase()))
        .collect()
}

pub fn default_for(name: &str) -> Option<&'static str> {
    let key = name.to_lowercase();
    DEFAULTS.iter().find(|(n, _)| *n == key).map(|(_, v)| *v)
}

/// Value of a built-in alias from the live editor context.
pub fn resolve_from_context(name: &str, ctx: &EditorContext) -> Option<String> {
    let value = match name.to_lowercase().as_str() {
        "selectedtext" | "selection" | "code" => ctx.selection().map(str::to_string),
        "filename" | "file" => Some(ctx.file_name().to_string()),
        "filepath" | "path" => Some(ctx.file_path.clone()),
        "language" | "lang" => Some(ctx.language.clone()),
        "currentline" | "line" => Some(ctx.current_line.clone()),
        "linenumber" => Some(ctx.line_number.to_string()),
        "functionname" | "function" => ctx.function_name().map(str::to_string),
        "classname" | "class" => ctx.class_name().map(str::to_string),
        "testname" | "test" => ctx.test_name().map(str::to_string),
        "erroratcursor" | "error" => ctx.error_at_cursor(),
        "projecttype" | "project" => ctx.project_type.map(|p| p.as_str().to_string()),
        "imports" => ctx.imports(),
        _ => None,
    };
    value.filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Interactive input
// ---------------------------------------------------------------------------

/// Source of values for variables the context cannot answer.
pub trait VariableInput {
    /// Ask for `name`. Returns `ShelfError::Cancelled` when the user backs out.
    fn ask(&mut self, name: &str, default: Option<&str>) -> Result<String>;
}

/// Line-editor prompts on the terminal. Ctrl-C or Ctrl-D cancels.
pub struct TerminalInput {
    editor: rustyline::DefaultEditor,
}

impl TerminalInput {
    pub fn new() -> Result<Self> {
        let editor = rustyline::DefaultEditor::new()
            .map_err(|e| ShelfError::Other(format!("failed to initialize readline: {}", e)))?;
        Ok(Self { editor })
    }
}

impl VariableInput for TerminalInput {
    fn ask(&mut self, name: &str, default: Option<&str>) -> Result<String> {
        use rustyline::error::ReadlineError;

        let prompt = format!("{}: ", name);
        let line = match default {
            Some(d) => self.editor.readline_with_initial(&prompt, (d, "")),
            None => self.editor.readline(&prompt),
        };
        match line {
            Ok(value) => Ok(value.trim().to_string()),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Err(ShelfError::Cancelled),
            Err(e) => Err(ShelfError::Other(format!("readline error: {}", e))),
        }
    }
}

/// Pre-supplied answers, consumed in order. Running out counts as cancelling.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    answers: VecDeque<Option<String>>,
    pub asked: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(|a| a.map(Into::into)).collect(),
            asked: Vec::new(),
        }
    }
}

impl VariableInput for ScriptedInput {
    fn ask(&mut self, name: &str, _default: Option<&str>) -> Result<String> {
        self.asked.push(name.to_string());
        self.answers
            .pop_front()
            .flatten()
            .ok_or(ShelfError::Cancelled)
    }
}

/// Resolve every placeholder in `text`.
///
/// `presets` (from the command line) win over the editor context, which wins
/// over interactive input. A blank interactive answer falls back to the
/// per-name default when there is one.
pub fn resolve_all(
    text: &str,
    ctx: Option<&EditorContext>,
    presets: &HashMap<String, String>,
    input: &mut dyn VariableInput,
) -> Result<HashMap<String, String>> {
    let presets: HashMap<String, &String> =
        presets.iter().map(|(k, v)| (k.to_lowercase(), v)).collect();
    let mut values = HashMap::new();

    for name in extract_variables(text) {
        let value = if let Some(v) = presets.get(&name.to_lowercase()) {
            (*v).clone()
        } else if let Some(v) = ctx.and_then(|c| resolve_from_context(&name, c)) {
            v
        } else {
            let default = default_for(&name);
            let answer = input.ask(&name, default)?;
            match (answer.is_empty(), default) {
                (true, Some(d)) => d.to_string(),
                _ => answer,
            }
        };
        values.insert(name, value);
    }
    Ok(values)
}

/// Replace every `{{name}}` whose name (case-insensitive) has a value.
/// Placeholders without a supplied value stay as they are.
pub fn substitute(text: &str, values: &HashMap<String, String>) -> String {
    let lookup: HashMap<String, &str> = values
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.as_str()))
        .collect();

    PLACEHOLDER
        .replace_all(text, |caps: &regex::Captures| {
            match lookup.get(&caps[1].to_lowercase()) {
                Some(v) => v.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
