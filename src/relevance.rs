// PromptShelf — Context-aware prompt ranking
//
// Each signal is an independent additive bonus. A prompt with no contextual
// signal scores zero and is dropped from the results.

use crate::context::{ContextKind, EditorContext};
use crate::preferences::Preferences;
use crate::prompt::{Prompt, PromptTree};

pub const DEFAULT_LIMIT: usize = 10;

const TAG_HIT: u32 = 3;
const LABEL_HIT: u32 = 2;
const BODY_HIT: u32 = 1;

const LANGUAGE_TAG: u32 = 4;
const LANGUAGE_TEXT: u32 = 3;
const PROJECT_TAG: u32 = 5;
const PROJECT_TEXT: u32 = 4;
const DIAGNOSTIC_CODE: u32 = 5;

const BASE: u32 = 1;
const MAX_FREQUENCY_BONUS: u64 = 3;

#[derive(Debug, Clone)]
pub struct Suggestion<'a> {
    pub prompt: &'a Prompt,
    pub score: u32,
}

fn keywords(kind: &ContextKind) -> &'static [&'static str] {
    match kind {
        ContextKind::Selection { .. } => {
            &["explain", "refactor", "review", "optimize", "improve", "simplify"]
        }
        ContextKind::Error { .. } => &["debug", "fix", "error", "bug", "troubleshoot", "exception"],
        ContextKind::Function { .. } => {
            &["function", "method", "document", "refactor", "test", "optimize"]
        }
        ContextKind::Class { .. } => {
            &["class", "design", "pattern", "architecture", "refactor", "structure"]
        }
        ContextKind::Test { .. } => &["test", "unit", "coverage", "mock", "assert", "spec"],
        ContextKind::Import { .. } => &["import", "dependency", "dependencies", "module", "package"],
        ContextKind::Comment { .. } => {
            &["comment", "document", "documentation", "explain", "docstring"]
        }
        ContextKind::File => &["explain", "review", "overview", "summarize", "document"],
    }
}

/// Lowercased text of a prompt, computed once per scoring pass.
struct Haystack {
    label: String,
    body: String,
}

impl Haystack {
    fn new(prompt: &Prompt) -> Self {
        Self {
            label: prompt.label.to_lowercase(),
            body: prompt.body.to_lowercase(),
        }
    }

    fn text_mentions(&self, needle: &str) -> bool {
        mentions(&self.label, needle) || mentions(&self.body, needle)
    }
}

/// Substring match. Needles of three characters or fewer must match a whole
/// word so that `go` does not fire on `good`.
fn mentions(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    if needle.len() > 3 {
        return haystack.contains(needle);
    }
    haystack
        .split(|c: char| !(c.is_alphanumeric() || c == '.' || c == '#' || c == '+'))
        .any(|word| word == needle)
}

/// Score from the context alone, before usage bonuses.
fn context_score(prompt: &Prompt, ctx: &EditorContext) -> u32 {
    let text = Haystack::new(prompt);
    let mut score = 0;

    for kw in keywords(&ctx.kind) {
        if prompt.tags.iter().any(|t| t.contains(kw)) {
            score += TAG_HIT;
        }
        if mentions(&text.label, kw) {
            score += LABEL_HIT;
        }
        if mentions(&text.body, kw) {
            score += BODY_HIT;
        }
    }

    let language = ctx.language.to_lowercase();
    if language != "plaintext" && !language.is_empty() {
        if prompt.has_tag(&language) {
            score += LANGUAGE_TAG;
        } else if text.text_mentions(&language) {
            score += LANGUAGE_TEXT;
        }
    }

    if let Some(project) = ctx.project_type {
        let words = project.keywords();
        if words.iter().any(|w| prompt.has_tag(w)) {
            score += PROJECT_TAG;
        } else if words.iter().any(|w| text.text_mentions(w)) {
            score += PROJECT_TEXT;
        }
    }

    if let ContextKind::Error { diagnostics } = &ctx.kind {
        for diag in diagnostics {
            let code = diag.code.trim().to_lowercase();
            if code.is_empty() {
                continue;
            }
            if text.label.contains(&code)
                || text.body.contains(&code)
                || prompt.tags.iter().any(|t| t.contains(&code))
            {
                score += DIAGNOSTIC_CODE;
            }
        }
    }

    score
}

fn usage_bonus(prompt: &Prompt, prefs: &Preferences) -> u32 {
    let recent = match prefs.recent_rank(&prompt.id) {
        Some(0..=1) => 2,
        Some(2..=4) => 1,
        _ => 0,
    };
    let frequency = prefs.use_count(&prompt.id).min(MAX_FREQUENCY_BONUS) as u32;
    recent + frequency
}

/// Full score of one prompt. Zero means "not relevant".
pub fn score(prompt: &Prompt, ctx: &EditorContext, prefs: &Preferences) -> u32 {
    let signal = context_score(prompt, ctx);
    if signal == 0 {
        return 0;
    }
    BASE + signal + usage_bonus(prompt, prefs)
}

/// Rank every prompt in `tree` for `ctx` and keep the best `limit`.
pub fn suggest<'a>(
    tree: &'a PromptTree,
    ctx: &EditorContext,
    prefs: &Preferences,
    limit: usize,
) -> Vec<Suggestion<'a>> {
    let mut ranked: Vec<Suggestion<'a>> = tree
        .prompts()
        .into_iter()
        .map(|prompt| Suggestion {
            prompt,
            score: score(prompt, ctx, prefs),
        })
        .filter(|s| s.score > 0)
        .collect();

    // sort_by is stable, ties keep forest order
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(limit);

    tracing::debug!(
        context = ctx.kind.name(),
        candidates = ranked.len(),
        "Ranked prompts"
    );
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Diagnostic, ProjectType, Severity};
    use crate::prompt::{CategoryKind, CategoryRecord, GroupRecord, PromptDocument};

    fn ctx(kind: ContextKind) -> EditorContext {
        EditorContext {
            kind,
            file_path: "src/lib.rs".into(),
            language: "plaintext".into(),
            project_type: None,
            current_line: String::new(),
            line_number: 1,
        }
    }

    fn error_ctx() -> EditorContext {
        ctx(ContextKind::Error {
            diagnostics: vec![Diagnostic {
                line: 0,
                code: "E0382".into(),
                message: "borrow of moved value".into(),
                severity: Severity::Error,
            }],
        })
    }

    fn tree(prompts: Vec<Prompt>) -> PromptTree {
        let doc = PromptDocument::new(vec![CategoryRecord {
            id: "100".into(),
            label: "All".into(),
            kind: CategoryKind::System,
            groups: vec![GroupRecord {
                id: "101".into(),
                label: "Misc".into(),
                prompts,
            }],
        }]);
        PromptTree::from_documents(doc, PromptDocument::empty_user())
    }

    #[test]
    fn test_error_context_prefers_debug_prompt() {
        let t = tree(vec![
            Prompt::new("1", "Tidy up", "Rename things for readability", Vec::<String>::new()),
            Prompt::new("2", "Investigate", "Help me debug this code", Vec::<String>::new()),
        ]);
        let prefs = Preferences::default();
        let c = error_ctx();

        let plain = score(t.prompt("1").unwrap(), &c, &prefs);
        let debug = score(t.prompt("2").unwrap(), &c, &prefs);
        assert!(debug > plain);

        let ranked = suggest(&t, &c, &prefs, DEFAULT_LIMIT);
        assert_eq!(ranked[0].prompt.id, "2");
    }

    #[test]
    fn test_zero_score_is_excluded() {
        let t = tree(vec![
            Prompt::new("1", "Poem", "Write a haiku about autumn", Vec::<String>::new()),
            Prompt::new("2", "Fix", "Fix the error", ["debug"]),
        ]);
        let ranked = suggest(&t, &error_ctx(), &Preferences::default(), DEFAULT_LIMIT);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].prompt.id, "2");
    }

    #[test]
    fn test_usage_alone_does_not_make_relevant() {
        let t = tree(vec![Prompt::new("1", "Poem", "Write a haiku", Vec::<String>::new())]);
        let mut prefs = Preferences::default();
        prefs.record_use("1");
        prefs.record_use("1");
        assert!(suggest(&t, &error_ctx(), &prefs, DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn test_recent_and_frequency_bonus() {
        let t = tree(vec![
            Prompt::new("1", "Debug A", "", Vec::<String>::new()),
            Prompt::new("2", "Debug B", "", Vec::<String>::new()),
        ]);
        let mut prefs = Preferences::default();
        for _ in 0..5 {
            prefs.record_use("2");
        }
        let c = error_ctx();
        let a = score(t.prompt("1").unwrap(), &c, &prefs);
        let b = score(t.prompt("2").unwrap(), &c, &prefs);
        assert_eq!(b - a, 2 + 3);
    }

    #[test]
    fn test_ties_keep_forest_order() {
        let t = tree(vec![
            Prompt::new("1", "Explain", "", Vec::<String>::new()),
            Prompt::new("2", "Review", "", Vec::<String>::new()),
        ]);
        let ranked = suggest(&t, &ctx(ContextKind::File), &Preferences::default(), DEFAULT_LIMIT);
        let ids: Vec<&str> = ranked.iter().map(|s| s.prompt.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_language_and_project_signals() {
        let t = tree(vec![
            Prompt::new("1", "Idioms", "Make it idiomatic", ["rust"]),
            Prompt::new("2", "Idioms", "Make it idiomatic cargo style", Vec::<String>::new()),
            Prompt::new("3", "Idioms", "Make it good", Vec::<String>::new()),
        ]);
        let mut c = ctx(ContextKind::Class { name: "Cache".into() });
        c.language = "rust".into();
        c.project_type = Some(ProjectType::Rust);

        let prefs = Preferences::default();
        // tag carries both language and project keyword
        assert_eq!(score(t.prompt("1").unwrap(), &c, &prefs), BASE + LANGUAGE_TAG + PROJECT_TAG);
        assert_eq!(score(t.prompt("2").unwrap(), &c, &prefs), BASE + PROJECT_TEXT);
        assert_eq!(score(t.prompt("3").unwrap(), &c, &prefs), 0);
    }

    #[test]
    fn test_short_needles_match_whole_words() {
        assert!(mentions("write it in go please", "go"));
        assert!(!mentions("a good answer", "go"));
        assert!(mentions("port to .net", ".net"));
    }

    #[test]
    fn test_diagnostic_code_bonus() {
        let t = tree(vec![
            Prompt::new("1", "Ownership", "Explain error E0382 in depth", Vec::<String>::new()),
            Prompt::new("2", "Ownership", "Explain error codes in depth", Vec::<String>::new()),
        ]);
        let c = error_ctx();
        let prefs = Preferences::default();
        let with = score(t.prompt("1").unwrap(), &c, &prefs);
        let without = score(t.prompt("2").unwrap(), &c, &prefs);
        assert_eq!(with - without, DIAGNOSTIC_CODE);
    }

    #[test]
    fn test_limit() {
        let prompts = (1..=15)
            .map(|i| Prompt::new(i.to_string(), "Debug", "", Vec::<String>::new()))
            .collect();
        let t = tree(prompts);
        assert_eq!(suggest(&t, &error_ctx(), &Preferences::default(), DEFAULT_LIMIT).len(), 10);
    }
}
