// PromptShelf — Usage and quality report
//
// Combines the prompt forest with the preference record into a summary of
// what is stored, what gets used, and how prompts were scored.

use crate::preferences::Preferences;
use crate::prompt::{CategoryKind, PromptTree};
use crate::search::tag_counts;

const TOP_PROMPTS: usize = 5;
const TOP_TAGS: usize = 8;

#[derive(Debug, Clone)]
pub struct PromptStat {
    pub id: String,
    pub label: String,
    pub uses: u64,
}

/// Structured analytics report.
#[derive(Debug, Clone)]
pub struct AnalyticsReport {
    pub system_prompts: usize,
    pub user_prompts: usize,
    pub categories: usize,
    pub favorites: usize,
    pub recent: usize,
    pub total_uses: u64,
    pub top_prompts: Vec<PromptStat>,
    pub top_tags: Vec<(String, usize)>,
    pub evaluated: usize,
    pub average_score: Option<f64>,
}

pub fn report(tree: &PromptTree, prefs: &Preferences) -> AnalyticsReport {
    let prompts = tree.prompts();

    let user_prompts = prompts
        .iter()
        .filter(|p| tree.kind_of(&p.id) == Some(CategoryKind::User))
        .count();

    let mut top_prompts: Vec<PromptStat> = prompts
        .iter()
        .map(|p| PromptStat {
            id: p.id.clone(),
            label: p.label.clone(),
            uses: prefs.use_count(&p.id),
        })
        .filter(|s| s.uses > 0)
        .collect();
    top_prompts.sort_by(|a, b| b.uses.cmp(&a.uses));
    top_prompts.truncate(TOP_PROMPTS);

    let mut top_tags: Vec<(String, usize)> = tag_counts(tree).into_iter().collect();
    top_tags.sort_by(|a, b| b.1.cmp(&a.1));
    top_tags.truncate(TOP_TAGS);

    let scores: Vec<u8> = prompts
        .iter()
        .filter_map(|p| p.evaluation.as_ref())
        .map(|e| e.overall_score)
        .collect();
    let average_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64)
    };

    AnalyticsReport {
        system_prompts: prompts.len() - user_prompts,
        user_prompts,
        categories: tree.categories().count(),
        favorites: prefs.favorites.iter().filter(|id| tree.contains(id)).count(),
        recent: prefs.recent.len(),
        total_uses: prefs.usage.values().map(|u| u.count).sum(),
        top_prompts,
        top_tags,
        evaluated: scores.len(),
        average_score,
    }
}

/// Format a report as a displayable string.
pub fn format_report(r: &AnalyticsReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "═══ PromptShelf Analytics ═══\n\
         Prompts:      {} ({} system, {} user)\n\
         Categories:   {}\n\
         Favorites:    {}\n\
         Recent:       {}\n\
         Total Uses:   {}\n",
        r.system_prompts + r.user_prompts,
        r.system_prompts,
        r.user_prompts,
        r.categories,
        r.favorites,
        r.recent,
        r.total_uses,
    ));

    if !r.top_prompts.is_empty() {
        out.push_str("\n─── Most Used ───\n");
        for p in &r.top_prompts {
            out.push_str(&format!("  {:<6} {:<40} {:>4} uses\n", p.id, p.label, p.uses));
        }
    }

    if !r.top_tags.is_empty() {
        out.push_str("\n─── Tags ───\n");
        for (tag, count) in &r.top_tags {
            out.push_str(&format!("  {:<20} {:>4} prompts\n", tag, count));
        }
    }

    out.push_str("\n─── Quality ───\n");
    match r.average_score {
        Some(avg) => out.push_str(&format!(
            "  Evaluated: {}  Average score: {:.1}\n",
            r.evaluated, avg
        )),
        None => out.push_str("  No evaluated prompts yet\n"),
    }

    out
}
