// PromptShelf — Search and tag filtering over the prompt forest

use crate::prompt::{Prompt, PromptTree};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Case-insensitive substring match on label, body and tags.
pub fn prompt_matches(prompt: &Prompt, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    prompt.label.to_lowercase().contains(&q)
        || prompt.body.to_lowercase().contains(&q)
        || prompt.tags.iter().any(|t| t.contains(&q))
}

/// Prune the forest to prompts matching `query`, keeping their ancestors.
///
/// A category or group whose label matches keeps everything beneath it. An
/// empty query returns the tree unchanged.
pub fn search(tree: &PromptTree, query: &str) -> PromptTree {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return tree.clone();
    }
    tree.pruned(
        |p| prompt_matches(p, &q),
        |label| label.to_lowercase().contains(&q),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMatch {
    /// Keep prompts carrying at least one of the tags.
    #[default]
    Any,
    /// Keep prompts carrying every tag.
    All,
}

/// Prune the forest to prompts selected by a tag multi-select.
pub fn filter_by_tags(tree: &PromptTree, tags: &BTreeSet<String>, mode: TagMatch) -> PromptTree {
    if tags.is_empty() {
        return tree.clone();
    }
    tree.pruned(
        |p| match mode {
            TagMatch::Any => tags.iter().any(|t| p.tags.contains(t)),
            TagMatch::All => tags.iter().all(|t| p.tags.contains(t)),
        },
        |_| false,
    )
}

/// Query and tag selection kept between invocations until cleared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ActiveFilter {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub match_all: bool,
}

impl ActiveFilter {
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty() && self.tags.is_empty()
    }

    pub fn apply(&self, tree: &PromptTree) -> PromptTree {
        let mode = if self.match_all { TagMatch::All } else { TagMatch::Any };
        filter_by_tags(&search(tree, &self.query), &self.tags, mode)
    }
}

/// Every tag in the forest with the number of prompts carrying it.
pub fn tag_counts(tree: &PromptTree) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for prompt in tree.prompts() {
        for tag in &prompt.tags {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{CategoryKind, CategoryRecord, GroupRecord, PromptDocument};

    fn tree() -> PromptTree {
        let system = PromptDocument::new(vec![
            CategoryRecord {
                id: "1".into(),
                label: "Code".into(),
                kind: CategoryKind::System,
                groups: vec![
                    GroupRecord {
                        id: "2".into(),
                        label: "Review".into(),
                        prompts: vec![
                            Prompt::new("3", "Review", "Review the code", ["review"]),
                            Prompt::new("4", "Security", "Audit for issues", ["review", "owasp"]),
                        ],
                    },
                    GroupRecord {
                        id: "5".into(),
                        label: "Testing".into(),
                        prompts: vec![Prompt::new("6", "Unit tests", "Write tests", ["test"])],
                    },
                ],
            },
            CategoryRecord {
                id: "7".into(),
                label: "Docs".into(),
                kind: CategoryKind::System,
                groups: vec![GroupRecord {
                    id: "8".into(),
                    label: "Readme".into(),
                    prompts: vec![Prompt::new("9", "Readme", "Draft a README", ["docs"])],
                }],
            },
        ]);
        PromptTree::from_documents(system, PromptDocument::empty_user())
    }

    #[test]
    fn test_deep_tag_match_keeps_ancestors_only() {
        let result = search(&tree(), "OWASP");
        assert!(result.get("1").is_some());
        assert!(result.get("2").is_some());
        assert!(result.get("4").is_some());
        assert!(result.get("3").is_none());
        assert!(result.get("5").is_none());
        assert!(result.get("6").is_none());
        assert!(result.get("7").is_none());
        assert!(result.get("user").is_none());
        assert_eq!(result.ancestors("4"), vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_group_label_match_keeps_subtree() {
        let result = search(&tree(), "testing");
        assert!(result.get("6").is_some());
        assert!(result.get("3").is_none());
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let t = tree();
        assert_eq!(search(&t, "  "), t);
    }

    #[test]
    fn test_body_match_is_case_insensitive() {
        let result = search(&tree(), "readme");
        assert_eq!(result.prompt_count(), 1);
        assert!(result.get("9").is_some());
    }

    #[test]
    fn test_filter_by_tags() {
        let t = tree();
        let tags: BTreeSet<String> = ["review".to_string(), "docs".to_string()].into();
        assert_eq!(filter_by_tags(&t, &tags, TagMatch::Any).prompt_count(), 3);
        assert_eq!(filter_by_tags(&t, &tags, TagMatch::All).prompt_count(), 0);

        let both: BTreeSet<String> = ["review".to_string(), "owasp".to_string()].into();
        let all = filter_by_tags(&t, &both, TagMatch::All);
        assert_eq!(all.prompt_count(), 1);
        assert!(all.get("4").is_some());
    }

    #[test]
    fn test_tag_counts() {
        let counts = tag_counts(&tree());
        assert_eq!(counts["review"], 2);
        assert_eq!(counts["docs"], 1);
    }

    #[test]
    fn test_active_filter_combines_query_and_tags() {
        let t = tree();
        let filter = ActiveFilter {
            query: "review".into(),
            tags: ["owasp".to_string()].into(),
            match_all: false,
        };
        let result = filter.apply(&t);
        assert_eq!(result.prompt_count(), 1);
        assert!(result.get("4").is_some());

        assert!(ActiveFilter::default().is_empty());
        assert_eq!(ActiveFilter::default().apply(&t), t);
    }
}
