// PromptShelf — Prompt store (system + user JSON files merged into one forest)
//
// Every mutation is applied to a draft copy of the forest, the user part of the
// draft is written to disk, and the store is reloaded from disk. A failed write
// leaves the in-memory forest untouched.

use crate::error::{Result, ShelfError};
use crate::evaluator::{evaluate_or_fallback, Evaluator, PromptScore};
use crate::prompt::{
    normalize_tags, CategoryInfo, CategoryKind, Entry, Prompt, PromptDocument, PromptTree,
};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

/// Label of the group created when a prompt is added directly under a category.
pub const DEFAULT_GROUP_LABEL: &str = "General";

static PLACEHOLDER_PHRASES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:for example:|e\.g\.,|example:)[ \t]*").unwrap());

#[derive(Debug, Clone)]
pub struct StorePaths {
    pub system: PathBuf,
    pub user: PathBuf,
}

/// Fields of a prompt to create.
#[derive(Debug, Clone, Default)]
pub struct NewPrompt {
    pub label: String,
    pub body: String,
    pub tags: BTreeSet<String>,
}

/// Partial update; `None` fields are left as they are.
#[derive(Debug, Clone, Default)]
pub struct PromptPatch {
    pub label: Option<String>,
    pub body: Option<String>,
    pub tags: Option<BTreeSet<String>>,
}

pub struct PromptStore {
    paths: StorePaths,
    tree: PromptTree,
    next_id: u64,
    evaluator: Option<Arc<dyn Evaluator>>,
    eval_timeout: Duration,
}

impl PromptStore {
    /// Create a store and load both files.
    pub async fn open(
        paths: StorePaths,
        evaluator: Option<Arc<dyn Evaluator>>,
        eval_timeout: Duration,
    ) -> Result<Self> {
        let mut store = Self {
            paths,
            tree: PromptTree::new(),
            next_id: 1,
            evaluator,
            eval_timeout,
        };
        store.load().await?;
        Ok(store)
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn tree(&self) -> &PromptTree {
        &self.tree
    }

    /// Rebuild the forest from disk and recompute the id counter.
    pub async fn load(&mut self) -> Result<()> {
        let system = read_system(&self.paths.system).await;
        let user = read_or_create_user(&self.paths.user).await;

        self.tree = PromptTree::from_documents(system, user);
        self.next_id = self.next_id.max(self.tree.max_numeric_id() + 1);

        tracing::debug!(
            prompts = self.tree.prompt_count(),
            next_id = self.next_id,
            "Prompt store loaded"
        );
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Entry> {
        self.tree.get(id)
    }

    pub fn prompt(&self, id: &str) -> Option<&Prompt> {
        self.tree.prompt(id)
    }

    pub fn kind_of(&self, id: &str) -> Option<CategoryKind> {
        self.tree.kind_of(id)
    }

    /// Whether `id` exists and may be edited, deleted and shared.
    pub fn is_mutable(&self, id: &str) -> bool {
        self.kind_of(id).is_some_and(|k| k.is_mutable())
    }

    fn allocate_id(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        id.to_string()
    }

    // -----------------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------------

    /// Add a prompt under `parent` (a user category, group or prompt) or under
    /// the first user category when `parent` is `None`. Returns the new id.
    pub async fn add(&mut self, new: NewPrompt, parent: Option<&str>) -> Result<String> {
        let label = new.label.trim().to_string();
        let body = strip_placeholder_phrases(&new.body);
        if label.is_empty() {
            return Err(ShelfError::InvalidInput("label must not be empty".into()));
        }
        if body.is_empty() {
            return Err(ShelfError::InvalidInput("prompt text must not be empty".into()));
        }
        if let Some(parent_id) = parent {
            self.ensure_mutable(parent_id)?;
        }

        let evaluation = self.evaluate(&body).await;

        let mut draft = self.tree.clone();
        let group_id = self.target_group(&mut draft, parent)?;
        let id = self.allocate_id();
        let mut prompt = Prompt::new(id.clone(), label, body, &new.tags);
        prompt.evaluation = evaluation;
        draft.insert_prompt(&group_id, prompt)?;

        self.commit(draft).await?;
        tracing::info!(id = %id, group = %group_id, "Prompt added");
        Ok(id)
    }

    /// Apply `patch` to a user prompt. Unknown ids are a no-op.
    pub async fn update(&mut self, id: &str, patch: PromptPatch) -> Result<()> {
        let Some(current) = self.tree.prompt(id) else {
            tracing::warn!(id = %id, "Update for unknown prompt ignored");
            return Ok(());
        };
        self.ensure_mutable(id)?;

        let new_body = patch.body.as_deref().map(strip_placeholder_phrases);
        if let Some(body) = &new_body {
            if body.is_empty() {
                return Err(ShelfError::InvalidInput("prompt text must not be empty".into()));
            }
        }
        if let Some(label) = &patch.label {
            if label.trim().is_empty() {
                return Err(ShelfError::InvalidInput("label must not be empty".into()));
            }
        }

        let body_changed = new_body.as_ref().is_some_and(|b| *b != current.body);
        let evaluation = match (&new_body, body_changed) {
            (Some(body), true) => self.evaluate(body).await,
            _ => current.evaluation.clone(),
        };

        let mut draft = self.tree.clone();
        if let Some(prompt) = draft.prompt_mut(id) {
            if let Some(label) = patch.label {
                prompt.label = label.trim().to_string();
            }
            if let Some(body) = new_body {
                prompt.body = body;
            }
            if let Some(tags) = patch.tags {
                prompt.tags = normalize_tags(&tags);
            }
            prompt.evaluation = evaluation;
        }

        self.commit(draft).await?;
        tracing::info!(id = %id, re_evaluated = body_changed, "Prompt updated");
        Ok(())
    }

    /// Remove a user prompt, group or category together with its subtree.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        if !self.tree.contains(id) {
            return Err(ShelfError::NotFound(id.to_string()));
        }
        self.ensure_mutable(id)?;

        let mut draft = self.tree.clone();
        let removed = draft.remove(id);
        self.commit(draft).await?;
        tracing::info!(id = %id, removed = removed.len(), "Deleted from store");
        Ok(())
    }

    /// Create a new group inside a user category.
    pub async fn add_group(&mut self, category_id: &str, label: &str) -> Result<String> {
        if label.trim().is_empty() {
            return Err(ShelfError::InvalidInput("group label must not be empty".into()));
        }
        match self.tree.get(category_id) {
            Some(Entry::Category(_)) => {}
            Some(other) => {
                return Err(ShelfError::InvalidInput(format!(
                    "'{}' is a {}, not a category",
                    category_id,
                    other.kind_name()
                )))
            }
            None => return Err(ShelfError::NotFound(category_id.to_string())),
        }
        self.ensure_mutable(category_id)?;

        let mut draft = self.tree.clone();
        let id = self.allocate_id();
        draft.insert_group(category_id, &id, label.trim())?;
        self.commit(draft).await?;
        Ok(id)
    }

    /// Create a new, empty user category.
    pub async fn add_category(&mut self, label: &str) -> Result<String> {
        if label.trim().is_empty() {
            return Err(ShelfError::InvalidInput("category label must not be empty".into()));
        }
        let mut draft = self.tree.clone();
        let id = self.allocate_id();
        draft.insert_category(CategoryInfo {
            id: id.clone(),
            label: label.trim().to_string(),
            kind: CategoryKind::User,
            groups: Vec::new(),
        });
        self.commit(draft).await?;
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_mutable(&self, id: &str) -> Result<()> {
        match self.tree.kind_of(id) {
            Some(CategoryKind::User) => Ok(()),
            Some(CategoryKind::System) => Err(ShelfError::ReadOnly(id.to_string())),
            None => Err(ShelfError::NotFound(id.to_string())),
        }
    }

    async fn evaluate(&self, body: &str) -> Option<PromptScore> {
        match &self.evaluator {
            Some(evaluator) => {
                Some(evaluate_or_fallback(evaluator.as_ref(), body, self.eval_timeout).await)
            }
            None => None,
        }
    }

    /// Resolve the group a new prompt goes into, creating it in `draft` if needed.
    fn target_group(&mut self, draft: &mut PromptTree, parent: Option<&str>) -> Result<String> {
        let category_id = match parent {
            Some(id) => match draft.get(id) {
                Some(Entry::Group(g)) => return Ok(g.id.clone()),
                Some(Entry::Prompt(_)) => {
                    return draft
                        .parent(id)
                        .map(str::to_string)
                        .ok_or_else(|| ShelfError::NotFound(id.to_string()))
                }
                Some(Entry::Category(c)) => c.id.clone(),
                None => return Err(ShelfError::NotFound(id.to_string())),
            },
            None => {
                let first_user = draft
                    .categories()
                    .find(|c| c.kind == CategoryKind::User)
                    .map(|c| c.id.clone());
                match first_user {
                    Some(id) => id,
                    None => {
                        let id = self.allocate_id();
                        draft.insert_category(CategoryInfo {
                            id: id.clone(),
                            label: "User Prompts".to_string(),
                            kind: CategoryKind::User,
                            groups: Vec::new(),
                        });
                        id
                    }
                }
            }
        };

        let existing = draft
            .children(&category_id)
            .into_iter()
            .find(|e| e.label() == DEFAULT_GROUP_LABEL)
            .map(|e| e.id().to_string());
        match existing {
            Some(id) => Ok(id),
            None => {
                let id = self.allocate_id();
                draft.insert_group(&category_id, &id, DEFAULT_GROUP_LABEL)?;
                Ok(id)
            }
        }
    }

    /// Persist the user part of `draft`, then reload from disk.
    async fn commit(&mut self, draft: PromptTree) -> Result<()> {
        let doc = draft.to_document(CategoryKind::User);
        if let Err(e) = doc.write(&self.paths.user).await {
            tracing::error!(path = %self.paths.user.display(), error = %e, "Failed to save user prompts");
            return Err(e);
        }
        self.load().await
    }
}

/// Remove filler phrases such as "e.g.," left over from prompt templates.
pub fn strip_placeholder_phrases(body: &str) -> String {
    PLACEHOLDER_PHRASES.replace_all(body, "").trim().to_string()
}

async fn read_system(path: &Path) -> PromptDocument {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "System prompts file not found, starting without system prompts");
        return PromptDocument::default();
    }
    match PromptDocument::read_async(path).await {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to load system prompts, using empty set");
            PromptDocument::default()
        }
    }
}

async fn read_or_create_user(path: &Path) -> PromptDocument {
    if !path.exists() {
        let doc = PromptDocument::empty_user();
        match doc.write(path).await {
            Ok(()) => tracing::info!(path = %path.display(), "Created user prompts file"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to create user prompts file")
            }
        }
        return doc;
    }

    match PromptDocument::read_async(path).await {
        Ok(doc) => doc,
        Err(e) => {
            let backup = corrupt_backup_path(path);
            tracing::warn!(
                path = %path.display(),
                backup = %backup.display(),
                error = %e,
                "User prompts file is unreadable, moving it aside"
            );
            if let Err(e) = tokio::fs::rename(path, &backup).await {
                tracing::error!(error = %e, "Failed to move unreadable user prompts file");
            }
            PromptDocument::empty_user()
        }
    }
}

fn corrupt_backup_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "user_prompts.json".to_string());
    path.with_file_name(format!("{}.corrupt-{}", name, chrono::Utc::now().timestamp()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingEvaluator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Evaluator for CountingEvaluator {
        async fn evaluate(&self, _text: &str) -> anyhow::Result<PromptScore> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut score = PromptScore::fallback();
            score.overall_score = 77;
            score.suggestions = vec!["Be specific".into()];
            Ok(score)
        }
    }

    fn paths(tmp: &TempDir) -> StorePaths {
        StorePaths {
            system: tmp.path().join("system_prompts.json"),
            user: tmp.path().join("user_prompts.json"),
        }
    }

    fn write_system(tmp: &TempDir) {
        let json = r#"{"version": "1.0", "categories": [{
            "id": "40", "label": "Code", "type": "system",
            "groups": [{"id": "41", "label": "Review", "prompts": [
                {"id": "42", "label": "Review", "prompt": "Review {{selection}}", "tags": ["review"]}
            ]}]
        }]}"#;
        std::fs::write(tmp.path().join("system_prompts.json"), json).unwrap();
    }

    async fn open(tmp: &TempDir) -> PromptStore {
        PromptStore::open(paths(tmp), None, Duration::from_secs(1))
            .await
            .unwrap()
    }

    fn new_prompt(label: &str, body: &str) -> NewPrompt {
        NewPrompt {
            label: label.into(),
            body: body.into(),
            tags: ["Rust"].iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_load_creates_user_file() {
        crate::logger::init_test();
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;

        assert!(tmp.path().join("user_prompts.json").exists());
        let cats: Vec<_> = store.tree().categories().collect();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].label, "User Prompts");
        assert_eq!(cats[0].kind, CategoryKind::User);
    }

    #[tokio::test]
    async fn test_malformed_system_file_is_not_fatal() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("system_prompts.json"), "{ not json").unwrap();
        let store = open(&tmp).await;
        assert_eq!(store.tree().prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_user_file_is_moved_aside() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("user_prompts.json"), "[[[").unwrap();
        let store = open(&tmp).await;

        assert_eq!(store.tree().categories().count(), 1);
        let backups = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .count();
        assert_eq!(backups, 1);
    }

    #[tokio::test]
    async fn test_add_then_find() {
        let tmp = TempDir::new().unwrap();
        write_system(&tmp);
        let mut store = open(&tmp).await;
        let before = store.tree().max_numeric_id();

        let id = store
            .add(new_prompt("Explain", "Explain e.g., this {{selection}}"), None)
            .await
            .unwrap();

        assert!(id.parse::<u64>().unwrap() > before);
        let p = store.prompt(&id).unwrap();
        assert_eq!(p.label, "Explain");
        assert_eq!(p.body, "Explain this {{selection}}");
        assert!(p.has_tag("rust"));
        assert_eq!(store.kind_of(&id), Some(CategoryKind::User));

        let group = store.tree().parent(&id).unwrap();
        assert_eq!(store.find_by_id(group).unwrap().label(), DEFAULT_GROUP_LABEL);
    }

    #[tokio::test]
    async fn test_ids_increase_monotonically() {
        let tmp = TempDir::new().unwrap();
        write_system(&tmp);
        let mut store = open(&tmp).await;

        let a: u64 = store.add(new_prompt("A", "a"), None).await.unwrap().parse().unwrap();
        let b: u64 = store.add(new_prompt("B", "b"), None).await.unwrap().parse().unwrap();
        assert!(a > 42);
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_add_under_system_rejected() {
        let tmp = TempDir::new().unwrap();
        write_system(&tmp);
        let mut store = open(&tmp).await;

        let err = store.add(new_prompt("X", "y"), Some("40")).await.unwrap_err();
        assert!(matches!(err, ShelfError::ReadOnly(_)));
        let err = store.add(new_prompt("X", "y"), Some("nope")).await.unwrap_err();
        assert!(matches!(err, ShelfError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_add_rejects_empty_input() {
        let tmp = TempDir::new().unwrap();
        let mut store = open(&tmp).await;
        let err = store.add(new_prompt("  ", "body"), None).await.unwrap_err();
        assert!(matches!(err, ShelfError::InvalidInput(_)));
        let err = store.add(new_prompt("label", "example:"), None).await.unwrap_err();
        assert!(matches!(err, ShelfError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_system_prompt_is_immutable() {
        let tmp = TempDir::new().unwrap();
        write_system(&tmp);
        let mut store = open(&tmp).await;

        let patch = PromptPatch {
            label: Some("Hacked".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update("42", patch).await,
            Err(ShelfError::ReadOnly(_))
        ));
        assert!(matches!(store.delete("42").await, Err(ShelfError::ReadOnly(_))));
        assert_eq!(store.prompt("42").unwrap().label, "Review");
    }

    #[tokio::test]
    async fn test_update_unknown_is_noop() {
        let tmp = TempDir::new().unwrap();
        let mut store = open(&tmp).await;
        store
            .update("999", PromptPatch::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_reevaluates_on_body_change() {
        let tmp = TempDir::new().unwrap();
        let evaluator = Arc::new(CountingEvaluator {
            calls: AtomicUsize::new(0),
        });
        let mut store =
            PromptStore::open(paths(&tmp), Some(evaluator.clone()), Duration::from_secs(1))
                .await
                .unwrap();

        let id = store.add(new_prompt("A", "first"), None).await.unwrap();
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.prompt(&id).unwrap().evaluation.as_ref().unwrap().overall_score, 77);

        let label_only = PromptPatch {
            label: Some("Renamed".into()),
            ..Default::default()
        };
        store.update(&id, label_only).await.unwrap();
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);

        let body = PromptPatch {
            body: Some("second".into()),
            ..Default::default()
        };
        store.update(&id, body).await.unwrap();
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 2);

        let p = store.prompt(&id).unwrap();
        assert_eq!(p.label, "Renamed");
        assert_eq!(p.body, "second");
        assert!(p.evaluation.is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_only_target() {
        let tmp = TempDir::new().unwrap();
        write_system(&tmp);
        let mut store = open(&tmp).await;
        let a = store.add(new_prompt("A", "a"), None).await.unwrap();
        let b = store.add(new_prompt("B", "b"), None).await.unwrap();

        store.delete(&a).await.unwrap();

        assert!(store.find_by_id(&a).is_none());
        assert!(store.find_by_id(&b).is_some());
        assert!(store.find_by_id("42").is_some());
    }

    #[tokio::test]
    async fn test_changes_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        write_system(&tmp);
        let id = {
            let mut store = open(&tmp).await;
            store.add(new_prompt("Keep", "keep me"), None).await.unwrap()
        };

        let store = open(&tmp).await;
        assert_eq!(store.prompt(&id).unwrap().body, "keep me");
        // System prompts are never written to the user file.
        let user = PromptDocument::read(&tmp.path().join("user_prompts.json")).unwrap();
        assert!(user.categories.iter().all(|c| c.kind == CategoryKind::User));
        assert_eq!(user.prompt_count(), 1);
    }

    #[tokio::test]
    async fn test_groups_and_categories() {
        let tmp = TempDir::new().unwrap();
        let mut store = open(&tmp).await;
        let cat = store.add_category("Writing").await.unwrap();
        let group = store.add_group(&cat, "Emails").await.unwrap();
        let id = store.add(new_prompt("Reply", "Reply politely"), Some(&group)).await.unwrap();
        assert_eq!(store.tree().parent(&id), Some(group.as_str()));

        // Adding next to an existing prompt lands in the same group.
        let sibling = store.add(new_prompt("Decline", "Decline"), Some(&id)).await.unwrap();
        assert_eq!(store.tree().parent(&sibling), Some(group.as_str()));
    }

    #[test]
    fn test_strip_placeholder_phrases() {
        assert_eq!(
            strip_placeholder_phrases("Use a pattern, e.g., builder. Example: foo"),
            "Use a pattern, builder. foo"
        );
        assert_eq!(strip_placeholder_phrases("  plain  "), "plain");
    }
}
