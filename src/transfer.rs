// PromptShelf — Export and import of system prompts
//
// Only system categories travel. User prompts are never exported, and an
// import never touches the user file.

use crate::error::{Result, ShelfError};
use crate::prompt::{CategoryKind, PromptDocument};
use crate::store::PromptStore;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub categories: usize,
    pub prompts: usize,
    /// Ids that collided with existing user ids (or repeated) and were renumbered.
    pub reassigned: usize,
}

/// Write every system category to `path`. Returns the number of prompts written.
pub async fn export_system(store: &PromptStore, path: &Path) -> Result<usize> {
    let doc = store.tree().to_document(CategoryKind::System);
    doc.write(path).await?;
    tracing::info!(path = %path.display(), prompts = doc.prompt_count(), "Exported system prompts");
    Ok(doc.prompt_count())
}

/// Replace the system prompts with the document at `path` and reload.
pub async fn import_system(store: &mut PromptStore, path: &Path) -> Result<ImportSummary> {
    let mut doc = PromptDocument::read_async(path).await?;
    if doc.categories.is_empty() {
        return Err(ShelfError::InvalidInput(format!(
            "{} contains no categories",
            path.display()
        )));
    }

    let user_doc = store.tree().to_document(CategoryKind::User);
    let mut taken: HashSet<String> = document_ids(&user_doc).into_iter().collect();
    let mut next = numeric_max(taken.iter()).max(numeric_max(document_ids(&doc).iter())) + 1;

    let mut reassigned = 0;
    let mut claim = |id: &mut String| {
        if id.is_empty() || taken.contains(id.as_str()) {
            *id = next.to_string();
            next += 1;
            reassigned += 1;
        }
        taken.insert(id.clone());
    };

    for category in &mut doc.categories {
        category.kind = CategoryKind::System;
        claim(&mut category.id);
        for group in &mut category.groups {
            claim(&mut group.id);
            for prompt in &mut group.prompts {
                claim(&mut prompt.id);
            }
        }
    }

    let summary = ImportSummary {
        categories: doc.categories.len(),
        prompts: doc.prompt_count(),
        reassigned,
    };

    doc.write(&store.paths().system).await?;
    store.load().await?;

    tracing::info!(
        path = %path.display(),
        prompts = summary.prompts,
        reassigned = summary.reassigned,
        "Imported system prompts"
    );
    Ok(summary)
}

fn document_ids(doc: &PromptDocument) -> Vec<String> {
    let mut ids = Vec::new();
    for category in &doc.categories {
        ids.push(category.id.clone());
        for group in &category.groups {
            ids.push(group.id.clone());
            ids.extend(group.prompts.iter().map(|p| p.id.clone()));
        }
    }
    ids
}

fn numeric_max<'a>(ids: impl Iterator<Item = &'a String>) -> u64 {
    ids.filter_map(|id| id.parse::<u64>().ok()).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{CategoryRecord, GroupRecord, Prompt};
    use crate::store::{NewPrompt, StorePaths};
    use std::time::Duration;
    use tempfile::TempDir;

    async fn open(tmp: &TempDir) -> PromptStore {
        let system = tmp.path().join("system.json");
        PromptDocument::new(vec![CategoryRecord {
            id: "1".into(),
            label: "Code".into(),
            kind: CategoryKind::System,
            groups: vec![GroupRecord {
                id: "2".into(),
                label: "Review".into(),
                prompts: vec![Prompt::new("3", "Review", "Review it", ["review"])],
            }],
        }])
        .write(&system)
        .await
        .unwrap();
        PromptStore::open(
            StorePaths {
                system,
                user: tmp.path().join("user.json"),
            },
            None,
            Duration::from_secs(1),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_export_only_system() {
        let tmp = TempDir::new().unwrap();
        let mut store = open(&tmp).await;
        store
            .add(
                NewPrompt {
                    label: "Mine".into(),
                    body: "Private".into(),
                    tags: Default::default(),
                },
                None,
            )
            .await
            .unwrap();

        let out = tmp.path().join("export.json");
        assert_eq!(export_system(&store, &out).await.unwrap(), 1);
        let doc = PromptDocument::read(&out).unwrap();
        assert_eq!(doc.categories.len(), 1);
        assert!(doc.categories.iter().all(|c| c.kind == CategoryKind::System));
    }

    #[tokio::test]
    async fn test_import_replaces_system_and_protects_user() {
        let tmp = TempDir::new().unwrap();
        let mut store = open(&tmp).await;
        let user_id = store
            .add(
                NewPrompt {
                    label: "Mine".into(),
                    body: "Keep me".into(),
                    tags: Default::default(),
                },
                None,
            )
            .await
            .unwrap();
        let user_before = store.tree().to_document(CategoryKind::User);

        // Declared as user and reusing the user prompt's id.
        let incoming = tmp.path().join("incoming.json");
        PromptDocument::new(vec![CategoryRecord {
            id: "50".into(),
            label: "Imported".into(),
            kind: CategoryKind::User,
            groups: vec![GroupRecord {
                id: "51".into(),
                label: "Stuff".into(),
                prompts: vec![Prompt::new(user_id.clone(), "Clash", "Clashing id", ["x"])],
            }],
        }])
        .write(&incoming)
        .await
        .unwrap();

        let summary = import_system(&mut store, &incoming).await.unwrap();
        assert_eq!(summary.categories, 1);
        assert_eq!(summary.prompts, 1);
        assert_eq!(summary.reassigned, 1);

        assert!(store.find_by_id("3").is_none());
        assert_eq!(store.kind_of("50"), Some(CategoryKind::System));
        assert_eq!(store.prompt(&user_id).unwrap().label, "Mine");
        assert_eq!(store.tree().to_document(CategoryKind::User), user_before);
        let imported = store
            .tree()
            .prompts()
            .into_iter()
            .find(|p| p.label == "Clash")
            .unwrap();
        assert_ne!(imported.id, user_id);
    }

    #[tokio::test]
    async fn test_import_rejects_empty_document() {
        let tmp = TempDir::new().unwrap();
        let mut store = open(&tmp).await;
        let incoming = tmp.path().join("empty.json");
        std::fs::write(&incoming, r#"{"version": "1.0", "categories": []}"#).unwrap();
        assert!(matches!(
            import_system(&mut store, &incoming).await,
            Err(ShelfError::InvalidInput(_))
        ));
        assert!(store.find_by_id("3").is_some());
    }
}
