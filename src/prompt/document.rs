// PromptShelf — On-disk prompt document

use super::{CategoryKind, Prompt};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DOCUMENT_VERSION: &str = "1.0";

const BUNDLED_SYSTEM_PROMPTS: &str = include_str!("../../assets/system_prompts.json");

/// A whole prompts file: `{ "version": "1.0", "categories": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub categories: Vec<CategoryRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRecord {
    pub id: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: CategoryKind,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupRecord {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub prompts: Vec<Prompt>,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

impl Default for PromptDocument {
    fn default() -> Self {
        Self {
            version: default_version(),
            categories: Vec::new(),
        }
    }
}

impl PromptDocument {
    pub fn new(categories: Vec<CategoryRecord>) -> Self {
        Self {
            version: default_version(),
            categories,
        }
    }

    /// The document written when no user prompts file exists yet.
    pub fn empty_user() -> Self {
        Self::new(vec![CategoryRecord {
            id: "user".to_string(),
            label: "User Prompts".to_string(),
            kind: CategoryKind::User,
            groups: Vec::new(),
        }])
    }

    /// The system prompts shipped with the binary, installed by `init`.
    pub fn bundled() -> crate::Result<Self> {
        Ok(serde_json::from_str(BUNDLED_SYSTEM_PROMPTS)?)
    }

    pub fn prompt_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| &c.groups)
            .map(|g| g.prompts.len())
            .sum()
    }

    pub fn read(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn read_async(path: &Path) -> crate::Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Atomic write: write to temp file then rename.
    pub async fn write(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&tmp_path, &content).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_document() {
        let json = r#"{
            "version": "1.0",
            "categories": [{
                "id": "c1", "label": "Code", "type": "system",
                "groups": [{"id": "g1", "label": "Review", "prompts": [
                    {"id": "1", "label": "Review", "prompt": "Review {{selection}}", "tags": ["review"]}
                ]}]
            }]
        }"#;
        let doc: PromptDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.categories[0].kind, CategoryKind::System);
        assert_eq!(doc.prompt_count(), 1);
    }

    #[test]
    fn test_missing_fields_default() {
        let doc: PromptDocument = serde_json::from_str(r#"{"categories": []}"#).unwrap();
        assert_eq!(doc.version, DOCUMENT_VERSION);
        assert!(doc.categories.is_empty());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("user_prompts.json");

        let doc = PromptDocument::empty_user();
        doc.write(&path).await.unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        let loaded = PromptDocument::read_async(&path).await.unwrap();
        assert_eq!(loaded, doc);
        assert_eq!(loaded.categories[0].kind, CategoryKind::User);
    }

    #[test]
    fn test_bundled_prompts_parse() {
        let doc = PromptDocument::bundled().unwrap();
        assert!(doc.prompt_count() > 10);
        assert!(doc.categories.iter().all(|c| c.kind == CategoryKind::System));
    }
}
