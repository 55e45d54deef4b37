// PromptShelf — Prompt forest as an id-keyed arena
//
// Nodes are stored flat and reference their children by id. Parent links live
// in a separate index so the structure stays acyclic and trivially serializable.

use super::document::{CategoryRecord, GroupRecord, PromptDocument};
use super::{normalize_tags, CategoryKind, Prompt};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryInfo {
    pub id: String,
    pub label: String,
    pub kind: CategoryKind,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupInfo {
    pub id: String,
    pub label: String,
    pub prompts: Vec<String>,
}

/// A node of the forest.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Category(CategoryInfo),
    Group(GroupInfo),
    Prompt(Prompt),
}

impl Entry {
    pub fn id(&self) -> &str {
        match self {
            Entry::Category(c) => &c.id,
            Entry::Group(g) => &g.id,
            Entry::Prompt(p) => &p.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Entry::Category(c) => &c.label,
            Entry::Group(g) => &g.label,
            Entry::Prompt(p) => &p.label,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Entry::Category(_) => "category",
            Entry::Group(_) => "group",
            Entry::Prompt(_) => "prompt",
        }
    }

    fn children(&self) -> &[String] {
        match self {
            Entry::Category(c) => &c.groups,
            Entry::Group(g) => &g.prompts,
            Entry::Prompt(_) => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            Entry::Category(c) => Some(&mut c.groups),
            Entry::Group(g) => Some(&mut g.prompts),
            Entry::Prompt(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptTree {
    entries: HashMap<String, Entry>,
    roots: Vec<String>,
    parents: HashMap<String, String>,
}

impl PromptTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the system and user documents into one forest.
    ///
    /// A category's kind is taken from the file it came from. Ids that are
    /// empty or already taken are replaced with fresh numeric ids.
    pub fn from_documents(system: PromptDocument, user: PromptDocument) -> Self {
        let mut next = max_numeric_id_in(&system).max(max_numeric_id_in(&user)) + 1;
        let mut tree = Self::new();

        for (kind, doc) in [(CategoryKind::System, system), (CategoryKind::User, user)] {
            for record in doc.categories {
                if record.kind != kind {
                    tracing::warn!(
                        category = %record.id,
                        declared = record.kind.as_str(),
                        actual = kind.as_str(),
                        "Category type does not match its source file, overriding"
                    );
                }
                tree.push_record(record, kind, &mut next);
            }
        }

        tree
    }

    fn push_record(&mut self, record: CategoryRecord, kind: CategoryKind, next: &mut u64) {
        let cat_id = self.claim_id(record.id, next);
        self.insert_category(CategoryInfo {
            id: cat_id.clone(),
            label: record.label,
            kind,
            groups: Vec::new(),
        });

        for group in record.groups {
            let group_id = self.claim_id(group.id, next);
            // Both ids are fresh, so insertion cannot fail.
            let _ = self.insert_group(&cat_id, &group_id, &group.label);
            for mut prompt in group.prompts {
                prompt.id = self.claim_id(prompt.id, next);
                prompt.tags = normalize_tags(&prompt.tags);
                let _ = self.insert_prompt(&group_id, prompt);
            }
        }
    }

    fn claim_id(&self, id: String, next: &mut u64) -> String {
        if !id.is_empty() && !self.entries.contains_key(&id) {
            return id;
        }
        let fresh = next.to_string();
        *next += 1;
        tracing::warn!(old = %id, new = %fresh, "Duplicate or empty id, reassigned");
        fresh
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn prompt(&self, id: &str) -> Option<&Prompt> {
        match self.entries.get(id) {
            Some(Entry::Prompt(p)) => Some(p),
            _ => None,
        }
    }

    pub fn prompt_mut(&mut self, id: &str) -> Option<&mut Prompt> {
        match self.entries.get_mut(id) {
            Some(Entry::Prompt(p)) => Some(p),
            _ => None,
        }
    }

    pub fn parent(&self, id: &str) -> Option<&str> {
        self.parents.get(id).map(String::as_str)
    }

    /// Ids from the root category down to (excluding) `id`.
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parents.get(current) {
            chain.push(parent.clone());
            current = parent.as_str();
        }
        chain.reverse();
        chain
    }

    /// The category owning `id` (or `id` itself when it is a category).
    pub fn category_of(&self, id: &str) -> Option<&CategoryInfo> {
        let mut current = id;
        loop {
            match self.entries.get(current)? {
                Entry::Category(c) => return Some(c),
                _ => current = self.parents.get(current).map(String::as_str)?,
            }
        }
    }

    pub fn kind_of(&self, id: &str) -> Option<CategoryKind> {
        self.category_of(id).map(|c| c.kind)
    }

    pub fn categories(&self) -> impl Iterator<Item = &CategoryInfo> {
        self.roots.iter().filter_map(|id| match self.entries.get(id) {
            Some(Entry::Category(c)) => Some(c),
            _ => None,
        })
    }

    pub fn children(&self, id: &str) -> Vec<&Entry> {
        self.entries
            .get(id)
            .map(|e| {
                e.children()
                    .iter()
                    .filter_map(|c| self.entries.get(c))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every prompt in forest order (category, then group, then prompt order).
    pub fn prompts(&self) -> Vec<&Prompt> {
        let mut out = Vec::new();
        for cat in self.categories() {
            for group_id in &cat.groups {
                for entry in self.children(group_id) {
                    if let Entry::Prompt(p) = entry {
                        out.push(p);
                    }
                }
            }
        }
        out
    }

    pub fn prompt_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, Entry::Prompt(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of prompts in the subtree rooted at `id`, counting `id` itself.
    pub fn prompts_under(&self, id: &str) -> usize {
        match self.entries.get(id) {
            Some(Entry::Prompt(_)) => 1,
            Some(entry) => entry.children().iter().map(|c| self.prompts_under(c)).sum(),
            None => 0,
        }
    }

    /// Largest id that parses as an integer, 0 when there is none.
    pub fn max_numeric_id(&self) -> u64 {
        self.entries
            .keys()
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    pub fn insert_category(&mut self, category: CategoryInfo) {
        self.roots.push(category.id.clone());
        self.entries
            .insert(category.id.clone(), Entry::Category(category));
    }

    pub fn insert_group(&mut self, category_id: &str, id: &str, label: &str) -> crate::Result<()> {
        self.attach(
            category_id,
            Entry::Group(GroupInfo {
                id: id.to_string(),
                label: label.to_string(),
                prompts: Vec::new(),
            }),
            |e| matches!(e, Entry::Category(_)),
        )
    }

    pub fn insert_prompt(&mut self, group_id: &str, prompt: Prompt) -> crate::Result<()> {
        self.attach(group_id, Entry::Prompt(prompt), |e| {
            matches!(e, Entry::Group(_))
        })
    }

    fn attach(
        &mut self,
        parent_id: &str,
        entry: Entry,
        parent_ok: impl Fn(&Entry) -> bool,
    ) -> crate::Result<()> {
        let id = entry.id().to_string();
        if self.entries.contains_key(&id) {
            return Err(crate::ShelfError::InvalidInput(format!(
                "id '{}' is already in use",
                id
            )));
        }
        let parent = self
            .entries
            .get_mut(parent_id)
            .filter(|p| parent_ok(p))
            .ok_or_else(|| crate::ShelfError::NotFound(parent_id.to_string()))?;
        if let Some(children) = parent.children_mut() {
            children.push(id.clone());
        }
        self.parents.insert(id.clone(), parent_id.to_string());
        self.entries.insert(id, entry);
        Ok(())
    }

    /// Remove `id` and its whole subtree. Returns the removed ids.
    pub fn remove(&mut self, id: &str) -> Vec<String> {
        if !self.entries.contains_key(id) {
            return Vec::new();
        }

        match self.parents.get(id).cloned() {
            Some(parent) => {
                if let Some(children) = self.entries.get_mut(&parent).and_then(|p| p.children_mut()) {
                    children.retain(|c| c != id);
                }
            }
            None => self.roots.retain(|r| r != id),
        }

        let mut removed = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(entry) = self.entries.remove(&current) {
                stack.extend(entry.children().iter().cloned());
            }
            self.parents.remove(&current);
            removed.push(current);
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Derived trees
    // -----------------------------------------------------------------------

    /// Rebuild the document for all categories of `kind`.
    pub fn to_document(&self, kind: CategoryKind) -> PromptDocument {
        let categories = self
            .categories()
            .filter(|c| c.kind == kind)
            .map(|c| CategoryRecord {
                id: c.id.clone(),
                label: c.label.clone(),
                kind: c.kind,
                groups: c
                    .groups
                    .iter()
                    .filter_map(|gid| match self.entries.get(gid) {
                        Some(Entry::Group(g)) => Some(GroupRecord {
                            id: g.id.clone(),
                            label: g.label.clone(),
                            prompts: g
                                .prompts
                                .iter()
                                .filter_map(|pid| self.prompt(pid).cloned())
                                .collect(),
                        }),
                        _ => None,
                    })
                    .collect(),
            })
            .collect();
        PromptDocument::new(categories)
    }

    /// A copy keeping only matching prompts plus their ancestor chains.
    ///
    /// A category or group whose own label matches keeps its whole subtree.
    /// Containers left without any match are dropped.
    pub fn pruned<P, C>(&self, prompt_matches: P, container_matches: C) -> PromptTree
    where
        P: Fn(&Prompt) -> bool,
        C: Fn(&str) -> bool,
    {
        let mut out = PromptTree::new();
        for cat in self.categories() {
            let keep_cat = container_matches(&cat.label);
            let mut kept_groups: Vec<(&GroupInfo, Vec<&Prompt>)> = Vec::new();

            for gid in &cat.groups {
                let Some(Entry::Group(group)) = self.entries.get(gid) else {
                    continue;
                };
                let keep_group = keep_cat || container_matches(&group.label);
                let prompts: Vec<&Prompt> = group
                    .prompts
                    .iter()
                    .filter_map(|pid| self.prompt(pid))
                    .filter(|p| keep_group || prompt_matches(p))
                    .collect();
                if keep_group || !prompts.is_empty() {
                    kept_groups.push((group, prompts));
                }
            }

            if !keep_cat && kept_groups.is_empty() {
                continue;
            }

            out.insert_category(CategoryInfo {
                groups: Vec::new(),
                ..cat.clone()
            });
            for (group, prompts) in kept_groups {
                let _ = out.insert_group(&cat.id, &group.id, &group.label);
                for p in prompts {
                    let _ = out.insert_prompt(&group.id, p.clone());
                }
            }
        }
        out
    }
}

fn max_numeric_id_in(doc: &PromptDocument) -> u64 {
    let mut max = 0;
    for cat in &doc.categories {
        let ids = std::iter::once(&cat.id)
            .chain(cat.groups.iter().map(|g| &g.id))
            .chain(cat.groups.iter().flat_map(|g| g.prompts.iter().map(|p| &p.id)));
        for id in ids {
            if let Ok(n) = id.parse::<u64>() {
                max = max.max(n);
            }
        }
    }
    max
}
