// PromptShelf — Terminal browser state and key handling.

use crate::preferences::Preferences;
use crate::prompt::{CategoryKind, Entry, Prompt, PromptTree};
use crate::search::search;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Which slice of the forest is listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    All,
    Favorites,
    Recent,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::All => "All",
            View::Favorites => "Favorites",
            View::Recent => "Recent",
        }
    }

    fn next(self) -> Self {
        match self {
            View::All => View::Favorites,
            View::Favorites => View::Recent,
            View::Recent => View::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Category,
    Group,
    Prompt,
    /// Shown under an empty user category.
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct Row {
    pub id: String,
    pub depth: usize,
    pub label: String,
    pub kind: RowKind,
    pub favorite: bool,
    pub read_only: bool,
    pub badge: Option<String>,
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    None,
    Quit,
    /// Leave the browser and use this prompt.
    Use(String),
    /// Favorites changed and should be saved.
    SavePreferences,
}

pub struct BrowserApp {
    tree: PromptTree,
    pub prefs: Preferences,
    pub view: View,
    pub mode: Mode,
    pub query: String,
    pub rows: Vec<Row>,
    pub selected: usize,
    pub status: String,
}

impl BrowserApp {
    pub fn new(tree: PromptTree, prefs: Preferences) -> Self {
        let mut app = Self {
            tree,
            prefs,
            view: View::All,
            mode: Mode::Browse,
            query: String::new(),
            rows: Vec::new(),
            selected: 0,
            status: String::new(),
        };
        app.rebuild_rows();
        app
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.get(self.selected)
    }

    pub fn selected_prompt(&self) -> Option<&Prompt> {
        self.selected_row()
            .filter(|r| r.kind == RowKind::Prompt)
            .and_then(|r| self.tree.prompt(&r.id))
    }

    /// Category kind of the selected row, if it has one.
    pub fn selected_kind(&self) -> Option<CategoryKind> {
        self.selected_row().and_then(|r| self.tree.kind_of(&r.id))
    }

    fn prompt_row(&self, prompt: &Prompt, depth: usize) -> Row {
        Row {
            id: prompt.id.clone(),
            depth,
            label: prompt.label.clone(),
            kind: RowKind::Prompt,
            favorite: self.prefs.is_favorite(&prompt.id),
            read_only: self.tree.kind_of(&prompt.id) == Some(CategoryKind::System),
            badge: prompt.evaluation.as_ref().map(|e| e.badge()),
        }
    }

    pub fn rebuild_rows(&mut self) {
        let filtered = search(&self.tree, &self.query);
        let mut rows = Vec::new();

        match self.view {
            View::All => {
                for category in filtered.categories() {
                    rows.push(Row {
                        id: category.id.clone(),
                        depth: 0,
                        label: category.label.clone(),
                        kind: RowKind::Category,
                        favorite: false,
                        read_only: !category.kind.is_mutable(),
                        badge: None,
                    });
                    let groups = filtered.children(&category.id);
                    let empty = filtered.prompts_under(&category.id) == 0;
                    if empty && category.kind == CategoryKind::User && self.query.is_empty() {
                        rows.push(Row {
                            id: category.id.clone(),
                            depth: 1,
                            label: "No prompts yet. Add one with `promptshelf add`.".into(),
                            kind: RowKind::Placeholder,
                            favorite: false,
                            read_only: true,
                            badge: None,
                        });
                    }
                    for group in groups {
                        rows.push(Row {
                            id: group.id().to_string(),
                            depth: 1,
                            label: group.label().to_string(),
                            kind: RowKind::Group,
                            favorite: false,
                            read_only: !category.kind.is_mutable(),
                            badge: None,
                        });
                        for entry in filtered.children(group.id()) {
                            if let Entry::Prompt(p) = entry {
                                rows.push(self.prompt_row(p, 2));
                            }
                        }
                    }
                }
            }
            View::Favorites => {
                for id in &self.prefs.favorites {
                    if let Some(p) = filtered.prompt(id) {
                        rows.push(self.prompt_row(p, 0));
                    }
                }
            }
            View::Recent => {
                for id in &self.prefs.recent {
                    if let Some(p) = filtered.prompt(id) {
                        rows.push(self.prompt_row(p, 0));
                    }
                }
            }
        }

        self.rows = rows;
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    fn move_by(&mut self, delta: isize) {
        if self.rows.is_empty() {
            return;
        }
        let last = self.rows.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }
        match self.mode {
            Mode::Search => self.handle_search_key(key),
            Mode::Browse => self.handle_browse_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => {
                self.query.clear();
                self.mode = Mode::Browse;
                self.rebuild_rows();
            }
            KeyCode::Enter => {
                self.mode = Mode::Browse;
                self.prefs.record_search(&self.query);
                return Action::SavePreferences;
            }
            KeyCode::Backspace => {
                self.query.pop();
                self.rebuild_rows();
            }
            KeyCode::Char(c) => {
                self.query.push(c);
                self.selected = 0;
                self.rebuild_rows();
            }
            _ => {}
        }
        Action::None
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
            KeyCode::Up | KeyCode::Char('k') => self.move_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_by(1),
            KeyCode::PageUp => self.move_by(-10),
            KeyCode::PageDown => self.move_by(10),
            KeyCode::Char('/') => {
                self.mode = Mode::Search;
                self.status.clear();
            }
            KeyCode::Char('c') => {
                self.query.clear();
                self.rebuild_rows();
            }
            KeyCode::Tab => {
                self.view = self.view.next();
                self.selected = 0;
                self.rebuild_rows();
            }
            KeyCode::Char('f') => {
                let Some(id) = self.selected_prompt().map(|p| p.id.clone()) else {
                    self.status = "Select a prompt to favorite".into();
                    return Action::None;
                };
                let starred = self.prefs.toggle_favorite(&id);
                self.status = if starred {
                    format!("Added {} to favorites", id)
                } else {
                    format!("Removed {} from favorites", id)
                };
                self.rebuild_rows();
                return Action::SavePreferences;
            }
            KeyCode::Enter => {
                if let Some(p) = self.selected_prompt() {
                    return Action::Use(p.id.clone());
                }
            }
            _ => {}
        }
        Action::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{CategoryRecord, GroupRecord, PromptDocument};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> BrowserApp {
        let system = PromptDocument::new(vec![CategoryRecord {
            id: "1".into(),
            label: "Code".into(),
            kind: CategoryKind::System,
            groups: vec![GroupRecord {
                id: "2".into(),
                label: "Review".into(),
                prompts: vec![
                    Prompt::new("3", "Review", "Review the code", ["review"]),
                    Prompt::new("4", "Debug", "Debug this", ["debug"]),
                ],
            }],
        }]);
        let tree = PromptTree::from_documents(system, PromptDocument::empty_user());
        BrowserApp::new(tree, Preferences::default())
    }

    #[test]
    fn test_rows_include_empty_user_placeholder() {
        let app = app();
        let kinds: Vec<RowKind> = app.rows.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RowKind::Category,
                RowKind::Group,
                RowKind::Prompt,
                RowKind::Prompt,
                RowKind::Category,
                RowKind::Placeholder,
            ]
        );
        assert!(app.rows[2].read_only);
    }

    #[test]
    fn test_search_mode_filters_live() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('/')));
        for c in "debug".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(app.rows.iter().filter(|r| r.kind == RowKind::Prompt).count(), 1);

        assert_eq!(app.handle_key(key(KeyCode::Enter)), Action::SavePreferences);
        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.prefs.search_history.front().map(String::as_str), Some("debug"));

        app.handle_key(key(KeyCode::Char('c')));
        assert!(app.query.is_empty());
        assert_eq!(app.rows.len(), 6);
    }

    #[test]
    fn test_favorite_and_use() {
        let mut app = app();
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.selected_prompt().map(|p| p.id.as_str()), Some("3"));

        assert_eq!(app.handle_key(key(KeyCode::Char('f'))), Action::SavePreferences);
        assert!(app.prefs.is_favorite("3"));
        assert!(app.rows[2].favorite);

        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.view, View::Favorites);
        assert_eq!(app.rows.len(), 1);
        assert_eq!(app.handle_key(key(KeyCode::Enter)), Action::Use("3".into()));
    }

    #[test]
    fn test_placeholder_when_user_groups_are_empty() {
        let system = PromptDocument::new(Vec::new());
        let user = PromptDocument::new(vec![CategoryRecord {
            id: "user".into(),
            label: "User Prompts".into(),
            kind: CategoryKind::User,
            groups: vec![GroupRecord {
                id: "24".into(),
                label: "General".into(),
                prompts: Vec::new(),
            }],
        }]);
        let app = BrowserApp::new(PromptTree::from_documents(system, user), Preferences::default());
        let kinds: Vec<RowKind> = app.rows.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![RowKind::Category, RowKind::Placeholder, RowKind::Group]
        );
    }

    #[test]
    fn test_enter_on_category_does_nothing() {
        let mut app = app();
        assert_eq!(app.handle_key(key(KeyCode::Enter)), Action::None);
        assert_eq!(app.handle_key(key(KeyCode::Char('q'))), Action::Quit);
    }
}
