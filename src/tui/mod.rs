// PromptShelf — Interactive terminal browser over the prompt forest.

pub mod app;
pub mod ui;

use crate::preferences::PreferencesStore;
use crate::prompt::PromptTree;
use crate::tui::app::{Action, BrowserApp};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::CrosstermBackend;
use ratatui::Terminal;
use std::io;

/// Run the browser until the user quits or picks a prompt.
/// Returns the id of the picked prompt, if any.
pub fn run(tree: PromptTree, prefs_store: &dyn PreferencesStore) -> anyhow::Result<Option<String>> {
    let prefs = prefs_store.load()?;
    let mut app = BrowserApp::new(tree, prefs);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, prefs_store);

    // Restore the terminal even when the loop failed.
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut BrowserApp,
    prefs_store: &dyn PreferencesStore,
) -> anyhow::Result<Option<String>> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        if !event::poll(std::time::Duration::from_millis(200))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.handle_key(key) {
            Action::None => {}
            Action::Quit => return Ok(None),
            Action::Use(id) => return Ok(Some(id)),
            Action::SavePreferences => {
                if let Err(e) = prefs_store.save(&app.prefs) {
                    tracing::warn!(error = %e, "Failed to save preferences");
                    app.status = format!("Could not save preferences: {}", e);
                }
            }
        }
    }
}
