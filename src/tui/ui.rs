// PromptShelf — Terminal browser rendering (ratatui widgets and layout).

use super::app::{BrowserApp, Mode, RowKind};
use crate::variables::extract_variables;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

const HEADER_ART: &str = " PromptShelf ";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Render the full browser layout.
pub fn render(frame: &mut Frame, app: &BrowserApp) {
    let area = frame.area();

    // header (3) | body | footer (3)
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(area);

    render_header(frame, outer[0], app);
    render_body(frame, outer[1], app);
    render_footer(frame, outer[2], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &BrowserApp) {
    let mut spans = vec![
        Span::styled(
            HEADER_ART,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("v{}  ", VERSION), Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("[{}]", app.view.title()),
            Style::default().fg(Color::Yellow),
        ),
    ];
    if !app.query.is_empty() || app.mode == Mode::Search {
        let cursor = if app.mode == Mode::Search { "▏" } else { "" };
        spans.push(Span::styled(
            format!("  / {}{}", app.query, cursor),
            Style::default().fg(Color::Green),
        ));
    }

    let title = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(title, area);
}

fn render_body(frame: &mut Frame, area: Rect, app: &BrowserApp) {
    // tree (45%) | preview (55%)
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_tree(frame, columns[0], app);
    render_preview(frame, columns[1], app);
}

fn render_tree(frame: &mut Frame, area: Rect, app: &BrowserApp) {
    let block = Block::default()
        .title(" ◉ Prompts ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    if app.rows.is_empty() {
        let empty = Paragraph::new("  Nothing to show")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .rows
        .iter()
        .map(|row| {
            let indent = "  ".repeat(row.depth);
            let (icon, style) = match row.kind {
                RowKind::Category => (
                    "▸ ",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                RowKind::Group => ("▹ ", Style::default().fg(Color::Blue)),
                RowKind::Prompt if row.read_only => ("• ", Style::default().fg(Color::White)),
                RowKind::Prompt => ("✎ ", Style::default().fg(Color::Magenta)),
                RowKind::Placeholder => ("  ", Style::default().fg(Color::DarkGray)),
            };

            let mut spans = vec![
                Span::raw(indent),
                Span::styled(icon, style),
                Span::styled(row.label.clone(), style),
            ];
            if row.favorite {
                spans.push(Span::styled(" ★", Style::default().fg(Color::Yellow)));
            }
            if let Some(badge) = &row.badge {
                spans.push(Span::styled(
                    format!("  {}", badge),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    let mut state = ListState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_preview(frame: &mut Frame, area: Rect, app: &BrowserApp) {
    let block = Block::default()
        .title(" ◉ Preview ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let Some(prompt) = app.selected_prompt() else {
        let hint = match app.selected_row() {
            Some(row) => format!("  {}", row.label),
            None => String::new(),
        };
        frame.render_widget(
            Paragraph::new(hint)
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        );
        return;
    };

    let label_style = Style::default().fg(Color::Gray);
    let kind = app
        .selected_kind()
        .map(|k| k.as_str())
        .unwrap_or("unknown");
    let tags = prompt.tags.iter().cloned().collect::<Vec<_>>().join(", ");
    let variables = extract_variables(&prompt.body).join(", ");

    let mut lines = vec![
        Line::from(Span::styled(
            prompt.label.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  Id        ", label_style),
            Span::raw(format!("{} ({})", prompt.id, kind)),
        ]),
        Line::from(vec![
            Span::styled("  Tags      ", label_style),
            Span::styled(tags, Style::default().fg(Color::Yellow)),
        ]),
    ];
    if !variables.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("  Variables ", label_style),
            Span::styled(variables, Style::default().fg(Color::Green)),
        ]));
    }
    if let Some(score) = &prompt.evaluation {
        lines.push(Line::from(vec![
            Span::styled("  Score     ", label_style),
            Span::raw(score.badge()),
        ]));
        for suggestion in &score.suggestions {
            lines.push(Line::from(Span::styled(
                format!("    - {}", suggestion),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }
    lines.push(Line::raw(""));
    lines.extend(prompt.body.lines().map(|l| Line::raw(l.to_string())));

    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(block);
    frame.render_widget(widget, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &BrowserApp) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Black).bg(Color::Cyan));
    let hint = |h: &'static str| Span::styled(h, Style::default().fg(Color::Gray));

    let mut spans = match app.mode {
        Mode::Search => vec![
            key(" Enter "),
            hint(" Keep filter  "),
            key(" Esc "),
            hint(" Clear  "),
        ],
        Mode::Browse => vec![
            key(" q "),
            hint(" Quit  "),
            key(" / "),
            hint(" Search  "),
            key(" c "),
            hint(" Clear  "),
            key(" f "),
            hint(" Favorite  "),
            key(" Tab "),
            hint(" View  "),
            key(" Enter "),
            hint(" Use  "),
        ],
    };
    if !app.status.is_empty() {
        spans.push(Span::styled(
            format!(" {}", app.status),
            Style::default().fg(Color::Yellow),
        ));
    }

    let footer = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(footer, area);
}
