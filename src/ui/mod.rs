// UI module for rendering the single screen.
// Search box, repository view with its issue list, creation form, status bar.

mod modal;

use chrono::{DateTime, Utc};
use ratatui::{prelude::*, widgets::*};

use crate::app::{App, Focus};
use crate::github::Repository;
use crate::state::SessionPhase;

/// Main draw function that renders the entire UI.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Search input
            Constraint::Min(1),    // Repository view
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_title(frame, app, chunks[0]);
    draw_search_box(frame, app, chunks[1]);
    draw_body(frame, app, chunks[2]);
    draw_status_bar(frame, app, chunks[3]);

    // A failed creation blocks the screen until acknowledged.
    if let SessionPhase::MutationFailed(errors) = app.session.phase() {
        modal::draw_mutation_errors(frame, errors);
    }
}

/// Format a timestamp as relative time (e.g., "2h ago").
fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(*dt);

    if duration.num_days() > 0 {
        format!("{}d ago", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{}m ago", duration.num_minutes())
    } else {
        "just now".to_string()
    }
}

/// Render a loading indicator.
fn render_loading(frame: &mut Frame, area: Rect, message: &str) {
    let text = Paragraph::new(format!("⏳ {}...", message))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(text, area);
}

/// Render an error message.
fn render_error(frame: &mut Frame, area: Rect, error: &str) {
    let text = Paragraph::new(format!("❌ {}", error))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true });
    frame.render_widget(text, area);
}

/// Render an empty state message.
fn render_empty(frame: &mut Frame, area: Rect, message: &str) {
    let text = Paragraph::new(message)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(text, area);
}

fn draw_title(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        "IssueTracker",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if app.session.phase().is_busy() {
        spans.push(Span::styled("  ⏳", Style::default().fg(Color::Yellow)));
    }
    let title = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, area);
}

/// The repository path form. Submitting it starts a search.
fn draw_search_box(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Path;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut spans = vec![
        Span::styled(
            "Show open issues for: ",
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(app.session.path().to_string()),
    ];
    if focused {
        spans.push(Span::styled("█", Style::default().fg(Color::Yellow)));
    }

    let input = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(" Repository (owner/name) "),
    );
    frame.render_widget(input, area);
}

/// Draw the main area for the current session phase.
fn draw_body(frame: &mut Frame, app: &mut App, area: Rect) {
    match app.session.phase().clone() {
        SessionPhase::Idle => render_empty(frame, area, "Nothing loaded yet"),
        SessionPhase::Fetching => render_loading(frame, area, "Fetching repository"),
        SessionPhase::FetchFailed(failure) => render_error(frame, area, &failure.describe()),
        SessionPhase::Ready | SessionPhase::Mutating | SessionPhase::MutationFailed(_) => {
            draw_repository(frame, app, area);
        }
    }
}

fn draw_repository(frame: &mut Frame, app: &mut App, area: Rect) {
    let Some(repository) = app.session.repository().cloned() else {
        render_empty(frame, area, "Nothing loaded yet");
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Repository header
            Constraint::Min(1),    // Issue list
            Constraint::Length(3), // New issue input
        ])
        .split(area);

    draw_repo_header(frame, &repository, chunks[0]);
    draw_issue_list(frame, app, &repository, chunks[1]);
    draw_new_issue_box(frame, app, chunks[2]);
}

fn draw_repo_header(frame: &mut Frame, repository: &Repository, area: Rect) {
    let owner = match &repository.owner.name {
        Some(name) => format!("{} ({})", repository.owner.login, name),
        None => repository.owner.login.clone(),
    };

    let lines = vec![
        Line::from(vec![
            Span::styled(
                repository.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" ({})", repository.url),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(Span::styled(owner, Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

/// Issues in server-returned order, first page only.
fn draw_issue_list(frame: &mut Frame, app: &mut App, repository: &Repository, area: Rect) {
    let issues = &repository.issues;
    let title = if issues.page_info.has_next_page {
        format!(" Issues [{}+] (more on GitHub) ", issues.edges.len())
    } else {
        format!(" Issues [{}] ", issues.edges.len())
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    if issues.edges.is_empty() {
        let text = Paragraph::new("<no issues>")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(text, area);
        return;
    }

    let items: Vec<ListItem> = issues
        .edges
        .iter()
        .map(|edge| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("({}) ", edge.node.number),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(edge.node.title.clone()),
            ]))
        })
        .collect();

    let list_widget = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list_widget, area, &mut app.issue_list);
}

fn draw_new_issue_box(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Title;
    let creating = matches!(app.session.phase(), SessionPhase::Mutating);

    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let title = if creating {
        " New Issue ⏳ "
    } else {
        " New Issue "
    };

    let mut spans = vec![
        Span::styled("Title: ", Style::default().fg(Color::DarkGray)),
        Span::raw(app.title_input.clone()),
    ];
    if focused && !creating {
        spans.push(Span::styled("█", Style::default().fg(Color::Yellow)));
    }

    let input = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title),
    );
    frame.render_widget(input, area);
}

/// Draw the status bar with keybinding hints or a local-error notice.
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(notice) = &app.notice {
        let text = Paragraph::new(Line::from(vec![
            Span::styled(" ⚠ ", Style::default().fg(Color::Yellow)),
            Span::styled(notice.clone(), Style::default().fg(Color::Red)),
        ]));
        frame.render_widget(text, area);
        return;
    }

    let submit_hint = match app.focus {
        Focus::Path => "Search",
        Focus::Title => "Create Issue",
    };

    let mut hints = vec![
        Span::raw(" Tab "),
        Span::styled("Switch input", Style::default().fg(Color::DarkGray)),
        Span::raw("  ↵ "),
        Span::styled(submit_hint, Style::default().fg(Color::DarkGray)),
        Span::raw("  ↑↓ "),
        Span::styled("Scroll issues", Style::default().fg(Color::DarkGray)),
        Span::raw("  Esc "),
        Span::styled("Quit", Style::default().fg(Color::DarkGray)),
    ];

    if let Some(at) = app.session.cached_at() {
        hints.push(Span::styled(
            format!("  cached {}", format_relative_time(&at)),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let status = Paragraph::new(Line::from(hints));
    frame.render_widget(status, area);
}
