// Modal UI components.
// Blocking dialog shown when an issue creation is rejected.

use ratatui::{prelude::*, widgets::*};

use crate::github::GraphQLError;

/// Draw the creation-failure dialog on top of the current view.
pub fn draw_mutation_errors(frame: &mut Frame, errors: &[GraphQLError]) {
    let area = frame.area();

    // Create centered modal
    let modal_width = 60;
    let modal_height = (errors.len() as u16).saturating_add(4);
    let modal_x = (area.width.saturating_sub(modal_width)) / 2;
    let modal_y = (area.height.saturating_sub(modal_height)) / 2;

    let modal_area = Rect::new(modal_x, modal_y, modal_width, modal_height);

    // Clear the area behind the modal
    frame.render_widget(Clear, modal_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Error messages
            Constraint::Length(1), // Instructions
        ])
        .split(modal_area);

    let lines: Vec<Line> = errors
        .iter()
        .map(|error| {
            Line::from(vec![
                Span::styled("❌ ", Style::default().fg(Color::Red)),
                Span::raw(error.message.clone()),
            ])
        })
        .collect();

    let body = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Issue Creation Failed "),
    );
    frame.render_widget(body, chunks[0]);

    let instructions = Line::from(vec![
        Span::styled(" Enter", Style::default().fg(Color::Yellow)),
        Span::styled(" or ", Style::default().fg(Color::DarkGray)),
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::styled(" = Dismiss ", Style::default().fg(Color::DarkGray)),
    ]);

    let instructions_widget = Paragraph::new(instructions).alignment(Alignment::Center);
    frame.render_widget(instructions_widget, chunks[1]);
}
