use crate::app::{AppState, FOOTER_HEIGHT, HEADER_HEIGHT};
use crate::tui::{footer, header, list};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

pub fn render(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(1), // list
            Constraint::Length(FOOTER_HEIGHT),
        ])
        .split(f.area());

    header::render(f, chunks[0], state);
    list::render(f, chunks[1], state);
    footer::render(f, chunks[2], state);

    // Error toast
    if let Some(err) = state.error_message() {
        let area = f.area();
        if area.height > 6 && area.width >= 4 {
            let err_area = Rect {
                x: area.x + 1,
                y: area.y + area.height.saturating_sub(5),
                width: area.width.saturating_sub(2),
                height: 3,
            };
            let err_widget = Paragraph::new(err.to_owned())
                .style(Style::default().fg(Color::Red))
                .block(
                    Block::default()
                        .title(" Error ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Red)),
                )
                .wrap(Wrap { trim: true });
            f.render_widget(err_widget, err_area);
        }
    }
}

/// Height of the list area for a terminal `total_height` rows tall.
pub fn list_height(total_height: u16) -> u16 {
    total_height
        .saturating_sub(HEADER_HEIGHT + FOOTER_HEIGHT)
        .max(1)
}
