use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::AppState;

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let narrow = area.width < crate::app::NARROW_WIDTH_THRESHOLD;

    let line = if let Some(text) = &state.mask_editor {
        Line::from(vec![
            Span::styled("mask> ", Style::default().fg(Color::Magenta)),
            Span::raw(text.as_str()),
            Span::styled("█", Style::default().fg(Color::DarkGray)),
            Span::styled(
                "  Enter apply  Esc cancel",
                Style::default().fg(Color::DarkGray),
            ),
        ])
    } else if let Some(notif) = state.notifications.last() {
        Line::from(vec![
            Span::styled("★ ", Style::default().fg(Color::Yellow)),
            Span::styled(&notif.message, Style::default().fg(Color::Yellow)),
        ])
    } else {
        let hints: &[(&str, &str)] = if narrow {
            &[
                ("j/k", "nav"),
                ("⏎", "toggle"),
                ("r", "refresh"),
                ("m", "mask"),
                ("q", "quit"),
            ]
        } else {
            &[
                ("↑↓/jk", "navigate"),
                ("Enter/Space/click", "toggle"),
                ("←/h", "collapse"),
                ("r", "refresh"),
                ("R", "reload"),
                ("m", "mask"),
                ("o", "open"),
                ("q", "quit"),
            ]
        };
        let mut spans: Vec<Span> = Vec::new();
        for (i, (key, desc)) in hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
            spans.push(Span::styled(
                format!(" {desc}"),
                Style::default().fg(Color::DarkGray),
            ));
        }
        Line::from(spans)
    };

    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(footer, area);
}
