use crate::app::AppState;
use crate::tui::spinner;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let narrow = area.width < crate::app::NARROW_WIDTH_THRESHOLD;

    let mut spans = vec![
        Span::styled(
            format!(
                " expdash v{}+{} ",
                env!("CARGO_PKG_VERSION"),
                env!("BUILD_NUMBER")
            ),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ "),
        Span::styled(
            &state.config.project,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ];

    if !narrow {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            state.config.server.as_str(),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if !state.mask.is_empty() {
        spans.push(Span::styled(
            format!(" [mask {}]", state.mask.len()),
            Style::default().fg(Color::Magenta),
        ));
    }

    if let Some(glyph) = spinner::activity(state) {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            glyph.to_string(),
            Style::default().fg(Color::Yellow),
        ));
    } else if let Some(at) = state.refreshed_at {
        spans.push(Span::styled(
            format!(" {}", at.format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if state.error_message().is_some() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            "!",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(header, area);
}
