use crate::app::{AppState, Row, RowKind, QUICK_SELECT_MAX};
use crate::experiment::{DetailRegion, Experiment};
use crate::tui::spinner;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let narrow = area.width < crate::app::NARROW_WIDTH_THRESHOLD;
    let inner_width = area.width.saturating_sub(1) as usize;
    let height = area.height as usize;

    let mut lines: Vec<Line> = Vec::new();
    if state.list_loading {
        lines.push(render_list_loading_line(state.spinner_frame));
    }

    if state.rows.is_empty() {
        if !state.list_loading {
            let (msg, color) = match &state.list_notice {
                Some(notice) => (notice.message(), Color::Red),
                None if state.refreshed_at.is_none() => {
                    ("Press r to load experiments".to_string(), Color::DarkGray)
                }
                None => ("No experiments".to_string(), Color::DarkGray),
            };
            lines.push(Line::styled(msg, Style::default().fg(color)));
        }
        f.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::NONE)),
            area,
        );
        return;
    }

    let offset = state.scroll_offset(height);
    for (i, row) in state
        .rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(state.rows_height(height))
    {
        let Some(exp) = state.experiments.get(row.slot) else {
            lines.push(Line::raw(""));
            continue;
        };
        let is_selected = i == state.cursor;
        lines.push(render_row(
            *row,
            exp,
            is_selected,
            state.spinner_frame,
            narrow,
            inner_width,
        ));
    }

    let list = Paragraph::new(lines).block(Block::default().borders(Borders::NONE));
    f.render_widget(list, area);
}

fn render_row(
    row: Row,
    exp: &Experiment,
    is_selected: bool,
    spinner_frame: usize,
    narrow: bool,
    max_width: usize,
) -> Line<'static> {
    let select_style = if is_selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    match row.kind {
        RowKind::Summary => render_summary_line(exp, row.slot, select_style, narrow, max_width),
        RowKind::Loading => render_loading_line(spinner_frame, select_style),
        RowKind::Detail(i) => {
            let text = match exp.detail() {
                DetailRegion::Content { lines, .. } => lines.get(i).cloned().unwrap_or_default(),
                _ => String::new(),
            };
            Line::from(vec![
                Span::raw("    "),
                Span::styled(truncate(&text, max_width.saturating_sub(4)), select_style),
            ])
        }
        RowKind::Notice => {
            let text = match exp.detail() {
                DetailRegion::Notice(notice) => notice.message(),
                _ => String::new(),
            };
            Line::from(vec![
                Span::styled("    ✗ ", Style::default().fg(Color::Red)),
                Span::styled(
                    truncate(&text, max_width.saturating_sub(6)),
                    select_style.fg(Color::Red),
                ),
            ])
        }
    }
}

fn render_summary_line(
    exp: &Experiment,
    slot: usize,
    select_style: Style,
    narrow: bool,
    max_width: usize,
) -> Line<'static> {
    let arrow = if exp.is_active() { "▼" } else { "▶" };
    let index = if !narrow && slot < QUICK_SELECT_MAX {
        format!("{} ", slot + 1)
    } else {
        String::new()
    };
    let prefix = format!("{arrow} {index}");
    let id = format!("{} ", exp.id());

    let used = UnicodeWidthStr::width(prefix.as_str()) + UnicodeWidthStr::width(id.as_str());
    let summary = truncate(&exp.summary, max_width.saturating_sub(used));

    Line::from(vec![
        Span::styled(prefix, Style::default().fg(Color::DarkGray)),
        Span::styled(
            id,
            select_style.fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(summary, select_style),
    ])
}

fn render_loading_line(spinner_frame: usize, select_style: Style) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("    {} ", spinner::frame(spinner_frame)),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled("Loading…", select_style.fg(Color::DarkGray)),
    ])
}

fn render_list_loading_line(spinner_frame: usize) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{} ", spinner::frame(spinner_frame)),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled("Loading experiments…", Style::default().fg(Color::DarkGray)),
    ])
}

fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        s.to_string()
    } else {
        let mut result = String::new();
        let mut width = 0;
        for c in s.chars() {
            let cw = UnicodeWidthChar::width(c).unwrap_or(0);
            if width + cw + 1 > max_width {
                result.push('…');
                break;
            }
            result.push(c);
            width += cw;
        }
        result
    }
}
