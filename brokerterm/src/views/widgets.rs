use bigdecimal::{BigDecimal, Zero};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::state::{ListCursor, LoadState};

pub fn fixed(v: &BigDecimal, dp: i64) -> String {
    v.round(dp).with_scale(dp).to_string()
}

pub fn money(v: Option<&BigDecimal>) -> String {
    v.map(|v| fixed(v, 2)).unwrap_or_else(|| "-".to_string())
}

pub fn signed_money(v: Option<&BigDecimal>) -> String {
    match v {
        Some(v) if v > &BigDecimal::zero() => format!("+{}", fixed(v, 2)),
        Some(v) => fixed(v, 2),
        None => "-".to_string(),
    }
}

pub fn percent(v: Option<&BigDecimal>) -> String {
    v.map(|v| format!("{}%", fixed(v, 2)))
        .unwrap_or_else(|| "-".to_string())
}

/// Quantities print without trailing zeros.
pub fn qty(v: Option<&BigDecimal>) -> String {
    match v {
        Some(v) => {
            let s = v.to_string();
            if s.contains('.') {
                s.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                s
            }
        }
        None => "-".to_string(),
    }
}

pub fn count(v: Option<u64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn gain_style(v: Option<&BigDecimal>) -> Style {
    match v {
        Some(v) if v > &BigDecimal::zero() => Style::default().fg(Color::Green),
        Some(v) if v < &BigDecimal::zero() => Style::default().fg(Color::Red),
        _ => Style::default(),
    }
}

pub fn header_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
}

pub fn block(title: &str) -> Block<'_> {
    Block::default().borders(Borders::ALL).title(format!(" {title} "))
}

/// A bordered table showing only the cursor's visible window.
pub fn windowed_table<'a>(
    title: &'a str,
    header: Vec<&'a str>,
    widths: Vec<Constraint>,
    rows: Vec<Row<'a>>,
    cursor: &ListCursor,
    highlight: bool,
) -> Table<'a> {
    let len = rows.len();
    let range = cursor.visible(len);
    let visible: Vec<Row<'a>> = rows
        .into_iter()
        .enumerate()
        .skip(range.start)
        .take(range.len())
        .map(|(i, row)| {
            if highlight && i == cursor.index {
                row.style(selected_style())
            } else {
                row
            }
        })
        .collect();
    let header = Row::new(header.into_iter().map(Cell::from)).style(header_style());
    Table::new(visible, widths).header(header).block(block(title))
}

/// Placeholder for views with nothing loaded yet.
pub fn render_status<T>(frame: &mut Frame, area: Rect, title: &str, state: &LoadState<T>, idle: &str) {
    let text = match state {
        LoadState::Idle => idle.to_string(),
        LoadState::Loading(_) => "Loading…".to_string(),
        LoadState::Error(e) => format!("Error: {e}\n\nPress r to retry."),
        LoadState::Loaded(_) => String::new(),
    };
    render_text(frame, area, title, &text);
}

pub fn render_text(frame: &mut Frame, area: Rect, title: &str, text: &str) {
    let lines: Vec<Line> = text.lines().map(|l| Line::from(l.to_string())).collect();
    frame.render_widget(
        Paragraph::new(lines).block(block(title)).wrap(Wrap { trim: false }),
        area,
    );
}

/// A `width`x`height` rectangle centred in `area`, shrunk to fit.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn formats_decimals() {
        assert_eq!(money(Some(&d("1754.2"))), "1754.20");
        assert_eq!(signed_money(Some(&d("3.1"))), "+3.10");
        assert_eq!(signed_money(Some(&d("-3.1"))), "-3.10");
        assert_eq!(percent(Some(&d("14.616"))), "14.62%");
        assert_eq!(qty(Some(&d("10.000"))), "10");
        assert_eq!(qty(Some(&d("0.50"))), "0.5");
        assert_eq!(money(None), "-");
    }
}
