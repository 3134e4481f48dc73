use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

use super::reducer::Dispatcher;
use super::state::*;
use crate::views::widgets::{block, centered, selected_style};

pub fn render(frame: &mut Frame, d: &Dispatcher) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(HEADER_ROWS),
        Constraint::Min(0),
        Constraint::Length(FOOTER_ROWS),
    ])
    .areas(frame.area());

    render_header(frame, header, d);
    d.screen(d.active()).render(frame, body);
    render_footer(frame, footer, d);

    match d.modal() {
        Modal::None => {}
        Modal::AccountPicker { cursor } => render_picker(frame, body, d, *cursor),
        Modal::Confirmation(req) => render_confirm(frame, body, req),
    }
}

fn render_header(frame: &mut Frame, area: Rect, d: &Dispatcher) {
    let titles: Vec<Line> = ViewKind::ALL
        .iter()
        .enumerate()
        .map(|(i, k)| Line::from(format!("{} {}", i + 1, k.title())))
        .collect();
    let highlight = match d.focus() {
        FocusScope::Toolbar => Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        FocusScope::Content => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    };
    let account = d
        .account()
        .map(|a| a.to_string())
        .unwrap_or_else(|| "no account".to_string());
    let title = format!("brokerterm · {account}");
    let tabs = Tabs::new(titles)
        .select(d.active().index())
        .highlight_style(highlight)
        .block(block(&title));
    frame.render_widget(tabs, area);
}

fn render_footer(frame: &mut Frame, area: Rect, d: &Dispatcher) {
    let status = Line::from(Span::styled(
        d.status().unwrap_or_default().to_string(),
        Style::default().fg(Color::Yellow),
    ));
    let hints = match (d.modal(), d.focus()) {
        (Modal::AccountPicker { .. }, _) => "j/k move · enter select · esc close".to_string(),
        (Modal::Confirmation(_), _) => "y confirm · n cancel".to_string(),
        (Modal::None, FocusScope::Toolbar) => {
            "←/→ switch · enter open · 1-6 jump · a account · r refresh · q quit".to_string()
        }
        (Modal::None, FocusScope::Content) => {
            let screen = d.screen(d.active());
            if screen.is_exclusive() {
                screen.hints().to_string()
            } else {
                format!("{} · esc toolbar · a account · q quit", screen.hints())
            }
        }
    };
    let hints = Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray)));
    frame.render_widget(Paragraph::new(vec![status, hints]), area);
}

fn render_picker(frame: &mut Frame, area: Rect, d: &Dispatcher, cursor: usize) {
    let accounts = d.accounts();
    let height = (accounts.len() as u16 + 2).clamp(4, area.height.max(4));
    let popup = centered(area, 60, height);
    let items: Vec<ListItem> = accounts
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let current = d.account() == Some(&a.account_id);
            let label = format!("{} {}", if current { "●" } else { " " }, a.label());
            if i == cursor {
                ListItem::new(label).style(selected_style())
            } else {
                ListItem::new(label)
            }
        })
        .collect();
    frame.render_widget(Clear, popup);
    frame.render_widget(List::new(items).block(block("Select account")), popup);
}

fn render_confirm(frame: &mut Frame, area: Rect, req: &ConfirmRequest) {
    let popup = centered(area, 50, 5);
    let text = vec![
        Line::from(req.prompt.clone()),
        Line::from(Span::styled("y / enter to confirm · n / esc to cancel", Style::default().fg(Color::DarkGray))),
    ];
    let title = match req.kind {
        ConfirmKind::Quit => "Quit",
        ConfirmKind::CancelAll => "Cancel all orders",
    };
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text).block(block(title)).wrap(Wrap { trim: true }),
        popup,
    );
}
