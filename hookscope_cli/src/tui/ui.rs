//! TUI rendering functions

use super::app::{Focus, LinkStatus, TuiApp, View};
use crate::commands::{format_bytes, truncate};
use crate::live::Reconciler;
use chrono::Local;
use hookscope_common::{CapturedRequest, RequestId};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Scrollbar,
        ScrollbarOrientation, ScrollbarState, Table, TableState, Wrap,
    },
    Frame,
};

/// Draw the TUI
pub fn draw(frame: &mut Frame, app: &TuiApp, requests: &Reconciler) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Min(5),    // Body
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    draw_title_bar(frame, app, chunks[0]);

    match app.view {
        View::Dashboard => draw_dashboard(frame, app, requests, chunks[1]),
        View::Detail(id) => draw_detail(frame, requests.find(id), id, chunks[1]),
    }

    draw_footer(frame, app, chunks[2]);
}

fn draw_title_bar(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let link_color = match app.link {
        LinkStatus::Online => Color::Green,
        LinkStatus::Connecting | LinkStatus::Reconnecting => Color::Yellow,
        LinkStatus::Offline => Color::Red,
    };

    let line = Line::from(vec![
        Span::styled(" HOOKSCOPE ", Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(format!(" v{}  ", app.version), Style::default().fg(Color::DarkGray)),
        Span::styled(app.server_url.as_str(), Style::default().fg(Color::White)),
        Span::styled("  ● ", Style::default().fg(link_color)),
        Span::styled(app.link.as_str(), Style::default().fg(link_color).add_modifier(Modifier::BOLD)),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

fn draw_dashboard(frame: &mut Frame, app: &TuiApp, requests: &Reconciler, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(40)])
        .split(area);

    draw_endpoints(frame, app, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(3)])
        .split(columns[1]);

    draw_endpoint_info(frame, app, requests, right[0]);
    draw_requests(frame, app, requests, right[1]);
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

fn draw_endpoints(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let width = (area.width as usize).saturating_sub(6);

    let items: Vec<ListItem> = app
        .endpoints
        .iter()
        .map(|endpoint| {
            let marker = if Some(endpoint.id) == app.active { "▸ " } else { "  " };
            let name_style = if endpoint.enabled {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Cyan)),
                Span::styled(truncate(&endpoint.name, width), name_style),
            ]))
        })
        .collect();

    let focused = app.view == View::Dashboard && app.focus == Focus::Endpoints;
    let list = List::new(items)
        .block(pane_block(format!(" Endpoints ({}) ", app.endpoints.len()), focused))
        .highlight_style(Style::default().bg(Color::Rgb(40, 40, 60)));

    let mut state = ListState::default();
    if !app.endpoints.is_empty() {
        state.select(Some(app.endpoint_index));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_endpoint_info(frame: &mut Frame, app: &TuiApp, requests: &Reconciler, area: Rect) {
    let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));

    let lines = match app.active_endpoint() {
        Some(endpoint) => {
            let mut state = vec![
                label("Reply  "),
                Span::styled(endpoint.response_status.to_string(), Style::default().fg(Color::White)),
            ];
            if endpoint.delay_ms > 0 {
                state.push(Span::styled(format!(" after {}ms", endpoint.delay_ms), Style::default().fg(Color::White)));
            }
            if endpoint.requires_secret() {
                state.push(Span::styled("  secret required", Style::default().fg(Color::Magenta)));
            }
            if !endpoint.enabled {
                state.push(Span::styled("  capture disabled", Style::default().fg(Color::Yellow)));
            }
            if requests.is_loading() {
                state.push(Span::styled("  loading...", Style::default().fg(Color::DarkGray)));
            }

            vec![
                Line::from(vec![
                    label("URL    "),
                    Span::styled(app.webhook_url(endpoint), Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
                ]),
                Line::from(state),
            ]
        }
        None if app.endpoints.is_empty() => vec![Line::from(Span::styled(
            "No endpoints yet. Create one with `hookscope create <NAME>`.",
            Style::default().fg(Color::DarkGray),
        ))],
        None => vec![Line::from(Span::styled(
            "Select an endpoint with Enter",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let title = app
        .active_endpoint()
        .map(|e| format!(" {} ", e.name))
        .unwrap_or_default();

    frame.render_widget(Paragraph::new(lines).block(pane_block(title, false)), area);
}

fn draw_requests(frame: &mut Frame, app: &TuiApp, requests: &Reconciler, area: Rect) {
    let header = Row::new(vec!["Time", "Method", "Query", "Size", "Source"])
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let query_width = (area.width as usize).saturating_sub(9 + 8 + 9 + 16 + 8).max(10);

    let rows: Vec<Row> = requests
        .requests()
        .iter()
        .map(|req| {
            Row::new(vec![
                Cell::from(req.received_at.with_timezone(&Local).format("%H:%M:%S").to_string()),
                Cell::from(format!("{:>7}", truncate(&req.method, 7))).style(method_style(&req.method)),
                Cell::from(truncate(&req.display_path(), query_width)),
                Cell::from(format_bytes(req.size_bytes())),
                Cell::from(req.source_ip.clone()),
            ])
        })
        .collect();

    let count = match requests.total() {
        Some(total) if total > requests.len() as u64 => format!("{} of {}", requests.len(), total),
        _ => requests.len().to_string(),
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let focused = app.view == View::Dashboard && app.focus == Focus::Requests;
    let table = Table::new(
        rows,
        [
            Constraint::Length(9),
            Constraint::Length(8),
            Constraint::Min(10),
            Constraint::Length(9),
            Constraint::Length(16),
        ],
    )
    .header(header)
    .block(pane_block(format!(" Requests ({}) ", count), focused))
    .row_highlight_style(Style::default().bg(Color::Rgb(40, 40, 60)));

    let mut state = TableState::default();
    if !requests.is_empty() && focused {
        state.select(Some(app.request_index.min(requests.len() - 1)));
    }

    frame.render_stateful_widget(table, chunks[0], &mut state);

    if let Some(error) = requests.last_error() {
        let inner = Rect {
            x: area.x + 2,
            y: area.y + 2,
            width: area.width.saturating_sub(4),
            height: 1,
        };
        let text = Span::styled(format!("Failed to load requests: {}", error), Style::default().fg(Color::Red));
        frame.render_widget(Paragraph::new(text), inner);
    } else if !requests.is_empty() {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");

        let mut scrollbar_state = ScrollbarState::new(requests.len()).position(app.request_index);
        frame.render_stateful_widget(scrollbar, chunks[1], &mut scrollbar_state);
    }
}

fn draw_detail(frame: &mut Frame, request: Option<&CapturedRequest>, id: RequestId, area: Rect) {
    let Some(req) = request else {
        let text = Paragraph::new(format!("Request #{} is no longer in view", id))
            .block(pane_block(" Request ".to_string(), true));
        frame.render_widget(text, area);
        return;
    };

    let label = |s: String| Span::styled(s, Style::default().fg(Color::DarkGray));
    let heading = |s: &'static str| {
        Line::from(Span::styled(s, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)))
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(req.method.clone(), method_style(&req.method).add_modifier(Modifier::BOLD)),
            Span::raw(" "),
            Span::raw(req.display_path()),
        ]),
        Line::from(vec![
            label("Received ".to_string()),
            Span::raw(req.received_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S%.3f").to_string()),
        ]),
        Line::from(vec![label("Source   ".to_string()), Span::raw(req.source_ip.clone())]),
        Line::from(vec![label("Size     ".to_string()), Span::raw(format_bytes(req.size_bytes()))]),
        Line::from(""),
        heading("Headers"),
    ];

    for (name, value) in &req.headers {
        lines.push(Line::from(vec![label(format!("  {}: ", name)), Span::raw(value.clone())]));
    }

    if !req.query_params.is_empty() {
        lines.push(Line::from(""));
        lines.push(heading("Query"));
        for pair in req.query_params.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            lines.push(Line::from(vec![label(format!("  {} = ", key)), Span::raw(value.to_string())]));
        }
    }

    lines.push(Line::from(""));
    lines.push(heading("Body"));
    if req.body.is_empty() {
        lines.push(Line::from(label("  (empty)".to_string())));
    } else {
        lines.extend(req.pretty_body().lines().map(|l| Line::from(l.to_string())));
    }

    let paragraph = Paragraph::new(lines)
        .block(pane_block(format!(" Request #{} ", req.id), true))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn draw_footer(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let key = |s: &'static str| Span::styled(s, Style::default().fg(Color::Cyan));
    let hint = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));

    let line = if app.confirm_clear {
        let name = app.active_endpoint().map(|e| e.name.as_str()).unwrap_or("endpoint");
        Line::from(vec![
            Span::styled(format!("Delete all requests of {}? ", name), Style::default().fg(Color::Yellow)),
            key("y"),
            hint(" Confirm  "),
            key("any key"),
            hint(" Cancel"),
        ])
    } else if let Some(message) = &app.status_message {
        Line::from(Span::styled(message.as_str(), Style::default().fg(Color::Yellow)))
    } else if matches!(app.view, View::Detail(_)) {
        Line::from(vec![key("Esc"), hint(" Back  "), key("q"), hint(" Quit")])
    } else {
        Line::from(vec![
            key("↑/↓"),
            hint(" Navigate  "),
            key("Enter"),
            hint(" Open  "),
            key("Tab"),
            hint(" Switch pane  "),
            key("r"),
            hint(" Refresh  "),
            key("x"),
            hint(" Clear  "),
            key("e"),
            hint(" Enable/disable  "),
            key("q"),
            hint(" Quit"),
        ])
    };

    frame.render_widget(Paragraph::new(line), area);
}

/// Get style for HTTP method
fn method_style(method: &str) -> Style {
    match method {
        "GET" => Style::default().fg(Color::Green),
        "POST" => Style::default().fg(Color::Yellow),
        "PUT" => Style::default().fg(Color::Blue),
        "PATCH" => Style::default().fg(Color::Magenta),
        "DELETE" => Style::default().fg(Color::Red),
        "HEAD" => Style::default().fg(Color::Cyan),
        _ => Style::default().fg(Color::White),
    }
}
