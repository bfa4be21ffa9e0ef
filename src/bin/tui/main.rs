mod app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

use app::{
    format_last_ok, format_move, format_price, format_time, truncate, urgency_label, AppState,
    ConnectionStatus,
};
use polymarket_times::config::REVALIDATE_SECS;
use polymarket_times::types::Urgency;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut table_state = TableState::default();
    table_state.select(None);

    let result = run_loop(&mut terminal, &mut app, &client, &mut table_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    table_state: &mut TableState,
) -> io::Result<()> {
    // The server's answer may be cached for this long anyway.
    let refresh_interval = Duration::from_secs(REVALIDATE_SECS);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app, table_state))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO)
            .min(Duration::from_millis(250));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            clamp_selection(app, table_state);
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.alerts.len().saturating_sub(1);
                            let next = table_state.selected().map_or(0, |i| (i + 1).min(max));
                            table_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = table_state.selected().map_or(0, |i| i.saturating_sub(1));
                            table_state.select(Some(prev));
                        }
                        KeyCode::Esc => table_state.select(None),
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            clamp_selection(app, table_state);
            last_tick = std::time::Instant::now();
        }
    }
}

fn clamp_selection(app: &AppState, state: &mut TableState) {
    if app.alerts.is_empty() {
        state.select(None);
    } else if let Some(i) = state.selected() {
        state.select(Some(i.min(app.alerts.len() - 1)));
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // masthead
            Constraint::Min(0),     // alerts
            Constraint::Length(7),  // story
            Constraint::Length(1),  // footer
        ])
        .split(area);

    render_masthead(f, app, chunks[0]);
    render_alerts_table(f, app, table_state, chunks[1]);
    render_story(f, app, table_state.selected(), chunks[2]);
    render_footer(f, chunks[3]);
}

fn render_masthead(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● live".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let backend_text = match app.health.backend_configured {
        Some(true) => "backend ok",
        Some(false) => "no backend",
        None => "backend ?",
    };
    let failures = app.health.query_failures.unwrap_or(0);
    let queries = app.health.queries_total.unwrap_or(0);
    let last_ok = format_last_ok(
        app.health.last_success_at_ms,
        chrono::Utc::now().timestamp_millis(),
    );

    let spans = vec![
        Span::styled(
            " THE POLYMARKET TIMES  ",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} alerts in the last 2h", app.alerts.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("updated {}s ago", app.last_refresh.elapsed().as_secs()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  │  "),
        Span::styled(backend_text, Style::default().fg(Color::DarkGray)),
        Span::raw("  │  "),
        Span::styled(
            format!("{failures}/{queries} queries failed"),
            Style::default().fg(if failures > 0 { Color::Red } else { Color::DarkGray }),
        ),
        Span::raw("  │  "),
        Span::styled(last_ok, Style::default().fg(Color::DarkGray)),
    ];

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(paragraph, area);
}

fn render_alerts_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["Time", "Urgency", "Headline", "Move", "Yes"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .alerts
        .iter()
        .map(|a| {
            let urgency_color = match a.urgency {
                Urgency::High => Color::Red,
                Urgency::Medium => Color::Yellow,
                Urgency::Low => Color::DarkGray,
            };
            let move_color = if a.price_change >= 0.0 {
                Color::Green
            } else {
                Color::Red
            };

            Row::new(vec![
                Cell::from(format_time(&a.created_at)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(urgency_label(a.urgency)).style(Style::default().fg(urgency_color)),
                Cell::from(truncate(&a.headline, 60)),
                Cell::from(format_move(a.price_change)).style(Style::default().fg(move_color)),
                Cell::from(format_price(a.new_price)).style(Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();

    let title = if app.alerts.is_empty() {
        " LATEST ALERTS (quiet market) "
    } else {
        " LATEST ALERTS "
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Min(20),
            Constraint::Length(8),
            Constraint::Length(5),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                title,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(table, area, state);
}

fn render_story(f: &mut Frame, app: &AppState, selected: Option<usize>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " STORY ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let lines = match app.selected_alert(selected) {
        Some(a) => vec![
            Line::from(Span::styled(
                a.market_data.question.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled(a.market_data.slug.clone(), Style::default().fg(Color::DarkGray)),
                Span::raw("  │  "),
                Span::raw(format!(
                    "{} → {} ({})",
                    format_price(a.old_price),
                    format_price(a.new_price),
                    a.alert_type
                )),
            ]),
            Line::from(a.reasoning.clone().unwrap_or_else(|| "No analysis filed.".to_string())),
        ],
        None => vec![Line::from(Span::styled(
            "Select an alert with ↑↓ / j k to read the story.",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("select  "),
        Span::styled("[esc] ", Style::default().fg(Color::Yellow)),
        Span::raw("clear  "),
        Span::styled(
            format!("auto-refresh: {REVALIDATE_SECS}s"),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
