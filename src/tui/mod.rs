mod graph_view;
mod help;
mod state;

use crate::engine::PathfinderApi;
use crate::layout::{self, PointerKind};
use crate::model::{ClientConfig, ControllerPhase, SessionEvent};
use crate::orchestrator::{self, SessionController, UiCommand};
use crate::progress::{self, DepthCell};
use crate::storage::FileSessionStore;
use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs},
    Terminal,
};
use state::{Focus, UiState, HELP_TAB, SEARCH_TAB};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

const DOUBLE_CLICK: Duration = Duration::from_millis(400);

/// Screen regions of the search tab.
struct SearchAreas {
    start: Rect,
    end: Rect,
    status: Rect,
    progress: Rect,
    steps: Rect,
    graph: Rect,
}

fn search_areas(screen: Rect) -> SearchAreas {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(screen);
    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(6),
                Constraint::Min(6),
            ]
            .as_ref(),
        )
        .split(outer[1]);
    let fields = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(body[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(20)].as_ref())
        .split(body[3]);
    SearchAreas {
        start: fields[0],
        end: fields[1],
        status: body[1],
        progress: body[2],
        steps: bottom[0],
        graph: bottom[1],
    }
}

pub async fn run(
    cfg: ClientConfig,
    api: Arc<dyn PathfinderApi>,
    store: FileSessionStore,
    initial: Option<(String, String)>,
) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let session_path = store.path().display().to_string();
    let (controller, inbox) = SessionController::new(api, store, cfg.clone(), event_tx);

    // Explicit fields replace whatever the last run left behind.
    let restore = initial.is_none();
    if let Some((start, end)) = initial {
        let _ = cmd_tx.send(UiCommand::Submit { start, end });
    }

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    // It owns the only remaining command sender, so the controller stops when it exits.
    let ui_handle = std::thread::spawn(move || run_threaded(cfg, session_path, event_rx, cmd_tx));

    let res = orchestrator::run_controller(controller, inbox, cmd_rx, restore).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res.map(|_| ())
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    cfg: ClientConfig,
    session_path: String,
    mut event_rx: UnboundedReceiver<SessionEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut screen = terminal
        .size()
        .map(|s| Rect::new(0, 0, s.width, s.height))
        .unwrap_or_else(|_| Rect::new(0, 0, 80, 24));

    let mut state = UiState::new(cfg.max_depth, cfg.wiki_base_url.clone());
    state.set_graph_width(graph_view::container_width_px(search_areas(screen).graph));

    let frame_rate = Duration::from_millis(50);
    // ~60 Hz keeps drags smooth and settles a fresh layout in about two seconds.
    let sim_rate = Duration::from_millis(16);
    let mut last_frame = Instant::now() - frame_rate;
    let mut last_sim = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_sim.elapsed() >= sim_rate {
            if let Some(sim) = state.simulation.as_mut() {
                sim.tick();
            }
            last_sim = Instant::now();
        }

        if last_frame.elapsed() >= frame_rate {
            terminal
                .draw(|f| draw(f.area(), f, &state, &session_path))
                .ok();
            last_frame = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(5)).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => {
                    if handle_key(&mut state, k, &cmd_tx) == KeyOutcome::Quit {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
                Ok(Event::Mouse(m)) => handle_mouse(&mut state, m, screen),
                Ok(Event::Resize(w, h)) => {
                    screen = Rect::new(0, 0, w, h);
                    state.set_graph_width(graph_view::container_width_px(
                        search_areas(screen).graph,
                    ));
                }
                _ => {}
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, DisableMouseCapture, LeaveAlternateScreen).ok();
    res
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

fn handle_key(state: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) -> KeyOutcome {
    match (k.modifiers, k.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => return KeyOutcome::Quit,
        (KeyModifiers::CONTROL, KeyCode::Char('x')) => {
            let _ = cmd_tx.send(UiCommand::Clear);
            return KeyOutcome::Continue;
        }
        (_, KeyCode::F(1)) => {
            state.tab = if state.tab == HELP_TAB { SEARCH_TAB } else { HELP_TAB };
            return KeyOutcome::Continue;
        }
        _ => {}
    }

    if state.tab == HELP_TAB {
        if matches!(
            k.code,
            KeyCode::Esc | KeyCode::Tab | KeyCode::Char('?') | KeyCode::Char('q')
        ) {
            state.tab = SEARCH_TAB;
        }
        return KeyOutcome::Continue;
    }

    match k.code {
        KeyCode::Tab => state.focus = state.focus.next(),
        KeyCode::BackTab => state.focus = state.focus.prev(),
        _ if state.focus != Focus::Graph => handle_field_key(state, k, cmd_tx),
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Char('?') => state.tab = HELP_TAB,
        KeyCode::Left | KeyCode::Char('h') => state.select_prev_node(),
        KeyCode::Right | KeyCode::Char('l') => state.select_next_node(),
        KeyCode::Enter | KeyCode::Char('o') => open_selected_page(state),
        KeyCode::Char('r') => {
            if let Some(sim) = state.simulation.as_mut() {
                sim.nudge();
            }
        }
        KeyCode::Esc => state.focus = Focus::Start,
        _ => {}
    }
    KeyOutcome::Continue
}

fn handle_field_key(state: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) {
    match k.code {
        KeyCode::Enter => {
            if state.submit_enabled() {
                let _ = cmd_tx.send(UiCommand::Submit {
                    start: state.start_input.clone(),
                    end: state.end_input.clone(),
                });
            } else {
                state.info = state.submit_blocked_reason().into();
            }
        }
        KeyCode::Backspace => {
            if let Some(input) = state.focused_input_mut() {
                input.pop();
            }
        }
        KeyCode::Down => state.focus = state.focus.next(),
        KeyCode::Up => state.focus = state.focus.prev(),
        KeyCode::Esc => state.focus = Focus::Graph,
        KeyCode::Char(c)
            if !k
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            if let Some(input) = state.focused_input_mut() {
                if input.chars().count() < crate::model::MAX_TITLE_CHARS {
                    input.push(c);
                }
            }
        }
        _ => {}
    }
}

fn handle_mouse(state: &mut UiState, m: MouseEvent, screen: Rect) {
    if state.tab != SEARCH_TAB {
        return;
    }
    let area = search_areas(screen).graph;
    let Some(sim) = state.simulation.as_mut() else {
        return;
    };
    let Some(point) = graph_view::cell_to_point(area, sim.size(), m.column, m.row) else {
        return;
    };

    match m.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if !graph_view::contains(area, m.column, m.row) {
                return;
            }
            let Some(i) = sim.node_at(point) else {
                return;
            };
            let now = Instant::now();
            let is_double = state
                .last_click
                .is_some_and(|(j, at)| j == i && now.duration_since(at) <= DOUBLE_CLICK);
            state.focus = Focus::Graph;
            state.selected_node = Some(i);
            if is_double {
                sim.double_activate(i);
                state.last_click = None;
                open_selected_page(state);
            } else {
                sim.pointer_down(i, PointerKind::Mouse);
                state.last_click = Some((i, now));
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            sim.pointer_move(point, PointerKind::Mouse);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            sim.pointer_up(PointerKind::Mouse);
        }
        MouseEventKind::Moved => {
            let over = graph_view::contains(area, m.column, m.row)
                .then(|| sim.node_at(point))
                .flatten();
            sim.hover(over, PointerKind::Mouse);
        }
        _ => {}
    }
}

fn open_selected_page(state: &mut UiState) {
    let Some(title) = state.selected_title().map(str::to_string) else {
        return;
    };
    state.info = match layout::page_url(&state.wiki_base_url, &title) {
        Ok(url) => match webbrowser::open(url.as_str()) {
            Ok(()) => {
                info!(%url, "opened page");
                format!("Opened {url}")
            }
            Err(e) => {
                warn!("failed to open browser: {e}");
                format!("Could not open browser: {e}")
            }
        },
        Err(e) => format!("{e:#}"),
    };
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, session_path: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Search"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("wikipath"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        SEARCH_TAB => draw_search(area, f, state),
        _ => help::draw_help(chunks[1], f, session_path),
    }
}

fn field_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn draw_search(screen: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let areas = search_areas(screen);

    let hint = if state.submit_enabled() {
        " · Enter to search"
    } else {
        ""
    };
    f.render_widget(
        Paragraph::new(state.start_input.as_str())
            .block(field_block("Start page".into(), state.focus == Focus::Start)),
        areas.start,
    );
    f.render_widget(
        Paragraph::new(state.end_input.as_str()).block(field_block(
            format!("End page{hint}"),
            state.focus == Focus::End,
        )),
        areas.end,
    );
    let cursor_field = match state.focus {
        Focus::Start => Some((areas.start, &state.start_input)),
        Focus::End => Some((areas.end, &state.end_input)),
        Focus::Graph => None,
    };
    if let Some((r, text)) = cursor_field {
        let x = (r.x + 1 + text.chars().count() as u16).min(r.x + r.width.saturating_sub(2));
        f.set_cursor_position(Position::new(x, r.y + 1));
    }

    draw_status(areas.status, f, state);
    draw_progress(areas.progress, f, state);
    draw_steps(areas.steps, f, state);
    graph_view::draw_graph(areas.graph, f, state);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let phase_color = match state.phase {
        ControllerPhase::Completed => Color::Green,
        ControllerPhase::Failed => Color::Red,
        ControllerPhase::Idle => Color::Gray,
        _ => Color::Yellow,
    };
    let mut spans = vec![Span::styled(
        state.phase.label(),
        Style::default().fg(phase_color).add_modifier(Modifier::BOLD),
    )];
    if let Some(id) = &state.task_id {
        spans.push(Span::styled(
            format!("  task {id}"),
            Style::default().fg(Color::Gray),
        ));
    }
    if let Some(err) = &state.error {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(err.clone(), Style::default().fg(Color::Red)));
    } else if !state.info.is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::raw(state.info.clone()));
    }
    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

fn draw_progress(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let s = &state.progress;
    let mut depth = vec![Span::styled("Depth    ", Style::default().fg(Color::Gray))];
    for cell in progress::depth_indicator(s.current_depth, s.max_depth) {
        depth.push(match cell {
            DepthCell::Completed => Span::styled("■ ", Style::default().fg(Color::Green)),
            DepthCell::Active => Span::styled("▶ ", Style::default().fg(Color::Yellow)),
            DepthCell::Pending => Span::styled("· ", Style::default().fg(Color::DarkGray)),
        });
    }
    depth.push(Span::raw(format!(
        " {}/{}",
        s.current_depth.min(s.max_depth),
        s.max_depth
    )));

    let label = |t: &'static str| Span::styled(t, Style::default().fg(Color::Gray));
    let mut elapsed = vec![
        label("Elapsed  "),
        Span::raw(progress::format_elapsed(s.elapsed_seconds)),
    ];
    if let Some(msg) = &s.status_message {
        elapsed.push(Span::styled(
            format!("  {msg}"),
            Style::default().fg(Color::Gray),
        ));
    }

    let lines = vec![
        Line::from(depth),
        Line::from(vec![
            label("Explored "),
            Span::raw(s.nodes_explored.to_string()),
            label("   Queue "),
            Span::raw(s.queue_size.to_string()),
        ]),
        Line::from(vec![label("Last     "), Span::raw(s.last_node.clone())]),
        Line::from(elapsed),
    ];
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Progress"));
    f.render_widget(p, area);
}

fn draw_steps(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let title = if state.result_restored {
        "Steps (restored)"
    } else {
        "Steps"
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let Some(result) = &state.result else {
        let msg = match &state.error {
            Some(_) => "No result.",
            None => "No path yet.",
        };
        f.render_widget(
            Paragraph::new(Span::styled(msg, Style::default().fg(Color::Gray))).block(block),
            area,
        );
        return;
    };

    let mut items: Vec<ListItem> = result
        .path
        .iter()
        .enumerate()
        .map(|(i, title)| {
            let style = if state.selected_node == Some(i) {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>2}. ", i + 1), Style::default().fg(Color::Gray)),
                Span::styled(title.clone(), style),
            ]))
        })
        .collect();
    items.push(ListItem::new(""));
    items.push(ListItem::new(Span::styled(
        format!(
            "{} clicks · {} · {} explored",
            result.hops(),
            progress::format_elapsed(result.search_time_seconds),
            result.nodes_explored
        ),
        Style::default().fg(Color::Gray),
    )));
    f.render_widget(List::new(items).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PathResult, SearchQuery};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn typed(state: &mut UiState, text: &str, tx: &UnboundedSender<UiCommand>) {
        for c in text.chars() {
            handle_key(state, key(KeyCode::Char(c)), tx);
        }
    }

    #[test]
    fn typing_and_enter_submits_both_fields() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = UiState::new(6, "https://en.wikipedia.org/wiki/");
        typed(&mut state, "Albert Einstein", &tx);
        handle_key(&mut state, key(KeyCode::Tab), &tx);
        typed(&mut state, "Physics", &tx);
        handle_key(&mut state, key(KeyCode::Enter), &tx);

        match rx.try_recv().unwrap() {
            UiCommand::Submit { start, end } => {
                assert_eq!(start, "Albert Einstein");
                assert_eq!(end, "Physics");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn enter_with_empty_field_only_explains() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = UiState::new(6, "https://en.wikipedia.org/wiki/");
        typed(&mut state, "A", &tx);
        handle_key(&mut state, key(KeyCode::Enter), &tx);
        assert!(rx.try_recv().is_err());
        assert_eq!(state.info, "Enter both a start and an end page");
    }

    #[test]
    fn q_types_in_fields_but_quits_from_graph() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = UiState::new(6, "https://en.wikipedia.org/wiki/");
        assert_eq!(
            handle_key(&mut state, key(KeyCode::Char('q')), &tx),
            KeyOutcome::Continue
        );
        assert_eq!(state.start_input, "q");
        state.focus = Focus::Graph;
        assert_eq!(
            handle_key(&mut state, key(KeyCode::Char('q')), &tx),
            KeyOutcome::Quit
        );
        assert_eq!(
            handle_key(
                &mut state,
                KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
                &tx
            ),
            KeyOutcome::Quit
        );
    }

    #[test]
    fn ctrl_x_requests_clear() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = UiState::new(6, "https://en.wikipedia.org/wiki/");
        handle_key(
            &mut state,
            KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL),
            &tx,
        );
        assert!(matches!(rx.try_recv().unwrap(), UiCommand::Clear));
        assert!(state.start_input.is_empty());
    }

    #[test]
    fn mouse_drag_moves_a_node() {
        let screen = Rect::new(0, 0, 120, 40);
        let mut state = UiState::new(6, "https://en.wikipedia.org/wiki/");
        state.set_graph_width(graph_view::container_width_px(search_areas(screen).graph));
        state.apply_event(SessionEvent::Completed {
            query: SearchQuery::new("A", "B").unwrap(),
            result: Box::new(PathResult {
                path: vec!["A".into(), "B".into()],
                search_time_seconds: 0.1,
                nodes_explored: 3,
            }),
            restored: false,
        });

        while state.simulation.as_mut().unwrap().tick() {}

        // Find a cell that hits node 0.
        let area = search_areas(screen).graph;
        let inner = graph_view::inner(area);
        let sim = state.simulation.as_ref().unwrap();
        let target = sim.nodes()[0].position();
        let (w, h) = sim.size();
        let col = inner.x + ((target.x / w) * inner.width as f64) as u16;
        let row = inner.y + ((target.y / h) * inner.height as f64) as u16;

        let ev = |kind, column, row| MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        };
        handle_mouse(&mut state, ev(MouseEventKind::Down(MouseButton::Left), col, row), screen);
        assert_eq!(state.selected_node, Some(0));
        assert_eq!(state.simulation.as_ref().unwrap().dragging(), Some(0));

        handle_mouse(
            &mut state,
            ev(MouseEventKind::Drag(MouseButton::Left), inner.x, inner.y),
            screen,
        );
        let pinned = state.simulation.as_ref().unwrap().nodes()[0].pinned.unwrap();
        assert!(pinned.x <= 30.0 + f64::EPSILON);

        handle_mouse(&mut state, ev(MouseEventKind::Up(MouseButton::Left), 0, 0), screen);
        assert_eq!(state.simulation.as_ref().unwrap().dragging(), None);
    }
}
