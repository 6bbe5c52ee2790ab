use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame, session_path: &str) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        key_line("Tab", 9, "Cycle focus: Start, End, Graph"),
        key_line("Enter", 7, "Search (in a field) / open page (in the graph)"),
        key_line("Ctrl-X", 6, "Clear fields, result and saved session"),
        key_line("Ctrl-C", 6, "Quit (a running search resumes next launch)"),
        key_line("F1", 10, "Toggle this help"),
        Line::from(""),
        Line::from("Graph focus:"),
        key_line("←/→", 9, "Select previous/next page"),
        key_line("o", 11, "Open selected page in the browser"),
        key_line("r", 11, "Reheat the layout"),
        key_line("q", 11, "Quit"),
        key_line("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Mouse:"),
        key_line("drag", 8, "Move a page; it settles back when released"),
        key_line("double-click", 0, " Unpin and open the page"),
        Line::from(""),
        Line::from("Session file:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(session_path.to_string(), Style::default().fg(Color::Cyan)),
        ]),
    ])
    .wrap(Wrap { trim: false })
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
