use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Span,
    widgets::canvas::{Canvas, Line as CanvasLine, Points},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::state::UiState;
use crate::layout::{NodeRole, Point, Simulation, CANVAS_INSET};

/// Virtual pixels per terminal column.
pub const CELL_PX_X: f64 = 8.0;

/// Helper function to draw a line on a canvas
pub fn draw_line(
    ctx: &mut ratatui::widgets::canvas::Context,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    color: Color,
) {
    ctx.draw(&CanvasLine {
        x1,
        y1,
        x2,
        y2,
        color,
    });
}

/// Area inside the graph block's borders.
pub fn inner(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

/// Container width to hand the simulation so its canvas fills `area`.
pub fn container_width_px(area: Rect) -> f64 {
    inner(area).width as f64 * CELL_PX_X + CANVAS_INSET
}

pub fn contains(area: Rect, column: u16, row: u16) -> bool {
    let r = inner(area);
    column >= r.x && column < r.x + r.width && row >= r.y && row < r.y + r.height
}

/// Map a terminal cell to simulation coordinates (origin top-left). Cells
/// outside the area are clamped to its edge so drags can leave it.
pub fn cell_to_point(area: Rect, size: (f64, f64), column: u16, row: u16) -> Option<Point> {
    let r = inner(area);
    if r.width == 0 || r.height == 0 {
        return None;
    }
    let col = column.clamp(r.x, r.x + r.width - 1) - r.x;
    let row = row.clamp(r.y, r.y + r.height - 1) - r.y;
    Some(Point::new(
        (col as f64 + 0.5) / r.width as f64 * size.0,
        (row as f64 + 0.5) / r.height as f64 * size.1,
    ))
}

fn role_color(role: NodeRole) -> Color {
    match role {
        NodeRole::Start => Color::Green,
        NodeRole::End => Color::Red,
        NodeRole::Intermediate => Color::Cyan,
    }
}

pub fn draw_graph(area: Rect, f: &mut Frame, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title("Path graph");
    let Some(sim) = state.simulation.as_ref() else {
        let msg = if state.phase.is_active() {
            "Searching…"
        } else {
            "The path will appear here."
        };
        let p = Paragraph::new(Span::styled(msg, Style::default().fg(Color::Gray))).block(block);
        f.render_widget(p, area);
        return;
    };

    let (w, h) = sim.size();
    let canvas = Canvas::default()
        .block(block)
        .x_bounds([0.0, w])
        .y_bounds([0.0, h])
        .paint(|ctx| paint(ctx, sim, state.selected_node, h));
    f.render_widget(canvas, area);
}

fn paint(
    ctx: &mut ratatui::widgets::canvas::Context,
    sim: &Simulation,
    selected: Option<usize>,
    height: f64,
) {
    let nodes = sim.nodes();
    // Canvas y grows upward; the simulation's grows downward.
    for e in sim.edges() {
        let (a, b) = (&nodes[e.source], &nodes[e.target]);
        draw_line(ctx, a.x, height - a.y, b.x, height - b.y, Color::DarkGray);
    }
    for n in nodes {
        ctx.draw(&Points {
            coords: &[(n.x, height - n.y)],
            color: role_color(n.role),
        });
    }
    ctx.layer();

    for (i, n) in nodes.iter().enumerate() {
        let mut style = Style::default().fg(role_color(n.role));
        if selected == Some(i) {
            style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
        }
        if sim.hovered() == Some(i) || sim.dragging() == Some(i) {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        let half = n.display_label.chars().count() as f64 * CELL_PX_X / 2.0;
        ctx.print(
            (n.x - half).max(0.0),
            height - n.y,
            Span::styled(n.display_label.clone(), style),
        );
    }
}
