pub mod charting;
pub mod screen;
pub mod table;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Points},
        Block, Borders, Clear, Paragraph, Widget, Wrap,
    },
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Mode, PromptKind, StatusKind};
use crate::line::{LineId, Side};
use crate::ui::charting::{
    deviation_colour, format_deviation, format_mm, DiagramLayout, CANVAS_HEIGHT, CANVAS_WIDTH,
};

const HORIZONTAL_MARGIN: u16 = 1;
const ACTIVE_COLOUR: Color = Color::Rgb(255, 99, 71);
const PROMPT_WIDTH: u16 = 70;

pub const LEGEND: &str =
    "(enter) submit (tab) side (←↑↓→) select (d)irection (w)rite (W) save as (o)pen (l)oad table (e)xport (i)d (t) summary (?) help (q)uit";

/// Draw the whole frame for the current mode.
pub fn draw(app: &App, f: &mut Frame) {
    screen::current_screen(app.mode).render(app, f);
    if let Mode::Prompt(kind) = app.mode {
        render_prompt(app, kind, f);
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(1),      // identification
                Constraint::Percentage(45), // diagram
                Constraint::Min(5),         // table
                Constraint::Length(3),      // input
                Constraint::Length(1),      // status
                Constraint::Length(1),      // legend
            ])
            .split(area);

        let session = &self.session;
        let title = match session.project_path() {
            Some(path) => format!("{}   [{}]", session.identification(), path.display()),
            None => session.identification().to_string(),
        };
        Paragraph::new(Span::styled(title, bold_style))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        render_diagram(self, chunks[1], buf);
        table::line_table(session, self.config.colour_range_mm).render(chunks[2], buf);

        let active = if session.profile().is_empty() {
            "no table loaded".to_string()
        } else {
            let key = session.active_key();
            match session.active_theoretical() {
                Some(theo) => format!(
                    "{} (theoretical {} mm)",
                    session.profile().key_label(key),
                    format_mm(theo)
                ),
                None => session.profile().key_label(key),
            }
        };
        let input_style = if session.pending_cancel() {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            bold_style
        };
        Paragraph::new(Span::styled(format!("{}▏", self.input), input_style))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Measurement: {active} ")),
            )
            .render(chunks[3], buf);

        status_line(self).render(chunks[4], buf);
        Paragraph::new(Span::styled(LEGEND, italic_style))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);
    }
}

/// "offset 12.3 mm | 14/40 measured | Center to tip | Left | sound on | <message>"
pub fn status_line(app: &App) -> Paragraph<'static> {
    let session = &app.session;
    let report = session.report();
    let facts = format!(
        "offset {:.1} mm | {}/{} measured | {} | {} | sound {}",
        report.offset,
        report.measured(),
        report.total(),
        session.direction(),
        session.cursor().side,
        if app.config.sound { "on" } else { "off" }
    );

    let mut spans = vec![Span::styled(facts, Style::default().fg(Color::Cyan))];
    if let Some(status) = &app.status {
        let colour = match status.kind {
            StatusKind::Info => Color::Gray,
            StatusKind::Good => Color::Green,
            StatusKind::Warn => Color::Yellow,
            StatusKind::Error => Color::Red,
        };
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            status.text.clone(),
            Style::default().fg(colour).add_modifier(Modifier::BOLD),
        ));
    }
    Paragraph::new(Line::from(spans))
}

fn render_diagram(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let profile = session.profile();
    let layout = DiagramLayout::for_profile(profile);
    let polygon = app.outline.polygon();
    let range = app.config.colour_range_mm;
    let active = session.active_key();
    let show_active = !profile.is_empty();

    Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Left  |  offset = {:.1} mm  |  Right ",
            session.report().offset
        )))
        .marker(Marker::Braille)
        .x_bounds([0.0, CANVAS_WIDTH])
        .y_bounds([0.0, CANVAS_HEIGHT])
        .paint(|ctx| {
            for pair in polygon.windows(2) {
                ctx.draw(&CanvasLine::new(
                    pair[0].0,
                    pair[0].1,
                    pair[1].0,
                    pair[1].1,
                    Color::DarkGray,
                ));
            }
            ctx.draw(&CanvasLine::new(
                CANVAS_WIDTH / 2.0,
                0.0,
                CANVAS_WIDTH / 2.0,
                CANVAS_HEIGHT,
                Color::Gray,
            ));

            if show_active {
                let (x, y) = layout.position(active.line, active.side);
                ctx.draw(&CanvasLine::new(0.0, y, CANVAS_WIDTH, y, ACTIVE_COLOUR));
                ctx.draw(&CanvasLine::new(x, 0.0, x, CANVAS_HEIGHT, ACTIVE_COLOUR));
            }
            ctx.layer();

            for key in profile.keys() {
                let (x, y) = layout.position(key.line, key.side);
                let colour = match session.report().get(key) {
                    Some(dev) => deviation_colour(dev, range),
                    None => Color::Gray,
                };
                ctx.draw(&Points {
                    coords: &[(x, y)],
                    color: colour,
                });
            }

            for (row, r) in profile.rows().iter().enumerate() {
                let (x, y) = layout.position(LineId::new(row, 0), Side::Right);
                ctx.print(x - layout.h_step * 0.5, y, r.name.clone());
            }
        })
        .render(area, buf);
}

pub fn render_summary(app: &App, f: &mut Frame) {
    let session = &app.session;
    let report = session.report();
    let profile = session.profile();
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(Span::styled(session.identification().to_string(), bold)),
        Line::from(""),
        Line::from(format!(
            "Measured {} of {} lines",
            report.measured(),
            report.total()
        )),
        Line::from(format!("Offset {:.1} mm", report.offset)),
    ];
    if let Some(spread) = report.spread() {
        lines.push(Line::from(format!("Spread (std dev) {spread:.1} mm")));
    }
    if let Some((key, dev)) = report.worst() {
        lines.push(Line::from(vec![
            Span::raw("Largest deviation "),
            Span::styled(
                format!("{} {} mm", profile.key_label(key), format_deviation(dev)),
                Style::default().fg(deviation_colour(dev, app.config.colour_range_mm)),
            ),
        ]));
    }

    let asymmetry: Vec<_> = report
        .row_asymmetry(profile)
        .into_iter()
        .filter_map(|a| a.mean_left_minus_right.map(|m| (a.row, a.pairs, m)))
        .collect();
    if !asymmetry.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Left - Right per row", bold)));
        for (row, pairs, diff) in asymmetry {
            let name = profile.row(row).map_or("?", |r| r.name.as_str());
            lines.push(Line::from(format!(
                "  {:<8} {:>6} mm  ({} pairs)",
                name,
                format_deviation(diff),
                pairs
            )));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "(t) or (esc) back",
        Style::default().add_modifier(Modifier::ITALIC),
    )));

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Summary "))
        .wrap(Wrap { trim: false });
    f.render_widget(widget, f.area());
}

pub fn render_help(f: &mut Frame) {
    let rows = [
        ("0-9 .", "type a length (values below 10 are metres)"),
        ("enter", "submit the reading for the highlighted line"),
        ("", "a short reading (< 1 m) twice steps back one line"),
        ("tab", "switch between left and right side"),
        ("arrows", "select a line by hand"),
        ("d", "cycle measuring direction"),
        ("b", "toggle sound"),
        ("w / W", "save project / save as"),
        ("o", "open project"),
        ("l", "load a line table"),
        ("e", "export CSV report"),
        ("i", "edit glider identification"),
        ("t", "summary"),
        ("q / esc", "quit"),
    ];
    let width = rows.iter().map(|(k, _)| k.width()).max().unwrap_or(0);
    let lines: Vec<Line> = rows
        .iter()
        .map(|(k, d)| {
            Line::from(vec![
                Span::styled(
                    format!("{k:>width$}  "),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(*d),
            ])
        })
        .collect();
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Keys ")),
        f.area(),
    );
}

fn render_prompt(app: &App, kind: PromptKind, f: &mut Frame) {
    let area = centered(f.area(), PROMPT_WIDTH, 3);
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(format!("{}▏", app.prompt_input)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(format!(" {kind} (enter to confirm, esc to cancel) ")),
        ),
        area,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
