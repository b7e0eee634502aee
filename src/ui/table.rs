use ratatui::{
    layout::Constraint,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Row, Table},
};

use crate::line::{LineId, MeasurementKey, Side};
use crate::session::Session;
use crate::ui::charting::{deviation_colour, format_deviation, format_mm};

const CELL_HEIGHT: u16 = 3;

/// Pure presenter for one line/side cell: label and theoretical length,
/// measured value, deviation.
pub fn present_cell(session: &Session, key: MeasurementKey, colour_range: f64) -> Cell<'static> {
    let profile = session.profile();
    let Some(theoretical) = profile.theoretical(key.line) else {
        return Cell::from("");
    };
    let active = session.active_key() == key;

    let header = Line::from(Span::styled(
        format!("{} {}", profile.key_label(key), format_mm(theoretical)),
        Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
    ));

    let (measured, deviation) = match (session.ledger().get(key), session.report().get(key)) {
        (Some(value), Some(dev)) => (
            Span::styled(format_mm(value), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("Δ {}", format_deviation(dev)),
                Style::default()
                    .fg(Color::Black)
                    .bg(deviation_colour(dev, colour_range))
                    .add_modifier(Modifier::BOLD),
            ),
        ),
        _ if active => (Span::raw("--"), Span::raw("")),
        _ => (Span::raw(""), Span::raw("")),
    };

    let style = if active {
        Style::default().bg(Color::Rgb(255, 99, 71)).fg(Color::Black)
    } else {
        Style::default()
    };
    Cell::from(Text::from(vec![header, Line::from(measured), Line::from(deviation)])).style(style)
}

/// Grid of every line: Left mirrored outward from the centre column, Right
/// to its right. Trailing-edge rows are at the top.
pub fn line_table(session: &Session, colour_range: f64) -> Table<'static> {
    let profile = session.profile();
    let n = profile.max_positions();

    let rows = (0..profile.row_count()).rev().map(|row| {
        let name = profile.row(row).map(|r| r.name.clone()).unwrap_or_default();
        let cell = |position: usize, side: Side| {
            present_cell(session, LineId::new(row, position).on(side), colour_range)
        };
        let mut cells: Vec<Cell> = (0..n).rev().map(|p| cell(p, Side::Left)).collect();
        cells.push(
            Cell::from(Text::from(vec![Line::from(""), Line::from(name)]))
                .style(Style::default().add_modifier(Modifier::BOLD)),
        );
        cells.extend((0..n).map(|p| cell(p, Side::Right)));
        Row::new(cells).height(CELL_HEIGHT)
    });

    let widths = std::iter::repeat(Constraint::Min(10))
        .take(n)
        .chain(std::iter::once(Constraint::Length(8)))
        .chain(std::iter::repeat(Constraint::Min(10)).take(n));

    Table::new(rows, widths)
        .column_spacing(1)
        .block(Block::default().borders(Borders::ALL).title(" Lines "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Profile;
    use ratatui::{backend::TestBackend, Terminal};

    fn session() -> Session {
        let mut s = Session::default();
        s.install_profile(Profile::parse("*A\n7000\n6900\n*B\n6950\n").unwrap());
        s.submit_measurement("7010");
        s
    }

    #[test]
    fn test_present_cell_empty_slot() {
        let s = session();
        // row B has a single position
        let cell = present_cell(&s, MeasurementKey::new(1, 1, Side::Left), 24.0);
        assert_eq!(cell, Cell::from(""));
    }

    #[test]
    fn test_table_renders_labels_and_values() {
        let s = session();
        let backend = TestBackend::new(120, 14);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| f.render_widget(line_table(&s, 24.0), f.area()))
            .unwrap();

        let content: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(content.contains("A01-L 7000"));
        assert!(content.contains("B01-R 6950"));
        assert!(content.contains("7010"));
        assert!(content.contains("Δ 0"));
    }
}
