use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::{App, SortBy};

/// Scrollable, sortable table of per-field dwell aggregates from the stats db.
pub fn render_field_stats(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Stats table
            Constraint::Length(4), // Instructions
        ])
        .split(area);

    let sort_direction = if app.field_stats_state.sort_ascending {
        "↑"
    } else {
        "↓"
    };
    let sort_by_text = match app.field_stats_state.sort_by {
        SortBy::Field => "Field",
        SortBy::AvgDwell => "Avg Dwell",
        SortBy::MotionGap => "Motion Gap",
        SortBy::Samples => "Samples",
    };
    let title_text = format!("Field Dwell Times (Sort: {} {})", sort_by_text, sort_direction);

    let title = Paragraph::new(title_text)
        .block(Block::default().borders(Borders::ALL).title("Stats"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let summary = app
        .experiment
        .stats_db
        .as_ref()
        .and_then(|db| db.get_all_field_summary().ok());

    if let Some(mut summary) = summary {
        match app.field_stats_state.sort_by {
            SortBy::Field => {
                summary.sort_by(|a, b| {
                    let cmp = a.0.cmp(&b.0);
                    if app.field_stats_state.sort_ascending {
                        cmp
                    } else {
                        cmp.reverse()
                    }
                });
            }
            SortBy::AvgDwell => {
                summary.sort_by(|a, b| {
                    let cmp = a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal);
                    if app.field_stats_state.sort_ascending {
                        cmp
                    } else {
                        cmp.reverse()
                    }
                });
            }
            SortBy::MotionGap => {
                summary.sort_by(|a, b| {
                    let gap_a = a.3 - a.2;
                    let gap_b = b.3 - b.2;
                    let cmp = gap_a.partial_cmp(&gap_b).unwrap_or(std::cmp::Ordering::Equal);
                    if app.field_stats_state.sort_ascending {
                        cmp
                    } else {
                        cmp.reverse()
                    }
                });
            }
            SortBy::Samples => {
                summary.sort_by(|a, b| {
                    let cmp = a.4.cmp(&b.4);
                    if app.field_stats_state.sort_ascending {
                        cmp
                    } else {
                        cmp.reverse()
                    }
                });
            }
        }

        // Account for borders and header
        let table_height = chunks[1].height.saturating_sub(3) as usize;
        let total_rows = summary.len();
        let max_scroll = total_rows.saturating_sub(table_height);

        if app.field_stats_state.scroll_offset > max_scroll {
            app.field_stats_state.scroll_offset = max_scroll;
        }

        let header = Row::new(vec![
            Cell::from("Field"),
            Cell::from("Avg Dwell (ms)"),
            Cell::from("All-at-once (ms)"),
            Cell::from("Grouped (ms)"),
            Cell::from("Samples"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let visible_rows: Vec<Row> = summary
            .iter()
            .skip(app.field_stats_state.scroll_offset)
            .take(table_height)
            .map(|(field, avg, avg_aao, avg_grouped, samples)| {
                let dwell_color = if *avg < 2_000.0 {
                    Color::Green
                } else if *avg < 5_000.0 {
                    Color::Yellow
                } else {
                    Color::Red
                };

                Row::new(vec![
                    Cell::from(field.clone()),
                    Cell::from(format!("{:.0}", avg)).style(Style::default().fg(dwell_color)),
                    Cell::from(format!("{:.0}", avg_aao)),
                    Cell::from(format!("{:.0}", avg_grouped)),
                    Cell::from(samples.to_string()),
                ])
            })
            .collect();

        let scroll_info = if total_rows > table_height {
            format!(
                " ({}/{} rows)",
                app.field_stats_state.scroll_offset + visible_rows.len().min(table_height),
                total_rows
            )
        } else {
            String::new()
        };

        let table = Table::new(
            visible_rows,
            &[
                Constraint::Length(18),
                Constraint::Length(16),
                Constraint::Length(18),
                Constraint::Length(14),
                Constraint::Length(10),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Dwell by Field{}", scroll_info)),
        )
        .row_highlight_style(Style::default().bg(Color::DarkGray));

        f.render_widget(table, chunks[1]);
    } else {
        let no_data = Paragraph::new(
            "No field statistics available.\nComplete an experiment session to see dwell times!",
        )
        .block(Block::default().borders(Borders::ALL).title("No Data"))
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
        f.render_widget(no_data, chunks[1]);
    }

    let instructions = Paragraph::new(
        "Dwell aggregates across all recorded sessions, split by motion factor\nSort: (1)Field (2)Dwell (3)Gap (4)Samples | (Space)Toggle | ↑/↓ PgUp/PgDn | (b)ack (esc)ape",
    )
    .block(Block::default().borders(Borders::ALL))
    .style(Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC))
    .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[2]);
}
