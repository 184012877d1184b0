pub mod charting;
pub mod field_stats;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::fields::{self, Field};
use crate::{summary, util, App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Welcome => render_welcome(self, area, buf),
            AppState::Form => render_form(self, area, buf),
            AppState::RunResult => render_run_result(self, area, buf),
            AppState::Summary => render_summary(self, area, buf),
            // drawn by ui::field_stats::render_field_stats via the Frame path
            AppState::FieldStats => {}
        }
    }
}

fn render_welcome(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let dim_style = Style::default().add_modifier(Modifier::DIM);

    let mut lines = vec![
        Line::from(Span::styled("formlab", bold_style)),
        Line::from(Span::styled(
            "signup form experiment: 8 variants, one participant",
            dim_style,
        )),
        Line::from(""),
    ];

    if let Some(ref participant) = app.experiment.participant {
        lines.push(Line::from(format!("participant: {}", participant)));
    }
    if let Some(ref last) = app.last_session {
        lines.push(Line::from(Span::styled(
            format!("last session: {}", last),
            dim_style,
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "press enter to begin · (esc)ape",
        italic_style,
    )));

    let vertical_pad = area.height.saturating_sub(lines.len() as u16) / 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(vertical_pad),
            Constraint::Min(lines.len() as u16),
        ])
        .split(area);

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);
}

fn render_form(app: &App, area: Rect, buf: &mut Buffer) {
    let exp = &app.experiment;
    let cond = match exp.condition() {
        Some(cond) => cond,
        None => return,
    };

    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let hint_style = Style::default()
        .add_modifier(Modifier::DIM)
        .add_modifier(Modifier::ITALIC);
    let focused_style = Style::default()
        .patch(bold_style)
        .add_modifier(Modifier::UNDERLINED);
    let ok_style = Style::default().fg(Color::Green).patch(bold_style);
    let bad_style = Style::default().fg(Color::Red).patch(bold_style);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let visible = exp.visible();
    let label_width = visible
        .iter()
        .map(|f| app.catalog.spec(*f).label.width())
        .max()
        .unwrap_or(0);

    let header = Line::from(Span::styled(
        format!(
            "run {}/{}   {:.1}s",
            exp.current + 1,
            exp.order.len(),
            exp.elapsed_ms() as f64 / 1000.0
        ),
        dim_style,
    ));

    let mut lines = vec![header, Line::from("")];

    for field in &visible {
        let spec = app.catalog.spec(*field);
        let value = exp.run.form.get(*field);
        let is_focused = exp.run.focused == Some(*field);

        let mut spans = Vec::new();

        spans.push(Span::styled(
            if is_focused { "› " } else { "  " }.to_string(),
            bold_style,
        ));
        spans.push(Span::styled(
            format!("{:width$}  ", spec.label, width = label_width),
            if is_focused { bold_style } else { dim_style },
        ));

        if value.is_empty() {
            if cond.hints == 1 {
                spans.push(Span::styled(spec.example.clone(), hint_style));
            } else if field.is_select() {
                spans.push(Span::styled("‹choose›".to_string(), hint_style));
            }
        } else {
            let shown = if *field == Field::Password || *field == Field::PasswordConfirm {
                "*".repeat(value.chars().count())
            } else {
                value.to_string()
            };
            spans.push(Span::styled(
                shown,
                if is_focused { focused_style } else { Style::default() },
            ));
        }

        if is_focused && !field.is_select() {
            spans.push(Span::styled("▌".to_string(), bold_style));
        }

        if fields::validity_visible(cond, *field, &exp.run.form, &exp.run.blurred) {
            match fields::validity(*field, &exp.run.form) {
                Some(true) => spans.push(Span::styled("  ok".to_string(), ok_style)),
                Some(false) => spans.push(Span::styled("  !!".to_string(), bad_style)),
                None => {}
            }
        }

        lines.push(Line::from(spans));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        "tab/enter next · shift-tab back · ←/→ choose · enter on last field completes",
        italic_style.patch(dim_style),
    )));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([Constraint::Min(1)])
        .split(area);

    Paragraph::new(lines)
        .alignment(Alignment::Left)
        .render(chunks[0], buf);
}

fn render_run_result(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let result = match app.experiment.summary.last() {
        Some(result) => result,
        None => return,
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!("run {} complete", result.run_number),
            bold_style,
        )),
        Line::from(Span::styled(
            format!("condition {}", result.code),
            dim_style,
        )),
        Line::from(""),
    ];

    for (i, interval) in result.intervals.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:28}", result.transition_label(i)),
                dim_style,
            ),
            Span::raw(util::format_ms(*interval)),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("total {}", util::format_ms(result.total_time_ms)),
        bold_style,
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "press enter to continue",
        italic_style,
    )));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([Constraint::Min(1)])
        .split(area);

    Paragraph::new(lines)
        .alignment(Alignment::Left)
        .render(chunks[0], buf);
}

fn render_summary(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let magenta_style = Style::default().fg(Color::Magenta);

    let results = &app.experiment.summary;
    let rows_len = results.len().max(1) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),            // chart
            Constraint::Length(1),         // padding
            Constraint::Length(rows_len),  // per-run rows
            Constraint::Length(1),         // aggregates
            Constraint::Length(1),         // status line
            Constraint::Length(1),         // legend
        ])
        .split(area);

    let secs = summary::total_times_secs(results);
    let tuples: Vec<(f64, f64)> = summary::run_points(results)
        .iter()
        .map(|p| (p.run, p.secs))
        .collect();
    let (last_run, highest_secs) = charting::compute_chart_params(&tuples);

    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(magenta_style)
        .graph_type(GraphType::Line)
        .data(&tuples)];

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("run")
                .bounds([1.0, last_run])
                .labels(vec![
                    Span::styled("1", bold_style),
                    Span::styled(charting::format_label(last_run), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("secs")
                .bounds([0.0, highest_secs])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(highest_secs), bold_style),
                ]),
        );

    chart.render(chunks[0], buf);

    let rows: Vec<Line> = results
        .iter()
        .map(|r| {
            Line::from(vec![
                Span::styled(format!("run {}  ", r.run_number), dim_style),
                Span::styled(format!("{}  ", r.code), bold_style),
                Span::raw(util::format_ms(r.total_time_ms)),
            ])
        })
        .collect();
    Paragraph::new(rows)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let aggregates = match (util::mean(&secs), util::std_dev(&secs)) {
        (Some(mean), Some(sd)) => format!("{:.1}s mean   {:.1}s sd", mean, sd),
        _ => String::from("no completed runs"),
    };
    Paragraph::new(Span::styled(aggregates, bold_style))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    if let Some(ref status) = app.status {
        Paragraph::new(Span::styled(
            status.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }

    let legend = Paragraph::new(Span::styled(
        "(s)tats / (e)xport / (r)estart / (esc)ape",
        italic_style,
    ));
    legend.render(chunks[5], buf);
}
