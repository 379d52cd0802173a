use cypher_tracer::{
    Asset, ConfidenceLevel, ConnectionStatus, DashboardView, PriceDirection, Timeframe, Trend,
    confidence::confidence_percentage,
};
use itertools::{Itertools, MinMaxResult};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph, Wrap},
};

const ACCENT: Color = Color::Rgb(100, 149, 237);

pub fn render_ui(f: &mut Frame, view: &DashboardView) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(10),
        ])
        .split(f.area());

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
        .split(rows[1]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Min(6),
        ])
        .split(middle[1]);

    render_status_bar(f, view, rows[0]);
    render_chart(f, view, middle[0]);
    render_valuation(f, view, side[0]);
    render_timeframes(f, view, side[1]);
    render_assets(f, view, side[2]);
    render_prediction(f, view, rows[2]);
}

fn status_color(status: ConnectionStatus) -> Color {
    match status {
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Connecting => Color::Yellow,
        ConnectionStatus::Error | ConnectionStatus::Disconnected => Color::Red,
    }
}

fn render_status_bar(f: &mut Frame, view: &DashboardView, area: Rect) {
    let line = Line::from(vec![
        Span::styled(
            " CYPHER TRACER ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ "),
        Span::styled(
            view.feed_status.label(),
            Style::default()
                .fg(status_color(view.feed_status))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ "),
        Span::styled(
            format!("{} · {}", view.selection.asset, view.selection.timeframe),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ "),
        Span::styled(
            "←/→ asset  ↑/↓ timeframe  1-4 pick  q quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

/// Y bounds padded by 5% of the range (or of the price when the series is flat).
fn y_bounds(series: &[f64]) -> [f64; 2] {
    let (min, max) = match series.iter().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => return [0.0, 1.0],
        MinMaxResult::OneElement(only) => (*only, *only),
        MinMaxResult::MinMax(min, max) => (*min, *max),
    };

    let pad = if max > min {
        (max - min) * 0.05
    } else {
        (max.abs() * 0.05).max(f64::EPSILON)
    };
    [min - pad, max + pad]
}

fn format_price(price: f64) -> String {
    if price.abs() >= 1_000.0 {
        format!("{price:.2}")
    } else if price.abs() >= 1.0 {
        format!("{price:.4}")
    } else {
        format!("{price:.6}")
    }
}

fn render_chart(f: &mut Frame, view: &DashboardView, area: Rect) {
    let title = format!(
        " {} {} · {} samples ",
        view.selection.asset,
        view.selection.timeframe,
        view.series.len()
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    if view.series.is_empty() {
        let waiting = Paragraph::new(Line::from(Span::styled(
            "Waiting for price data...",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        f.render_widget(waiting, area);
        return;
    }

    let points = view
        .series
        .iter()
        .enumerate()
        .map(|(index, price)| (index as f64, *price))
        .collect::<Vec<_>>();
    let [low, high] = y_bounds(&view.series);
    let x_max = (view.series.len().saturating_sub(1)).max(1) as f64;

    let dataset = Dataset::default()
        .name(view.selection.asset.as_str())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(ACCENT))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, x_max])
                .labels(vec![Span::raw("oldest"), Span::raw("latest")]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([low, high])
                .labels(vec![
                    Span::raw(format_price(low)),
                    Span::raw(format_price((low + high) / 2.0)),
                    Span::raw(format_price(high)),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_valuation(f: &mut Frame, view: &DashboardView, area: Rect) {
    let block = Block::default().title(" LIVE VALUATION ").borders(Borders::ALL);

    let (arrow, color) = match view.direction {
        Some(PriceDirection::Up) => ("▲", Color::Green),
        Some(PriceDirection::Down) => ("▼", Color::Red),
        None => ("•", Color::Gray),
    };

    let price = view
        .live_price
        .map(format_price)
        .unwrap_or_else(|| "--".to_string());

    let updated = view
        .last_update
        .map(|time| time.format("%H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{} ", view.selection.asset),
                Style::default().fg(Color::White),
            ),
            Span::styled(
                format!("${price} {arrow}"),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            format!("updated {updated}"),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn selector_line(label: &str, selected: bool) -> Line<'static> {
    if selected {
        Line::from(Span::styled(
            format!("▶ {label}"),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(
            format!("  {label}"),
            Style::default().fg(Color::Gray),
        ))
    }
}

fn render_timeframes(f: &mut Frame, view: &DashboardView, area: Rect) {
    let lines = Timeframe::ALL
        .iter()
        .map(|timeframe| selector_line(timeframe.as_str(), *timeframe == view.selection.timeframe))
        .collect::<Vec<_>>();

    let block = Block::default().title(" TIMEFRAME ").borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_assets(f: &mut Frame, view: &DashboardView, area: Rect) {
    let lines = Asset::ALL
        .iter()
        .enumerate()
        .map(|(index, asset)| {
            selector_line(
                &format!("{} {}", index + 1, asset),
                *asset == view.selection.asset,
            )
        })
        .collect::<Vec<_>>();

    let block = Block::default().title(" ASSET ").borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn trend_style(trend: Trend) -> (&'static str, Color) {
    match trend {
        Trend::Bullish => ("BULLISH ▲", Color::Green),
        Trend::Bearish => ("BEARISH ▼", Color::Red),
        Trend::Neutral => ("NEUTRAL ■", Color::Yellow),
    }
}

fn level_color(level: ConfidenceLevel) -> Color {
    match level {
        ConfidenceLevel::VeryHigh => Color::Green,
        ConfidenceLevel::High => Color::LightGreen,
        ConfidenceLevel::Medium => Color::Yellow,
        ConfidenceLevel::Low => Color::LightRed,
        ConfidenceLevel::VeryLow => Color::Red,
    }
}

fn render_prediction(f: &mut Frame, view: &DashboardView, area: Rect) {
    let title = format!(
        " AI TREND · {} · {} ",
        view.selection.asset,
        view.prediction_status.label()
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(status_color(view.prediction_status)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(prediction) = &view.prediction else {
        let waiting = Paragraph::new(Line::from(Span::styled(
            format!("Waiting for {} prediction...", view.selection.asset),
            Style::default().fg(Color::DarkGray),
        )));
        f.render_widget(waiting, inner);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    let (trend_label, trend_color) = trend_style(prediction.trend);
    let level = prediction.confidence_level();
    let header = Line::from(vec![
        Span::styled(
            trend_label,
            Style::default().fg(trend_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(level.label(), Style::default().fg(level_color(level))),
        Span::styled(
            format!("  {}", prediction.timestamp.format("%H:%M:%S UTC")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(header), rows[0]);

    let gauge = Gauge::default()
        .gauge_style(
            Style::default()
                .fg(level_color(level))
                .bg(Color::Rgb(30, 30, 40)),
        )
        .ratio(prediction.confidence.clamp(0.0, 1.0))
        .label(Span::styled(
            format!(" Confidence: {}% ", confidence_percentage(prediction.confidence)),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ));
    f.render_widget(gauge, rows[1]);

    let explanation = if prediction.explanation.is_empty() {
        vec![Line::from(Span::styled(
            "No analysis available",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        prediction
            .explanation
            .iter()
            .map(|line| Line::from(format!("• {line}")))
            .collect()
    };
    f.render_widget(
        Paragraph::new(explanation).wrap(Wrap { trim: true }),
        rows[2],
    );
}
