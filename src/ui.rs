use ratatui::{
    Frame,
    layout::{Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span, Text},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Cell, Chart, Clear, Dataset, GraphType, List,
        ListItem, ListState, Paragraph, Row, Table as TableWidget, Wrap,
    },
};
use std::time::Duration;

use crate::model::{Model, Pane};
use csvsight::chart::{BarChart as BarSpec, ChartSpec, LineChart, PieChart};
use csvsight::domain::{Outcome, SightConfig};
use csvsight::frequency::FrequencyTable;
use csvsight::report::summary_text;
use csvsight::summary::ColumnSummary;
use csvsight::table::{ColumnKind, Table, format_number};

pub const CMDLINE_HEIGH: u16 = 1;
pub const COLUMN_LIST_WIDTH: u16 = 28;
const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TableUI {
    max_column_width: usize,
}

impl TableUI {
    pub fn new(cfg: &SightConfig) -> Self {
        Self {
            max_column_width: cfg.max_column_width,
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let [title_area, body_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(CMDLINE_HEIGH),
        ])
        .areas(frame.area());
        let [list_area, pane_area] = Layout::horizontal([
            Constraint::Length(COLUMN_LIST_WIDTH),
            Constraint::Min(0),
        ])
        .areas(body_area);

        self.draw_title(model, frame, title_area);
        self.draw_column_list(model, frame, list_area);
        match model.pane() {
            Pane::OVERVIEW => self.draw_overview(model, frame, pane_area),
            Pane::CHART => self.draw_chart(model, frame, pane_area),
            Pane::PREVIEW => self.draw_preview(model, frame, pane_area),
            Pane::WORDS => self.draw_words(model, frame, pane_area),
        }
        self.draw_statusline(model, frame, status_area);

        if model.show_popup() {
            self.draw_popup(model.popup_message(), frame);
        }
    }

    fn draw_title(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let request = model.request();
        let mut spans = vec![
            format!(" {} ", model.table().name()).bold(),
            format!(
                "{} rows x {} columns",
                model.table().nrows(),
                model.table().ncols()
            )
            .into(),
            "  chart: ".into(),
            request.chart.to_string().yellow(),
            "  split: ".into(),
            if request.multi_value { "on".green() } else { "off".red() },
        ];
        if !request.filters.is_empty() {
            let clauses: Vec<String> = request
                .filters
                .iter()
                .map(|(c, f)| format!("{c}={f}"))
                .collect();
            spans.push("  filters: ".into());
            spans.push(clauses.join(", ").cyan());
        }
        let tabs: Vec<Span> = Pane::ALL
            .iter()
            .map(|p| {
                let label = format!(" {} ", p.title());
                if *p == model.pane() {
                    label.black().on_blue()
                } else {
                    label.into()
                }
            })
            .collect();
        let [left, right] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(64)]).areas(area);
        frame.render_widget(Paragraph::new(Line::from(spans)), left);
        frame.render_widget(Paragraph::new(Line::from(tabs)).right_aligned(), right);
    }

    fn draw_column_list(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = model
            .table()
            .columns()
            .iter()
            .map(|c| {
                let marker = match c.kind() {
                    ColumnKind::Numeric => "#".magenta(),
                    ColumnKind::Categorical => "A".cyan(),
                };
                ListItem::new(Line::from(vec![marker, " ".into(), c.name().to_string().into()]))
            })
            .collect();
        let list = List::new(items)
            .block(Block::bordered().title(" Columns "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(model.selected_column()));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_overview(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let block = Block::bordered().title(format!(" {} ", Pane::OVERVIEW.title()));
        let Some(column) = model.selected() else {
            frame.render_widget(Paragraph::new("No columns").block(block), area);
            return;
        };
        let summary = model
            .report()
            .summaries
            .iter()
            .find(|s| s.column() == column.name());

        let mut lines = vec![
            Line::from(vec![
                format!("🔹 {}", column.name().to_uppercase()).bold(),
                format!("  ({}, {} missing)", column.kind(), column.missing_count()).dark_gray(),
            ]),
            Line::default(),
        ];
        match summary {
            Some(ColumnSummary::Categorical { top, .. }) => {
                lines.push("Top 5 Frequent Values:".underlined().into());
                for (value, count) in top {
                    lines.push(Line::from(format!("  {count:>8}  {value}")));
                }
            }
            Some(ColumnSummary::Numeric { stats, .. }) => {
                let opt = |v: Option<f64>| v.map(|f| format!("{f:.4}")).unwrap_or("NaN".into());
                let rows = [
                    ("count", stats.count.to_string()),
                    ("mean", opt(stats.mean)),
                    ("std", opt(stats.std)),
                    ("min", opt(stats.min)),
                    ("25%", opt(stats.p25)),
                    ("50%", opt(stats.p50)),
                    ("75%", opt(stats.p75)),
                    ("max", opt(stats.max)),
                ];
                for (name, value) in rows {
                    lines.push(Line::from(vec![
                        format!("  {name:<6}").bold(),
                        format!("{value:>16}").into(),
                    ]));
                }
            }
            None => {}
        }

        lines.push(Line::default());
        lines.push("All columns".underlined().into());
        for s in model.report().summaries.iter() {
            lines.push(Line::from(summary_text(s)).dark_gray());
        }
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(block)
                .wrap(Wrap { trim: false }),
            area,
        );
    }

    fn draw_chart(&self, model: &Model, frame: &mut Frame, area: Rect) {
        match &model.report().chart {
            Some(Outcome::Ready(ChartSpec::Bar(spec))) => self.draw_bar_chart(spec, frame, area),
            Some(Outcome::Ready(ChartSpec::Pie(spec))) => self.draw_pie_chart(spec, frame, area),
            Some(Outcome::Ready(ChartSpec::Line(spec))) => self.draw_line_chart(spec, frame, area),
            Some(Outcome::Skipped(advisory)) => {
                let block = Block::bordered().title(format!(" {} ", Pane::CHART.title()));
                frame.render_widget(
                    Paragraph::new(format!("⚠ {advisory}"))
                        .yellow()
                        .block(block)
                        .wrap(Wrap { trim: true }),
                    area,
                );
            }
            None => frame.render_widget(Block::bordered().title(" Chart "), area),
        }
    }

    // Bars are coloured from blue (rare) to red (frequent).
    fn count_color(count: usize, max: usize) -> Color {
        let t = if max == 0 { 0.0 } else { count as f64 / max as f64 };
        let r = (60.0 + 195.0 * t) as u8;
        let b = (255.0 - 195.0 * t) as u8;
        Color::Rgb(r, 90, b)
    }

    fn draw_bar_chart(&self, spec: &BarSpec, frame: &mut Frame, area: Rect) {
        let data = &spec.data;
        let max = data.max_count();
        let bars: Vec<Bar> = data
            .entries
            .iter()
            .map(|(label, count)| {
                let style = if spec.color_by_count {
                    Style::default().fg(Self::count_color(*count, max))
                } else {
                    Style::default()
                };
                Bar::default()
                    .value(*count as u64)
                    .label(Line::from(self.clip(&label.to_string(), 12)))
                    .style(style)
            })
            .collect();

        let inner_width = area.width.saturating_sub(2) as usize;
        let n = bars.len().max(1);
        let bar_width = ((inner_width / n).saturating_sub(1)).clamp(1, 12) as u16;
        let chart = BarChart::default()
            .block(
                Block::bordered()
                    .title(format!(" {} ", spec.title))
                    .title_bottom(format!(" {} / {} ", spec.x_label, spec.y_label)),
            )
            .bar_width(bar_width)
            .bar_gap(1)
            .data(BarGroup::default().bars(&bars));
        frame.render_widget(chart, area);
    }

    // The terminal has no wedges, so slices are drawn as horizontal bars with
    // their share of the total.
    fn draw_pie_chart(&self, spec: &PieChart, frame: &mut Frame, area: Rect) {
        let data = &spec.data;
        let total = data.total().max(1) as f64;
        let palette = [
            Color::Cyan,
            Color::Magenta,
            Color::Yellow,
            Color::Green,
            Color::Blue,
            Color::Red,
            Color::LightCyan,
            Color::LightMagenta,
            Color::LightYellow,
            Color::LightGreen,
        ];
        let bars: Vec<Bar> = data
            .entries
            .iter()
            .enumerate()
            .map(|(i, (label, count))| {
                let share = *count as f64 * 100.0 / total;
                Bar::default()
                    .value(*count as u64)
                    .text_value(format!("{share:.1}% ({count})"))
                    .label(Line::from(self.clip(&label.to_string(), 20)))
                    .style(Style::default().fg(palette[i % palette.len()]))
            })
            .collect();
        let chart = BarChart::default()
            .block(
                Block::bordered()
                    .title(format!(" {} ", spec.title))
                    .title_bottom(format!(" donut hole {:.0}% ", spec.hole * 100.0)),
            )
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(0)
            .data(BarGroup::default().bars(&bars));
        frame.render_widget(chart, area);
    }

    fn draw_line_chart(&self, spec: &LineChart, frame: &mut Frame, area: Rect) {
        let points = Self::line_points(&spec.data);
        let (x_lo, x_hi) = points
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), (x, _)| (lo.min(*x), hi.max(*x)));
        let (x_lo, x_hi) = if x_lo < x_hi { (x_lo, x_hi) } else { (x_lo - 1.0, x_lo + 1.0) };
        let y_hi = spec.data.max_count().max(1) as f64;

        let dataset = Dataset::default()
            .name(spec.y_label.clone())
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().cyan())
            .data(&points);
        let chart = Chart::new(vec![dataset])
            .block(Block::bordered().title(format!(" {} ", spec.title)))
            .x_axis(
                Axis::default()
                    .title(spec.x_label.clone())
                    .bounds([x_lo, x_hi])
                    .labels(vec![
                        format_number(x_lo),
                        format_number((x_lo + x_hi) / 2.0),
                        format_number(x_hi),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title(spec.y_label.clone())
                    .bounds([0.0, y_hi])
                    .labels(vec!["0".to_string(), format_number(y_hi)]),
            );
        frame.render_widget(chart, area);
    }

    fn line_points(data: &FrequencyTable) -> Vec<(f64, f64)> {
        data.entries
            .iter()
            .filter_map(|(label, count)| label.as_f64().map(|x| (x, *count as f64)))
            .collect()
    }

    fn draw_preview(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let report = model.report();
        let [top, bottom] =
            Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
        let data_title = format!(
            " Data preview (first {} of {} rows) ",
            report.data_preview.nrows(),
            model.table().nrows()
        );
        let filtered_title = format!(
            " {} (first {} of {} rows) ",
            Pane::PREVIEW.title(),
            report.filtered_preview.nrows(),
            report.filtered.nrows()
        );
        self.draw_table(&report.data_preview, data_title, frame, top);
        self.draw_table(&report.filtered_preview, filtered_title, frame, bottom);
    }

    fn draw_table(&self, preview: &Table, title: String, frame: &mut Frame, area: Rect) {
        let widths: Vec<Constraint> = preview
            .columns()
            .iter()
            .map(|c| {
                let widest = (0..preview.nrows())
                    .map(|r| c.display_cell(r).chars().count())
                    .chain(std::iter::once(c.name().chars().count()))
                    .max()
                    .unwrap_or(0);
                Constraint::Length(widest.min(self.max_column_width) as u16)
            })
            .collect();
        let header = Row::new(
            preview
                .columns()
                .iter()
                .map(|c| Cell::from(c.name().to_string())),
        )
        .style(Style::default().bold().underlined());
        let rows: Vec<Row> = (0..preview.nrows())
            .map(|r| {
                Row::new(
                    preview
                        .columns()
                        .iter()
                        .map(|c| Cell::from(self.clip(&c.display_cell(r), self.max_column_width))),
                )
            })
            .collect();
        let table = TableWidget::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .block(Block::bordered().title(title));
        frame.render_widget(table, area);
    }

    fn draw_words(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let report = model.report();
        let column = report.text_column.as_deref().unwrap_or("-");
        let block = Block::bordered().title(format!(" {} from '{column}' ", Pane::WORDS.title()));
        let paragraph = match &report.document {
            Some(Outcome::Skipped(advisory)) => Paragraph::new(format!("⚠ {advisory}")).yellow(),
            _ if model.words().is_empty() => Paragraph::new("No words"),
            _ => {
                let palette = [
                    Color::LightRed,
                    Color::LightYellow,
                    Color::LightGreen,
                    Color::LightCyan,
                    Color::LightMagenta,
                ];
                let spans: Vec<Span> = model
                    .words()
                    .iter()
                    .enumerate()
                    .flat_map(|(i, w)| {
                        let mut style = Style::default().fg(palette[i % palette.len()]);
                        if w.weight > 0.66 {
                            style = style.add_modifier(Modifier::BOLD);
                            [Span::styled(w.word.to_uppercase(), style), Span::raw("  ")]
                        } else if w.weight > 0.33 {
                            style = style.add_modifier(Modifier::BOLD);
                            [Span::styled(w.word.clone(), style), Span::raw("  ")]
                        } else {
                            style = style.add_modifier(Modifier::DIM);
                            [Span::styled(w.word.clone(), style), Span::raw("  ")]
                        }
                    })
                    .collect();
                Paragraph::new(Line::from(spans)).centered()
            }
        };
        frame.render_widget(paragraph.block(block).wrap(Wrap { trim: true }), area);
    }

    fn draw_statusline(&self, model: &Model, frame: &mut Frame, area: Rect) {
        if let Some(input) = model.cmdinput() {
            let prompt = "filter> ";
            frame.render_widget(
                Paragraph::new(Line::from(vec![prompt.bold(), input.input.clone().into()])),
                area,
            );
            let x = area.x + (prompt.chars().count() + input.curser_pos) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            return;
        }
        let message = if model.last_status_message_update().elapsed() < STATUS_MESSAGE_TIMEOUT {
            model.status_message().to_string()
        } else {
            String::new()
        };
        let [left, right] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(24)]).areas(area);
        frame.render_widget(Paragraph::new(message), left);
        frame.render_widget(
            Paragraph::new("? help  q quit").dark_gray().right_aligned(),
            right,
        );
    }

    fn draw_popup(&self, message: &str, frame: &mut Frame) {
        let height = message.lines().count() as u16 + 2;
        let width = message.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4;
        let area = Self::centered_rect(frame.area(), width, height);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(message).block(Block::bordered().title(" Help ")),
            area,
        );
    }

    fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
        let [area] = Layout::horizontal([Constraint::Length(width)])
            .flex(Flex::Center)
            .areas(area);
        let [area] = Layout::vertical([Constraint::Length(height)])
            .flex(Flex::Center)
            .areas(area);
        area
    }

    fn clip(&self, s: &str, width: usize) -> String {
        if width < 3 {
            return String::new();
        }
        if s.chars().count() > width {
            let mut reduced: String = s.chars().take(width - 3).collect();
            reduced.push_str("...");
            reduced
        } else {
            s.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use csvsight::chart::ChartKind;
    use csvsight::domain::Message;
    use csvsight::report::Request;
    use csvsight::table::Column;
    use ratatui::{Terminal, backend::TestBackend};

    fn model(request: Request) -> Model {
        let table = Table::new(
            "titles.csv",
            vec![
                Column::text("genre", vec![Some("Action, Drama"), Some("Comedy"), Some("Action")]),
                Column::numeric("rating", vec![Some(7.5), Some(8.0), Some(7.5)]),
            ],
        )
        .unwrap();
        Model::init(&SightConfig::default(), table, request).unwrap()
    }

    fn render(model: &Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        let mut ui = TableUI::new(&SightConfig::default());
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn renders_every_pane() {
        let mut model = model(Request::default());
        for _ in 0..Pane::ALL.len() {
            let screen = render(&model);
            assert!(screen.contains("titles.csv"));
            model.update(Some(Message::NextPane)).unwrap();
        }
    }

    #[test]
    fn renders_advisory_for_line_on_categorical() {
        let mut model = model(Request::default().with_chart(ChartKind::Line));
        model.update(Some(Message::LineChart)).unwrap();
        let screen = render(&model);
        assert!(screen.contains("suitable only for numeric"));
    }

    #[test]
    fn renders_line_and_pie() {
        let mut model = model(Request::default().with_column("rating".to_string()));
        model.update(Some(Message::LineChart)).unwrap();
        assert!(render(&model).contains("Line Chart of 'rating'"));
        model.update(Some(Message::PieChart)).unwrap();
        assert!(render(&model).contains("Top 10 Distribution in 'rating'"));
    }

    #[test]
    fn preview_pane_shows_both_tables() {
        let mut model = model(Request::default());
        model.update(Some(Message::NextPane)).unwrap();
        model.update(Some(Message::NextPane)).unwrap();
        assert_eq!(model.pane(), Pane::PREVIEW);
        let screen = render(&model);
        assert!(screen.contains("Data preview (first 3 of 3 rows)"));
        assert!(screen.contains("Filtered preview (first 3 of 3 rows)"));
    }

    #[test]
    fn clip_long_text() {
        let ui = TableUI::new(&SightConfig::default());
        assert_eq!(ui.clip("abcdefgh", 6), "abc...");
        assert_eq!(ui.clip("abc", 6), "abc");
        assert_eq!(ui.clip("abc", 2), "");
    }
}
