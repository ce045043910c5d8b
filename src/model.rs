use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::inputter::{InputResult, Inputter};
use csvsight::chart::ChartKind;
use csvsight::domain::{CMDMode, HELP_TEXT, Message, Outcome, SightConfig, SightError};
use csvsight::filter::FilterClause;
use csvsight::report::{Report, Request};
use csvsight::table::{Column, Table};
use csvsight::text::{WordWeight, word_weights};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pane {
    OVERVIEW,
    CHART,
    PREVIEW,
    WORDS,
}

impl Pane {
    pub const ALL: [Pane; 4] = [Pane::OVERVIEW, Pane::CHART, Pane::PREVIEW, Pane::WORDS];

    pub fn title(&self) -> &'static str {
        match self {
            Pane::OVERVIEW => "Summary",
            Pane::CHART => "Chart",
            Pane::PREVIEW => "Filtered preview",
            Pane::WORDS => "Word cloud",
        }
    }

    fn step(self, forward: bool) -> Pane {
        let idx = Pane::ALL.iter().position(|&p| p == self).unwrap_or(0);
        let n = Pane::ALL.len();
        let next = if forward { (idx + 1) % n } else { (idx + n - 1) % n };
        Pane::ALL[next]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    VIEW,
    POPUP,
    CMDINPUT,
}

pub struct Model {
    config: SightConfig,
    pub status: Status,
    modus: Modus,
    pane: Pane,
    table: Table,
    request: Request,
    report: Report,
    words: Vec<WordWeight>,
    selected_column: usize,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    popup_message: String,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &SightConfig, table: Table, request: Request) -> Result<Self, SightError> {
        let start_time = Instant::now();
        let report = Report::build(&table, &request, config)?;
        let selected_column = request
            .resolve_column(&table)
            .and_then(|name| table.columns().iter().position(|c| c.name() == name))
            .unwrap_or(0);
        let clipboard = match Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Clipboard unavailable: {e}");
                None
            }
        };
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::VIEW,
            pane: Pane::OVERVIEW,
            words: Vec::new(),
            table,
            request,
            report,
            selected_column,
            clipboard,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            popup_message: String::new(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.update_words();
        model.set_status_message(format!(
            "Loaded {} rows x {} columns in {}ms",
            model.table.nrows(),
            model.table.ncols(),
            start_time.elapsed().as_millis()
        ));
        Ok(model)
    }

    // ------------------------------ Accessors ------------------------------- //
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn words(&self) -> &[WordWeight] {
        &self.words
    }

    pub fn pane(&self) -> Pane {
        self.pane
    }

    pub fn selected_column(&self) -> usize {
        self.selected_column
    }

    pub fn selected(&self) -> Option<&Column> {
        self.table.columns().get(self.selected_column)
    }

    pub fn show_popup(&self) -> bool {
        self.modus == Modus::POPUP
    }

    pub fn popup_message(&self) -> &str {
        &self.popup_message
    }

    pub fn cmdinput(&self) -> Option<&InputResult> {
        match self.modus {
            Modus::CMDINPUT => Some(&self.last_input),
            _ => None,
        }
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn last_status_message_update(&self) -> Instant {
        self.last_status_message_update
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), SightError> {
        if let Some(msg) = message {
            match self.modus {
                Modus::VIEW => match msg {
                    Message::Quit => self.quit(),
                    Message::Help => self.show_help(),
                    Message::NextPane => self.pane = self.pane.step(true),
                    Message::PrevPane => self.pane = self.pane.step(false),
                    Message::MoveUp => self.move_selection(-1),
                    Message::MoveDown => self.move_selection(1),
                    Message::MovePageUp => self.move_selection(-10),
                    Message::MovePageDown => self.move_selection(10),
                    Message::Enter => self.pane = Pane::CHART,
                    Message::BarChart => self.select_chart(ChartKind::Bar),
                    Message::PieChart => self.select_chart(ChartKind::Pie),
                    Message::LineChart => self.select_chart(ChartKind::Line),
                    Message::ToggleMultiValue => self.toggle_multi_value(),
                    Message::UseAsTextColumn => self.use_as_text_column(),
                    Message::Filter => self.enter_cmd_mode(CMDMode::Filter),
                    Message::ClearFilters => self.clear_filters(),
                    Message::CopyDocument => self.copy_document(),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Enter | Message::Help => self.modus = Modus::VIEW,
                    _ => (),
                },
                Modus::CMDINPUT => {
                    if let Message::RawKey(key) = msg {
                        self.raw_input(key)
                    }
                }
            }
        }
        Ok(())
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    /// Rebuild the report for `request`. The current request is only replaced
    /// when the new one is valid for the table.
    fn apply_request(&mut self, request: Request) -> bool {
        let start_time = Instant::now();
        match Report::build(&self.table, &request, &self.config) {
            Ok(report) => {
                self.request = request;
                self.report = report;
                self.update_words();
                trace!("Report rebuilt in {}ms", start_time.elapsed().as_millis());
                if let Some(advisory) = self
                    .report
                    .chart
                    .as_ref()
                    .and_then(|c| c.advisory())
                    .cloned()
                {
                    self.set_status_message(advisory.to_string());
                }
                true
            }
            Err(e) => {
                error!("Rejected request: {e}");
                self.set_status_message(e.to_string());
                false
            }
        }
    }

    fn update_words(&mut self) {
        self.words = match &self.report.document {
            Some(Outcome::Ready(doc)) => word_weights(doc, self.config.word_limit),
            _ => Vec::new(),
        };
    }

    // -------------------- Control handling functions ---------------------- //
    fn move_selection(&mut self, step: i64) {
        let ncols = self.table.ncols();
        if ncols == 0 {
            return;
        }
        let target = (self.selected_column as i64 + step).clamp(0, ncols as i64 - 1) as usize;
        if target == self.selected_column {
            return;
        }
        self.selected_column = target;
        let name = self.table.columns()[target].name().to_string();
        let request = self.request.clone().with_column(name);
        self.apply_request(request);
    }

    fn select_chart(&mut self, kind: ChartKind) {
        let request = self.request.clone().with_chart(kind);
        if self.apply_request(request) {
            self.pane = Pane::CHART;
            if self.report.chart.as_ref().is_some_and(|c| c.is_ready()) {
                self.set_status_message(format!("{kind} chart"));
            }
        }
    }

    fn toggle_multi_value(&mut self) {
        let multi_value = !self.request.multi_value;
        let request = self.request.clone().with_multi_value(multi_value);
        if self.apply_request(request) {
            self.set_status_message(if multi_value {
                "Splitting categorical cells on ','"
            } else {
                "Counting whole cells"
            });
        }
    }

    fn use_as_text_column(&mut self) {
        let Some(name) = self.selected().map(|c| c.name().to_string()) else {
            return;
        };
        let request = self.request.clone().with_text_column(name.clone());
        if self.apply_request(request) {
            self.pane = Pane::WORDS;
            match self.report.document.as_ref().and_then(|d| d.advisory()) {
                Some(advisory) => {
                    let msg = advisory.to_string();
                    self.set_status_message(msg);
                }
                None => self.set_status_message(format!("Word cloud from '{name}'")),
            }
        }
    }

    fn clear_filters(&mut self) {
        let mut request = self.request.clone();
        request.filters.clear();
        if self.apply_request(request) {
            self.set_status_message("Filters cleared");
        }
    }

    fn add_filter(&mut self, clause: &str) {
        let parsed: FilterClause = match clause.parse() {
            Ok(c) => c,
            Err(e) => {
                self.set_status_message(format!("{e}"));
                return;
            }
        };
        info!("Adding filter {parsed}");
        let mut request = self.request.clone();
        request.filters.insert(parsed.column.clone(), parsed.filter.clone());
        if self.apply_request(request) {
            self.pane = Pane::PREVIEW;
            self.set_status_message(format!(
                "Filter {parsed}: {} of {} rows",
                self.report.filtered.nrows(),
                self.table.nrows()
            ));
        }
    }

    fn copy_document(&mut self) {
        let Some(Outcome::Ready(doc)) = &self.report.document else {
            self.set_status_message("No word cloud text to copy");
            return;
        };
        let doc = doc.clone();
        let len = doc.chars().count();
        let result = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(doc).map_err(|e| e.to_string()),
            None => Err("clipboard unavailable".to_string()),
        };
        match result {
            Ok(()) => self.set_status_message(format!("Copied {len} characters")),
            Err(e) => {
                error!("Copy failed: {e}");
                self.set_status_message(format!("Copy failed: {e}"));
            }
        }
    }

    fn show_help(&mut self) {
        self.popup_message = HELP_TEXT.to_string();
        self.modus = Modus::POPUP;
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        debug!("Entering cmd mode {mode:?}");
        self.input.clear();
        self.last_input = self.input.get();
        self.cmd_mode = Some(mode);
        self.modus = Modus::CMDINPUT;
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.modus = Modus::VIEW;
            if !self.last_input.canceled {
                self.handle_cmd_input();
            }
            self.cmd_mode = None;
            self.input.clear();
        }
    }

    fn handle_cmd_input(&mut self) {
        let cmd_input = self.last_input.input.clone();
        match self.cmd_mode {
            Some(CMDMode::Filter) => self.add_filter(&cmd_input),
            None => info!("Cmd mode is none!"),
        }
    }
}
