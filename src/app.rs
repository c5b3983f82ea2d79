use crate::experiment::{ClickOutcome, DetailRegion, Experiment, LoadState};
use crate::mask::FilterMask;
use crate::server::error::{FetchError, Notice};
use chrono::{DateTime, Local};
use std::time::{Duration, Instant};
use url::Url;

// UI constants
pub const NOTIFICATION_TTL_SECS: u64 = 5;
pub const SPINNER_FRAME_COUNT: usize = 10;
pub const QUICK_SELECT_MAX: usize = 9;
pub const NARROW_WIDTH_THRESHOLD: u16 = 60;
pub const ERROR_TTL_SECS: u64 = 10;

// Fixed screen layout: header and footer heights in terminal rows.
pub const HEADER_HEIGHT: u16 = 2;
pub const FOOTER_HEIGHT: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Summary,
    Loading,
    Detail(usize),
    Notice,
}

/// One rendered line of the list. Every row belongs to exactly one experiment,
/// so a click anywhere on an item resolves to that item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    pub slot: usize,
    pub kind: RowKind,
}

/// Parameters of one list request, tagged with the generation it will refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub generation: u64,
    pub project: String,
    pub mask: String,
}

/// Parameters of one detail request. `slot` and `generation` locate the item
/// the response belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    pub generation: u64,
    pub slot: usize,
    pub xid: String,
    pub project: String,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub timestamp: Instant,
}

/// Immutable configuration set at startup.
pub struct AppConfig {
    pub server: Url,
    pub project: String,
    pub timeout: Duration,
}

pub struct AppState {
    pub config: AppConfig,
    pub mask: FilterMask,
    /// Text being typed into the mask editor, when it is open.
    pub mask_editor: Option<String>,

    // List data
    pub experiments: Vec<Experiment>,
    pub generation: u64,
    /// Generation of the list currently on screen. Detail requests are tagged
    /// with it, so a refresh landing in between invalidates them.
    pub displayed_generation: u64,
    pub list_loading: bool,
    pub list_notice: Option<Notice>,
    pub refreshed_at: Option<DateTime<Local>>,

    // Navigation
    pub rows: Vec<Row>,
    pub cursor: usize,

    // Transient UI
    pub notifications: Vec<Notification>,
    pub error: Option<(String, Instant)>,
    pub spinner_frame: usize,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(server: Url, project: String, timeout: Duration) -> Self {
        Self {
            config: AppConfig {
                server,
                project,
                timeout,
            },
            mask: FilterMask::empty(),
            mask_editor: None,
            experiments: Vec::new(),
            generation: 0,
            displayed_generation: 0,
            list_loading: false,
            list_notice: None,
            refreshed_at: None,
            rows: Vec::new(),
            cursor: 0,
            notifications: Vec::new(),
            error: None,
            spinner_frame: 0,
            should_quit: false,
        }
    }

    // --- List controller ---

    /// Starts a list refresh. Any response to an earlier request that arrives
    /// after this call is stale and will be discarded.
    pub fn begin_list_request(&mut self) -> ListRequest {
        self.generation += 1;
        self.list_loading = true;
        ListRequest {
            generation: self.generation,
            project: self.config.project.clone(),
            mask: self.mask.serialize(),
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        if generation == self.generation {
            return false;
        }
        tracing::debug!(
            "dropping stale response for generation {generation} (current {})",
            self.generation
        );
        true
    }

    /// Replaces the list with `fragments`. The last fragment ends up on top.
    /// Returns `false` if the response was stale.
    pub fn apply_list(&mut self, generation: u64, fragments: Vec<String>) -> bool {
        if self.is_stale(generation) {
            return false;
        }
        self.list_loading = false;
        self.list_notice = None;
        self.displayed_generation = generation;
        self.experiments.clear();

        let total = fragments.len();
        let mut skipped = 0;
        for html in fragments {
            if !self.add_experiment_to_list(html) {
                skipped += 1;
            }
        }
        if skipped > 0 {
            self.notify(format!(
                "Skipped {skipped} of {total} experiments without an identifier"
            ));
        }

        self.refreshed_at = Some(Local::now());
        self.cursor = 0;
        self.rebuild_rows();
        true
    }

    /// Empties the list and shows why the refresh failed. Returns `false` if
    /// the response was stale.
    pub fn fail_list(&mut self, generation: u64, err: &FetchError) -> bool {
        if self.is_stale(generation) {
            return false;
        }
        self.list_loading = false;
        self.displayed_generation = generation;
        self.experiments.clear();
        let notice = err.notice();
        self.set_error(notice.message());
        self.list_notice = Some(notice);
        self.cursor = 0;
        self.rebuild_rows();
        true
    }

    pub fn apply_list_result(
        &mut self,
        generation: u64,
        result: Result<Vec<String>, FetchError>,
    ) -> bool {
        match result {
            Ok(fragments) => self.apply_list(generation, fragments),
            Err(e) => self.fail_list(generation, &e),
        }
    }

    /// Puts one summary fragment at the top of the list. Fragments without an
    /// identifier are skipped and `false` is returned.
    pub fn add_experiment_to_list(&mut self, html: String) -> bool {
        match Experiment::from_fragment(html) {
            Some(exp) => {
                self.experiments.insert(0, exp);
                true
            }
            None => {
                tracing::warn!("skipping experiment fragment without an experiment-id");
                false
            }
        }
    }

    // --- Item interaction ---

    /// Routes a click to the item in `slot`. Returns the detail request to
    /// issue when the click started a load.
    pub fn toggle_item(&mut self, slot: usize) -> Option<DetailRequest> {
        let generation = self.displayed_generation;
        let project = self.config.project.clone();
        let exp = self.experiments.get_mut(slot)?;
        let request = match exp.click() {
            ClickOutcome::Expanded { fetch: true } => Some(DetailRequest {
                generation,
                slot,
                xid: exp.id().to_string(),
                project,
            }),
            ClickOutcome::Expanded { fetch: false } | ClickOutcome::Collapsed => None,
        };
        self.rebuild_rows();
        self.select_slot(slot);
        request
    }

    pub fn toggle_selected(&mut self) -> Option<DetailRequest> {
        let slot = self.selected_slot()?;
        self.toggle_item(slot)
    }

    /// Mouse click on list line `line` of a list area `height` lines tall.
    pub fn click_line(&mut self, line: usize, height: usize) -> Option<DetailRequest> {
        let row = self.row_at(line, height)?;
        let slot = self.rows.get(row)?.slot;
        self.toggle_item(slot)
    }

    pub fn collapse_selected(&mut self) {
        let Some(slot) = self.selected_slot() else {
            return;
        };
        if let Some(exp) = self.experiments.get_mut(slot) {
            exp.deactivate();
        }
        self.rebuild_rows();
        self.select_slot(slot);
    }

    /// Marks the selected item unloaded. If it is open, the reload starts now;
    /// otherwise on the next expansion.
    pub fn reload_selected(&mut self) -> Option<DetailRequest> {
        let slot = self.selected_slot()?;
        let generation = self.displayed_generation;
        let project = self.config.project.clone();
        let exp = self.experiments.get_mut(slot)?;
        if exp.is_loading() {
            return None;
        }
        exp.set_unloaded();
        let request = if exp.is_active() && exp.begin_load() {
            Some(DetailRequest {
                generation,
                slot,
                xid: exp.id().to_string(),
                project,
            })
        } else {
            None
        };
        self.rebuild_rows();
        self.select_slot(slot);
        request
    }

    /// Writes a detail response into its item. Responses for a replaced list,
    /// or whose slot now holds a different experiment, are dropped.
    pub fn apply_detail(
        &mut self,
        request: &DetailRequest,
        result: Result<String, FetchError>,
    ) -> bool {
        if request.generation != self.displayed_generation {
            tracing::debug!(
                "dropping detail for {} from list generation {} (showing {})",
                request.xid,
                request.generation,
                self.displayed_generation
            );
            return false;
        }
        let Some(exp) = self.experiments.get_mut(request.slot) else {
            return false;
        };
        if exp.id() != request.xid {
            tracing::warn!(
                "detail for {} does not match slot {} ({})",
                request.xid,
                request.slot,
                exp.id()
            );
            return false;
        }
        let applied = exp.finish_load(result);
        let selected = self.rows.get(self.cursor).copied();
        self.rebuild_rows();
        if let Some(row) = selected {
            self.restore_cursor(row);
        }
        applied
    }

    // --- Rows and cursor ---

    pub fn rebuild_rows(&mut self) {
        let mut rows = Vec::new();
        for (slot, exp) in self.experiments.iter().enumerate() {
            rows.push(Row {
                slot,
                kind: RowKind::Summary,
            });
            if !exp.is_active() {
                continue;
            }
            if exp.load_state() == LoadState::Loading {
                rows.push(Row {
                    slot,
                    kind: RowKind::Loading,
                });
            }
            match exp.detail() {
                DetailRegion::Empty => {}
                DetailRegion::Content { lines, .. } => {
                    rows.extend((0..lines.len()).map(|i| Row {
                        slot,
                        kind: RowKind::Detail(i),
                    }));
                }
                DetailRegion::Notice(_) => rows.push(Row {
                    slot,
                    kind: RowKind::Notice,
                }),
            }
        }
        self.rows = rows;
        if self.rows.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.rows.len() {
            self.cursor = self.rows.len() - 1;
        }
    }

    pub fn selected_slot(&self) -> Option<usize> {
        self.rows.get(self.cursor).map(|r| r.slot)
    }

    pub fn selected_experiment(&self) -> Option<&Experiment> {
        self.experiments.get(self.selected_slot()?)
    }

    /// Puts the cursor back on `row` after a rebuild, or on its item's summary
    /// when that row is gone.
    fn restore_cursor(&mut self, row: Row) {
        match self.rows.iter().position(|r| *r == row) {
            Some(i) => self.cursor = i,
            None => self.select_slot(row.slot),
        }
    }

    /// Moves the cursor to the summary row of `slot`.
    pub fn select_slot(&mut self, slot: usize) {
        if let Some(i) = self
            .rows
            .iter()
            .position(|r| r.slot == slot && r.kind == RowKind::Summary)
        {
            self.cursor = i;
        }
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn move_cursor_down(&mut self) {
        if !self.rows.is_empty() && self.cursor < self.rows.len() - 1 {
            self.cursor += 1;
        }
    }

    /// Selects the nth experiment (1-indexed).
    pub fn quick_select(&mut self, n: usize) {
        if n >= 1 && n <= self.experiments.len() {
            self.select_slot(n - 1);
        }
    }

    /// Lines available for rows in a list area `height` lines tall; the
    /// loading placeholder takes the first line while a refresh is pending.
    pub fn rows_height(&self, height: usize) -> usize {
        if self.list_loading {
            height.saturating_sub(1)
        } else {
            height
        }
    }

    /// Index of the first visible row so the cursor stays on screen.
    pub fn scroll_offset(&self, height: usize) -> usize {
        let visible = self.rows_height(height);
        if visible == 0 {
            return 0;
        }
        if self.cursor >= visible {
            self.cursor - visible + 1
        } else {
            0
        }
    }

    /// Row index under list line `line`, if any.
    pub fn row_at(&self, line: usize, height: usize) -> Option<usize> {
        if line >= height {
            return None;
        }
        let line = if self.list_loading {
            line.checked_sub(1)?
        } else {
            line
        };
        let row = self.scroll_offset(height) + line;
        (row < self.rows.len()).then_some(row)
    }

    // --- Filter mask ---

    /// Replaces the mask from user text. Returns the warning shown when the
    /// text was not a JSON object and the empty mask was used instead.
    pub fn set_mask_text(&mut self, text: &str) -> Option<String> {
        let parsed = FilterMask::parse(text);
        self.mask = parsed.mask;
        if let Some(warning) = &parsed.warning {
            tracing::warn!("{warning}");
            self.set_error(warning.clone());
        }
        parsed.warning
    }

    pub fn open_mask_editor(&mut self) {
        let text = if self.mask.is_empty() {
            String::new()
        } else {
            self.mask.serialize()
        };
        self.mask_editor = Some(text);
    }

    pub fn mask_input(&mut self, c: char) {
        if let Some(buf) = self.mask_editor.as_mut() {
            buf.push(c);
        }
    }

    pub fn mask_backspace(&mut self) {
        if let Some(buf) = self.mask_editor.as_mut() {
            buf.pop();
        }
    }

    pub fn cancel_mask_editor(&mut self) {
        self.mask_editor = None;
    }

    /// Applies the editor text. Returns `false` if the editor was not open.
    pub fn submit_mask_editor(&mut self) -> bool {
        let Some(text) = self.mask_editor.take() else {
            return false;
        };
        self.set_mask_text(&text);
        true
    }

    // --- Transient UI ---

    pub fn notify(&mut self, message: String) {
        self.notifications.push(Notification {
            message,
            timestamp: Instant::now(),
        });
    }

    pub fn prune_notifications(&mut self) {
        let now = Instant::now();
        self.notifications
            .retain(|n| now.duration_since(n.timestamp).as_secs() < NOTIFICATION_TTL_SECS);
    }

    pub fn has_pending_loads(&self) -> bool {
        self.list_loading || self.experiments.iter().any(Experiment::is_loading)
    }

    pub fn advance_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAME_COUNT;
    }

    pub fn set_error(&mut self, msg: String) {
        self.error = Some((msg, Instant::now()));
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn prune_error(&mut self) {
        if let Some((_, ts)) = &self.error {
            if ts.elapsed().as_secs() >= ERROR_TTL_SECS {
                self.error = None;
            }
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|(msg, _)| msg.as_str())
    }
}
