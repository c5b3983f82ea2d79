//! One expandable experiment in the list and its lazy-load state machine.
//!
//! ```text
//! {inactive, Unloaded} --click--> {active, Loading} --ok--> {active, Loaded}
//!                                        |                      ^  |
//!                                       err                 click  click
//!                                        v                      |  v
//!                                 {active, Unloaded}       {inactive, Loaded}
//! ```
//!
//! Collapsing never cancels a load; the result lands in the hidden item.

use crate::server::error::{FetchError, Notice};
use crate::server::fragment;

/// Shown for a successful detail response with no visible text.
pub const EMPTY_DETAIL_TEXT: &str = "(no details)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    /// A detail request is in flight. Guards against issuing a second one.
    Loading,
    Loaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailRegion {
    Empty,
    Content { html: String, lines: Vec<String> },
    Notice(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The item was active and is now hidden. Never fetches.
    Collapsed,
    /// The item is now active; `fetch` is set when a detail load was started.
    Expanded { fetch: bool },
}

#[derive(Debug, Clone)]
pub struct Experiment {
    id: String,
    pub summary: String,
    pub fragment: String,
    active: bool,
    load: LoadState,
    detail: DetailRegion,
}

impl Experiment {
    /// Builds an inactive, unloaded item from a summary fragment. Returns `None`
    /// when the fragment carries no experiment identifier.
    pub fn from_fragment(html: String) -> Option<Self> {
        let summary = fragment::parse_summary(&html)?;
        Some(Self {
            id: summary.id,
            summary: summary.text,
            fragment: html,
            active: false,
            load: LoadState::Unloaded,
            detail: DetailRegion::Empty,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn load_state(&self) -> LoadState {
        self.load
    }

    pub fn detail(&self) -> &DetailRegion {
        &self.detail
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_loaded(&self) -> bool {
        self.load == LoadState::Loaded
    }

    pub fn is_loading(&self) -> bool {
        self.load == LoadState::Loading
    }

    /// Stores detail content and marks the item loaded.
    pub fn set_loaded(&mut self, html: String) {
        let mut lines = fragment::to_lines(&html);
        if lines.is_empty() {
            lines.push(EMPTY_DETAIL_TEXT.to_string());
        }
        self.detail = DetailRegion::Content { html, lines };
        self.load = LoadState::Loaded;
    }

    /// Forgets that the detail was fetched so the next load goes to the server
    /// again. The stale content stays visible until then.
    pub fn set_unloaded(&mut self) {
        self.load = LoadState::Unloaded;
    }

    /// Moves an unloaded item to `Loading`. Returns `false` when a load is
    /// already in flight or the content is present.
    pub fn begin_load(&mut self) -> bool {
        if self.load != LoadState::Unloaded {
            return false;
        }
        self.load = LoadState::Loading;
        true
    }

    /// Applies the outcome of the in-flight load. Results that arrive when no
    /// load is pending are ignored and `false` is returned.
    pub fn finish_load(&mut self, result: Result<String, FetchError>) -> bool {
        if self.load != LoadState::Loading {
            return false;
        }
        match result {
            Ok(html) => self.set_loaded(html),
            Err(e) => {
                self.detail = DetailRegion::Notice(e.notice());
                self.load = LoadState::Unloaded;
            }
        }
        true
    }

    /// Click on any part of the item: collapse if open, otherwise open it and
    /// start the detail load if nothing is loaded or loading yet.
    pub fn click(&mut self) -> ClickOutcome {
        if self.is_active() {
            self.deactivate();
            return ClickOutcome::Collapsed;
        }
        let fetch = self.begin_load();
        self.activate();
        ClickOutcome::Expanded { fetch }
    }
}
