//! Drill-down navigation: a single saved context plus the session state that
//! the drill-down actions toggle.
//!
//! The saved context is one slot, not a history. Entering a drill-down
//! overwrites it with whatever view was current at that moment, and leaving
//! a drill-down returns to that view.

use crate::filter::{FilterState, SearchQuery};
use crate::types::ViewMode;

/// The view a drill-down returns to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SavedContext {
    pub search: SearchQuery,
    pub state_filter: String,
    pub scroll_position: u32,
}

#[derive(Debug, Clone, Default)]
pub struct NavigationMemory {
    slot: SavedContext,
}

impl NavigationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot.
    pub fn save(&mut self, search: &SearchQuery, state_filter: &str, scroll_position: u32) {
        self.slot = SavedContext {
            search: search.clone(),
            state_filter: state_filter.to_string(),
            scroll_position,
        };
    }

    /// Read the slot. Does not clear it.
    pub fn restore(&self) -> SavedContext {
        self.slot.clone()
    }

    pub fn clear(&mut self) {
        self.slot = SavedContext::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillDown {
    SelectCode,
    DeselectCode,
    FocusState,
    UnfocusState,
    FocusLetter,
    UnfocusLetter,
    SeenFilterOn,
    SeenFilterOff,
}

/// Result of a drill-down action. `scroll_to` is set when leaving a drill-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub action: DrillDown,
    pub scroll_to: Option<u32>,
}

impl Transition {
    fn enter(action: DrillDown) -> Self {
        Self {
            action,
            scroll_to: None,
        }
    }

    fn leave(action: DrillDown, scroll_position: u32) -> Self {
        Self {
            action,
            scroll_to: Some(scroll_position),
        }
    }
}

/// Explicit per-session list state, passed to the pipeline on every recompute.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub filter: FilterState,
    pub selected_code: Option<String>,
    pub focused_group: Option<String>,
    memory: NavigationMemory,
}

impl Session {
    pub fn new(view_mode: ViewMode) -> Self {
        Self {
            filter: FilterState::new(view_mode),
            ..Default::default()
        }
    }

    pub fn memory(&self) -> &NavigationMemory {
        &self.memory
    }

    /// Free-text input from the search box.
    pub fn set_search_text(&mut self, text: &str) {
        self.filter.search = SearchQuery::term(text);
        self.selected_code = None;
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        self.filter.view_mode = view_mode;
    }

    /// Select a code, or deselect it when it is already selected.
    pub fn select_code(&mut self, code: &str, scroll_position: u32) -> Transition {
        if self.selected_code.as_deref() == Some(code) {
            let restored = self.memory.restore();
            self.filter.search = restored.search;
            self.filter.state_filter = restored.state_filter.clone();
            self.focused_group = non_empty(restored.state_filter);
            self.selected_code = None;
            return Transition::leave(DrillDown::DeselectCode, restored.scroll_position);
        }

        // Typing the full code and then tapping it does not move the return point
        let typed_same_code = matches!(
            &self.filter.search,
            SearchQuery::Term(term) if unicase::eq(term.as_str(), code)
        );
        if !typed_same_code {
            self.save_current(scroll_position);
        }

        self.filter.search = SearchQuery::exact(code);
        self.filter.state_filter.clear();
        self.focused_group = None;
        self.selected_code = Some(code.to_string());
        Transition::enter(DrillDown::SelectCode)
    }

    /// Focus a federal state, or leave the focus when it is already focused.
    pub fn toggle_state(&mut self, state: &str, scroll_position: u32) -> Transition {
        let already_focused =
            self.focused_group.as_deref() == Some(state) || self.filter.state_filter == state;
        if already_focused {
            return self.clear_state_filter();
        }

        // The return point is the unfiltered list with the previous search
        self.memory.save(&self.filter.search, "", scroll_position);
        self.filter.search = SearchQuery::All;
        self.filter.state_filter = state.to_string();
        self.focused_group = Some(state.to_string());
        self.selected_code = None;
        Transition::enter(DrillDown::FocusState)
    }

    /// Drop the state filter and return to the saved search and scroll position.
    pub fn clear_state_filter(&mut self) -> Transition {
        let restored = self.memory.restore();
        self.filter.search = restored.search;
        self.filter.state_filter.clear();
        self.focused_group = None;
        Transition::leave(DrillDown::UnfocusState, restored.scroll_position)
    }

    /// Narrow the list to codes starting with `letter`, or undo that narrowing.
    pub fn toggle_letter(&mut self, letter: &str, scroll_position: u32) -> Transition {
        let already_filtered = matches!(
            &self.filter.search,
            SearchQuery::Term(term) if unicase::eq(term.as_str(), letter)
        );
        if already_filtered {
            let restored = self.memory.restore();
            self.filter.search = restored.search;
            self.filter.state_filter = restored.state_filter;
            self.focused_group = None;
            return Transition::leave(DrillDown::UnfocusLetter, restored.scroll_position);
        }

        self.save_current(scroll_position);
        self.filter.search = SearchQuery::term(letter);
        self.filter.state_filter.clear();
        self.focused_group = Some(letter.to_string());
        self.selected_code = None;
        Transition::enter(DrillDown::FocusLetter)
    }

    /// A click on a group heading: a state in grouped mode, a letter otherwise.
    pub fn toggle_group_heading(&mut self, key: &str, scroll_position: u32) -> Transition {
        match self.filter.view_mode {
            ViewMode::Grouped => self.toggle_state(key, scroll_position),
            ViewMode::Alphabetical => self.toggle_letter(key, scroll_position),
        }
    }

    /// Turn the seen filter on (keeping any state filter) or off (restoring everything).
    pub fn toggle_seen_filter(&mut self, scroll_position: u32) -> Transition {
        if self.filter.seen_filter {
            let restored = self.memory.restore();
            self.filter.search = restored.search;
            self.filter.state_filter = restored.state_filter.clone();
            self.focused_group = non_empty(restored.state_filter);
            self.filter.seen_filter = false;
            return Transition::leave(DrillDown::SeenFilterOff, restored.scroll_position);
        }

        self.save_current(scroll_position);
        self.filter.search = SearchQuery::All;
        self.filter.seen_filter = true;
        self.selected_code = None;
        Transition::enter(DrillDown::SeenFilterOn)
    }

    /// Back to the full, unfiltered list with an empty save slot.
    pub fn clear_all_filters(&mut self) {
        self.filter.search = SearchQuery::All;
        self.filter.state_filter.clear();
        self.filter.seen_filter = false;
        self.selected_code = None;
        self.focused_group = None;
        self.memory.clear();
    }

    /// True when any drill-down or filter narrows the list.
    pub fn is_filtered(&self) -> bool {
        self.filter.search.is_active()
            || !self.filter.state_filter.is_empty()
            || self.filter.seen_filter
    }

    fn save_current(&mut self, scroll_position: u32) {
        self.memory.save(&self.filter.search, &self.filter.state_filter, scroll_position);
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
