//! Focus areas and the terminal-independent input alphabet.

use std::fmt;

/// The pane (or modal) that currently receives input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Focus {
    #[default]
    Catalog,
    SearchEntry,
    SessionPicker,
    SelectionList,
    /// Full-screen timer; suspends every other pane.
    Timer,
}

impl Focus {
    /// Modal states are entered and left explicitly, never by pane cycling.
    pub const fn is_modal(self) -> bool {
        matches!(self, Self::SessionPicker | Self::Timer)
    }

    /// Whether global shortcuts are evaluated before this state's handler.
    ///
    /// Search entry takes plain characters as text, and the modal states own
    /// all of their input.
    pub const fn accepts_global_shortcuts(self) -> bool {
        matches!(self, Self::Catalog | Self::SelectionList)
    }

    /// Next pane in the `Catalog -> SelectionList -> SearchEntry` cycle.
    ///
    /// The selection list is skipped while the working set is empty. Modal
    /// states have no successor and return themselves.
    pub const fn next_pane(self, list_is_empty: bool) -> Self {
        match self {
            Self::Catalog if list_is_empty => Self::SearchEntry,
            Self::Catalog => Self::SelectionList,
            Self::SelectionList => Self::SearchEntry,
            Self::SearchEntry => Self::Catalog,
            Self::SessionPicker | Self::Timer => self,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::SearchEntry => "search",
            Self::SessionPicker => "sessions",
            Self::SelectionList => "selection",
            Self::Timer => "timer",
        }
    }
}

impl fmt::Display for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single key press, already decoded from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Esc,
    Tab,
    Backspace,
    Char(char),
    /// A character typed with the control modifier held.
    Ctrl(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_visits_list_only_when_non_empty() {
        assert_eq!(Focus::Catalog.next_pane(false), Focus::SelectionList);
        assert_eq!(Focus::SelectionList.next_pane(false), Focus::SearchEntry);
        assert_eq!(Focus::SearchEntry.next_pane(false), Focus::Catalog);

        assert_eq!(Focus::Catalog.next_pane(true), Focus::SearchEntry);
        assert_eq!(Focus::SearchEntry.next_pane(true), Focus::Catalog);
    }

    #[test]
    fn cycle_never_enters_modal_states() {
        let mut focus = Focus::Catalog;
        for _ in 0..10 {
            focus = focus.next_pane(false);
            assert!(!focus.is_modal());
        }
        assert_eq!(Focus::Timer.next_pane(false), Focus::Timer);
        assert_eq!(Focus::SessionPicker.next_pane(true), Focus::SessionPicker);
    }

    #[test]
    fn global_shortcuts_apply_only_to_browsing_panes() {
        assert!(Focus::Catalog.accepts_global_shortcuts());
        assert!(Focus::SelectionList.accepts_global_shortcuts());
        assert!(!Focus::SearchEntry.accepts_global_shortcuts());
        assert!(!Focus::SessionPicker.accepts_global_shortcuts());
        assert!(!Focus::Timer.accepts_global_shortcuts());
    }
}
