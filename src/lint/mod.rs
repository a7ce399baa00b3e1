//! Running external linters and publishing their diagnostics.
//!
//! - [`select`] picks the tools that apply to a document and its events
//! - [`mapper`] turns parsed tool output into LSP diagnostics
//! - [`runner`] runs every tool for one document ([`Linter`])
//! - [`scheduler`] debounces requests and keeps one run per document ([`LintScheduler`])

pub mod mapper;
pub mod runner;
pub mod scheduler;
pub mod select;

use tower_lsp::lsp_types::{Diagnostic, MessageType, Url};

pub use runner::{LintReport, Linter, PublishedLedger};
pub use scheduler::LintScheduler;

/// Output patterns used when a tool does not declare any.
pub const DEFAULT_LINT_FORMATS: [&str; 2] = ["%f:%l:%m", "%f:%l:%c:%m"];

/// Document event that triggered a lint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Change,
    Save,
    Open,
}

/// Events collected while a debounced run was waiting.
///
/// The event gates are not nested (an Open run admits only
/// `lint-after-open` tools, a Change run every tool without
/// `lint-on-save`), so a run keeps every event it stands for and a tool
/// runs when any of them admits it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventSet {
    change: bool,
    save: bool,
    open: bool,
}

impl EventSet {
    pub fn insert(&mut self, event: EventType) {
        match event {
            EventType::Change => self.change = true,
            EventType::Save => self.save = true,
            EventType::Open => self.open = true,
        }
    }

    pub fn contains(&self, event: EventType) -> bool {
        match event {
            EventType::Change => self.change,
            EventType::Save => self.save,
            EventType::Open => self.open,
        }
    }

    pub fn iter(self) -> impl Iterator<Item = EventType> {
        [EventType::Change, EventType::Save, EventType::Open]
            .into_iter()
            .filter(move |event| self.contains(*event))
    }
}

impl From<EventType> for EventSet {
    fn from(event: EventType) -> Self {
        let mut set = EventSet::default();
        set.insert(event);
        set
    }
}

/// Outgoing notifications towards the editor.
#[tower_lsp::async_trait]
pub trait Notifier: Send + Sync {
    async fn publish_diagnostics(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>);

    async fn log_message(&self, typ: MessageType, message: String);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_set_keeps_every_event() {
        let mut events = EventSet::from(EventType::Open);
        events.insert(EventType::Change);
        assert!(events.contains(EventType::Open));
        assert!(events.contains(EventType::Change));
        assert!(!events.contains(EventType::Save));
        assert_eq!(events.iter().collect::<Vec<_>>(), vec![EventType::Change, EventType::Open]);
    }

    #[test]
    fn test_empty_event_set() {
        assert_eq!(EventSet::default().iter().count(), 0);
    }
}
