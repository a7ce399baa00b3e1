//! Selection of the tools that apply to a document.

use std::path::Path;

use crate::config::{Config, LanguageConfig};
use crate::lint::{EventSet, EventType};
use crate::root;

/// Whether a tool with `require-marker` may run for `file`.
pub fn marker_satisfied(tool: &LanguageConfig, file: &Path) -> bool {
    !tool.require_marker || root::find_root(file, &tool.root_markers).is_some()
}

fn event_allows(tool: &LanguageConfig, event: EventType) -> bool {
    match event {
        EventType::Open => tool.lint_after_open,
        EventType::Change => !tool.lint_on_save,
        EventType::Save => true,
    }
}

/// Lint tools for a document of `language_id`, language-specific tools first.
///
/// A tool runs when any of `events` admits it. Wildcard tools go through the
/// same marker and event checks.
pub fn lint_configs<'a>(
    config: &'a Config,
    file: &Path,
    language_id: &str,
    events: impl Into<EventSet>,
) -> Vec<&'a LanguageConfig> {
    let events = events.into();
    config
        .configs_for(language_id)
        .filter(|tool| !tool.lint_command.is_empty())
        .filter(|tool| events.iter().any(|event| event_allows(tool, event)))
        .filter(|tool| marker_satisfied(tool, file))
        .collect()
}
