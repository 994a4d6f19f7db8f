//! Output formatting helpers for CLI commands

use crate::registry::BackendView;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

/// Health label for a backend that may never have been probed.
fn health_label(view: &BackendView) -> String {
    match (view.health.checked_at, view.health.is_healthy) {
        (None, _) => "Unchecked".yellow().to_string(),
        (Some(_), true) => "Healthy".green().to_string(),
        (Some(_), false) => "Unhealthy".red().to_string(),
    }
}

/// Format backends as a table
pub fn format_backends_table(backends: &[BackendView]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Name", "URL", "Kind", "Class", "Priority", "Health", "Load", "Models",
    ]);

    for b in backends {
        table.add_row(vec![
            Cell::new(&b.name),
            Cell::new(&b.url),
            Cell::new(b.kind.as_str()),
            Cell::new(b.class.as_str()),
            Cell::new(b.priority),
            Cell::new(health_label(b)),
            Cell::new(format!("{}/{}", b.load.current, b.load.max)),
            Cell::new(b.models.join(", ")),
        ]);
    }

    table.to_string()
}

/// Format backends as JSON
pub fn format_backends_json(backends: &[BackendView]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({ "backends": backends }))
}
