//! CLI output formatting

use crate::core::{config::PipelineConfig, IndexPath};
use console::Emoji;
use serde_json::Value;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");

/// Render the stage tree of a definition, one element per line
pub fn format_stage_tree(config: &PipelineConfig) -> String {
    fn render(elements: &[Value], parent: &IndexPath, out: &mut Vec<String>) {
        for (index, element) in elements.iter().enumerate() {
            let path = parent.child(index);
            let indent = "  ".repeat(path.segments().len());
            let label = style(path.to_string()).dim();
            match element {
                Value::Array(members) => {
                    out.push(format!("{}{} {}", indent, label, style("group").cyan()));
                    render(members, &path, out);
                }
                Value::Object(stage) => {
                    let handlers: Vec<String> = stage
                        .iter()
                        .map(|(key, name)| format!("{}={}", key, name.as_str().unwrap_or("?")))
                        .collect();
                    let summary = if handlers.is_empty() {
                        style("identity".to_string()).dim().to_string()
                    } else {
                        handlers.join(" ")
                    };
                    out.push(format!("{}{} {}", indent, label, summary));
                }
                other => out.push(format!("{}{} {}", indent, label, style(other).red())),
            }
        }
    }

    let mut lines = Vec::new();
    render(&config.stages, &IndexPath::root(), &mut lines);
    lines.join("\n")
}

/// Count stages and groups at every depth, as `(stages, groups)`
pub fn count_elements(elements: &[Value]) -> (usize, usize) {
    elements.iter().fold((0, 0), |(stages, groups), element| match element {
        Value::Array(members) => {
            let (s, g) = count_elements(members);
            (stages + s, groups + g + 1)
        }
        _ => (stages + 1, groups),
    })
}
