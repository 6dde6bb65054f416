//! List command implementation

use std::collections::HashMap;

use colored::Colorize;
use ext_content::ContentDescriptor;

use super::print_json;
use crate::context::RegistryContext;
use crate::error::Result;

/// Run the list command
pub fn run_list(context: &RegistryContext, json: bool) -> Result<()> {
    if json {
        return print_json(&context.application);
    }

    println!(
        "{} {}",
        "Application".bold(),
        context.application.id.to_string().cyan()
    );
    if context.application.is_empty() {
        println!("  {}", "No extensions installed".dimmed());
        return Ok(());
    }

    let mut depth: HashMap<_, usize> = HashMap::new();
    for (parent, entry) in context.application.entries() {
        let level = parent
            .and_then(|p| depth.get(&p).copied())
            .map_or(0, |d| d + 1);
        depth.insert(entry.id, level);

        let source = match &entry.content {
            ContentDescriptor::Builtin => "builtin".to_string(),
            ContentDescriptor::Folder { path } => format!("folder {}", path.display()),
            ContentDescriptor::Artifact {
                group,
                name,
                version,
            } => format!("artifact {group}:{name}:{version}"),
        };
        println!(
            "  {}{} [{}] {}",
            "  ".repeat(level),
            entry.id.to_string().green(),
            entry.kind,
            source.dimmed()
        );
    }
    Ok(())
}
