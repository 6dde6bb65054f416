//! Plan command implementation

use colored::Colorize;
use ext_model::{ExtensionGraph, ExtensionId, ExtensionKind};
use ext_runtime::{LayerBuilder, Visibility};
use serde::Serialize;

use super::print_json;
use crate::context::RegistryContext;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct PlannedExtension {
    id: ExtensionId,
    kind: ExtensionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<ExtensionId>,
    depth: usize,
    classes: Vec<VisibleClass>,
}

#[derive(Debug, Serialize)]
struct VisibleClass {
    class: String,
    visibility: &'static str,
    owner: ExtensionId,
}

/// Run the plan command
pub fn run_plan(context: &RegistryContext, json: bool) -> Result<()> {
    let graph = ExtensionGraph::build(context.descriptors()?)?;
    let layers = LayerBuilder::new().build(&graph)?;

    let planned: Vec<PlannedExtension> = graph
        .plan()
        .map(|node| {
            let classes = layers
                .get(node.id())
                .map(|layer| {
                    layer
                        .visible()
                        .map(|(class, visibility)| VisibleClass {
                            class: class.to_string(),
                            visibility: match visibility {
                                Visibility::Local => "local",
                                Visibility::Exported => "exported",
                                Visibility::Inherited { .. } => "inherited",
                            },
                            owner: layer.owner_of(class.as_str()).unwrap_or(node.id()),
                        })
                        .collect()
                })
                .unwrap_or_default();
            PlannedExtension {
                id: node.id(),
                kind: node.extension().kind(),
                parent: node.extension().parent(),
                depth: node.depth(),
                classes,
            }
        })
        .collect();

    if json {
        return print_json(&planned);
    }

    println!("{}", "Load Plan".bold());
    println!();
    for (step, extension) in planned.iter().enumerate() {
        let indent = "  ".repeat(extension.depth);
        println!(
            "{:>3}. {}{} [{}]",
            step + 1,
            indent,
            extension.id.to_string().cyan(),
            extension.kind
        );
        for class in &extension.classes {
            let origin = if class.owner == extension.id {
                String::new()
            } else {
                format!(" from {}", class.owner)
            };
            println!(
                "     {}  {} {}{}",
                indent,
                class.class.green(),
                class.visibility.dimmed(),
                origin.dimmed()
            );
        }
    }
    Ok(())
}
