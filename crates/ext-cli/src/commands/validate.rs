//! Validate command implementation

use colored::Colorize;
use ext_model::{ExtensionGraph, ExtensionId, validate};
use ext_registry::reconcile;
use ext_runtime::LayerBuilder;
use serde::Serialize;

use super::print_json;
use crate::context::RegistryContext;
use crate::error::{CliError, Result};

#[derive(Debug, Serialize)]
struct Problem {
    #[serde(skip_serializing_if = "Option::is_none")]
    extension: Option<ExtensionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
    message: String,
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    valid: bool,
    extensions: usize,
    problems: Vec<Problem>,
}

/// Run the validate command
///
/// Every problem is collected before reporting; the command fails when any
/// was found.
pub fn run_validate(context: &RegistryContext, json: bool) -> Result<()> {
    let problems = collect_problems(context);
    let output = ValidateOutput {
        valid: problems.is_empty(),
        extensions: context.application.len(),
        problems,
    };

    if json {
        print_json(&output)?;
    } else if output.valid {
        println!(
            "{} {} extension(s) valid",
            "OK".green().bold(),
            output.extensions
        );
    } else {
        println!(
            "{} {} problem(s) found",
            "FAIL".red().bold(),
            output.problems.len()
        );
        for problem in &output.problems {
            let extension = problem
                .extension
                .map_or_else(|| "<registry>".to_string(), |id| id.to_string());
            match problem.field {
                Some(field) => println!(
                    "  {} {}: {}",
                    extension.cyan(),
                    field.yellow(),
                    problem.message
                ),
                None => println!("  {} {}", extension.cyan(), problem.message),
            }
        }
    }

    if output.valid {
        Ok(())
    } else {
        Err(CliError::user(format!(
            "validation failed with {} problem(s)",
            output.problems.len()
        )))
    }
}

fn collect_problems(context: &RegistryContext) -> Vec<Problem> {
    let mut problems = Vec::new();
    let mut descriptors = Vec::new();

    for declaration in context.declarations() {
        let extension = Some(declaration.entry.id);
        match declaration.descriptor {
            Ok(descriptor) => {
                problems.extend(validate(&descriptor).into_iter().map(|v| Problem {
                    extension,
                    field: Some(v.field()),
                    message: v.to_string(),
                }));
                descriptors.push(descriptor);
            }
            Err(e) => problems.push(Problem {
                extension,
                field: None,
                message: e.to_string(),
            }),
        }
    }

    problems.extend(
        reconcile(&context.application, &descriptors)
            .into_iter()
            .map(|mismatch| Problem {
                extension: None,
                field: None,
                message: mismatch.to_string(),
            }),
    );

    // Graph and visibility checks only make sense over clean declarations.
    if problems.is_empty() {
        match ExtensionGraph::build(descriptors) {
            Ok(graph) => {
                if let Err(e) = LayerBuilder::new().build(&graph) {
                    problems.extend(e.collisions.into_iter().map(|c| Problem {
                        extension: Some(c.extension),
                        field: Some("localClasses"),
                        message: c.to_string(),
                    }));
                }
            }
            Err(e) => problems.push(Problem {
                extension: None,
                field: None,
                message: e.to_string(),
            }),
        }
    }

    problems
}
