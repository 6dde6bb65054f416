//! Sync command implementation
//!
//! Checks every installed extension's content and re-synchronises what is
//! stale. Updates run on the blocking pool of a local tokio runtime; outcomes
//! are collected back here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use ext_content::{
    ContentDescriptor, ContentProvider, ProviderFactory, StandardProviders, SyncTicket,
    spawn_update,
};
use ext_model::ExtensionId;
use serde::Serialize;

use super::print_json;
use crate::context::RegistryContext;
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
enum Outcome {
    Builtin,
    UpToDate,
    Updated,
    Unchanged,
    Invalid,
    Failed,
}

impl Outcome {
    fn label(self) -> colored::ColoredString {
        match self {
            Self::Builtin => "builtin".dimmed(),
            Self::UpToDate => "up to date".green(),
            Self::Updated => "updated".green().bold(),
            Self::Unchanged => "unchanged".green(),
            Self::Invalid => "invalid".red().bold(),
            Self::Failed => "failed".red().bold(),
        }
    }

    fn is_error(self) -> bool {
        matches!(self, Self::Invalid | Self::Failed)
    }
}

#[derive(Debug, Serialize)]
struct SyncResult {
    id: ExtensionId,
    target: PathBuf,
    outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

enum Pending {
    Done(SyncResult),
    Running(ExtensionId, SyncTicket),
}

/// Provider for content that needs an update, or the outcome that makes
/// one unnecessary.
fn check(
    providers: &StandardProviders,
    content: &ContentDescriptor,
    destination: &Path,
    force: bool,
) -> std::result::Result<Arc<dyn ContentProvider>, (Outcome, Option<String>)> {
    if matches!(content, ContentDescriptor::Builtin) {
        return Err((Outcome::Builtin, None));
    }
    let provider = providers
        .create(content)
        .map_err(|e| (Outcome::Failed, Some(e.to_string())))?;
    if !provider.is_valid() {
        let detail = content
            .source_path()
            .map(|p| format!("source {} is missing", p.display()));
        return Err((Outcome::Invalid, detail));
    }
    if !force && provider.is_up_to_date(destination) {
        return Err((Outcome::UpToDate, None));
    }
    Ok(provider)
}

/// Run the sync command
pub fn run_sync(
    context: &RegistryContext,
    target: Option<&Path>,
    force: bool,
    json: bool,
) -> Result<()> {
    let target = target
        .map(Path::to_path_buf)
        .or_else(|| context.config.content_dir.clone())
        .ok_or_else(|| {
            CliError::user("no target directory: pass --target or set content_dir in the config")
        })?;
    let force = force || context.config.dev_mode;
    let providers = StandardProviders::new();
    let runtime = tokio::runtime::Builder::new_current_thread().build()?;

    let pending: Vec<Pending> = context
        .application
        .entries()
        .into_iter()
        .map(|(_, entry)| {
            let destination = target.join(entry.id.to_string());
            let content = context.resolve_content(&entry.content);
            let checked = check(&providers, &content, &destination, force);
            match checked {
                Ok(provider) => {
                    tracing::debug!(
                        extension = %entry.id,
                        target_dir = %destination.display(),
                        "syncing content"
                    );
                    let ticket = spawn_update(runtime.handle(), provider, destination);
                    Pending::Running(entry.id, ticket)
                }
                Err((outcome, detail)) => Pending::Done(SyncResult {
                    id: entry.id,
                    target: destination,
                    outcome,
                    detail,
                }),
            }
        })
        .collect();

    let results: Vec<SyncResult> = pending
        .into_iter()
        .map(|pending| match pending {
            Pending::Done(result) => result,
            Pending::Running(id, ticket) => {
                let target = ticket.target().to_path_buf();
                match ticket.wait() {
                    Ok(changed) => SyncResult {
                        id,
                        target,
                        outcome: if changed {
                            Outcome::Updated
                        } else {
                            Outcome::Unchanged
                        },
                        detail: None,
                    },
                    Err(e) => SyncResult {
                        id,
                        target,
                        outcome: Outcome::Failed,
                        detail: Some(format!(
                            "{e}{}",
                            if e.is_retryable() { " (retryable)" } else { "" }
                        )),
                    },
                }
            }
        })
        .collect();

    let failures = results.iter().filter(|r| r.outcome.is_error()).count();
    if json {
        print_json(&results)?;
    } else {
        println!("{} {}", "Syncing into".bold(), target.display());
        for result in &results {
            print!("  {} {}", result.id.to_string().cyan(), result.outcome.label());
            match &result.detail {
                Some(detail) => println!(": {detail}"),
                None => println!(),
            }
        }
    }

    if failures == 0 {
        Ok(())
    } else {
        Err(CliError::user(format!(
            "{failures} extension(s) could not be synchronised"
        )))
    }
}
