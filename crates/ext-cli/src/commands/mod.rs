//! Command implementations for ext-cli

pub mod list;
pub mod plan;
pub mod sync;
pub mod validate;

pub use list::run_list;
pub use plan::run_plan;
pub use sync::run_sync;
pub use validate::run_validate;

use serde::Serialize;

use crate::error::Result;

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
