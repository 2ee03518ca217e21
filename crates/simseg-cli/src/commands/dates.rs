use serde_json::json;
use simseg_core::{list_dates, SearchConfig};

use crate::cli::DatesArgs;
use crate::error::CliError;

use super::CommandOutcome;

pub fn run(args: &DatesArgs, config: &SearchConfig) -> Result<CommandOutcome, CliError> {
    let root = args.output.as_ref().unwrap_or(&config.output_root);
    let dates = list_dates(root)?;
    Ok(CommandOutcome::ok(json!({
        "output_root": root,
        "dates": dates,
    })))
}
