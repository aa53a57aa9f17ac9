//! Command dispatch and shared handler plumbing.

pub mod claim;
pub mod local;
pub mod nodes;
pub mod scenes;
pub mod schedules;
pub mod sharing;

use rainfly_api::{ApiClient, NodeDetail};
use rainfly_core::convert::nodes_from_details;
use rainfly_core::{BatchReport, LocalStore, Node, Outcome, ParamValue};

use crate::cli::Command;
use crate::error::CliError;
use crate::output;

/// Everything a handler needs.
pub struct Context {
    pub api: ApiClient,
    pub store: LocalStore,
    pub json: bool,
}

pub async fn dispatch(command: Command, ctx: &Context) -> Result<(), CliError> {
    match command {
        Command::Nodes(args) => nodes::handle(ctx, args).await,
        Command::Schedules(args) => schedules::handle(ctx, args).await,
        Command::Scenes(args) => scenes::handle(ctx, args).await,
        Command::Claim(args) => claim::handle(ctx, args).await,
        Command::Local(args) => local::handle(ctx, args).await,
        Command::Sharing(args) => sharing::handle(ctx, args).await,
        // Completions are handled in main before a context exists.
        Command::Completions(_) => Ok(()),
    }
}

/// Node details plus their converted domain form; the raw details keep
/// the params blobs the schedule/scene fragments live in.
pub(crate) struct Fleet {
    pub details: Vec<NodeDetail>,
    pub nodes: Vec<Node>,
}

/// Fetch the fleet and snapshot the node list locally.
pub(crate) async fn fetch_fleet(ctx: &Context) -> Result<Fleet, CliError> {
    let details = ctx.api.get_nodes().await?;
    let nodes = nodes_from_details(&details)?;
    ctx.store.save_nodes(&nodes)?;
    Ok(Fleet { details, nodes })
}

/// Parse a `node/device/param=value` selection argument. The value is
/// JSON, so `true`, `42`, `1.5`, and `"cozy"` all work.
pub(crate) fn parse_selection(arg: &str) -> Result<(String, String, String, ParamValue), CliError> {
    let invalid = |reason: &str| CliError::Validation {
        field: "--set".into(),
        reason: format!("{reason} (expected node/device/param=value, got '{arg}')"),
    };

    let (path, raw_value) = arg.split_once('=').ok_or_else(|| invalid("missing '='"))?;
    let mut parts = path.splitn(3, '/');
    let (Some(node), Some(device), Some(param)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid("missing path segment"));
    };
    if node.is_empty() || device.is_empty() || param.is_empty() {
        return Err(invalid("empty path segment"));
    }

    let json: serde_json::Value = serde_json::from_str(raw_value)
        .or_else(|_| serde_json::from_value(serde_json::Value::String(raw_value.to_owned())))
        .map_err(|_| invalid("unparseable value"))?;
    let value = ParamValue::from_json(&json).ok_or_else(|| invalid("unsupported value type"))?;

    Ok((node.to_owned(), device.to_owned(), param.to_owned(), value))
}

/// Fold a batch report into CLI output and an exit decision.
pub(crate) fn finish_report(report: &BatchReport, success_msg: &str) -> Result<(), CliError> {
    match report.outcome {
        Outcome::Success {
            some_nodes_failed: false,
        } => {
            output::success(success_msg);
            Ok(())
        }
        Outcome::Success {
            some_nodes_failed: true,
        } => {
            if let Some(message) = &report.message {
                output::partial(message);
            }
            output::success(success_msg);
            Ok(())
        }
        Outcome::Failure => Err(CliError::OperationFailed {
            message: report
                .message
                .clone()
                .unwrap_or_else(|| "operation failed on every node".into()),
        }),
    }
}
