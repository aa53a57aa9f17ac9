//! Node-sharing command handlers.

use serde::Serialize;
use tabled::Tabled;

use rainfly_api::ShareNodesBody;

use crate::cli::{SharingArgs, SharingCommand};
use crate::commands::Context;
use crate::error::CliError;
use crate::output;

#[derive(Tabled, Serialize)]
struct RequestRow {
    #[tabled(rename = "Request ID")]
    id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Nodes")]
    nodes: usize,
    #[tabled(rename = "User")]
    user: String,
}

pub async fn handle(ctx: &Context, args: SharingArgs) -> Result<(), CliError> {
    match args.command {
        SharingCommand::Add { nodes, user } => {
            if nodes.is_empty() {
                return Err(CliError::Validation {
                    field: "--nodes".into(),
                    reason: "at least one node id is required".into(),
                });
            }
            ctx.api
                .share_nodes(&ShareNodesBody {
                    nodes,
                    user_name: user.clone(),
                })
                .await?;
            output::success(&format!("Sharing request sent to {user}"));
            Ok(())
        }

        SharingCommand::Requests { primary } => {
            let requests = ctx.api.list_sharing_requests(primary).await?;
            let rows: Vec<RequestRow> = requests
                .iter()
                .map(|r| RequestRow {
                    id: r.request_id.clone(),
                    status: r.request_status.clone().unwrap_or_default(),
                    nodes: r.node_ids.len(),
                    user: r
                        .user_name
                        .clone()
                        .or_else(|| r.primary_user_name.clone())
                        .unwrap_or_default(),
                })
                .collect();
            output::print_rows(rows, ctx.json);
            Ok(())
        }

        SharingCommand::Respond {
            request_id,
            accept,
            decline,
        } => {
            if accept == decline {
                return Err(CliError::Validation {
                    field: "--accept/--decline".into(),
                    reason: "pass exactly one of --accept or --decline".into(),
                });
            }
            ctx.api
                .respond_sharing_request(&request_id, accept)
                .await?;
            output::success(if accept {
                "Sharing request accepted"
            } else {
                "Sharing request declined"
            });
            Ok(())
        }

        SharingCommand::Revoke { node, user } => {
            ctx.api.revoke_sharing(&node, &user).await?;
            output::success(&format!("Revoked access of {user} to {node}"));
            Ok(())
        }
    }
}
