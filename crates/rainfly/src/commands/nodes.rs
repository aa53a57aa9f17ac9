//! Node command handlers.

use serde::Serialize;
use tabled::Tabled;

use rainfly_core::Node;
use rainfly_core::convert::groups_from_details;

use crate::cli::{NodesArgs, NodesCommand};
use crate::commands::{Context, fetch_fleet};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled, Serialize)]
struct NodeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Devices")]
    devices: usize,
    #[tabled(rename = "Schedules")]
    schedules: String,
    #[tabled(rename = "Scenes")]
    scenes: String,
}

impl From<&Node> for NodeRow {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            name: node
                .info
                .as_ref()
                .and_then(|i| i.name.clone())
                .unwrap_or_default(),
            status: node.status_line(),
            devices: node.devices.len(),
            schedules: capability_summary(
                node.scheduling_supported,
                node.current_schedules,
                node.max_schedules,
            ),
            scenes: capability_summary(node.scenes_supported, node.current_scenes, node.max_scenes),
        }
    }
}

#[derive(Tabled, Serialize)]
struct GroupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Nodes")]
    nodes: usize,
}

fn capability_summary(supported: bool, current: u32, max: i32) -> String {
    if !supported {
        return "-".into();
    }
    if max < 0 {
        format!("{current}")
    } else {
        format!("{current}/{max}")
    }
}

fn detail(node: &Node) -> String {
    let mut lines = vec![
        format!("ID:        {}", node.id),
        format!(
            "Name:      {}",
            node.info
                .as_ref()
                .and_then(|i| i.name.as_deref())
                .unwrap_or("-")
        ),
        format!(
            "Firmware:  {}",
            node.info
                .as_ref()
                .and_then(|i| i.fw_version.as_deref())
                .unwrap_or("-")
        ),
        format!("Status:    {}", node.status_line()),
        format!(
            "Sharing:   primary {} / secondary {}",
            node.primary_users.len(),
            node.secondary_users.len()
        ),
    ];
    for device in &node.devices {
        lines.push(format!("Device:    {}", device.user_visible_name()));
        for param in &device.params {
            let value = param
                .value
                .as_ref()
                .map_or_else(|| "-".into(), ToString::to_string);
            lines.push(format!("  {:<18} {}", param.name, value));
        }
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: NodesArgs) -> Result<(), CliError> {
    match args.command {
        NodesCommand::List => {
            let fleet = fetch_fleet(ctx).await?;
            let rows: Vec<NodeRow> = fleet.nodes.iter().map(NodeRow::from).collect();
            output::print_rows(rows, ctx.json);
            Ok(())
        }

        NodesCommand::Show { node_id } => {
            let fleet = fetch_fleet(ctx).await?;
            let node = rainfly_core::find_node(&fleet.nodes, &node_id).ok_or_else(|| {
                CliError::NotFound {
                    resource_type: "node".into(),
                    identifier: node_id.clone(),
                    list_command: "nodes list".into(),
                }
            })?;
            if ctx.json {
                output::print_value(&serde_json::to_value(node)?);
            } else {
                println!("{}", detail(node));
            }
            Ok(())
        }

        NodesCommand::Groups => {
            let groups = groups_from_details(&ctx.api.get_node_groups().await?);
            ctx.store.save_node_groups(&groups)?;
            let rows: Vec<GroupRow> = groups
                .iter()
                .map(|g| GroupRow {
                    id: g.group_id.clone(),
                    name: g.group_name.clone(),
                    nodes: g.nodes.len(),
                })
                .collect();
            output::print_rows(rows, ctx.json);
            Ok(())
        }
    }
}
