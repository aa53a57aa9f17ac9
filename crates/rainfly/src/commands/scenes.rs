//! Scene command handlers.

use serde::Serialize;
use tabled::Tabled;

use rainfly_core::convert::service_fragments;
use rainfly_core::{DeviceServices, Operation, Scene, SceneManager};

use crate::cli::{SaveSceneArgs, ScenesArgs, ScenesCommand};
use crate::commands::{Context, Fleet, fetch_fleet, finish_report, parse_selection};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled, Serialize)]
struct SceneRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Info")]
    info: String,
    #[tabled(rename = "Nodes")]
    nodes: usize,
}

fn row(key: &str, scene: &Scene) -> SceneRow {
    SceneRow {
        key: key.to_owned(),
        name: scene.name.clone(),
        info: scene.info.clone(),
        nodes: scene.actions.len(),
    }
}

// ── Shared loading ──────────────────────────────────────────────────

fn load_manager(fleet: &Fleet) -> SceneManager {
    let mut manager = SceneManager::new();
    manager.rebuild_available_devices(&fleet.nodes);
    for (detail, node) in fleet.details.iter().zip(&fleet.nodes) {
        for fragment in service_fragments(&detail.params, &node.scene_key, &node.scenes_key) {
            manager.load_fragment(&node.id, fragment);
        }
    }
    manager
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: ScenesArgs) -> Result<(), CliError> {
    match args.command {
        ScenesCommand::List { cached } => {
            let scenes = if cached {
                ctx.store.fetch_scenes()?
            } else {
                let fleet = fetch_fleet(ctx).await?;
                let manager = load_manager(&fleet);
                ctx.store.save_scenes(&manager.scenes)?;
                manager.scenes
            };
            let rows: Vec<SceneRow> = scenes.iter().map(|(key, s)| row(key, s)).collect();
            output::print_rows(rows, ctx.json);
            Ok(())
        }

        ScenesCommand::Save(save) => handle_save(ctx, save).await,

        ScenesCommand::Activate { key } => {
            let fleet = fetch_fleet(ctx).await?;
            let mut manager = load_manager(&fleet);
            manager.set_online(ctx.api.probe().await);
            let report = manager.activate(&ctx.api, &fleet.nodes, &key).await?;
            finish_report(&report, "Scene activated")
        }

        ScenesCommand::Delete { key, nodes } => {
            let fleet = fetch_fleet(ctx).await?;
            let mut manager = load_manager(&fleet);
            manager.set_online(ctx.api.probe().await);
            let report = if nodes.is_empty() {
                manager.delete(&ctx.api, &fleet.nodes, &key).await?
            } else {
                manager
                    .delete_nodes(&ctx.api, &fleet.nodes, &key, &nodes)
                    .await?
            };
            ctx.store.save_scenes(&manager.scenes)?;
            finish_report(&report, "Scene deleted")
        }
    }
}

async fn handle_save(ctx: &Context, args: SaveSceneArgs) -> Result<(), CliError> {
    let fleet = fetch_fleet(ctx).await?;
    let mut manager = load_manager(&fleet);
    manager.set_online(ctx.api.probe().await);

    for selection in &args.selections {
        let (node_id, device_name, param_name, value) = parse_selection(selection)?;
        let device = manager
            .device_mut(&node_id, &device_name)
            .ok_or_else(|| CliError::NotFound {
                resource_type: "device".into(),
                identifier: format!("{node_id}/{device_name}"),
                list_command: "nodes list".into(),
            })?;
        if !device.select_param_with_value(&param_name, value) {
            return Err(CliError::NotFound {
                resource_type: "param".into(),
                identifier: format!("{node_id}/{device_name}/{param_name}"),
                list_command: "nodes show".into(),
            });
        }
    }

    let scene = manager.start_new();
    scene.name.clone_from(&args.name);
    scene.info.clone_from(&args.info);
    if let Some(id) = args.id {
        scene.id = id;
        scene.operation = Some(Operation::Edit);
    }

    let report = manager.save_current(&ctx.api, &fleet.nodes).await?;
    ctx.store.save_scenes(&manager.scenes)?;
    finish_report(&report, "Scene saved")
}
