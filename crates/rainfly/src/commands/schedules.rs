//! Schedule command handlers.

use serde::Serialize;
use tabled::Tabled;

use rainfly_core::convert::service_fragments;
use rainfly_core::{DeviceServices, Operation, Schedule, Scheduler, Trigger, Week};

use crate::cli::{SaveScheduleArgs, SchedulesArgs, SchedulesCommand};
use crate::commands::{Context, Fleet, fetch_fleet, finish_report, parse_selection};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled, Serialize)]
struct ScheduleRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Days")]
    days: String,
    #[tabled(rename = "Enabled")]
    enabled: bool,
    #[tabled(rename = "Nodes")]
    nodes: usize,
}

fn row(key: &str, schedule: &Schedule) -> ScheduleRow {
    ScheduleRow {
        key: key.to_owned(),
        name: schedule.name.clone(),
        time: schedule.trigger.time_description(),
        days: schedule.week.short_description(),
        enabled: schedule.enabled,
        nodes: schedule.actions.len(),
    }
}

// ── Shared loading ──────────────────────────────────────────────────

/// Build a scheduler with the availability projection and every
/// schedule fragment merged in.
fn load_scheduler(fleet: &Fleet) -> Scheduler {
    let mut scheduler = Scheduler::new();
    scheduler.rebuild_available_devices(&fleet.nodes);
    for (detail, node) in fleet.details.iter().zip(&fleet.nodes) {
        for fragment in service_fragments(&detail.params, &node.schedule_key, &node.schedules_key)
        {
            scheduler.load_fragment(&node.id, fragment);
        }
    }
    scheduler
}

fn trigger_from_args(time: &str, days: &[String]) -> Result<Trigger, CliError> {
    let (hours, minutes) = time.split_once(':').ok_or_else(|| CliError::Validation {
        field: "--time".into(),
        reason: format!("expected HH:MM, got '{time}'"),
    })?;
    let hours: u16 = hours.parse().map_err(|_| CliError::Validation {
        field: "--time".into(),
        reason: format!("invalid hour in '{time}'"),
    })?;
    let minutes: u16 = minutes.parse().map_err(|_| CliError::Validation {
        field: "--time".into(),
        reason: format!("invalid minute in '{time}'"),
    })?;
    if hours > 23 || minutes > 59 {
        return Err(CliError::Validation {
            field: "--time".into(),
            reason: format!("'{time}' is out of range"),
        });
    }

    let mut week = Week::default();
    for day in days {
        let index = Week::day_index(day).ok_or_else(|| CliError::Validation {
            field: "--days".into(),
            reason: format!("unknown day '{day}'"),
        })?;
        week.set(index, true);
    }

    Ok(Trigger {
        days: week.0,
        minutes: hours * 60 + minutes,
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: SchedulesArgs) -> Result<(), CliError> {
    match args.command {
        SchedulesCommand::List { cached } => {
            let schedules = if cached {
                ctx.store.fetch_schedules()?
            } else {
                let fleet = fetch_fleet(ctx).await?;
                let scheduler = load_scheduler(&fleet);
                ctx.store.save_schedules(&scheduler.schedules)?;
                scheduler.schedules
            };
            let rows: Vec<ScheduleRow> =
                schedules.iter().map(|(key, s)| row(key, s)).collect();
            output::print_rows(rows, ctx.json);
            Ok(())
        }

        SchedulesCommand::Save(save) => handle_save(ctx, save).await,

        SchedulesCommand::Enable { key } => set_enabled(ctx, &key, true).await,
        SchedulesCommand::Disable { key } => set_enabled(ctx, &key, false).await,

        SchedulesCommand::Delete { key, nodes } => {
            let fleet = fetch_fleet(ctx).await?;
            let mut scheduler = load_scheduler(&fleet);
            scheduler.set_online(ctx.api.probe().await);
            let report = if nodes.is_empty() {
                scheduler.delete(&ctx.api, &fleet.nodes, &key).await?
            } else {
                scheduler
                    .delete_nodes(&ctx.api, &fleet.nodes, &key, &nodes)
                    .await?
            };
            ctx.store.save_schedules(&scheduler.schedules)?;
            finish_report(&report, "Schedule deleted")
        }
    }
}

async fn handle_save(ctx: &Context, args: SaveScheduleArgs) -> Result<(), CliError> {
    let fleet = fetch_fleet(ctx).await?;
    let mut scheduler = load_scheduler(&fleet);
    scheduler.set_online(ctx.api.probe().await);

    let trigger = trigger_from_args(&args.time, &args.days)?;

    for selection in &args.selections {
        let (node_id, device_name, param_name, value) = parse_selection(selection)?;
        let device = scheduler
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

    let schedule = scheduler.start_new();
    schedule.name.clone_from(&args.name);
    schedule.week = Week(trigger.days);
    schedule.trigger = trigger;
    if let Some(id) = args.id {
        schedule.id = id;
        schedule.operation = Some(Operation::Edit);
    }

    let report = scheduler.save_current(&ctx.api, &fleet.nodes).await?;
    ctx.store.save_schedules(&scheduler.schedules)?;
    finish_report(&report, "Schedule saved")
}

async fn set_enabled(ctx: &Context, key: &str, enabled: bool) -> Result<(), CliError> {
    let fleet = fetch_fleet(ctx).await?;
    let mut scheduler = load_scheduler(&fleet);
    scheduler.set_online(ctx.api.probe().await);
    let report = scheduler
        .set_enabled(&ctx.api, &fleet.nodes, key, enabled)
        .await?;
    ctx.store.save_schedules(&scheduler.schedules)?;
    finish_report(
        &report,
        if enabled {
            "Schedule enabled"
        } else {
            "Schedule disabled"
        },
    )
}
