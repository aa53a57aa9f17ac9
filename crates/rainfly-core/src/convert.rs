// ── Wire → domain conversion ──
//
// Builds canonical domain types from the cloud's node-details payload.
// All param values are validated against their declared data types
// here; a mismatch fails the node's conversion instead of propagating
// a silently broken value into the model.

use serde_json::Value;

use rainfly_api::models::{DeviceConfig, NodeDetail, NodeGroupDetail, ParamConfig, ServiceConfig};

use crate::error::CoreError;
use crate::model::{
    Bounds, Device, Node, NodeGroup, NodeMeta, NodeService, Param, ParamValue, UiKind,
};

const SIMPLE_DATA_TYPES: [&str; 4] = ["bool", "int", "float", "string"];

/// Convert a fleet of node details.
pub fn nodes_from_details(details: &[NodeDetail]) -> Result<Vec<Node>, CoreError> {
    details.iter().map(node_from_detail).collect()
}

/// Convert one node detail into the domain [`Node`].
pub fn node_from_detail(detail: &NodeDetail) -> Result<Node, CoreError> {
    let mut node = Node::new(&detail.id);
    node.config_version = detail.config.config_version.clone();
    node.info = detail.config.info.as_ref().map(|info| NodeMeta {
        name: info.name.clone(),
        fw_version: info.fw_version.clone(),
        node_type: info.node_type.clone(),
    });
    node.primary_users = detail.primary.clone();
    node.secondary_users = detail.secondary.clone();

    for device_config in &detail.config.devices {
        let values = detail.params.get(&device_config.name);
        node.devices
            .push(device_from_config(&detail.id, device_config, values)?);
    }

    for service_config in &detail.config.services {
        apply_service_capability(&mut node, service_config);
        node.services.push(NodeService {
            name: service_config.name.clone(),
            service_type: service_config.service_type.clone(),
            params: service_config
                .params
                .iter()
                .map(|p| param_from_config(p, None))
                .collect::<Result<_, _>>()?,
        });
    }

    // Occupied slots: the automation arrays currently stored on the node.
    node.current_schedules = fragment_count(&detail.params, &node.schedule_key, &node.schedules_key);
    node.current_scenes = fragment_count(&detail.params, &node.scene_key, &node.scenes_key);

    if let Some(connectivity) = detail.status.as_ref().and_then(|s| s.connectivity.as_ref()) {
        node.connected = connectivity.connected;
        node.connectivity_timestamp = connectivity.timestamp;
    }

    Ok(node)
}

/// Convert the user's node groups.
pub fn groups_from_details(details: &[NodeGroupDetail]) -> Vec<NodeGroup> {
    details
        .iter()
        .map(|g| NodeGroup {
            group_id: g.group_id.clone(),
            group_name: g.group_name.clone(),
            nodes: g.nodes.clone(),
        })
        .collect()
}

/// Pull a node's schedule or scene fragments out of its params blob.
///
/// One fragment per automation; each is fed to the matching engine's
/// `load_fragment`.
pub fn service_fragments<'a>(
    params: &'a Value,
    service_key: &str,
    params_key: &str,
) -> Vec<&'a Value> {
    params
        .get(service_key)
        .and_then(|service| service.get(params_key))
        .and_then(Value::as_array)
        .map(|fragments| fragments.iter().collect())
        .unwrap_or_default()
}

fn fragment_count(params: &Value, service_key: &str, params_key: &str) -> u32 {
    service_fragments(params, service_key, params_key).len() as u32
}

fn device_from_config(
    node_id: &str,
    config: &DeviceConfig,
    values: Option<&Value>,
) -> Result<Device, CoreError> {
    let mut device = Device::action_stub(node_id, &config.name);
    device.device_type = config.device_type.clone();
    device.primary = config.primary.clone();

    for param_config in &config.params {
        let raw = values.and_then(|v| v.get(&param_config.name));
        device.params.push(param_from_config(param_config, raw)?);
    }

    device.display_name = device.user_visible_name().to_owned();
    Ok(device)
}

fn param_from_config(config: &ParamConfig, raw: Option<&Value>) -> Result<Param, CoreError> {
    let value = match (&config.data_type, raw) {
        (Some(data_type), Some(raw)) if !raw.is_null() => {
            Some(ParamValue::from_wire(&config.name, data_type, raw)?)
        }
        (None, Some(raw)) => ParamValue::from_json(raw),
        _ => None,
    };

    let mut param = Param {
        name: config.name.clone(),
        value,
        data_type: config.data_type.clone(),
        param_type: config.param_type.clone(),
        ui_kind: UiKind::from_wire(config.ui_type.as_deref()),
        properties: config.properties.clone(),
        bounds: config.bounds.map(|b| Bounds {
            min: b.min,
            max: b.max,
            step: b.step,
        }),
        valid_strs: config.valid_strs.clone(),
        service_eligible: false,
        selected: false,
    };

    // A param may be captured into schedules/scenes when it is
    // writable, carries a simple data type, and is not the device's
    // name slot.
    param.service_eligible = param.is_writable()
        && !param.is_name_param()
        && param
            .data_type
            .as_deref()
            .is_some_and(|dt| SIMPLE_DATA_TYPES.contains(&dt.to_ascii_lowercase().as_str()));

    Ok(param)
}

fn apply_service_capability(node: &mut Node, service: &ServiceConfig) {
    let Some(service_type) = service.service_type.as_deref() else {
        return;
    };

    if service_type.ends_with(".schedule") {
        node.scheduling_supported = true;
        node.schedule_key = service.name.clone();
        if let Some(param) = service
            .params
            .iter()
            .find(|p| p.param_type.as_deref().is_some_and(|t| t.ends_with(".schedules")))
        {
            node.schedules_key = param.name.clone();
            node.max_schedules = param
                .bounds
                .and_then(|b| b.max)
                .map_or(-1, |max| max as i32);
        }
    } else if service_type.ends_with(".scenes") || service_type.ends_with(".scene") {
        node.scenes_supported = true;
        node.scene_key = service.name.clone();
        if let Some(param) = service
            .params
            .iter()
            .find(|p| p.param_type.as_deref().is_some_and(|t| t.ends_with(".scenes")))
        {
            node.scenes_key = param.name.clone();
            node.max_scenes = param.bounds.and_then(|b| b.max).map_or(-1, |max| max as i32);
        }
    }
}
