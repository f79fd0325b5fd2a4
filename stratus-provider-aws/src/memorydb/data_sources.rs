//! MemoryDB data sources, looked up by `name`

use std::collections::HashMap;

use serde::Serialize;
use stratus_core::provider::{ProviderError, ProviderResult};
use stratus_core::resource::{Resource, State, Value};
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::MemoryDbApi;
use super::find::{
    find_acl_by_name, find_cluster_by_name, find_parameter_group_by_name, find_snapshot_by_name,
    find_subnet_group_by_name, find_user_by_name,
};
use crate::error::{ApiError, ApiResult};

pub const ACL: &str = "memorydb.acl";
pub const CLUSTER: &str = "memorydb.cluster";
pub const PARAMETER_GROUP: &str = "memorydb.parameter_group";
pub const SNAPSHOT: &str = "memorydb.snapshot";
pub const SUBNET_GROUP: &str = "memorydb.subnet_group";
pub const USER: &str = "memorydb.user";

pub const DATA_SOURCES: &[&str] = &[ACL, CLUSTER, PARAMETER_GROUP, SNAPSHOT, SUBNET_GROUP, USER];

fn strings() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}

/// Schema of a MemoryDB data source: `name` in, everything else computed
pub fn schema(resource_type: &str) -> Option<ResourceSchema> {
    let computed: Vec<(&str, AttributeType)> = match resource_type {
        ACL => vec![
            ("arn", AttributeType::String),
            ("status", AttributeType::String),
            ("user_names", strings()),
            ("clusters", strings()),
            ("minimum_engine_version", AttributeType::String),
        ],
        CLUSTER => vec![
            ("arn", AttributeType::String),
            ("status", AttributeType::String),
            ("node_type", AttributeType::String),
            ("engine_version", AttributeType::String),
            ("number_of_shards", AttributeType::Int),
            ("acl_name", AttributeType::String),
            ("parameter_group_name", AttributeType::String),
            ("subnet_group_name", AttributeType::String),
        ],
        PARAMETER_GROUP => vec![
            ("arn", AttributeType::String),
            ("family", AttributeType::String),
            ("description", AttributeType::String),
        ],
        SNAPSHOT => vec![
            ("arn", AttributeType::String),
            ("status", AttributeType::String),
            ("source", AttributeType::String),
            ("kms_key_id", AttributeType::String),
            ("cluster_name", AttributeType::String),
        ],
        SUBNET_GROUP => vec![
            ("arn", AttributeType::String),
            ("description", AttributeType::String),
            ("vpc_id", AttributeType::String),
            ("subnet_ids", strings()),
        ],
        USER => vec![
            ("arn", AttributeType::String),
            ("status", AttributeType::String),
            ("access_string", AttributeType::String),
            ("acl_names", strings()),
            ("minimum_engine_version", AttributeType::String),
        ],
        _ => return None,
    };

    let schema = ResourceSchema::new(resource_type)
        .attribute(AttributeSchema::new("name", AttributeType::String).required());
    Some(
        computed
            .into_iter()
            .fold(schema, |schema, (name, attr_type)| {
                schema.attribute(AttributeSchema::new(name, attr_type).computed())
            }),
    )
}

/// Look up the object named by the data source's `name` attribute
pub async fn read(conn: &dyn MemoryDbApi, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let name = resource
        .get_string("name")
        .ok_or_else(|| ProviderError::new("name is required").for_resource(id.clone()))?;

    let attributes = match id.resource_type.as_str() {
        ACL => to_attributes(find_acl_by_name(conn, name).await),
        CLUSTER => to_attributes(find_cluster_by_name(conn, name).await),
        PARAMETER_GROUP => to_attributes(find_parameter_group_by_name(conn, name).await),
        SNAPSHOT => to_attributes(find_snapshot_by_name(conn, name).await),
        SUBNET_GROUP => to_attributes(find_subnet_group_by_name(conn, name).await),
        USER => to_attributes(find_user_by_name(conn, name).await),
        other => {
            return Err(
                ProviderError::new(format!("Unknown data source: {}", other))
                    .for_resource(id.clone()),
            );
        }
    }
    .map_err(|e| {
        e.into_provider_error(format!("reading {} ({})", id.resource_type, name))
            .for_resource(id.clone())
    })?;

    let identifier = attributes
        .get("arn")
        .and_then(Value::as_str)
        .unwrap_or(name)
        .to_string();
    Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
}

/// Flatten a summary into attributes; unset fields are left out
fn to_attributes<T: Serialize>(found: ApiResult<T>) -> ApiResult<HashMap<String, Value>> {
    let found = found?;
    let json = serde_json::to_value(&found).map_err(|e| ApiError::Build(e.to_string()))?;
    match Value::from_json(&json) {
        Some(Value::Map(map)) => Ok(map),
        _ => Ok(HashMap::new()),
    }
}
