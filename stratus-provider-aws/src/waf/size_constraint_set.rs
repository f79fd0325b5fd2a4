//! `waf.size_constraint_set` resource

use std::collections::HashMap;

use stratus_core::arn::Arn;
use stratus_core::provider::{ProviderError, ProviderResult};
use stratus_core::resource::{Resource, ResourceId, State, Value};
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::{
    ChangeAction, ComparisonOperator, ERR_NONEXISTENT_CONTAINER, ERR_NONEXISTENT_ITEM,
    FieldToMatch, MatchFieldType, SizeConstraint, SizeConstraintSet, SizeConstraintSetUpdate,
    TextTransformation, WafApi, WafConn,
};
use crate::error::{ApiError, ApiResult};

pub const RESOURCE_TYPE: &str = "waf.size_constraint_set";

pub fn schema() -> ResourceSchema {
    let field_to_match = AttributeType::Block(vec![
        AttributeSchema::new("data", AttributeType::String)
            .with_description("Header or query argument name"),
        AttributeSchema::new("type", types::enumeration(MatchFieldType::VALUES)).required(),
    ]);

    let size_constraint = AttributeType::Block(vec![
        AttributeSchema::new(
            "comparison_operator",
            types::enumeration(ComparisonOperator::VALUES),
        )
        .required(),
        AttributeSchema::new(
            "field_to_match",
            AttributeType::List(Box::new(field_to_match)),
        )
        .required()
        .with_max_items(1),
        AttributeSchema::new("size", types::non_negative_int()).required(),
        AttributeSchema::new(
            "text_transformation",
            types::enumeration(TextTransformation::VALUES),
        )
        .required(),
    ]);

    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("WAF Classic size constraint set")
        .attribute(AttributeSchema::new("arn", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("size_constraints", AttributeType::Set(Box::new(size_constraint)))
                .with_description("Request parts to inspect and the sizes to compare against"),
        )
}

/// Fetch a set by id.
///
/// A nonexistent-item answer becomes [`ApiError::NotFound`], a response
/// without a set [`ApiError::EmptyResult`].
pub async fn find_size_constraint_set_by_id(
    api: &dyn WafApi,
    id: &str,
) -> ApiResult<SizeConstraintSet> {
    match api.get_size_constraint_set(id).await {
        Ok(Some(set)) => Ok(set),
        Ok(None) => Err(ApiError::empty_result(format!(
            "GetSizeConstraintSet ({})",
            id
        ))),
        Err(err) if err.is_code(&[ERR_NONEXISTENT_ITEM]) => Err(ApiError::not_found(format!(
            "WAF Size Constraint Set ({})",
            id
        ))),
        Err(err) => Err(err),
    }
}

/// Updates turning `old` into `new`: DELETEs first, then INSERTs.
///
/// Constraints present in both are left alone. Equal constraints are
/// matched one-for-one, so a duplicate only cancels a single counterpart.
pub fn diff_size_constraints(
    old: &[SizeConstraint],
    new: &[SizeConstraint],
) -> Vec<SizeConstraintSetUpdate> {
    let mut added: Vec<&SizeConstraint> = new.iter().collect();
    let mut updates = Vec::new();

    for constraint in old {
        if let Some(idx) = added.iter().position(|c| *c == constraint) {
            added.remove(idx);
            continue;
        }
        updates.push(SizeConstraintSetUpdate {
            action: ChangeAction::Delete,
            size_constraint: constraint.clone(),
        });
    }

    updates.extend(added.into_iter().map(|constraint| SizeConstraintSetUpdate {
        action: ChangeAction::Insert,
        size_constraint: constraint.clone(),
    }));
    updates
}

pub async fn create(conn: &WafConn, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let name = resource
        .get_string("name")
        .ok_or_else(|| ProviderError::new("name is required").for_resource(id.clone()))?;
    let constraints = expand_size_constraints(resource.attributes.get("size_constraints"))
        .map_err(|e| ProviderError::new(e).for_resource(id.clone()))?;

    let set = conn
        .retryer()
        .retry_with_token(|token| async move {
            conn.api.create_size_constraint_set(name, &token).await
        })
        .await
        .map_err(|e| {
            e.into_provider_error(format!("creating WAF Size Constraint Set ({})", name))
                .for_resource(id.clone())
        })?;

    if let Err(err) = update_size_constraints(conn, &set.id, &[], &constraints).await {
        // The set is not in state yet; leaving it behind would orphan it
        roll_back_create(conn, &set.id).await;
        return Err(err.for_resource(id.clone()));
    }

    read_set(conn, id, &set.id, true).await
}

async fn roll_back_create(conn: &WafConn, identifier: &str) {
    log::warn!(
        "Populating WAF Size Constraint Set ({}) failed, deleting it",
        identifier
    );
    let result = conn
        .retryer()
        .retry_with_token(|token| async move {
            conn.api.delete_size_constraint_set(identifier, &token).await
        })
        .await;

    match result {
        Err(err) if !err.is_code(&[ERR_NONEXISTENT_ITEM]) => log::error!(
            "WAF Size Constraint Set ({}) was created but could not be deleted: {}",
            identifier,
            err
        ),
        _ => {}
    }
}

/// Current state of the set; `State::not_found` once it is gone
pub async fn read(conn: &WafConn, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
    read_set(conn, id, identifier, false).await
}

pub async fn update(
    conn: &WafConn,
    id: &ResourceId,
    identifier: &str,
    from: &State,
    to: &Resource,
) -> ProviderResult<State> {
    let old_name = from.attributes.get("name").and_then(Value::as_str);
    if let (Some(old), Some(new)) = (old_name, to.get_string("name"))
        && old != new
    {
        return Err(ProviderError::new(format!(
            "name cannot be changed in place ({} to {}); the set must be replaced",
            old, new
        ))
        .for_resource(id.clone()));
    }

    let old = expand_size_constraints(from.attributes.get("size_constraints"));
    let new = expand_size_constraints(to.attributes.get("size_constraints"));
    let (old, new) = match (old, new) {
        (Ok(old), Ok(new)) => (old, new),
        (Err(e), _) | (_, Err(e)) => return Err(ProviderError::new(e).for_resource(id.clone())),
    };

    update_size_constraints(conn, identifier, &old, &new)
        .await
        .map_err(|e| e.for_resource(id.clone()))?;

    read_set(conn, id, identifier, true).await
}

pub async fn delete(conn: &WafConn, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
    let current = match find_size_constraint_set_by_id(conn.api.as_ref(), identifier).await {
        Ok(set) => set.size_constraints,
        Err(err) if err.is_not_found() => Vec::new(),
        Err(err) => {
            return Err(err
                .into_provider_error(format!("reading WAF Size Constraint Set ({})", identifier))
                .for_resource(id.clone()));
        }
    };

    if !current.is_empty() {
        let updates = diff_size_constraints(&current, &[]);
        let result = conn
            .retryer()
            .retry_with_token(|token| {
                let updates = &updates;
                async move {
                    conn.api
                        .update_size_constraint_set(identifier, &token, updates)
                        .await
                }
            })
            .await;
        match result {
            Err(err) if !err.is_code(&[ERR_NONEXISTENT_ITEM, ERR_NONEXISTENT_CONTAINER]) => {
                return Err(err
                    .into_provider_error(format!(
                        "updating WAF Size Constraint Set ({})",
                        identifier
                    ))
                    .for_resource(id.clone()));
            }
            _ => {}
        }
    }

    log::info!("Deleting WAF Size Constraint Set: {}", identifier);
    let result = conn
        .retryer()
        .retry_with_token(|token| async move {
            conn.api.delete_size_constraint_set(identifier, &token).await
        })
        .await;

    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_code(&[ERR_NONEXISTENT_ITEM]) => Ok(()),
        Err(err) => Err(err
            .into_provider_error(format!("deleting WAF Size Constraint Set ({})", identifier))
            .for_resource(id.clone())),
    }
}

async fn update_size_constraints(
    conn: &WafConn,
    identifier: &str,
    old: &[SizeConstraint],
    new: &[SizeConstraint],
) -> ProviderResult<()> {
    let updates = diff_size_constraints(old, new);
    if updates.is_empty() {
        return Ok(());
    }

    conn.retryer()
        .retry_with_token(|token| {
            let updates = &updates;
            async move {
                conn.api
                    .update_size_constraint_set(identifier, &token, updates)
                    .await
            }
        })
        .await
        .map_err(|e| {
            e.into_provider_error(format!("updating WAF Size Constraint Set ({})", identifier))
        })
}

/// Right after a create or update the set must exist
async fn read_set(
    conn: &WafConn,
    id: &ResourceId,
    identifier: &str,
    after_write: bool,
) -> ProviderResult<State> {
    let set = match find_size_constraint_set_by_id(conn.api.as_ref(), identifier).await {
        Ok(set) => set,
        Err(err) if !after_write && err.is_not_found() => {
            log::warn!(
                "WAF Size Constraint Set ({}) not found, removing from state",
                identifier
            );
            return Ok(State::not_found(id.clone()));
        }
        Err(err) => {
            return Err(err
                .into_provider_error(format!("reading WAF Size Constraint Set ({})", identifier))
                .for_resource(id.clone()));
        }
    };

    let arn = Arn::new(
        &conn.partition,
        "waf",
        "",
        &conn.account_id,
        format!("sizeconstraintset/{}", identifier),
    );

    let mut attributes = HashMap::new();
    attributes.insert("arn".to_string(), Value::String(arn.to_string()));
    if let Some(name) = set.name {
        attributes.insert("name".to_string(), Value::String(name));
    }
    attributes.insert(
        "size_constraints".to_string(),
        flatten_size_constraints(&set.size_constraints),
    );

    Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
}

/// Constraints from a `size_constraints` value; absent means none
pub fn expand_size_constraints(value: Option<&Value>) -> Result<Vec<SizeConstraint>, String> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let items = value
        .as_items()
        .ok_or_else(|| format!("size_constraints: expected a set, got {:?}", value))?;
    items.iter().map(expand_size_constraint).collect()
}

fn expand_size_constraint(value: &Value) -> Result<SizeConstraint, String> {
    let map = value
        .as_map()
        .ok_or_else(|| format!("size_constraints: expected a block, got {:?}", value))?;

    let field = map
        .get("field_to_match")
        .and_then(Value::as_items)
        .and_then(|items| items.first())
        .ok_or("size_constraints: field_to_match is required")?;

    Ok(SizeConstraint {
        field_to_match: expand_field_to_match(field)?,
        comparison_operator: required_str(map, "comparison_operator")?.parse()?,
        size: map
            .get("size")
            .and_then(Value::as_int)
            .ok_or("size_constraints: size is required")?,
        text_transformation: required_str(map, "text_transformation")?.parse()?,
    })
}

fn expand_field_to_match(value: &Value) -> Result<FieldToMatch, String> {
    let map = value
        .as_map()
        .ok_or_else(|| format!("field_to_match: expected a block, got {:?}", value))?;

    Ok(FieldToMatch {
        field_type: required_str(map, "type")?.parse()?,
        data: map.get("data").and_then(Value::as_str).map(str::to_string),
    })
}

fn required_str<'a>(map: &'a HashMap<String, Value>, key: &str) -> Result<&'a str, String> {
    map.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("size_constraints: {} is required", key))
}

pub fn flatten_size_constraints(constraints: &[SizeConstraint]) -> Value {
    Value::Set(constraints.iter().map(flatten_size_constraint).collect())
}

fn flatten_size_constraint(constraint: &SizeConstraint) -> Value {
    let mut field = HashMap::new();
    field.insert(
        "type".to_string(),
        Value::String(constraint.field_to_match.field_type.to_string()),
    );
    if let Some(data) = &constraint.field_to_match.data {
        field.insert("data".to_string(), Value::String(data.clone()));
    }

    let mut map = HashMap::new();
    map.insert(
        "comparison_operator".to_string(),
        Value::String(constraint.comparison_operator.to_string()),
    );
    map.insert(
        "field_to_match".to_string(),
        Value::List(vec![Value::Map(field)]),
    );
    map.insert("size".to_string(), Value::Int(constraint.size));
    map.insert(
        "text_transformation".to_string(),
        Value::String(constraint.text_transformation.to_string()),
    );
    Value::Map(map)
}
