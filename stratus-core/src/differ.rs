//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the desired state declared in configuration with the current
//! state fetched from the Provider, and generates the list of Effects
//! (Plan) needed to reconcile them.

use std::collections::{HashMap, HashSet};

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::{AttributeType, ResourceSchema};

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A force-new attribute differs -> delete and recreate
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State) -> Diff {
    diff_with_schema(desired, current, None)
}

/// Compare desired and current state, consulting the schema for computed,
/// collection and force-new attributes
pub fn diff_with_schema(
    desired: &Resource,
    current: &State,
    schema: Option<&ResourceSchema>,
) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes, schema);

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let forces_new = schema.is_some_and(|s| {
        s.force_new_attributes()
            .iter()
            .any(|name| changed.iter().any(|c| c == name))
    });

    if forces_new {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state, sorted by name
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    schema: Option<&ResourceSchema>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') || schema.is_some_and(|s| s.is_computed(key)) {
            continue;
        }

        match current.get(key) {
            Some(current_value) if current_value == desired_value => {}
            None if is_empty_collection(desired_value) => {}
            _ => changed.push(key.clone()),
        }
    }

    // An omitted collection attribute means "empty", not "unmanaged"
    if let Some(schema) = schema {
        for (key, attr) in &schema.attributes {
            if attr.computed || desired.contains_key(key) {
                continue;
            }
            let is_collection = matches!(
                attr.attr_type,
                AttributeType::List(_) | AttributeType::Set(_)
            );
            if is_collection && current.get(key).is_some_and(|v| !is_empty_collection(v)) {
                changed.push(key.clone());
            }
        }
    }

    changed.sort();
    changed
}

fn is_empty_collection(value: &Value) -> bool {
    value.as_items().is_some_and(|items| items.is_empty())
}

/// Compute Diff for multiple resources and generate a Plan
///
/// Data sources become `Effect::Read`. Existing states with no matching
/// desired resource are deleted.
pub fn create_plan(
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
    schemas: &HashMap<String, ResourceSchema>,
) -> Plan {
    let mut plan = Plan::new();

    for resource in desired {
        if resource.is_data_source() {
            plan.add(Effect::Read(resource.clone()));
            continue;
        }

        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        let schema = schemas.get(&resource.id.resource_type);
        match diff_with_schema(resource, &current, schema) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update {
                id,
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Update {
                id,
                from,
                to,
                changed_attributes,
            }),
            Diff::Replace {
                id,
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Replace {
                id,
                from,
                to,
                changed_attributes,
            }),
            Diff::NoChange(_) => {}
        }
    }

    let wanted: HashSet<&ResourceId> = desired.iter().map(|r| &r.id).collect();
    let mut orphans: Vec<&State> = current_states
        .values()
        .filter(|s| s.exists && !wanted.contains(&s.id))
        .collect();
    orphans.sort_by(|a, b| a.id.cmp(&b.id));
    for state in orphans {
        if let Some(identifier) = &state.identifier {
            plan.add(Effect::Delete {
                id: state.id.clone(),
                identifier: identifier.clone(),
            });
        }
    }

    plan
}

/// Generate a Plan deleting every existing resource, in reverse declaration order
pub fn destroy_plan(resources: &[Resource], current_states: &HashMap<ResourceId, State>) -> Plan {
    let mut plan = Plan::new();

    for resource in resources.iter().rev() {
        if resource.is_data_source() {
            continue;
        }
        if let Some(state) = current_states.get(&resource.id)
            && state.exists
            && let Some(identifier) = &state.identifier
        {
            plan.add(Effect::Delete {
                id: resource.id.clone(),
                identifier: identifier.clone(),
            });
        }
    }

    plan
}
