//! Refreshing remote state and applying plans

use std::collections::HashMap;

use colored::Colorize;
use log::{debug, warn};
use stratus_core::effect::Effect;
use stratus_core::plan::Plan;
use stratus_core::provider::{Provider, ProviderError};
use stratus_core::resource::{ResourceId, State};

use crate::state::{ResourceState, StateFile};

/// Read the remote state of everything recorded in the state file
///
/// Entries whose remote object has disappeared come back as not found;
/// resources missing from the state file are left out.
pub async fn refresh(
    provider: &dyn Provider,
    state: &StateFile,
) -> Result<HashMap<ResourceId, State>, String> {
    let mut current_states = HashMap::new();

    for (id, identifier) in state.identifiers() {
        debug!("Refreshing {} ({})", id, identifier);
        let current = provider
            .read(&id, Some(&identifier))
            .await
            .map_err(|e| format!("Failed to read state: {}", e))?;
        if !current.exists {
            warn!("{} ({}) no longer exists", id, identifier);
        }
        current_states.insert(id, current);
    }

    Ok(current_states)
}

/// Drop state entries whose remote object is gone
pub fn forget_missing(state: &mut StateFile, current_states: &HashMap<ResourceId, State>) {
    for (id, current) in current_states {
        if !current.exists {
            state.remove(id);
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ApplyResult {
    pub success: usize,
    pub failure: usize,
}

/// Run every effect of `plan`, recording identifiers in `state`
///
/// Failures are reported and counted; later effects still run.
pub async fn apply_plan(provider: &dyn Provider, plan: &Plan, state: &mut StateFile) -> ApplyResult {
    let mut result = ApplyResult::default();

    for effect in plan.effects() {
        match apply_effect(provider, effect, state).await {
            Ok(()) => {
                println!("  {} {}", "✓".green(), format_effect(effect));
                if effect.is_mutating() {
                    result.success += 1;
                }
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), format_effect(effect), e);
                result.failure += 1;
            }
        }
    }

    result
}

async fn apply_effect(
    provider: &dyn Provider,
    effect: &Effect,
    state: &mut StateFile,
) -> Result<(), ProviderError> {
    match effect {
        Effect::Read(resource) => {
            provider.read_data_source(resource).await?;
        }
        Effect::Create(resource) => {
            let created = provider.create(resource).await?;
            record(state, &created)?;
        }
        Effect::Update { id, from, to, .. } => {
            let identifier = identifier_of(id, from)?;
            let updated = provider.update(id, identifier, from, to).await?;
            record(state, &updated)?;
        }
        Effect::Replace { id, from, to, .. } => {
            let identifier = identifier_of(id, from)?;
            provider.delete(id, identifier).await?;
            state.remove(id);
            let created = provider.create(to).await?;
            record(state, &created)?;
        }
        Effect::Delete { id, identifier } => {
            provider.delete(id, identifier).await?;
            state.remove(id);
        }
    }
    Ok(())
}

fn identifier_of<'a>(id: &ResourceId, from: &'a State) -> Result<&'a str, ProviderError> {
    from.identifier
        .as_deref()
        .ok_or_else(|| ProviderError::new("no identifier in current state").for_resource(id.clone()))
}

fn record(state: &mut StateFile, current: &State) -> Result<(), ProviderError> {
    let entry = ResourceState::from_state(current).ok_or_else(|| {
        ProviderError::new("provider returned no identifier").for_resource(current.id.clone())
    })?;
    state.upsert(entry);
    Ok(())
}

pub fn format_effect(effect: &Effect) -> String {
    match effect {
        Effect::Read(r) => format!("Read {}", r.id),
        Effect::Create(r) => format!("Create {}", r.id),
        Effect::Update { id, .. } => format!("Update {}", id),
        Effect::Replace { id, .. } => format!("Replace {}", id),
        Effect::Delete { id, .. } => format!("Delete {}", id),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use stratus_core::differ::{create_plan, destroy_plan};
    use stratus_core::provider::{BoxFuture, ProviderResult, ResourceType};
    use stratus_core::resource::{Resource, Value};
    use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

    use super::*;

    const KIND: &str = "test.bucket";

    struct BucketType;

    impl ResourceType for BucketType {
        fn name(&self) -> &'static str {
            KIND
        }

        fn schema(&self) -> ResourceSchema {
            ResourceSchema::new(KIND)
                .attribute(AttributeSchema::new("name", AttributeType::String).force_new())
                .attribute(AttributeSchema::new("size", AttributeType::Int))
        }
    }

    /// Keeps objects in memory, keyed by identifier
    #[derive(Default)]
    struct MemoryProvider {
        objects: Mutex<HashMap<String, HashMap<String, Value>>>,
        next_id: Mutex<u32>,
    }

    impl MemoryProvider {
        fn insert(&self, identifier: &str, attributes: HashMap<String, Value>) {
            self.objects
                .lock()
                .unwrap()
                .insert(identifier.to_string(), attributes);
        }

        fn count(&self) -> usize {
            self.objects.lock().unwrap().len()
        }

        fn state(&self, id: &ResourceId, identifier: &str) -> State {
            match self.objects.lock().unwrap().get(identifier) {
                Some(attributes) => {
                    State::existing(id.clone(), attributes.clone()).with_identifier(identifier)
                }
                None => State::not_found(id.clone()),
            }
        }
    }

    impl Provider for MemoryProvider {
        fn name(&self) -> &'static str {
            "memory"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![Box::new(BucketType)]
        }

        fn read(
            &self,
            id: &ResourceId,
            identifier: Option<&str>,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let state = match identifier {
                Some(identifier) => self.state(id, identifier),
                None => State::not_found(id.clone()),
            };
            Box::pin(async move { Ok(state) })
        }

        fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            Box::pin(async move { Err(ProviderError::new("no data sources").for_resource(id)) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let identifier = {
                let mut next_id = self.next_id.lock().unwrap();
                *next_id += 1;
                format!("b-{}", next_id)
            };
            self.insert(&identifier, resource.attributes.clone());
            let state = self.state(&resource.id, &identifier);
            Box::pin(async move { Ok(state) })
        }

        fn update(
            &self,
            id: &ResourceId,
            identifier: &str,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            self.insert(identifier, to.attributes.clone());
            let state = self.state(id, identifier);
            Box::pin(async move { Ok(state) })
        }

        fn delete(&self, _id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
            self.objects.lock().unwrap().remove(identifier);
            Box::pin(async move { Ok(()) })
        }
    }

    fn bucket(name: &str, size: i64) -> Resource {
        Resource::new(KIND, name)
            .with_attribute("name", Value::String(name.to_string()))
            .with_attribute("size", Value::Int(size))
    }

    fn schemas() -> HashMap<String, ResourceSchema> {
        let mut schemas = HashMap::new();
        schemas.insert(KIND.to_string(), BucketType.schema());
        schemas
    }

    async fn converge(provider: &MemoryProvider, desired: &[Resource], state: &mut StateFile) -> Plan {
        let current = refresh(provider, state).await.unwrap();
        forget_missing(state, &current);
        let plan = create_plan(desired, &current, &schemas());
        let result = apply_plan(provider, &plan, state).await;
        assert_eq!(result.failure, 0);
        plan
    }

    #[tokio::test]
    async fn create_update_and_delete() {
        let provider = MemoryProvider::default();
        let mut state = StateFile::new();

        let plan = converge(&provider, &[bucket("logs", 1)], &mut state).await;
        assert!(matches!(plan.effects(), [Effect::Create(_)]));
        let id = ResourceId::new(KIND, "logs");
        assert_eq!(state.identifier(&id), Some("b-1"));

        let plan = converge(&provider, &[bucket("logs", 1)], &mut state).await;
        assert!(plan.is_empty());

        let plan = converge(&provider, &[bucket("logs", 2)], &mut state).await;
        assert!(matches!(plan.effects(), [Effect::Update { .. }]));
        assert_eq!(state.identifier(&id), Some("b-1"));

        let plan = converge(&provider, &[], &mut state).await;
        assert!(matches!(plan.effects(), [Effect::Delete { .. }]));
        assert!(state.resources.is_empty());
        assert_eq!(provider.count(), 0);
    }

    #[tokio::test]
    async fn replace_gets_a_new_identifier() {
        let provider = MemoryProvider::default();
        let mut state = StateFile::new();
        converge(&provider, &[bucket("logs", 1)], &mut state).await;

        let mut renamed = bucket("logs", 1);
        renamed
            .attributes
            .insert("name".to_string(), Value::String("archive".to_string()));
        let plan = converge(&provider, &[renamed], &mut state).await;

        assert!(matches!(plan.effects(), [Effect::Replace { .. }]));
        assert_eq!(state.identifier(&ResourceId::new(KIND, "logs")), Some("b-2"));
        assert_eq!(provider.count(), 1);
    }

    #[tokio::test]
    async fn vanished_objects_are_recreated() {
        let provider = MemoryProvider::default();
        let mut state = StateFile::new();
        converge(&provider, &[bucket("logs", 1)], &mut state).await;
        provider.objects.lock().unwrap().clear();

        let plan = converge(&provider, &[bucket("logs", 1)], &mut state).await;

        assert!(matches!(plan.effects(), [Effect::Create(_)]));
        assert_eq!(state.resources.len(), 1);
    }

    #[tokio::test]
    async fn destroy_removes_everything() {
        let provider = MemoryProvider::default();
        let mut state = StateFile::new();
        let desired = [bucket("a", 1), bucket("b", 2)];
        converge(&provider, &desired, &mut state).await;

        let current = refresh(&provider, &state).await.unwrap();
        let plan = destroy_plan(&desired, &current);
        let result = apply_plan(&provider, &plan, &mut state).await;

        assert_eq!(result, ApplyResult { success: 2, failure: 0 });
        assert!(state.resources.is_empty());
        assert_eq!(provider.count(), 0);
    }

    #[tokio::test]
    async fn failures_are_counted() {
        let provider = MemoryProvider::default();
        let mut state = StateFile::new();
        let mut plan = Plan::new();
        plan.add(Effect::Read(Resource::new(KIND, "ds").with_read_only(true)));
        plan.add(Effect::Create(bucket("a", 1)));

        let result = apply_plan(&provider, &plan, &mut state).await;

        assert_eq!(result, ApplyResult { success: 1, failure: 1 });
    }

    #[test]
    fn effect_labels() {
        let id = ResourceId::new(KIND, "a");
        let delete = Effect::Delete {
            id,
            identifier: "b-1".to_string(),
        };
        assert_eq!(format_effect(&delete), "Delete test.bucket.a");
        assert_eq!(
            format_effect(&Effect::Create(bucket("a", 1))),
            "Create test.bucket.a"
        );
    }
}
