//! Local state file
//!
//! Remembers the remote identifier of every managed resource (default:
//! `stratus.state.json`). Attributes are kept for display only; plans
//! always refresh from the provider.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stratus_core::resource::{ResourceId, State, Value};

pub const DEFAULT_STATE_FILE: &str = "stratus.state.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    /// Bumped on every write
    pub serial: u64,
    pub resources: Vec<ResourceState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub resource_type: String,
    pub name: String,
    pub identifier: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ResourceState {
    pub fn id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    /// Record a state returned by the provider; `None` when it carries no
    /// identifier
    pub fn from_state(state: &State) -> Option<Self> {
        let identifier = state.identifier.clone()?;
        Some(Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            identifier,
            attributes: match Value::Map(state.attributes.clone()).to_json() {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            },
        })
    }
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            resources: Vec::new(),
        }
    }

    /// Read the state at `path`; a missing file is an empty state
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read state file {}: {}", path.display(), e))?;
        let state: StateFile = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse state file {}: {}", path.display(), e))?;

        if state.version > Self::CURRENT_VERSION {
            return Err(format!(
                "State file {} has version {}, this build supports up to {}",
                path.display(),
                state.version,
                Self::CURRENT_VERSION
            ));
        }
        Ok(state)
    }

    pub fn save(&mut self, path: &Path) -> Result<(), String> {
        self.serial += 1;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize state: {}", e))?;
        fs::write(path, content)
            .map_err(|e| format!("Failed to write state file {}: {}", path.display(), e))
    }

    pub fn find(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources
            .iter()
            .find(|r| r.resource_type == id.resource_type && r.name == id.name)
    }

    pub fn identifier(&self, id: &ResourceId) -> Option<&str> {
        self.find(id).map(|r| r.identifier.as_str())
    }

    /// Add or replace the entry for the resource's id
    pub fn upsert(&mut self, resource: ResourceState) {
        match self
            .resources
            .iter_mut()
            .find(|r| r.resource_type == resource.resource_type && r.name == resource.name)
        {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub fn remove(&mut self, id: &ResourceId) -> Option<ResourceState> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.resource_type == id.resource_type && r.name == id.name)?;
        Some(self.resources.remove(pos))
    }

    /// Ids and identifiers of all recorded resources
    pub fn identifiers(&self) -> HashMap<ResourceId, String> {
        self.resources
            .iter()
            .map(|r| (r.id(), r.identifier.clone()))
            .collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(name: &str, identifier: &str) -> ResourceState {
        ResourceState {
            resource_type: "waf.size_constraint_set".to_string(),
            name: name.to_string(),
            identifier: identifier.to_string(),
            attributes: serde_json::Map::new(),
        }
    }

    #[test]
    fn missing_file_is_empty_state() {
        let dir = tempdir().unwrap();
        let state = StateFile::load(&dir.path().join("none.json")).unwrap();
        assert_eq!(state.serial, 0);
        assert!(state.resources.is_empty());
    }

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.state.json");

        let mut state = StateFile::new();
        state.upsert(entry("limits", "scs-1"));
        state.save(&path).unwrap();
        state.save(&path).unwrap();

        let loaded = StateFile::load(&path).unwrap();
        assert_eq!(loaded.serial, 2);
        assert_eq!(loaded.resources, vec![entry("limits", "scs-1")]);
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut state = StateFile::new();
        state.upsert(entry("a", "scs-1"));
        state.upsert(entry("b", "scs-2"));
        state.upsert(entry("a", "scs-3"));

        let id = ResourceId::new("waf.size_constraint_set", "a");
        assert_eq!(state.resources.len(), 2);
        assert_eq!(state.identifier(&id), Some("scs-3"));

        assert!(state.remove(&id).is_some());
        assert!(state.remove(&id).is_none());
        assert_eq!(state.identifiers().len(), 1);
    }

    #[test]
    fn from_provider_state() {
        let id = ResourceId::new("waf.size_constraint_set", "limits");
        let mut attributes = HashMap::new();
        attributes.insert("name".to_string(), Value::String("limits".to_string()));

        assert!(ResourceState::from_state(&State::existing(id.clone(), attributes.clone())).is_none());

        let recorded =
            ResourceState::from_state(&State::existing(id.clone(), attributes).with_identifier("scs-1"))
                .unwrap();
        assert_eq!(recorded.id(), id);
        assert_eq!(recorded.identifier, "scs-1");
        assert_eq!(recorded.attributes.get("name"), Some(&serde_json::json!("limits")));
    }

    #[test]
    fn newer_versions_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.json");
        fs::write(&path, r#"{"version": 9, "serial": 1, "resources": []}"#).unwrap();

        let err = StateFile::load(&path).unwrap_err();
        assert!(err.contains("has version 9"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();

        assert!(StateFile::load(&path).unwrap_err().starts_with("Failed to parse"));
    }
}
