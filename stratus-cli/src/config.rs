//! Configuration file
//!
//! A JSON document with a `provider` block and a list of resources:
//!
//! ```json
//! {
//!   "provider": { "region": "us-east-1" },
//!   "resources": [
//!     { "type": "waf.size_constraint_set", "name": "limits",
//!       "attributes": { "name": "limits", "size_constraints": [] } },
//!     { "type": "memorydb.acl", "name": "open", "data_source": true,
//!       "attributes": { "name": "open-access" } }
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use stratus_core::resource::{Resource, Value};
use stratus_core::schema::ResourceSchema;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub provider: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceConfig {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub data_source: bool,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&content).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| format!("Parse error: {}", e))
    }

    /// Provider attributes; `null` entries are dropped
    pub fn provider_attributes(&self) -> HashMap<String, Value> {
        to_values(&self.provider)
    }

    /// Resources in declaration order, with lists coerced to the sets their
    /// schema declares
    pub fn resources(
        &self,
        schemas: &HashMap<String, ResourceSchema>,
    ) -> Result<Vec<Resource>, String> {
        let mut seen = HashSet::new();
        let mut resources = Vec::with_capacity(self.resources.len());

        for config in &self.resources {
            let mut resource = Resource::new(&config.resource_type, &config.name)
                .with_read_only(config.data_source);
            if !seen.insert(resource.id.clone()) {
                return Err(format!("Duplicate resource: {}", resource.id));
            }

            let attributes = to_values(&config.attributes);
            resource.attributes = match schemas.get(&config.resource_type) {
                Some(schema) => schema.coerce(attributes),
                None => attributes,
            };
            resources.push(resource);
        }

        Ok(resources)
    }
}

fn to_values(map: &HashMap<String, serde_json::Value>) -> HashMap<String, Value> {
    map.iter()
        .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
        .collect()
}

/// Check every resource against its schema, collecting all errors
pub fn validate_resources(
    resources: &[Resource],
    schemas: &HashMap<String, ResourceSchema>,
    data_sources: &HashSet<String>,
) -> Result<(), String> {
    let mut all_errors = Vec::new();

    for resource in resources {
        let resource_type = &resource.id.resource_type;
        let Some(schema) = schemas.get(resource_type) else {
            all_errors.push(format!("Unknown resource type: {}", resource_type));
            continue;
        };

        let is_data_source = data_sources.contains(resource_type);
        if resource.is_data_source() != is_data_source {
            all_errors.push(if is_data_source {
                format!("{} is a data source; set \"data_source\": true", resource.id)
            } else {
                format!("{} is not a data source", resource.id)
            });
            continue;
        }

        if let Err(errors) = schema.validate(&resource.attributes) {
            for error in errors {
                all_errors.push(format!("{}: {}", resource.id, error));
            }
        }
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_provider_aws::memorydb::data_sources::DATA_SOURCES;
    use stratus_provider_aws::resources::all_schemas;

    const CONFIG: &str = r#"{
        "provider": { "region": "us-east-1", "profile": null },
        "resources": [
            {
                "type": "waf.size_constraint_set",
                "name": "limits",
                "attributes": {
                    "name": "limits",
                    "size_constraints": [{
                        "field_to_match": [{ "type": "BODY" }],
                        "comparison_operator": "GT",
                        "size": 8192,
                        "text_transformation": "NONE"
                    }]
                }
            },
            {
                "type": "memorydb.acl",
                "name": "open",
                "data_source": true,
                "attributes": { "name": "open-access" }
            }
        ]
    }"#;

    fn data_sources() -> HashSet<String> {
        DATA_SOURCES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_config() {
        let config = ConfigFile::parse(CONFIG).unwrap();
        let provider = config.provider_attributes();
        assert_eq!(provider.get("region"), Some(&Value::String("us-east-1".into())));
        assert!(!provider.contains_key("profile"));

        let resources = config.resources(&all_schemas()).unwrap();
        assert_eq!(resources.len(), 2);
        assert!(!resources[0].is_data_source());
        assert!(resources[1].is_data_source());
        assert!(matches!(
            resources[0].attributes.get("size_constraints"),
            Some(Value::Set(items)) if items.len() == 1
        ));

        validate_resources(&resources, &all_schemas(), &data_sources()).unwrap();
    }

    #[test]
    fn duplicate_resources_are_rejected() {
        let config = ConfigFile::parse(
            r#"{"resources": [
                {"type": "memorydb.acl", "name": "a", "data_source": true},
                {"type": "memorydb.acl", "name": "a", "data_source": true}
            ]}"#,
        )
        .unwrap();
        let err = config.resources(&all_schemas()).unwrap_err();
        assert_eq!(err, "Duplicate resource: memorydb.acl.a");
    }

    #[test]
    fn validation_collects_errors() {
        let config = ConfigFile::parse(
            r#"{"resources": [
                {"type": "waf.rule", "name": "r"},
                {"type": "memorydb.user", "name": "u"},
                {"type": "waf.size_constraint_set", "name": "s",
                 "attributes": {"arn": "arn:aws:waf::1:x"}}
            ]}"#,
        )
        .unwrap();
        let resources = config.resources(&all_schemas()).unwrap();
        let err = validate_resources(&resources, &all_schemas(), &data_sources()).unwrap_err();
        let lines: Vec<&str> = err.lines().collect();

        assert_eq!(lines[0], "Unknown resource type: waf.rule");
        assert!(lines[1].contains("is a data source"));
        assert!(lines.iter().any(|l| l.contains("'name' is missing")));
        assert!(lines.iter().any(|l| l.contains("'arn' is computed")));
    }

    #[test]
    fn constraint_typos_are_rejected() {
        let config = ConfigFile::parse(
            r#"{"resources": [
                {"type": "waf.size_constraint_set", "name": "fractional",
                 "attributes": {"name": "a", "size_constraints": [{
                     "field_to_match": [{ "type": "BODY" }],
                     "comparison_operator": "GT",
                     "size": 8191.9,
                     "text_transformation": "NONE"
                 }]}},
                {"type": "waf.size_constraint_set", "name": "misspelt",
                 "attributes": {"name": "b", "size_constraints": [{
                     "field_to_match": [{ "type": "HEADER", "date": "referer" }],
                     "comparison_operator": "GT",
                     "size": 10,
                     "text_transformation": "NONE"
                 }]}}
            ]}"#,
        )
        .unwrap();
        let resources = config.resources(&all_schemas()).unwrap();
        let err = validate_resources(&resources, &all_schemas(), &data_sources()).unwrap_err();
        let lines: Vec<&str> = err.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("waf.size_constraint_set.fractional: "));
        assert!(lines[0].contains("Type mismatch: expected Int, got String"));
        assert!(lines[1].starts_with("waf.size_constraint_set.misspelt: "));
        assert!(lines[1].contains("Unknown attribute 'date'"));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let config = ConfigFile::parse("{}").unwrap();
        assert!(config.provider_attributes().is_empty());
        assert!(config.resources(&all_schemas()).unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = ConfigFile::parse("{").unwrap_err();
        assert!(err.starts_with("Parse error:"));
    }
}
