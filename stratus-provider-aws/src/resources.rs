//! Resource and data source types handled by the AWS provider

use std::collections::HashMap;

use stratus_core::provider::ResourceType;
use stratus_core::schema::ResourceSchema;

use crate::memorydb::data_sources;
use crate::waf::size_constraint_set;

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $schema:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema
            }
        }
    };
}

macro_rules! define_data_source_type {
    ($name:ident, $type_name:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                data_sources::schema($type_name).unwrap_or_else(|| ResourceSchema::new($type_name))
            }
            fn is_data_source(&self) -> bool {
                true
            }
        }
    };
}

define_resource_type!(
    SizeConstraintSetType,
    size_constraint_set::RESOURCE_TYPE,
    size_constraint_set::schema()
);

define_data_source_type!(MemoryDbAclType, data_sources::ACL);
define_data_source_type!(MemoryDbClusterType, data_sources::CLUSTER);
define_data_source_type!(MemoryDbParameterGroupType, data_sources::PARAMETER_GROUP);
define_data_source_type!(MemoryDbSnapshotType, data_sources::SNAPSHOT);
define_data_source_type!(MemoryDbSubnetGroupType, data_sources::SUBNET_GROUP);
define_data_source_type!(MemoryDbUserType, data_sources::USER);

/// Returns all resource and data source types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(SizeConstraintSetType),
        Box::new(MemoryDbAclType),
        Box::new(MemoryDbClusterType),
        Box::new(MemoryDbParameterGroupType),
        Box::new(MemoryDbSnapshotType),
        Box::new(MemoryDbSubnetGroupType),
        Box::new(MemoryDbUserType),
    ]
}

/// Schemas keyed by resource type name
pub fn all_schemas() -> HashMap<String, ResourceSchema> {
    resource_types()
        .into_iter()
        .map(|t| (t.name().to_string(), t.schema()))
        .collect()
}
