//! Exports for use in tests only.

pub use crate::resources::{
    MemoryDbAclType as ResourceMemoryDbAcl, MemoryDbClusterType as ResourceMemoryDbCluster,
    MemoryDbParameterGroupType as ResourceMemoryDbParameterGroup,
    MemoryDbSnapshotType as ResourceMemoryDbSnapshot,
    MemoryDbSubnetGroupType as ResourceMemoryDbSubnetGroup,
    MemoryDbUserType as ResourceMemoryDbUser, SizeConstraintSetType as ResourceSizeConstraintSet,
};

pub use crate::memorydb::find::{
    find_acl_by_name, find_acls, find_cluster_by_name, find_clusters,
    find_parameter_group_by_name, find_parameter_groups, find_snapshot_by_name, find_snapshots,
    find_subnet_group_by_name, find_subnet_groups, find_user_by_name, find_users,
};
pub use crate::waf::size_constraint_set::{
    diff_size_constraints, expand_size_constraints, find_size_constraint_set_by_id,
    flatten_size_constraints,
};
