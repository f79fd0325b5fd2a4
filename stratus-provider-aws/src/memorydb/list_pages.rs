//! `Describe*` pagination helpers

use super::{Acl, Cluster, DescribeInput, MemoryDbApi, Page, ParameterGroup, Snapshot, SubnetGroup, User};
use crate::pagination::list_pages;

list_pages!(dyn MemoryDbApi, DescribeInput, {
    describe_acls_pages => describe_acls: Page<Acl>,
    describe_clusters_pages => describe_clusters: Page<Cluster>,
    describe_parameter_groups_pages => describe_parameter_groups: Page<ParameterGroup>,
    describe_snapshots_pages => describe_snapshots: Page<Snapshot>,
    describe_subnet_groups_pages => describe_subnet_groups: Page<SubnetGroup>,
    describe_users_pages => describe_users: Page<User>,
});
