//! MemoryDB API seam

use async_trait::async_trait;
use aws_sdk_memorydb::Client;
use aws_sdk_memorydb::types as sdk;

use super::{Acl, Cluster, DescribeInput, Page, ParameterGroup, Snapshot, SubnetGroup, User};
use crate::error::ApiResult;

pub const ERR_ACL_NOT_FOUND: &str = "ACLNotFoundFault";
pub const ERR_CLUSTER_NOT_FOUND: &str = "ClusterNotFoundFault";
pub const ERR_PARAMETER_GROUP_NOT_FOUND: &str = "ParameterGroupNotFoundFault";
pub const ERR_SNAPSHOT_NOT_FOUND: &str = "SnapshotNotFoundFault";
pub const ERR_SUBNET_GROUP_NOT_FOUND: &str = "SubnetGroupNotFoundFault";
pub const ERR_USER_NOT_FOUND: &str = "UserNotFoundFault";

#[async_trait]
pub trait MemoryDbApi: Send + Sync {
    async fn describe_acls(&self, input: &DescribeInput) -> ApiResult<Page<Acl>>;
    async fn describe_clusters(&self, input: &DescribeInput) -> ApiResult<Page<Cluster>>;
    async fn describe_parameter_groups(
        &self,
        input: &DescribeInput,
    ) -> ApiResult<Page<ParameterGroup>>;
    async fn describe_snapshots(&self, input: &DescribeInput) -> ApiResult<Page<Snapshot>>;
    async fn describe_subnet_groups(&self, input: &DescribeInput)
    -> ApiResult<Page<SubnetGroup>>;
    async fn describe_users(&self, input: &DescribeInput) -> ApiResult<Page<User>>;
}

/// [`MemoryDbApi`] backed by the AWS SDK
#[derive(Clone, Debug)]
pub struct AwsMemoryDbClient {
    client: Client,
}

impl AwsMemoryDbClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn page<T>(items: Vec<T>, next_token: Option<&str>) -> Page<T> {
    Page {
        items,
        next_token: next_token.map(str::to_string),
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

#[async_trait]
impl MemoryDbApi for AwsMemoryDbClient {
    async fn describe_acls(&self, input: &DescribeInput) -> ApiResult<Page<Acl>> {
        let output = self
            .client
            .describe_acls()
            .set_acl_name(input.name.clone())
            .set_max_results(input.max_results)
            .set_next_token(input.next_token.clone())
            .send()
            .await?;

        let items = output.acls().iter().map(acl_from_sdk).collect();
        Ok(page(items, output.next_token()))
    }

    async fn describe_clusters(&self, input: &DescribeInput) -> ApiResult<Page<Cluster>> {
        let output = self
            .client
            .describe_clusters()
            .set_cluster_name(input.name.clone())
            .set_max_results(input.max_results)
            .set_next_token(input.next_token.clone())
            .send()
            .await?;

        let items = output.clusters().iter().map(cluster_from_sdk).collect();
        Ok(page(items, output.next_token()))
    }

    async fn describe_parameter_groups(
        &self,
        input: &DescribeInput,
    ) -> ApiResult<Page<ParameterGroup>> {
        let output = self
            .client
            .describe_parameter_groups()
            .set_parameter_group_name(input.name.clone())
            .set_max_results(input.max_results)
            .set_next_token(input.next_token.clone())
            .send()
            .await?;

        let items = output
            .parameter_groups()
            .iter()
            .map(|group| ParameterGroup {
                name: group.name().unwrap_or_default().to_string(),
                arn: owned(group.arn()),
                family: owned(group.family()),
                description: owned(group.description()),
            })
            .collect();
        Ok(page(items, output.next_token()))
    }

    async fn describe_snapshots(&self, input: &DescribeInput) -> ApiResult<Page<Snapshot>> {
        let output = self
            .client
            .describe_snapshots()
            .set_snapshot_name(input.name.clone())
            .set_max_results(input.max_results)
            .set_next_token(input.next_token.clone())
            .send()
            .await?;

        let items = output
            .snapshots()
            .iter()
            .map(|snapshot| Snapshot {
                name: snapshot.name().unwrap_or_default().to_string(),
                arn: owned(snapshot.arn()),
                status: owned(snapshot.status()),
                source: owned(snapshot.source()),
                kms_key_id: owned(snapshot.kms_key_id()),
                cluster_name: owned(snapshot.cluster_configuration().and_then(|c| c.name())),
            })
            .collect();
        Ok(page(items, output.next_token()))
    }

    async fn describe_subnet_groups(
        &self,
        input: &DescribeInput,
    ) -> ApiResult<Page<SubnetGroup>> {
        let output = self
            .client
            .describe_subnet_groups()
            .set_subnet_group_name(input.name.clone())
            .set_max_results(input.max_results)
            .set_next_token(input.next_token.clone())
            .send()
            .await?;

        let items = output
            .subnet_groups()
            .iter()
            .map(|group| SubnetGroup {
                name: group.name().unwrap_or_default().to_string(),
                arn: owned(group.arn()),
                description: owned(group.description()),
                vpc_id: owned(group.vpc_id()),
                subnet_ids: group
                    .subnets()
                    .iter()
                    .filter_map(|s| s.identifier())
                    .map(str::to_string)
                    .collect(),
            })
            .collect();
        Ok(page(items, output.next_token()))
    }

    async fn describe_users(&self, input: &DescribeInput) -> ApiResult<Page<User>> {
        let output = self
            .client
            .describe_users()
            .set_user_name(input.name.clone())
            .set_max_results(input.max_results)
            .set_next_token(input.next_token.clone())
            .send()
            .await?;

        let items = output.users().iter().map(user_from_sdk).collect();
        Ok(page(items, output.next_token()))
    }
}

fn acl_from_sdk(acl: &sdk::Acl) -> Acl {
    Acl {
        name: acl.name().unwrap_or_default().to_string(),
        arn: owned(acl.arn()),
        status: owned(acl.status()),
        user_names: acl.user_names().to_vec(),
        clusters: acl.clusters().to_vec(),
        minimum_engine_version: owned(acl.minimum_engine_version()),
    }
}

fn cluster_from_sdk(cluster: &sdk::Cluster) -> Cluster {
    Cluster {
        name: cluster.name().unwrap_or_default().to_string(),
        arn: owned(cluster.arn()),
        status: owned(cluster.status()),
        node_type: owned(cluster.node_type()),
        engine_version: owned(cluster.engine_version()),
        number_of_shards: cluster.number_of_shards(),
        acl_name: owned(cluster.acl_name()),
        parameter_group_name: owned(cluster.parameter_group_name()),
        subnet_group_name: owned(cluster.subnet_group_name()),
    }
}

fn user_from_sdk(user: &sdk::User) -> User {
    User {
        name: user.name().unwrap_or_default().to_string(),
        arn: owned(user.arn()),
        status: owned(user.status()),
        access_string: owned(user.access_string()),
        acl_names: user.acl_names().to_vec(),
        minimum_engine_version: owned(user.minimum_engine_version()),
    }
}
