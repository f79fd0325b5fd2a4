//! In-memory MemoryDB used by tests

use std::sync::Mutex;

use async_trait::async_trait;

use super::api::{
    ERR_ACL_NOT_FOUND, ERR_CLUSTER_NOT_FOUND, ERR_PARAMETER_GROUP_NOT_FOUND,
    ERR_SNAPSHOT_NOT_FOUND, ERR_SUBNET_GROUP_NOT_FOUND, ERR_USER_NOT_FOUND,
};
use super::{
    Acl, Cluster, DescribeInput, MemoryDbApi, Page, ParameterGroup, Snapshot, SubnetGroup, User,
};
use crate::error::{ApiError, ApiResult};

/// Serves fixed objects in pages of `page_size`, using offsets as tokens
pub(crate) struct FakeMemoryDbApi {
    acls: Vec<Acl>,
    clusters: Vec<Cluster>,
    parameter_groups: Vec<ParameterGroup>,
    snapshots: Vec<Snapshot>,
    subnet_groups: Vec<SubnetGroup>,
    users: Vec<User>,
    page_size: usize,
    requests: Mutex<usize>,
    failure: Mutex<Option<ApiError>>,
}

impl Default for FakeMemoryDbApi {
    fn default() -> Self {
        Self {
            acls: Vec::new(),
            clusters: Vec::new(),
            parameter_groups: Vec::new(),
            snapshots: Vec::new(),
            subnet_groups: Vec::new(),
            users: Vec::new(),
            page_size: 100,
            requests: Mutex::new(0),
            failure: Mutex::new(None),
        }
    }
}

impl FakeMemoryDbApi {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_acls(mut self, acls: Vec<Acl>) -> Self {
        self.acls = acls;
        self
    }

    pub fn with_clusters(mut self, clusters: Vec<Cluster>) -> Self {
        self.clusters = clusters;
        self
    }

    pub fn with_users(mut self, users: Vec<User>) -> Self {
        self.users = users;
        self
    }

    /// Every following request fails with `err`
    pub fn fail_with(&self, err: ApiError) {
        *self.failure.lock().unwrap() = Some(err);
    }

    pub fn requests(&self) -> usize {
        *self.requests.lock().unwrap()
    }

    fn serve<T: Clone>(
        &self,
        items: &[T],
        name_of: fn(&T) -> &str,
        not_found_code: &str,
        input: &DescribeInput,
    ) -> ApiResult<Page<T>> {
        *self.requests.lock().unwrap() += 1;
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }

        let matching: Vec<&T> = items
            .iter()
            .filter(|item| input.name.as_deref().is_none_or(|n| n == name_of(item)))
            .collect();
        if let Some(name) = &input.name
            && matching.is_empty()
        {
            return Err(ApiError::service(not_found_code, format!("{} not found", name)));
        }

        let start = match input.next_token.as_deref() {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ApiError::service("InvalidParameterValueException", "bad token"))?,
            None => 0,
        }
        .min(matching.len());
        let page_size = input
            .max_results
            .map(|n| n as usize)
            .unwrap_or(self.page_size);
        let end = (start + page_size).min(matching.len());

        Ok(Page {
            items: matching[start..end].iter().map(|item| (*item).clone()).collect(),
            next_token: (end < matching.len()).then(|| end.to_string()),
        })
    }
}

#[async_trait]
impl MemoryDbApi for FakeMemoryDbApi {
    async fn describe_acls(&self, input: &DescribeInput) -> ApiResult<Page<Acl>> {
        self.serve(&self.acls, |a| &a.name, ERR_ACL_NOT_FOUND, input)
    }

    async fn describe_clusters(&self, input: &DescribeInput) -> ApiResult<Page<Cluster>> {
        self.serve(&self.clusters, |c| &c.name, ERR_CLUSTER_NOT_FOUND, input)
    }

    async fn describe_parameter_groups(
        &self,
        input: &DescribeInput,
    ) -> ApiResult<Page<ParameterGroup>> {
        self.serve(
            &self.parameter_groups,
            |g| &g.name,
            ERR_PARAMETER_GROUP_NOT_FOUND,
            input,
        )
    }

    async fn describe_snapshots(&self, input: &DescribeInput) -> ApiResult<Page<Snapshot>> {
        self.serve(&self.snapshots, |s| &s.name, ERR_SNAPSHOT_NOT_FOUND, input)
    }

    async fn describe_subnet_groups(
        &self,
        input: &DescribeInput,
    ) -> ApiResult<Page<SubnetGroup>> {
        self.serve(
            &self.subnet_groups,
            |g| &g.name,
            ERR_SUBNET_GROUP_NOT_FOUND,
            input,
        )
    }

    async fn describe_users(&self, input: &DescribeInput) -> ApiResult<Page<User>> {
        self.serve(&self.users, |u| &u.name, ERR_USER_NOT_FOUND, input)
    }
}
