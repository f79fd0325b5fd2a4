//! Amazon MemoryDB
//!
//! Read-only: the `Describe*` operations are exposed as paginated helpers,
//! finders and data sources.

pub mod api;
pub mod data_sources;
#[cfg(test)]
pub(crate) mod fake;
pub(crate) mod find;
pub mod list_pages;

use serde::Serialize;

use crate::pagination::{PagedInput, PagedOutput};

pub use api::{AwsMemoryDbClient, MemoryDbApi};

/// Filter and paging parameters shared by the `Describe*` operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeInput {
    /// Name of the single object to describe; all objects when unset
    pub name: Option<String>,
    pub max_results: Option<i32>,
    pub next_token: Option<String>,
}

impl DescribeInput {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

impl PagedInput for DescribeInput {
    fn set_next_token(&mut self, token: Option<String>) {
        self.next_token = token;
    }
}

/// One page of a `Describe*` response
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> PagedOutput for Page<T> {
    fn next_token(&self) -> Option<&str> {
        self.next_token.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Acl {
    pub name: String,
    pub arn: Option<String>,
    pub status: Option<String>,
    pub user_names: Vec<String>,
    pub clusters: Vec<String>,
    pub minimum_engine_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cluster {
    pub name: String,
    pub arn: Option<String>,
    pub status: Option<String>,
    pub node_type: Option<String>,
    pub engine_version: Option<String>,
    pub number_of_shards: Option<i32>,
    pub acl_name: Option<String>,
    pub parameter_group_name: Option<String>,
    pub subnet_group_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterGroup {
    pub name: String,
    pub arn: Option<String>,
    pub family: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub name: String,
    pub arn: Option<String>,
    pub status: Option<String>,
    /// `manual` or `automated`
    pub source: Option<String>,
    pub kms_key_id: Option<String>,
    pub cluster_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubnetGroup {
    pub name: String,
    pub arn: Option<String>,
    pub description: Option<String>,
    pub vpc_id: Option<String>,
    pub subnet_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct User {
    pub name: String,
    pub arn: Option<String>,
    pub status: Option<String>,
    pub access_string: Option<String>,
    pub acl_names: Vec<String>,
    pub minimum_engine_version: Option<String>,
}
