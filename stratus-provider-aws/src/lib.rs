//! Stratus AWS Provider
//!
//! AWS Provider implementation: WAF Classic size constraint sets as a
//! managed resource, MemoryDB objects as data sources.

pub mod config;
pub mod error;
#[doc(hidden)]
pub mod exports;
pub mod globalaccelerator;
pub mod memorydb;
pub mod pagination;
pub mod resources;
pub mod waf;

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use stratus_core::provider::{
    BoxFuture, Provider, ProviderError, ProviderResult, ResourceType,
};
use stratus_core::resource::{Resource, ResourceId, State};

use crate::config::ProviderConfig;
use crate::error::ApiError;
use crate::memorydb::data_sources;
use crate::memorydb::{AwsMemoryDbClient, MemoryDbApi};
use crate::waf::{AwsWafClient, WafApi, WafConn, size_constraint_set};

/// AWS Provider
pub struct AwsProvider {
    waf: WafConn,
    memorydb: Arc<dyn MemoryDbApi>,
    region: String,
}

impl AwsProvider {
    /// Create a new AWS Provider
    ///
    /// Credentials come from the default chain (or `profile`). The account
    /// ID is looked up through STS unless configured.
    pub async fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        let account_id = match &config.account_id {
            Some(account_id) => account_id.clone(),
            None => resolve_account_id(&aws_sdk_sts::Client::new(&sdk_config)).await?,
        };
        log::debug!(
            "AWS provider for account {} in {} ({})",
            account_id,
            config.region,
            config.partition
        );

        Ok(Self::with_clients(
            &config,
            account_id,
            Arc::new(AwsWafClient::new(aws_sdk_waf::Client::new(&sdk_config))),
            Arc::new(AwsMemoryDbClient::new(aws_sdk_memorydb::Client::new(
                &sdk_config,
            ))),
        ))
    }

    /// Create with specific clients (for testing)
    pub fn with_clients(
        config: &ProviderConfig,
        account_id: impl Into<String>,
        waf: Arc<dyn WafApi>,
        memorydb: Arc<dyn MemoryDbApi>,
    ) -> Self {
        Self {
            waf: WafConn::new(waf, config.retry.clone(), &config.partition, account_id),
            memorydb,
            region: config.region.clone(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn memorydb(&self) -> &dyn MemoryDbApi {
        self.memorydb.as_ref()
    }
}

async fn resolve_account_id(client: &aws_sdk_sts::Client) -> ProviderResult<String> {
    let output = client
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| ApiError::from(e).into_provider_error("resolving AWS account ID"))?;

    output
        .account()
        .map(str::to_string)
        .ok_or_else(|| ProviderError::new("resolving AWS account ID: empty result"))
}

fn unknown_type(id: &ResourceId) -> ProviderError {
    ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
        .for_resource(id.clone())
}

fn read_only(id: &ResourceId) -> ProviderError {
    ProviderError::new(format!(
        "{} is a data source and cannot be modified",
        id.resource_type
    ))
    .for_resource(id.clone())
}

fn is_data_source(resource_type: &str) -> bool {
    data_sources::DATA_SOURCES.contains(&resource_type)
}

impl Provider for AwsProvider {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resources::resource_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(str::to_string);
        Box::pin(async move {
            match id.resource_type.as_str() {
                size_constraint_set::RESOURCE_TYPE => match identifier {
                    Some(identifier) => size_constraint_set::read(&self.waf, &id, &identifier).await,
                    None => Ok(State::not_found(id.clone())),
                },
                t if is_data_source(t) => Err(ProviderError::new(format!(
                    "{} is a data source; read it with its configuration",
                    t
                ))
                .for_resource(id.clone())),
                _ => Err(unknown_type(&id)),
            }
        })
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            if is_data_source(&resource.id.resource_type) {
                data_sources::read(self.memorydb.as_ref(), &resource).await
            } else {
                Err(unknown_type(&resource.id))
            }
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            match resource.id.resource_type.as_str() {
                size_constraint_set::RESOURCE_TYPE => {
                    size_constraint_set::create(&self.waf, &resource).await
                }
                t if is_data_source(t) => Err(read_only(&resource.id)),
                _ => Err(unknown_type(&resource.id)),
            }
        })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move {
            match id.resource_type.as_str() {
                size_constraint_set::RESOURCE_TYPE => {
                    size_constraint_set::update(&self.waf, &id, &identifier, &from, &to).await
                }
                t if is_data_source(t) => Err(read_only(&id)),
                _ => Err(unknown_type(&id)),
            }
        })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            match id.resource_type.as_str() {
                size_constraint_set::RESOURCE_TYPE => {
                    size_constraint_set::delete(&self.waf, &id, &identifier).await
                }
                t if is_data_source(t) => Err(read_only(&id)),
                _ => Err(unknown_type(&id)),
            }
        })
    }
}
