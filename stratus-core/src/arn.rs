//! ARN - Amazon Resource Names
//!
//! `arn:partition:service:region:account-id:resource`

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const ARN_PREFIX: &str = "arn:";
const ARN_SECTIONS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArnError {
    #[error("arn: invalid prefix")]
    InvalidPrefix,

    #[error("arn: not enough sections")]
    NotEnoughSections,
}

/// A parsed ARN
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account_id: String,
    /// Everything after the fifth `:`, including further delimiters
    pub resource: String,
}

impl Arn {
    pub fn new(
        partition: impl Into<String>,
        service: impl Into<String>,
        region: impl Into<String>,
        account_id: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            partition: partition.into(),
            service: service.into(),
            region: region.into(),
            account_id: account_id.into(),
            resource: resource.into(),
        }
    }

    /// Resource section split on `/`
    pub fn resource_parts(&self) -> Vec<&str> {
        self.resource.split('/').collect()
    }

    /// Same ARN with a different resource section
    pub fn with_resource(&self, resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..self.clone()
        }
    }
}

impl FromStr for Arn {
    type Err = ArnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with(ARN_PREFIX) {
            return Err(ArnError::InvalidPrefix);
        }

        let sections: Vec<&str> = s.splitn(ARN_SECTIONS, ':').collect();
        if sections.len() != ARN_SECTIONS {
            return Err(ArnError::NotEnoughSections);
        }

        Ok(Self {
            partition: sections[1].to_string(),
            service: sections[2].to_string(),
            region: sections[3].to_string(),
            account_id: sections[4].to_string(),
            resource: sections[5].to_string(),
        })
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account_id, self.resource
        )
    }
}

/// Partition a region belongs to
pub fn partition_for_region(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "aws-cn"
    } else if region.starts_with("us-gov-") {
        "aws-us-gov"
    } else if region.starts_with("us-isob-") {
        "aws-iso-b"
    } else if region.starts_with("us-iso-") {
        "aws-iso"
    } else {
        "aws"
    }
}
