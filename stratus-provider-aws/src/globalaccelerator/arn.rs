//! Parent ARNs of listeners and endpoint groups
//!
//! `accelerator/{a}/listener/{l}/endpoint-group/{eg}` nests inside its
//! listener and accelerator, so parents are found by truncating the
//! resource section.

use stratus_core::arn::{Arn, ArnError};
use thiserror::Error;

use super::SERVICE;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParentArnError {
    #[error("parsing ARN ({arn}): {source}")]
    Parse { arn: String, source: ArnError },

    #[error("expected service globalaccelerator in ARN ({arn}), got: {service}")]
    Service { arn: String, service: String },

    #[error("expected at least {expected} resource parts in ARN ({arn}), got: {got}")]
    ResourceParts {
        arn: String,
        expected: usize,
        got: usize,
    },
}

/// Listener ARN from an endpoint group ARN
pub fn endpoint_group_arn_to_listener_arn(input: &str) -> Result<String, ParentArnError> {
    parent_arn(input, 6, 4)
}

/// Accelerator ARN from a listener or endpoint group ARN
pub fn listener_or_endpoint_group_arn_to_accelerator_arn(
    input: &str,
) -> Result<String, ParentArnError> {
    parent_arn(input, 4, 2)
}

/// Keep the first `keep` resource parts of a Global Accelerator ARN that
/// has at least `min_parts`
fn parent_arn(input: &str, min_parts: usize, keep: usize) -> Result<String, ParentArnError> {
    let arn: Arn = input.parse().map_err(|source| ParentArnError::Parse {
        arn: input.to_string(),
        source,
    })?;

    if arn.service != SERVICE {
        return Err(ParentArnError::Service {
            arn: input.to_string(),
            service: arn.service,
        });
    }

    let parts = arn.resource_parts();
    if parts.len() < min_parts {
        return Err(ParentArnError::ResourceParts {
            arn: input.to_string(),
            expected: min_parts,
            got: parts.len(),
        });
    }

    let resource = parts[..keep].join("/");
    Ok(arn.with_resource(resource).to_string())
}
