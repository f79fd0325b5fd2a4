//! AWS Global Accelerator

pub mod arn;

pub use arn::{
    ParentArnError, endpoint_group_arn_to_listener_arn,
    listener_or_endpoint_group_arn_to_accelerator_arn,
};

/// Service name in Global Accelerator ARNs
pub const SERVICE: &str = "globalaccelerator";
