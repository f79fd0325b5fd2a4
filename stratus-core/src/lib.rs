//! Stratus Core
//!
//! Provider framework for a declarative infrastructure tool: resource and
//! state values, the Provider trait, attribute schemas, and the differ that
//! turns desired and remote state into a Plan of Effects.

pub mod arn;
pub mod differ;
pub mod effect;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
