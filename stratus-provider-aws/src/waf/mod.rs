//! AWS WAF Classic
//!
//! Every mutating WAF Classic call needs a fresh change token; see
//! [`retryer::Retryer`].

pub mod api;
#[cfg(test)]
pub(crate) mod fake;
pub mod retryer;
pub(crate) mod size_constraint_set;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::Mutex;

pub use api::{AwsWafClient, WafApi};
pub use retryer::Retryer;

use crate::config::RetryConfig;

/// The change token was already used or superseded
pub const ERR_STALE_DATA: &str = "WAFStaleDataException";
pub const ERR_NONEXISTENT_ITEM: &str = "WAFNonexistentItemException";
pub const ERR_NONEXISTENT_CONTAINER: &str = "WAFNonexistentContainerException";
pub const ERR_THROTTLING: &str = "ThrottlingException";

/// Error codes on which a token-bearing call is retried with a new token
pub const RETRYABLE_CODES: &[&str] = &[ERR_STALE_DATA, ERR_THROTTLING];

/// API handle shared by the WAF resource handlers
#[derive(Clone)]
pub struct WafConn {
    pub api: Arc<dyn WafApi>,
    /// Serializes token-bearing calls; one change token is valid at a time
    pub lock: Arc<Mutex<()>>,
    pub retry: RetryConfig,
    pub partition: String,
    pub account_id: String,
}

impl WafConn {
    pub fn new(
        api: Arc<dyn WafApi>,
        retry: RetryConfig,
        partition: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            lock: Arc::new(Mutex::new(())),
            retry,
            partition: partition.into(),
            account_id: account_id.into(),
        }
    }

    pub fn retryer(&self) -> Retryer<'_> {
        Retryer::new(self.api.as_ref(), &self.lock, &self.retry)
    }
}

/// Declares a string-backed enum with its wire names
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const VALUES: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(format!(
                        "invalid {} '{}', expected one of: {}",
                        stringify!($name),
                        other,
                        Self::VALUES.join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(ComparisonOperator {
    Eq => "EQ",
    Ne => "NE",
    Le => "LE",
    Lt => "LT",
    Ge => "GE",
    Gt => "GT",
});

wire_enum!(TextTransformation {
    None => "NONE",
    CompressWhiteSpace => "COMPRESS_WHITE_SPACE",
    HtmlEntityDecode => "HTML_ENTITY_DECODE",
    Lowercase => "LOWERCASE",
    CmdLine => "CMD_LINE",
    UrlDecode => "URL_DECODE",
});

wire_enum!(
    /// Part of the web request to inspect
    MatchFieldType {
        Uri => "URI",
        QueryString => "QUERY_STRING",
        Header => "HEADER",
        Method => "METHOD",
        Body => "BODY",
        SingleQueryArg => "SINGLE_QUERY_ARG",
        AllQueryArgs => "ALL_QUERY_ARGS",
    }
);

wire_enum!(ChangeAction {
    Insert => "INSERT",
    Delete => "DELETE",
});

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldToMatch {
    pub field_type: MatchFieldType,
    /// Header or query argument name, for the types that need one
    pub data: Option<String>,
}

/// Compares the size of a request part against a byte count
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SizeConstraint {
    pub field_to_match: FieldToMatch,
    pub comparison_operator: ComparisonOperator,
    pub size: i64,
    pub text_transformation: TextTransformation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeConstraintSetUpdate {
    pub action: ChangeAction,
    pub size_constraint: SizeConstraint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeConstraintSet {
    pub id: String,
    pub name: Option<String>,
    pub size_constraints: Vec<SizeConstraint>,
}
