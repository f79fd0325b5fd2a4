//! WAF Classic API seam
//!
//! Resource handlers talk to [`WafApi`]; [`AwsWafClient`] implements it on
//! top of `aws-sdk-waf`.

use async_trait::async_trait;
use aws_sdk_waf::Client;
use aws_sdk_waf::types as sdk;

use super::{
    ChangeAction, ComparisonOperator, FieldToMatch, MatchFieldType, SizeConstraint,
    SizeConstraintSet, SizeConstraintSetUpdate, TextTransformation,
};
use crate::error::{ApiError, ApiResult};

#[async_trait]
pub trait WafApi: Send + Sync {
    async fn get_change_token(&self) -> ApiResult<String>;

    async fn create_size_constraint_set(
        &self,
        name: &str,
        change_token: &str,
    ) -> ApiResult<SizeConstraintSet>;

    /// `Ok(None)` when the response carried no set
    async fn get_size_constraint_set(&self, id: &str) -> ApiResult<Option<SizeConstraintSet>>;

    async fn update_size_constraint_set(
        &self,
        id: &str,
        change_token: &str,
        updates: &[SizeConstraintSetUpdate],
    ) -> ApiResult<()>;

    async fn delete_size_constraint_set(&self, id: &str, change_token: &str) -> ApiResult<()>;
}

/// [`WafApi`] backed by the AWS SDK
#[derive(Clone, Debug)]
pub struct AwsWafClient {
    client: Client,
}

impl AwsWafClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WafApi for AwsWafClient {
    async fn get_change_token(&self) -> ApiResult<String> {
        let output = self.client.get_change_token().send().await?;
        output
            .change_token()
            .map(str::to_string)
            .ok_or_else(|| ApiError::empty_result("GetChangeToken"))
    }

    async fn create_size_constraint_set(
        &self,
        name: &str,
        change_token: &str,
    ) -> ApiResult<SizeConstraintSet> {
        let output = self
            .client
            .create_size_constraint_set()
            .name(name)
            .change_token(change_token)
            .send()
            .await?;

        output
            .size_constraint_set()
            .map(from_sdk_set)
            .transpose()?
            .ok_or_else(|| ApiError::empty_result(format!("CreateSizeConstraintSet ({})", name)))
    }

    async fn get_size_constraint_set(&self, id: &str) -> ApiResult<Option<SizeConstraintSet>> {
        let output = self
            .client
            .get_size_constraint_set()
            .size_constraint_set_id(id)
            .send()
            .await?;

        output.size_constraint_set().map(from_sdk_set).transpose()
    }

    async fn update_size_constraint_set(
        &self,
        id: &str,
        change_token: &str,
        updates: &[SizeConstraintSetUpdate],
    ) -> ApiResult<()> {
        let updates = updates
            .iter()
            .map(to_sdk_update)
            .collect::<ApiResult<Vec<_>>>()?;

        self.client
            .update_size_constraint_set()
            .size_constraint_set_id(id)
            .change_token(change_token)
            .set_updates(Some(updates))
            .send()
            .await?;

        Ok(())
    }

    async fn delete_size_constraint_set(&self, id: &str, change_token: &str) -> ApiResult<()> {
        self.client
            .delete_size_constraint_set()
            .size_constraint_set_id(id)
            .change_token(change_token)
            .send()
            .await?;

        Ok(())
    }
}

fn build_error(err: aws_sdk_waf::error::BuildError) -> ApiError {
    ApiError::Build(err.to_string())
}

fn to_sdk_update(update: &SizeConstraintSetUpdate) -> ApiResult<sdk::SizeConstraintSetUpdate> {
    let constraint = &update.size_constraint;

    let field_to_match = sdk::FieldToMatch::builder()
        .r#type(sdk::MatchFieldType::from(
            constraint.field_to_match.field_type.as_str(),
        ))
        .set_data(constraint.field_to_match.data.clone())
        .build()
        .map_err(build_error)?;

    let size_constraint = sdk::SizeConstraint::builder()
        .field_to_match(field_to_match)
        .comparison_operator(sdk::ComparisonOperator::from(
            constraint.comparison_operator.as_str(),
        ))
        .size(constraint.size)
        .text_transformation(sdk::TextTransformation::from(
            constraint.text_transformation.as_str(),
        ))
        .build()
        .map_err(build_error)?;

    sdk::SizeConstraintSetUpdate::builder()
        .action(sdk::ChangeAction::from(update.action.as_str()))
        .size_constraint(size_constraint)
        .build()
        .map_err(build_error)
}

fn from_sdk_set(set: &sdk::SizeConstraintSet) -> ApiResult<SizeConstraintSet> {
    let size_constraints = set
        .size_constraints()
        .iter()
        .map(from_sdk_constraint)
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(SizeConstraintSet {
        id: set.size_constraint_set_id().to_string(),
        name: set.name().map(str::to_string),
        size_constraints,
    })
}

fn from_sdk_constraint(constraint: &sdk::SizeConstraint) -> ApiResult<SizeConstraint> {
    let unexpected = |what: &str, value: &str| {
        ApiError::Build(format!("unexpected {} in response: {}", what, value))
    };

    let field = constraint
        .field_to_match()
        .ok_or_else(|| ApiError::empty_result("SizeConstraint.FieldToMatch"))?;

    Ok(SizeConstraint {
        field_to_match: FieldToMatch {
            field_type: field
                .r#type()
                .as_str()
                .parse::<MatchFieldType>()
                .map_err(|_| unexpected("field type", field.r#type().as_str()))?,
            data: field.data().map(str::to_string),
        },
        comparison_operator: constraint
            .comparison_operator()
            .as_str()
            .parse::<ComparisonOperator>()
            .map_err(|_| {
                unexpected(
                    "comparison operator",
                    constraint.comparison_operator().as_str(),
                )
            })?,
        size: constraint.size(),
        text_transformation: constraint
            .text_transformation()
            .as_str()
            .parse::<TextTransformation>()
            .map_err(|_| {
                unexpected(
                    "text transformation",
                    constraint.text_transformation().as_str(),
                )
            })?,
    })
}
