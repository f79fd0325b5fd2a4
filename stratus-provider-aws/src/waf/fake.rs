//! In-memory WAF used by the handler tests

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    ChangeAction, ERR_NONEXISTENT_ITEM, ERR_STALE_DATA, SizeConstraintSet,
    SizeConstraintSetUpdate, WafApi,
};
use crate::error::{ApiError, ApiResult};

#[derive(Default)]
struct Inner {
    sets: BTreeMap<String, SizeConstraintSet>,
    next_id: usize,
    issued: usize,
    /// Only the most recently issued token is accepted
    outstanding: Option<String>,
    /// Error code and count of injected token-bearing failures
    injected: Option<(String, usize)>,
    update_error: Option<ApiError>,
    delete_error: Option<ApiError>,
    updates: Vec<Vec<SizeConstraintSetUpdate>>,
    deletes: usize,
}

#[derive(Default)]
pub(crate) struct FakeWafApi {
    inner: Mutex<Inner>,
}

impl FakeWafApi {
    pub fn with_set(self, set: SizeConstraintSet) -> Self {
        self.inner.lock().unwrap().sets.insert(set.id.clone(), set);
        self
    }

    /// The next `n` token-bearing calls fail as if their token was stale
    pub fn fail_next_with_stale(&self, n: usize) {
        self.fail_next_with(ERR_STALE_DATA, n);
    }

    /// The next `n` token-bearing calls fail with `code`
    pub fn fail_next_with(&self, code: &str, n: usize) {
        self.inner.lock().unwrap().injected = Some((code.to_string(), n));
    }

    /// Every update fails with `err` after consuming its token
    pub fn fail_updates_with(&self, err: ApiError) {
        self.inner.lock().unwrap().update_error = Some(err);
    }

    /// Every delete fails with `err` after consuming its token
    pub fn fail_deletes_with(&self, err: ApiError) {
        self.inner.lock().unwrap().delete_error = Some(err);
    }

    pub fn set(&self, id: &str) -> Option<SizeConstraintSet> {
        self.inner.lock().unwrap().sets.get(id).cloned()
    }

    pub fn updates(&self) -> Vec<Vec<SizeConstraintSetUpdate>> {
        self.inner.lock().unwrap().updates.clone()
    }

    pub fn deletes(&self) -> usize {
        self.inner.lock().unwrap().deletes
    }

    pub fn tokens_issued(&self) -> usize {
        self.inner.lock().unwrap().issued
    }
}

fn consume_token(inner: &mut Inner, token: &str) -> ApiResult<()> {
    let current = inner.outstanding.take();
    if let Some((code, remaining)) = inner.injected.as_mut()
        && *remaining > 0
    {
        *remaining -= 1;
        return Err(ApiError::service(code.clone(), "injected failure"));
    }
    if current.as_deref() != Some(token) {
        return Err(ApiError::service(ERR_STALE_DATA, format!("token {} is stale", token)));
    }
    Ok(())
}

fn nonexistent(id: &str) -> ApiError {
    ApiError::service(ERR_NONEXISTENT_ITEM, format!("no size constraint set {}", id))
}

#[async_trait]
impl WafApi for FakeWafApi {
    async fn get_change_token(&self) -> ApiResult<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.issued += 1;
        let token = format!("token-{}", inner.issued);
        inner.outstanding = Some(token.clone());
        Ok(token)
    }

    async fn create_size_constraint_set(
        &self,
        name: &str,
        change_token: &str,
    ) -> ApiResult<SizeConstraintSet> {
        let mut inner = self.inner.lock().unwrap();
        consume_token(&mut inner, change_token)?;

        inner.next_id += 1;
        let set = SizeConstraintSet {
            id: format!("scs-{}", inner.next_id),
            name: Some(name.to_string()),
            size_constraints: Vec::new(),
        };
        inner.sets.insert(set.id.clone(), set.clone());
        Ok(set)
    }

    async fn get_size_constraint_set(&self, id: &str) -> ApiResult<Option<SizeConstraintSet>> {
        let inner = self.inner.lock().unwrap();
        inner.sets.get(id).cloned().map(Some).ok_or_else(|| nonexistent(id))
    }

    async fn update_size_constraint_set(
        &self,
        id: &str,
        change_token: &str,
        updates: &[SizeConstraintSetUpdate],
    ) -> ApiResult<()> {
        let mut inner = self.inner.lock().unwrap();
        consume_token(&mut inner, change_token)?;
        if let Some(err) = inner.update_error.clone() {
            return Err(err);
        }

        let mut set = inner.sets.get(id).cloned().ok_or_else(|| nonexistent(id))?;
        for update in updates {
            match update.action {
                ChangeAction::Insert => set.size_constraints.push(update.size_constraint.clone()),
                ChangeAction::Delete => {
                    let idx = set
                        .size_constraints
                        .iter()
                        .position(|c| *c == update.size_constraint)
                        .ok_or_else(|| nonexistent(id))?;
                    set.size_constraints.remove(idx);
                }
            }
        }

        inner.sets.insert(id.to_string(), set);
        inner.updates.push(updates.to_vec());
        Ok(())
    }

    async fn delete_size_constraint_set(&self, id: &str, change_token: &str) -> ApiResult<()> {
        let mut inner = self.inner.lock().unwrap();
        consume_token(&mut inner, change_token)?;
        if let Some(err) = inner.delete_error.clone() {
            return Err(err);
        }

        inner.sets.remove(id).ok_or_else(|| nonexistent(id))?;
        inner.deletes += 1;
        Ok(())
    }
}
