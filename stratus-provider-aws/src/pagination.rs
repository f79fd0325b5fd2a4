//! Token-based pagination over list/describe APIs

use std::future::Future;

/// Request that can be resumed from a continuation token
pub trait PagedInput: Clone {
    fn set_next_token(&mut self, token: Option<String>);
}

/// Response page that may carry a continuation token
pub trait PagedOutput {
    fn next_token(&self) -> Option<&str>;
}

/// Call `call` page after page, handing each page to `callback`.
///
/// `callback` receives the page and whether it is the last one; returning
/// `false` stops before the next request. A missing or empty continuation
/// token marks the last page.
pub async fn for_each_page<I, O, E, Call, Fut, F>(
    mut input: I,
    mut call: Call,
    mut callback: F,
) -> Result<(), E>
where
    I: PagedInput,
    O: PagedOutput,
    Call: FnMut(I) -> Fut,
    Fut: Future<Output = Result<O, E>>,
    F: FnMut(&O, bool) -> bool,
{
    loop {
        let output = call(input.clone()).await?;

        let next_token = output
            .next_token()
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        let last_page = next_token.is_none();

        if !callback(&output, last_page) || last_page {
            break;
        }

        log::debug!("fetching next page");
        input.set_next_token(next_token);
    }

    Ok(())
}

/// Generate `<operation>_pages` helpers for paginated operations of an API trait.
///
/// ```ignore
/// list_pages!(dyn MemoryDbApi, DescribeInput, {
///     describe_acls_pages => describe_acls: Page<Acl>,
/// });
/// ```
macro_rules! list_pages {
    ($api:ty, $input:ty, { $($pages_fn:ident => $op:ident: $output:ty),+ $(,)? }) => {
        $(
            pub async fn $pages_fn<F>(
                conn: &$api,
                input: $input,
                callback: F,
            ) -> $crate::error::ApiResult<()>
            where
                F: FnMut(&$output, bool) -> bool,
            {
                $crate::pagination::for_each_page(
                    input,
                    |input: $input| async move { conn.$op(&input).await },
                    callback,
                )
                .await
            }
        )+
    };
}

pub(crate) use list_pages;
