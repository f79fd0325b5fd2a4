//! Finders over the `Describe*` operations

use super::api::{
    ERR_ACL_NOT_FOUND, ERR_CLUSTER_NOT_FOUND, ERR_PARAMETER_GROUP_NOT_FOUND,
    ERR_SNAPSHOT_NOT_FOUND, ERR_SUBNET_GROUP_NOT_FOUND, ERR_USER_NOT_FOUND,
};
use super::list_pages::{
    describe_acls_pages, describe_clusters_pages, describe_parameter_groups_pages,
    describe_snapshots_pages, describe_subnet_groups_pages, describe_users_pages,
};
use super::{Acl, Cluster, DescribeInput, MemoryDbApi, ParameterGroup, Snapshot, SubnetGroup, User};
use crate::error::{ApiError, ApiResult};

/// The only element of `items`
pub fn single<T>(mut items: Vec<T>, what: impl Into<String>) -> ApiResult<T> {
    match items.len() {
        0 => Err(ApiError::not_found(what)),
        1 => Ok(items.remove(0)),
        count => Err(ApiError::TooManyResults {
            what: what.into(),
            count,
        }),
    }
}

macro_rules! finders {
    ($(
        $item:ty {
            all: $find_all:ident,
            by_name: $find_by_name:ident,
            pages: $pages:ident,
            not_found: $code:expr,
            what: $what:literal $(,)?
        }
    ),+ $(,)?) => {
        $(
            /// Every object matching `input`, across all pages
            pub async fn $find_all(conn: &dyn MemoryDbApi, input: DescribeInput) -> ApiResult<Vec<$item>> {
                let mut output = Vec::new();
                $pages(conn, input, |page, _| {
                    output.extend(page.items.iter().cloned());
                    true
                })
                .await?;
                Ok(output)
            }

            #[doc = concat!("The ", $what, " named `name`")]
            pub async fn $find_by_name(conn: &dyn MemoryDbApi, name: &str) -> ApiResult<$item> {
                let what = format!("{} ({})", $what, name);
                match $find_all(conn, DescribeInput::by_name(name)).await {
                    Ok(items) => single(items, what),
                    Err(err) if err.is_code(&[$code]) => Err(ApiError::not_found(what)),
                    Err(err) => Err(err),
                }
            }
        )+
    };
}

finders! {
    Acl {
        all: find_acls,
        by_name: find_acl_by_name,
        pages: describe_acls_pages,
        not_found: ERR_ACL_NOT_FOUND,
        what: "MemoryDB ACL",
    },
    Cluster {
        all: find_clusters,
        by_name: find_cluster_by_name,
        pages: describe_clusters_pages,
        not_found: ERR_CLUSTER_NOT_FOUND,
        what: "MemoryDB Cluster",
    },
    ParameterGroup {
        all: find_parameter_groups,
        by_name: find_parameter_group_by_name,
        pages: describe_parameter_groups_pages,
        not_found: ERR_PARAMETER_GROUP_NOT_FOUND,
        what: "MemoryDB Parameter Group",
    },
    Snapshot {
        all: find_snapshots,
        by_name: find_snapshot_by_name,
        pages: describe_snapshots_pages,
        not_found: ERR_SNAPSHOT_NOT_FOUND,
        what: "MemoryDB Snapshot",
    },
    SubnetGroup {
        all: find_subnet_groups,
        by_name: find_subnet_group_by_name,
        pages: describe_subnet_groups_pages,
        not_found: ERR_SUBNET_GROUP_NOT_FOUND,
        what: "MemoryDB Subnet Group",
    },
    User {
        all: find_users,
        by_name: find_user_by_name,
        pages: describe_users_pages,
        not_found: ERR_USER_NOT_FOUND,
        what: "MemoryDB User",
    },
}
