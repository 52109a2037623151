use crate::{
    models::{Page, PageCursor, RepoDetail, Repository},
    Result,
};

/// Where repositories come from
///
/// The stores only ever talk to this trait, so tests can hand them a fake
/// and the real GitHub client stays an implementation detail.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RepoProvider: Send + Sync {
    /// Fetch one page of the public listing. No cursor means the first page.
    async fn fetch_page(&self, cursor: Option<PageCursor>) -> Result<Page>;

    /// Fetch the supplemental fields for one repository by qualified name
    async fn fetch_detail(&self, full_name: &str) -> Result<RepoDetail>;

    /// Fetch a single repository with its detail block already filled in
    async fn fetch_repository(&self, full_name: &str) -> Result<Repository>;
}
