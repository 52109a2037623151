// GitHub provider implementation - bridges API client with RepoProvider trait
use async_trait::async_trait;
use repobrowse_api::{ClientConfig, GitHubClient, GitHubRepo};

use crate::{
    models::{Owner, OwnerKind, Page, PageCursor, RepoDetail, Repository},
    provider::RepoProvider,
    Result,
};

/// Wrapper around GitHubClient that implements RepoProvider
pub struct GitHubProvider {
    client: GitHubClient,
}

impl GitHubProvider {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            client: GitHubClient::new(config)?,
        })
    }
}

#[async_trait]
impl RepoProvider for GitHubProvider {
    async fn fetch_page(&self, cursor: Option<PageCursor>) -> Result<Page> {
        let page = self
            .client
            .list_public_repositories(cursor.as_ref().map(PageCursor::as_str))
            .await?;

        Ok(Page {
            repositories: page.repos.into_iter().map(github_to_repo).collect(),
            next: page.next.map(PageCursor::new),
        })
    }

    async fn fetch_detail(&self, full_name: &str) -> Result<RepoDetail> {
        let repo = self.client.get_repository(full_name).await?;
        Ok(github_to_detail(&repo))
    }

    async fn fetch_repository(&self, full_name: &str) -> Result<Repository> {
        let repo = self.client.get_repository(full_name).await?;
        let detail = github_to_detail(&repo);
        Ok(github_to_repo(repo).merging(detail))
    }
}

/// Convert a GitHub API repo to our internal Repository model
///
/// Counters are not copied here. The detail block only changes through `merging`.
fn github_to_repo(gh: GitHubRepo) -> Repository {
    Repository::new(
        gh.id,
        gh.name,
        gh.full_name,
        gh.description,
        gh.fork,
        gh.html_url,
        Owner {
            login: gh.owner.login,
            avatar_url: gh.owner.avatar_url,
            kind: gh.owner.owner_type.as_deref().and_then(OwnerKind::from_tag),
        },
    )
}

fn github_to_detail(gh: &GitHubRepo) -> RepoDetail {
    RepoDetail {
        stars: gh.stargazers_count,
        language: gh.language.clone(),
        forks: gh.forks_count,
        open_issues: gh.open_issues_count,
        updated_at: gh.updated_at,
    }
}
