use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable identity of a repository within a listing session
pub type RepoId = u64;

/// Repository model - the star of the show
///
/// The display fields come straight from the listing. The supplemental
/// counters only show up after a detail fetch, and once they are set they
/// stay set: the only way to touch them is `merging`, which swaps the whole
/// block in one go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepoId,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub fork: bool,
    pub html_url: String,
    pub owner: Owner,
    #[serde(default)]
    detail: Supplemental<RepoDetail>,
}

impl Repository {
    pub fn new(
        id: RepoId,
        name: impl Into<String>,
        full_name: impl Into<String>,
        description: Option<String>,
        fork: bool,
        html_url: impl Into<String>,
        owner: Owner,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            full_name: full_name.into(),
            description,
            fork,
            html_url: html_url.into(),
            owner,
            detail: Supplemental::Unset,
        }
    }

    /// Copy of this repository with the detail block replaced wholesale
    pub fn merging(&self, detail: RepoDetail) -> Self {
        Self {
            detail: Supplemental::Value(detail),
            ..self.clone()
        }
    }

    pub fn detail(&self) -> Option<&RepoDetail> {
        self.detail.value()
    }

    /// Has a detail fetch landed for this repository yet?
    pub fn is_enriched(&self) -> bool {
        self.detail.is_set()
    }

    pub fn stars(&self) -> Option<u32> {
        self.detail().and_then(|d| d.stars)
    }

    pub fn language(&self) -> Option<&str> {
        self.detail().and_then(|d| d.language.as_deref())
    }

    pub fn forks(&self) -> Option<u32> {
        self.detail().and_then(|d| d.forks)
    }

    pub fn open_issues(&self) -> Option<u32> {
        self.detail().and_then(|d| d.open_issues)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.detail().and_then(|d| d.updated_at)
    }

    /// Case-insensitive match on name, owner login and description
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let q = query.to_lowercase();
        self.name.to_lowercase().contains(&q)
            || self.owner.login.to_lowercase().contains(&q)
            || self
                .description
                .as_ref()
                .is_some_and(|d| d.to_lowercase().contains(&q))
    }
}

/// Fields only the per-repository endpoint hands out
///
/// Every field can legitimately be null upstream (no language detected,
/// never updated, ...), which is different from "not fetched yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDetail {
    pub stars: Option<u32>,
    pub language: Option<String>,
    pub forks: Option<u32>,
    pub open_issues: Option<u32>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Something we either haven't fetched yet, or have
///
/// Serialised as a plain nullable value so stored bookmarks stay readable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Supplemental<T> {
    #[default]
    Unset,
    Value(T),
}

impl<T> Supplemental<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Supplemental::Unset => None,
            Supplemental::Value(v) => Some(v),
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Supplemental::Value(_))
    }
}

impl<T> From<Option<T>> for Supplemental<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Supplemental::Unset, Supplemental::Value)
    }
}

impl<T: Serialize> Serialize for Supplemental<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Supplemental<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Supplemental::from)
    }
}

/// Who owns the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
    pub avatar_url: Option<String>,
    pub kind: Option<OwnerKind>,
}

/// GitHub's account classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerKind {
    User,
    Organization,
}

impl OwnerKind {
    /// Parse GitHub's `type` tag. Bots and friends come back as None.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "User" => Some(OwnerKind::User),
            "Organization" => Some(OwnerKind::Organization),
            _ => None,
        }
    }
}

impl std::fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnerKind::User => write!(f, "User"),
            OwnerKind::Organization => write!(f, "Organization"),
        }
    }
}

/// Opaque "there is another page" marker
///
/// Whatever the transport needs to fetch the next page - for GitHub that is
/// the absolute URL from the `Link` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of the public listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub repositories: Vec<Repository>,
    pub next: Option<PageCursor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Repository {
        Repository::new(
            28,
            "god",
            "mojombo/god",
            Some("Ruby process monitor".to_string()),
            false,
            "https://github.com/mojombo/god",
            Owner {
                login: "mojombo".to_string(),
                avatar_url: None,
                kind: Some(OwnerKind::User),
            },
        )
    }

    #[test]
    fn test_new_repository_is_not_enriched() {
        let r = repo();
        assert!(!r.is_enriched());
        assert_eq!(r.stars(), None);
        assert_eq!(r.language(), None);
    }

    #[test]
    fn test_merge_replaces_all_supplemental_fields() {
        let detail = RepoDetail {
            stars: Some(42),
            language: Some("Kotlin".to_string()),
            forks: Some(10),
            open_issues: Some(0),
            updated_at: None,
        };

        let merged = repo().merging(detail.clone());

        assert!(merged.is_enriched());
        assert_eq!(merged.stars(), Some(42));
        assert_eq!(merged.language(), Some("Kotlin"));
        assert_eq!(merged.forks(), Some(10));
        assert_eq!(merged.open_issues(), Some(0));
        assert_eq!(merged.updated_at(), None);
        assert_eq!(merged.detail(), Some(&detail));

        // Display fields untouched
        assert_eq!(merged.id, 28);
        assert_eq!(merged.full_name, "mojombo/god");
    }

    #[test]
    fn test_second_merge_is_not_a_field_merge() {
        let first = repo().merging(RepoDetail {
            stars: Some(1),
            language: Some("Ruby".to_string()),
            ..RepoDetail::default()
        });
        let second = first.merging(RepoDetail {
            stars: Some(2),
            ..RepoDetail::default()
        });

        assert_eq!(second.stars(), Some(2));
        // Language came from the new block, which has none
        assert_eq!(second.language(), None);
        assert!(second.is_enriched());
    }

    #[test]
    fn test_serde_roundtrip_keeps_enrichment_state() {
        let plain = repo();
        let json = serde_json::to_string(&plain).unwrap();
        assert!(json.contains("\"detail\":null"));
        let back: Repository = serde_json::from_str(&json).unwrap();
        assert!(!back.is_enriched());

        let enriched = plain.merging(RepoDetail::default());
        let json = serde_json::to_string(&enriched).unwrap();
        let back: Repository = serde_json::from_str(&json).unwrap();
        assert!(back.is_enriched());
        assert_eq!(back, enriched);
    }

    #[test]
    fn test_matches_filter() {
        let r = repo();
        assert!(r.matches(""));
        assert!(r.matches("GOD"));
        assert!(r.matches("mojo"));
        assert!(r.matches("process"));
        assert!(!r.matches("python"));
    }

    #[test]
    fn test_owner_kind_tags() {
        assert_eq!(OwnerKind::from_tag("User"), Some(OwnerKind::User));
        assert_eq!(OwnerKind::from_tag("Organization"), Some(OwnerKind::Organization));
        assert_eq!(OwnerKind::from_tag("Bot"), None);
        assert_eq!(OwnerKind::Organization.to_string(), "Organization");
    }
}
