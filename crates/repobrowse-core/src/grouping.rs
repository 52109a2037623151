// Bucketing repositories for display
use crate::models::Repository;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const UNKNOWN: &str = "Unknown";

/// How the list view buckets repositories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grouping {
    #[default]
    OwnerType,
    ForkStatus,
    Language,
    Stargazers,
}

impl Grouping {
    pub fn all() -> Vec<Grouping> {
        vec![
            Grouping::OwnerType,
            Grouping::ForkStatus,
            Grouping::Language,
            Grouping::Stargazers,
        ]
    }

    /// Groupings that only make sense once the detail fields are in
    pub fn requires_detail(&self) -> bool {
        matches!(self, Grouping::Language | Grouping::Stargazers)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grouping::OwnerType => "Owner Type",
            Grouping::ForkStatus => "Fork Status",
            Grouping::Language => "Language",
            Grouping::Stargazers => "Stars",
        }
    }

    /// Bucket key for one repository
    pub fn key_for(&self, repo: &Repository) -> String {
        match self {
            Grouping::OwnerType => repo
                .owner
                .kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            Grouping::ForkStatus => {
                if repo.fork {
                    "Forked".to_string()
                } else {
                    "Original".to_string()
                }
            }
            Grouping::Language => match repo.language() {
                Some(lang) if !lang.is_empty() => lang.to_string(),
                _ => UNKNOWN.to_string(),
            },
            Grouping::Stargazers => StarBand::from_stars(repo.stars()).label().to_string(),
        }
    }
}

/// Fixed popularity bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StarBand {
    Unknown,
    Zero,
    Few,
    Tens,
    Hundreds,
    Thousands,
}

impl StarBand {
    pub fn from_stars(stars: Option<u32>) -> Self {
        match stars {
            None => StarBand::Unknown,
            Some(0) => StarBand::Zero,
            Some(1..=9) => StarBand::Few,
            Some(10..=99) => StarBand::Tens,
            Some(100..=999) => StarBand::Hundreds,
            Some(_) => StarBand::Thousands,
        }
    }

    /// Sort rank; bigger bands come first in the list
    pub fn rank(&self) -> i32 {
        match self {
            StarBand::Unknown => -1,
            StarBand::Zero => 0,
            StarBand::Few => 1,
            StarBand::Tens => 2,
            StarBand::Hundreds => 3,
            StarBand::Thousands => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StarBand::Unknown => UNKNOWN,
            StarBand::Zero => "0",
            StarBand::Few => "1–9",
            StarBand::Tens => "10–99",
            StarBand::Hundreds => "100–999",
            StarBand::Thousands => "1000+",
        }
    }
}

/// A named bucket of repositories, in collection order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoGroup {
    pub key: String,
    pub repos: Vec<Repository>,
}

/// Partition repositories into sorted groups
///
/// Keys sort alphabetically, except star bands which go biggest first.
pub fn group_repositories(repos: &[Repository], grouping: Grouping) -> Vec<RepoGroup> {
    let mut buckets: BTreeMap<String, (i32, Vec<Repository>)> = BTreeMap::new();

    for repo in repos {
        let rank = StarBand::from_stars(repo.stars()).rank();
        buckets
            .entry(grouping.key_for(repo))
            .or_insert_with(|| (rank, Vec::new()))
            .1
            .push(repo.clone());
    }

    let mut groups: Vec<(i32, RepoGroup)> = buckets
        .into_iter()
        .map(|(key, (rank, repos))| (rank, RepoGroup { key, repos }))
        .collect();

    if grouping == Grouping::Stargazers {
        groups.sort_by(|a, b| b.0.cmp(&a.0));
    }

    groups.into_iter().map(|(_, group)| group).collect()
}
