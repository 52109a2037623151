// GitHub transport: HTTP client, pagination cursors, and the error taxonomy
pub mod error;
pub mod github;
pub mod link;

// Re-export common types
pub use error::FetchError;
pub use github::{ClientConfig, GitHubClient, GitHubOwner, GitHubRepo, RepoPage};
pub use link::parse_next_link;
