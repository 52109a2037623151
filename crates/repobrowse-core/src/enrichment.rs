// Fan-out channel for "this repository just got its details"
use crate::models::Repository;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// Default number of events a slow subscriber may fall behind by
pub const DEFAULT_CAPACITY: usize = 256;

/// What travels over the enrichment channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentEvent {
    /// A single repository was enriched, usually by a detail view
    RepositoryEnriched(Repository),
    /// A batch was enriched, usually by the list grouping pass
    RepositoriesEnriched(Vec<Repository>),
}

impl EnrichmentEvent {
    /// Flatten into the enriched repositories it carries
    pub fn into_repositories(self) -> Vec<Repository> {
        match self {
            EnrichmentEvent::RepositoryEnriched(repo) => vec![repo],
            EnrichmentEvent::RepositoriesEnriched(repos) => repos,
        }
    }
}

/// Many-producer, many-consumer enrichment notifications
///
/// Best effort and in-memory only: subscribers that join late miss earlier
/// publishes, and a subscriber that falls more than `capacity` events behind
/// skips ahead. Each subscriber sees publishes in publish order.
#[derive(Debug, Clone)]
pub struct EnrichmentBroadcaster {
    sender: broadcast::Sender<EnrichmentEvent>,
}

impl EnrichmentBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish one enriched repository. Returns how many subscribers got it.
    pub fn publish(&self, repo: Repository) -> usize {
        self.send(EnrichmentEvent::RepositoryEnriched(repo))
    }

    /// Publish a batch in a single event. Empty batches are dropped.
    pub fn publish_batch(&self, repos: Vec<Repository>) -> usize {
        if repos.is_empty() {
            return 0;
        }
        self.send(EnrichmentEvent::RepositoriesEnriched(repos))
    }

    fn send(&self, event: EnrichmentEvent) -> usize {
        // Err only means nobody is listening right now
        match self.sender.send(event) {
            Ok(count) => count,
            Err(_) => {
                debug!("Enrichment published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> EnrichmentSubscription {
        EnrichmentSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EnrichmentBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// One subscriber's view of the channel. Dropping it unsubscribes.
#[derive(Debug)]
pub struct EnrichmentSubscription {
    receiver: broadcast::Receiver<EnrichmentEvent>,
}

impl EnrichmentSubscription {
    /// Next event, or None once every broadcaster handle is gone
    pub async fn next(&mut self) -> Option<EnrichmentEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Enrichment subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
