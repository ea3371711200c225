// Nimbus Drive Debounced Search
// Each keystroke supersedes the previous pending search; only the last query
// that stays unchanged for the debounce delay reaches the backend.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::gateway::{DriveGateway, FileRecord};
use crate::notice::{Fallback, Notice};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    Results { query: String, records: Vec<FileRecord> },
    Failed { query: String, message: String },
    /// The query was emptied; drop any displayed results
    Cleared,
}

struct Pending {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Cancellable, debounced file search
///
/// Must be used from within a tokio runtime. Dropping the debouncer cancels
/// whatever is still pending.
pub struct SearchDebouncer {
    gateway: Arc<dyn DriveGateway>,
    delay: Duration,
    pending: Option<Pending>,
    events: mpsc::UnboundedSender<SearchEvent>,
}

impl SearchDebouncer {
    pub fn new(
        gateway: Arc<dyn DriveGateway>,
        delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SearchEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                gateway,
                delay,
                pending: None,
                events,
            },
            rx,
        )
    }

    /// Schedule a search for `query`, superseding any pending one
    pub fn submit(&mut self, query: &str) {
        self.cancel();

        let query = query.trim().to_string();
        if query.is_empty() {
            let _ = self.events.send(SearchEvent::Cleared);
            return;
        }

        let token = CancellationToken::new();
        let task_token = token.clone();
        let gateway = self.gateway.clone();
        let events = self.events.clone();
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            debug!("Searching for '{}'", query);
            let result = tokio::select! {
                _ = task_token.cancelled() => return,
                result = gateway.search_files(&query) => result,
            };

            let event = match result {
                Ok(records) => SearchEvent::Results { query, records },
                Err(e) => SearchEvent::Failed {
                    message: Notice::from_error(&e, &Fallback::SEARCH).message,
                    query,
                },
            };
            let _ = events.send(event);
        });

        self.pending = Some(Pending { token, handle });
    }

    /// Cancel the pending search, if any
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.token.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|p| !p.handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;
    use crate::gateway::GatewayError;

    fn gateway() -> Arc<MemoryGateway> {
        Arc::new(MemoryGateway::new(vec![
            FileRecord::file("1", "Report.pdf", 10),
            FileRecord::file("2", "Budget.xlsx", 10),
        ]))
    }

    fn search_calls(gateway: &MemoryGateway) -> Vec<String> {
        gateway
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("search"))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_last_query_is_sent() {
        let gw = gateway();
        let (mut search, mut rx) = SearchDebouncer::new(gw.clone(), DEFAULT_DEBOUNCE);

        search.submit("r");
        tokio::time::sleep(Duration::from_millis(100)).await;
        search.submit("re");
        tokio::time::sleep(Duration::from_millis(100)).await;
        search.submit("rep");

        let event = rx.recv().await.unwrap();
        match event {
            SearchEvent::Results { query, records } => {
                assert_eq!(query, "rep");
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].name, "Report.pdf");
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(search_calls(&gw), vec!["search rep"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_query_clears_and_cancels() {
        let gw = gateway();
        let (mut search, mut rx) = SearchDebouncer::new(gw.clone(), DEFAULT_DEBOUNCE);

        search.submit("budget");
        assert!(search.is_pending());
        search.submit("   ");
        assert_eq!(rx.recv().await.unwrap(), SearchEvent::Cleared);

        tokio::time::sleep(DEFAULT_DEBOUNCE * 2).await;
        assert!(search_calls(&gw).is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_search() {
        let gw = gateway();
        let (mut search, mut rx) = SearchDebouncer::new(gw.clone(), DEFAULT_DEBOUNCE);
        search.submit("report");
        drop(search);

        tokio::time::sleep(DEFAULT_DEBOUNCE * 2).await;
        assert!(search_calls(&gw).is_empty());
        // Sender side is gone, nothing was emitted
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_becomes_event() {
        let gw = gateway();
        gw.fail_next(GatewayError::Network("offline".into()));
        let (mut search, mut rx) = SearchDebouncer::new(gw.clone(), Duration::from_millis(50));
        search.submit("x");

        assert_eq!(
            rx.recv().await.unwrap(),
            SearchEvent::Failed {
                query: "x".into(),
                message: "Search failed".into()
            }
        );
    }
}
