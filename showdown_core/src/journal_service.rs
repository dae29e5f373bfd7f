//! The journal behind the journal-append call.
//!
//! Serves remote appends (`RequestHandler`) and, for in-process callers such
//! as the journal host itself or the simulator, acts as a `JournalTransport`
//! directly.

use crate::journal::Journal;
use async_trait::async_trait;
use showdown_env::{EnvError, JournalRequest, JournalResponse, JournalTransport, RequestHandler};
use std::sync::Arc;
use tracing::info;

/// Journal service wrapping one [`Journal`].
#[derive(Clone)]
pub struct JournalService {
    journal: Arc<Journal>,
}

impl JournalService {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self { journal }
    }

    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    async fn record(&self, request: JournalRequest) -> Result<JournalResponse, EnvError> {
        let journal = Arc::clone(&self.journal);
        let payload = request.payload;
        let (offset, message) = tokio::task::spawn_blocking(move || {
            let message = String::from_utf8_lossy(&payload).into_owned();
            journal.append(&message).map(|offset| (offset, message))
        })
        .await
        .map_err(|e| EnvError::Remote(format!("journal task failed: {e}")))?
        .map_err(|e| EnvError::Remote(e.to_string()))?;

        info!(offset, %message, "Recorded");
        Ok(JournalResponse { offset })
    }
}

#[async_trait]
impl RequestHandler for JournalService {
    type Request = JournalRequest;
    type Response = JournalResponse;

    async fn handle(&self, request: JournalRequest) -> Result<JournalResponse, EnvError> {
        self.record(request).await
    }
}

#[async_trait]
impl JournalTransport for JournalService {
    async fn append(&self, request: JournalRequest) -> Result<JournalResponse, EnvError> {
        self.record(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use showdown_env::rpc::serve;
    use showdown_env::{CancellationToken, TcpJournalClient};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_in_process_append() {
        let dir = tempfile::tempdir().unwrap();
        let service = JournalService::new(Arc::new(Journal::open(dir.path()).unwrap()));

        let a = service.append(JournalRequest::message("first")).await.unwrap();
        let b = service.append(JournalRequest::message("second")).await.unwrap();
        assert_eq!(a.offset, 0);
        assert!(b.offset > a.offset);
        assert_eq!(service.journal().records().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_remote_append_over_tcp() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Arc::new(Journal::open(dir.path()).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let token = CancellationToken::new();
        let server = tokio::spawn(serve(
            listener,
            Arc::new(JournalService::new(journal.clone())),
            token.clone(),
        ));

        let client = TcpJournalClient::new(addr);
        let reply = client
            .append(JournalRequest::message("Doc was initialized"))
            .await
            .unwrap();
        assert_eq!(reply.offset, 0);

        token.cancel();
        server.await.unwrap().unwrap();
        assert_eq!(journal.records().unwrap()[0].message, "Doc was initialized");
    }

    #[tokio::test]
    async fn test_closed_journal_surfaces_error_to_caller() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Arc::new(Journal::open(dir.path()).unwrap());
        journal.close().unwrap();
        let service = JournalService::new(journal);

        let err = service.append(JournalRequest::message("late")).await.unwrap_err();
        assert!(matches!(err, EnvError::Remote(ref m) if m.contains("closed")));
    }
}
