//! Hosts the journal service.

use crate::config::JournalArgs;
use anyhow::{Context, Result};
use showdown_core::{Journal, JournalService};
use showdown_env::rpc::serve;
use showdown_env::{CancellationToken, JournalRequest, JournalTransport};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Serves appends until `shutdown` fires, then closes the journal.
pub async fn run(args: JournalArgs, shutdown: CancellationToken) -> Result<()> {
    std::fs::create_dir_all(&args.dir)
        .with_context(|| format!("failed to create journal directory {}", args.dir.display()))?;
    let journal = Arc::new(Journal::open(&args.dir).context("failed to open journal")?);
    if args.reset {
        journal.reset().context("failed to reset journal")?;
    }

    let listener = TcpListener::bind((args.bind.as_str(), args.port))
        .await
        .with_context(|| format!("failed to bind journal port {}:{}", args.bind, args.port))?;
    let addr = listener.local_addr()?;

    let service = Arc::new(JournalService::new(journal.clone()));
    service
        .append(JournalRequest::message(format!("journal service listening on {addr}")))
        .await
        .context("failed to record startup event")?;
    info!(%addr, path = %journal.path().display(), "Journal service started");

    serve(listener, service, shutdown).await?;

    journal.close().context("failed to close journal")?;
    info!("Journal service stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use showdown_core::read_records;
    use showdown_env::TcpJournalClient;
    use std::time::Duration;

    #[tokio::test]
    async fn test_serves_until_cancelled() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("journal");

        // Find a free port, then hand it to the service.
        let port = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };
        let args = JournalArgs {
            port,
            dir: dir.clone(),
            reset: false,
            bind: "127.0.0.1".into(),
            log: Default::default(),
        };
        let token = CancellationToken::new();
        let host = tokio::spawn(run(args, token.clone()));

        let client = TcpJournalClient::new(format!("127.0.0.1:{port}"));
        let mut reply = None;
        for _ in 0..50 {
            match client.append(JournalRequest::message("Doc was initialized")).await {
                Ok(r) => {
                    reply = Some(r);
                    break;
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        }
        assert!(reply.unwrap().offset > 0);

        token.cancel();
        host.await.unwrap().unwrap();

        let records = read_records(&dir.join(showdown_core::JOURNAL_FILE)).unwrap();
        assert!(records[0].message.starts_with("journal service listening on"));
        assert_eq!(records[1].message, "Doc was initialized");
    }
}
