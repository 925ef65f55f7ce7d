use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use super::{Link, TransportEvent};
use crate::http::SceneSource;

/// Poll the full document every `period` while the link is down.
///
/// A fetch that resolves after the link changed is discarded: the new epoch
/// brings its own snapshot.
pub async fn poll_while_down(
    source: Arc<dyn SceneSource>,
    period: Duration,
    link: watch::Receiver<Link>,
    events: mpsc::Sender<TransportEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => return,
        }
        let started = *link.borrow();
        if started.up {
            continue;
        }

        match source.fetch().await {
            Ok(doc) if *link.borrow() != started => {
                tracing::debug!(version = doc.version, "Link changed during poll, discarding");
            }
            Ok(doc) => {
                tracing::debug!(version = doc.version, items = doc.items.len(), "Polled scene");
                let polled = TransportEvent::Polled {
                    epoch: started.epoch,
                    doc,
                };
                if events.send(polled).await.is_err() {
                    return;
                }
            }
            Err(err) => tracing::warn!(%err, "Scene poll failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;
    use futures::future::BoxFuture;
    use overlay_proto::SceneDocument;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::ClientError;

    #[derive(Default)]
    struct CountingSource {
        fetches: AtomicUsize,
    }

    impl SceneSource for CountingSource {
        fn fetch(&self) -> BoxFuture<'_, Result<SceneDocument, ClientError>> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) as u64;
            async move { Ok(SceneDocument::new(Vec::new(), n + 1)) }.boxed()
        }
    }

    /// Fetch that reports when it starts and completes only when released.
    #[derive(Default)]
    struct GatedSource {
        started: Notify,
        release: Notify,
    }

    impl SceneSource for GatedSource {
        fn fetch(&self) -> BoxFuture<'_, Result<SceneDocument, ClientError>> {
            async move {
                self.started.notify_one();
                self.release.notified().await;
                Ok(SceneDocument::new(Vec::new(), 5))
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_only_while_down() {
        let source = Arc::new(CountingSource::default());
        let (link_tx, link_rx) = watch::channel(Link::down(3));
        let (event_tx, mut events) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(poll_while_down(
            source.clone(),
            Duration::from_secs(5),
            link_rx,
            event_tx,
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert!(events.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(matches!(
            events.try_recv(),
            Ok(TransportEvent::Polled { epoch: 3, doc }) if doc.version == 1
        ));

        link_tx.send(Link::up(4)).unwrap();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_polling() {
        let source = Arc::new(CountingSource::default());
        let (_link_tx, link_rx) = watch::channel(Link::default());
        let (event_tx, _events) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(poll_while_down(
            source.clone(),
            Duration::from_secs(5),
            link_rx,
            event_tx,
            shutdown_rx,
        ));
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_finishing_after_reconnect_is_discarded() {
        let source = Arc::new(GatedSource::default());
        let (link_tx, link_rx) = watch::channel(Link::down(1));
        let (event_tx, mut events) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(poll_while_down(
            source.clone(),
            Duration::from_secs(5),
            link_rx,
            event_tx,
            shutdown_rx,
        ));

        source.started.notified().await;
        link_tx.send(Link::up(2)).unwrap();
        source.release.notify_one();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(events.try_recv().is_err());
    }
}
