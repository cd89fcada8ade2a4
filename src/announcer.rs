//! Periodic tracker announces.
//!
//! One [`Announcer`] runs per tracker URL. It announces `Started` on entry,
//! then plain announces on the tracker's interval, `Completed` once the
//! download finishes, and a best-effort `Stopped` on shutdown. Failed
//! announces are retried under exponential backoff and never give up.
//!
//! Progress snapshots come from the download engine through a
//! request/response handshake so the reported numbers are always taken
//! between events, never mid-update.

use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng as _;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::config::AnnounceConfig;
use crate::shutdown;
use crate::tracker::{Tracker, TrackerEvent, Transfer};

/// A request for a progress snapshot, answered by the download engine.
#[derive(Debug)]
pub struct TransferRequest {
    pub reply: oneshot::Sender<Transfer>,
}

/// Exponential backoff for announce retries.
///
/// Each failure yields a jittered delay around the current interval, then
/// grows the interval by the multiplier up to the cap. There is no attempt
/// limit.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    multiplier: f64,
    randomization: f64,
    max: Duration,
    current: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, multiplier: f64, randomization: f64, max: Duration) -> Self {
        Self {
            initial,
            multiplier,
            randomization,
            max,
            current: initial,
        }
    }

    pub fn from_config(config: &AnnounceConfig) -> Self {
        Self::new(
            config.initial_interval,
            config.multiplier,
            config.randomization,
            config.max_interval,
        )
    }

    /// Restores the initial interval after a success.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    /// Returns the next delay and grows the interval.
    pub fn next(&mut self) -> Duration {
        let interval = self.randomized();
        self.current = Duration::min(self.current.mul_f64(self.multiplier), self.max);
        interval
    }

    fn randomized(&self) -> Duration {
        if self.randomization <= 0.0 {
            return self.current;
        }
        let delta = self.current.mul_f64(self.randomization);
        let low = self.current.saturating_sub(delta);
        let high = self.current + delta;
        let secs = rand::rng().random_range(low.as_secs_f64()..=high.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Announce actor for a single tracker.
pub struct Announcer {
    tracker: Arc<dyn Tracker>,
    transfers: mpsc::Sender<TransferRequest>,
    completed: Option<broadcast::Receiver<()>>,
    peer_tx: mpsc::Sender<Vec<SocketAddr>>,
    backoff: ExponentialBackoff,
    next_announce: Duration,
    stop_event_timeout: Duration,
}

impl Announcer {
    pub fn new(
        tracker: Arc<dyn Tracker>,
        transfers: mpsc::Sender<TransferRequest>,
        completed: broadcast::Receiver<()>,
        peer_tx: mpsc::Sender<Vec<SocketAddr>>,
        config: AnnounceConfig,
    ) -> Self {
        Self {
            tracker,
            transfers,
            completed: Some(completed),
            peer_tx,
            backoff: ExponentialBackoff::from_config(&config),
            next_announce: Duration::ZERO,
            stop_event_timeout: config.stop_event_timeout,
        }
    }

    /// Runs until shutdown or until the engine goes away.
    pub async fn run(mut self, mut stop: shutdown::Receiver) {
        self.backoff.reset();
        if self
            .announce(TrackerEvent::Started, &mut stop)
            .await
            .is_break()
        {
            self.finish(stop).await;
            return;
        }

        loop {
            tokio::select! {
                _ = stop.recv() => break,
                _ = tokio::time::sleep(self.next_announce) => {
                    if self.announce(TrackerEvent::None, &mut stop).await.is_break() {
                        break;
                    }
                }
                fired = Self::completed_signal(&mut self.completed) => {
                    if fired
                        && self
                            .announce(TrackerEvent::Completed, &mut stop)
                            .await
                            .is_break()
                    {
                        break;
                    }
                    // fires at most once
                    self.completed = None;
                }
            }
        }

        self.finish(stop).await;
    }

    async fn completed_signal(completed: &mut Option<broadcast::Receiver<()>>) -> bool {
        match completed {
            Some(rx) => rx.recv().await.is_ok(),
            None => std::future::pending().await,
        }
    }

    async fn announce(
        &mut self,
        event: TrackerEvent,
        stop: &mut shutdown::Receiver,
    ) -> ControlFlow<()> {
        let transfer = tokio::select! {
            _ = stop.recv() => return ControlFlow::Break(()),
            transfer = self.request_transfer() => match transfer {
                Some(transfer) => transfer,
                // engine gone
                None => return ControlFlow::Break(()),
            },
        };

        let result = tokio::select! {
            _ = stop.recv() => return ControlFlow::Break(()),
            result = self.tracker.announce(transfer, event) => result,
        };

        match result {
            Err(error) => {
                warn!(event = event.as_str(), %error, "announce failed");
                self.next_announce = self.backoff.next();
            }
            Ok(response) => {
                self.backoff.reset();
                self.next_announce = response.interval;
                tokio::select! {
                    _ = stop.recv() => return ControlFlow::Break(()),
                    _ = self.peer_tx.send(response.peers) => {}
                }
            }
        }
        ControlFlow::Continue(())
    }

    async fn request_transfer(&self) -> Option<Transfer> {
        let (reply, rx) = oneshot::channel();
        if self.transfers.send(TransferRequest { reply }).await.is_err() {
            return None;
        }
        rx.await.ok()
    }

    async fn finish(mut self, stop: shutdown::Receiver) {
        if stop.is_shutdown() {
            let deadline = self.stop_event_timeout;
            if tokio::time::timeout(deadline, self.announce_stopped())
                .await
                .is_err()
            {
                debug!("stopped announce timed out");
            }
        }
        self.tracker.close().await;
    }

    async fn announce_stopped(&mut self) {
        let Some(transfer) = self.request_transfer().await else {
            return;
        };
        if let Err(error) = self.tracker.announce(transfer, TrackerEvent::Stopped).await {
            debug!(%error, "stopped announce failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::PeerId;
    use crate::tracker::{AnnounceResponse, TrackerError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn backoff_growth_is_capped() {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_secs(5),
            2.0,
            0.0,
            Duration::from_secs(40),
        );
        assert_eq!(backoff.next(), Duration::from_secs(5));
        assert_eq!(backoff.next(), Duration::from_secs(10));
        assert_eq!(backoff.next(), Duration::from_secs(20));
        assert_eq!(backoff.next(), Duration::from_secs(40));
        assert_eq!(backoff.next(), Duration::from_secs(40));
        backoff.reset();
        assert_eq!(backoff.next(), Duration::from_secs(5));
    }

    #[test]
    fn backoff_jitter_stays_in_bounds() {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_secs(10),
            2.0,
            0.5,
            Duration::from_secs(3600),
        );
        for _ in 0..50 {
            backoff.reset();
            let delay = backoff.next();
            assert!(delay >= Duration::from_secs(5), "delay {:?}", delay);
            assert!(delay <= Duration::from_secs(15), "delay {:?}", delay);
        }
    }

    struct FakeTracker {
        responses: Mutex<VecDeque<Result<AnnounceResponse, TrackerError>>>,
        events: mpsc::UnboundedSender<TrackerEvent>,
        closed: AtomicBool,
    }

    impl FakeTracker {
        fn new(
            responses: Vec<Result<AnnounceResponse, TrackerError>>,
        ) -> (Arc<Self>, mpsc::UnboundedReceiver<TrackerEvent>) {
            let (events, rx) = mpsc::unbounded_channel();
            (
                Arc::new(Self {
                    responses: Mutex::new(responses.into()),
                    events,
                    closed: AtomicBool::new(false),
                }),
                rx,
            )
        }

        fn ok(interval: Duration) -> Result<AnnounceResponse, TrackerError> {
            Ok(AnnounceResponse {
                interval,
                peers: vec!["10.0.0.1:6881".parse().unwrap()],
            })
        }
    }

    #[async_trait]
    impl Tracker for FakeTracker {
        async fn announce(
            &self,
            _transfer: Transfer,
            event: TrackerEvent,
        ) -> Result<AnnounceResponse, TrackerError> {
            let _ = self.events.send(event);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Self::ok(Duration::from_secs(1800)))
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn spawn_engine_stub(mut requests: mpsc::Receiver<TransferRequest>) {
        tokio::spawn(async move {
            while let Some(request) = requests.recv().await {
                let _ = request.reply.send(Transfer {
                    info_hash: [1; 20],
                    peer_id: PeerId::generate(),
                    port: 6881,
                    uploaded: 0,
                    downloaded: 0,
                    left: 100,
                });
            }
        });
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<TrackerEvent>) -> TrackerEvent {
        tokio::time::timeout(Duration::from_secs(7200), rx.recv())
            .await
            .expect("no announce within deadline")
            .expect("tracker dropped")
    }

    #[tokio::test(start_paused = true)]
    async fn announcer_lifecycle() {
        let (tracker, mut events) = FakeTracker::new(vec![]);
        let (transfers_tx, transfers_rx) = mpsc::channel(1);
        let (completed_tx, completed_rx) = broadcast::channel(1);
        let (peer_tx, mut peer_rx) = mpsc::channel(16);
        let (stop_tx, stop_rx) = shutdown::channel();

        spawn_engine_stub(transfers_rx);
        let announcer = Announcer::new(
            tracker.clone(),
            transfers_tx,
            completed_rx,
            peer_tx,
            AnnounceConfig::default(),
        );
        let task = tokio::spawn(announcer.run(stop_rx));

        assert_eq!(next_event(&mut events).await, TrackerEvent::Started);
        assert_eq!(peer_rx.recv().await.unwrap().len(), 1);

        completed_tx.send(()).unwrap();
        loop {
            // plain announces may interleave while time advances
            match next_event(&mut events).await {
                TrackerEvent::Completed => break,
                TrackerEvent::None => continue,
                other => panic!("unexpected event {:?}", other),
            }
        }

        stop_tx.shutdown();
        loop {
            match next_event(&mut events).await {
                TrackerEvent::Stopped => break,
                TrackerEvent::None => continue,
                other => panic!("unexpected event {:?}", other),
            }
        }
        task.await.unwrap();
        assert!(tracker.closed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_announce_is_retried() {
        let (tracker, mut events) = FakeTracker::new(vec![
            Err(TrackerError::Timeout),
            FakeTracker::ok(Duration::from_secs(1800)),
        ]);
        let (transfers_tx, transfers_rx) = mpsc::channel(1);
        let (_completed_tx, completed_rx) = broadcast::channel(1);
        let (peer_tx, _peer_rx) = mpsc::channel(16);
        let (stop_tx, stop_rx) = shutdown::channel();

        spawn_engine_stub(transfers_rx);
        let announcer = Announcer::new(
            tracker,
            transfers_tx,
            completed_rx,
            peer_tx,
            AnnounceConfig::default(),
        );
        let task = tokio::spawn(announcer.run(stop_rx));

        assert_eq!(next_event(&mut events).await, TrackerEvent::Started);
        // the retry comes as a plain announce after the backoff delay
        assert_eq!(next_event(&mut events).await, TrackerEvent::None);

        stop_tx.shutdown();
        task.await.unwrap();
    }
}
