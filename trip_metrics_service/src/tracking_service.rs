use std::time::Duration;

use tokio::{
    sync::{mpsc, oneshot, watch},
    time::MissedTickBehavior,
};
use trip_metrics_lib::{
    activity::ActivityType,
    aggregator::{LocationAggregator, SessionSnapshot},
    clock::Clock,
    configuration::TrackerConfig,
    navigation::{NavigationSnapshot, RouteTracker},
    position_fix::PositionFix,
    route::Route,
    summary::ActivitySummary,
};

use crate::ServiceError;

enum Command {
    Fix(PositionFix),
    Pause,
    Resume,
    Stop(oneshot::Sender<Option<ActivitySummary>>),
}

/// Everything the presentation layer shows, published as one value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveSnapshot {
    pub session: SessionSnapshot,
    pub navigation: Option<NavigationSnapshot>,
    pub fixes_received: u64,
}

/// Handle to a running tracking session.
///
/// Fixes and commands go through a bounded channel into a single task that owns the
/// aggregator and route tracker, so they are applied strictly one at a time. Readers get
/// whole [`LiveSnapshot`] values from a watch channel, republished after every command and
/// on a fixed interval so elapsed time keeps moving while the location source is silent.
///
/// Dropping every handle stops the session.
#[derive(Clone)]
pub struct TrackingService {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<LiveSnapshot>,
}

impl TrackingService {
    pub async fn start<C>(
        config: &TrackerConfig,
        activity_type: ActivityType,
        route: Option<Route>,
        clock: C,
    ) -> Result<Self, ServiceError>
    where
        C: Clock + Send + 'static,
    {
        if config.command_buffer == 0 {
            return Err(ServiceError::InvalidConfig("command_buffer must be positive".into()));
        }
        if config.snapshot_interval_ms == 0 {
            return Err(ServiceError::InvalidConfig("snapshot_interval_ms must be positive".into()));
        }

        let navigator = match route {
            Some(route) => {
                let mut tracker = RouteTracker::new(config.waypoint_radius_m);
                tracker.load(route).map_err(|e| ServiceError::Navigation(e.to_string()))?;
                tracker.start().map_err(|e| ServiceError::Navigation(e.to_string()))?;
                Some(tracker)
            }
            None => None,
        };

        let mut aggregator = LocationAggregator::with_clock(clock);
        aggregator.start(activity_type);

        let worker = Worker {
            aggregator,
            navigator,
            fixes_received: 0,
        };

        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        let (snapshot_tx, snapshot_rx) = watch::channel(worker.snapshot());

        tokio::spawn(worker.run(
            command_rx,
            snapshot_tx,
            Duration::from_millis(config.snapshot_interval_ms),
        ));

        Ok(Self {
            commands: command_tx,
            snapshots: snapshot_rx,
        })
    }

    pub async fn push_fix(&self, fix: PositionFix) -> Result<(), ServiceError> {
        self.send(Command::Fix(fix)).await
    }

    pub async fn pause(&self) -> Result<(), ServiceError> {
        self.send(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<(), ServiceError> {
        self.send(Command::Resume).await
    }

    /// Ends the session and hands back the upload record, if any fix was recorded.
    pub async fn stop(&self) -> Result<Option<ActivitySummary>, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Stop(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| ServiceError::ChannelClosed("no reply to stop".into()))
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> LiveSnapshot {
        *self.snapshots.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveSnapshot> {
        self.snapshots.clone()
    }

    /// Waits until the task has taken in at least `count` fixes.
    pub async fn wait_for_fixes(&self, count: u64) -> Result<LiveSnapshot, ServiceError> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|snapshot| snapshot.fixes_received >= count)
            .await
            .map(|snapshot| *snapshot)
            .map_err(|_| ServiceError::ChannelClosed(format!("stopped before {} fixes arrived", count)))?;
        Ok(snapshot)
    }

    async fn send(&self, command: Command) -> Result<(), ServiceError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ServiceError::ChannelClosed("session already stopped".into()))
    }
}

struct Worker<C: Clock> {
    aggregator: LocationAggregator<C>,
    navigator: Option<RouteTracker>,
    fixes_received: u64,
}

impl<C: Clock> Worker<C> {
    fn snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            session: self.aggregator.snapshot(),
            navigation: self.navigator.as_ref().map(|navigator| navigator.snapshot()),
            fixes_received: self.fixes_received,
        }
    }

    fn stop(&mut self) {
        self.aggregator.stop();
        if let Some(navigator) = self.navigator.as_mut() {
            navigator.stop();
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        snapshots: watch::Sender<LiveSnapshot>,
        interval: Duration,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        tracing::info!("All tracking handles dropped, stopping session");
                        self.stop();
                        snapshots.send_replace(self.snapshot());
                        break;
                    };

                    match command {
                        Command::Fix(fix) => {
                            self.fixes_received += 1;
                            self.aggregator.on_fix(fix);
                            if let Some(navigator) = self.navigator.as_mut() {
                                navigator.on_fix(fix);
                            }
                        }
                        Command::Pause => {
                            self.aggregator.pause();
                            if let Some(navigator) = self.navigator.as_mut() {
                                navigator.pause();
                            }
                        }
                        Command::Resume => {
                            self.aggregator.resume();
                            if let Some(navigator) = self.navigator.as_mut() {
                                navigator.resume();
                            }
                        }
                        Command::Stop(reply) => {
                            self.stop();
                            snapshots.send_replace(self.snapshot());
                            if reply.send(self.aggregator.summary()).is_err() {
                                tracing::warn!("Stop requester went away before the summary was ready");
                            }
                            break;
                        }
                    }

                    snapshots.send_replace(self.snapshot());
                }
                _ = ticker.tick() => {
                    snapshots.send_replace(self.snapshot());
                }
            }
        }

        tracing::info!("Tracking session ended after {} fixes", self.fixes_received);
    }
}
