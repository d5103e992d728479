use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    activity::ActivityType,
    clock::{Clock, SystemClock},
    geodesy,
    position_fix::PositionFix,
    summary::ActivitySummary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Inactive,
    Active,
    Paused,
    Stopped,
}

/// Accumulated metrics of one tracked activity.
///
/// Distance and elevation gain only ever grow while the session is active and unpaused.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    pub activity_type: ActivityType,
    pub start_time: DateTime<Utc>,
    pub paused_duration: TimeDelta,
    pub total_distance_m: f64,
    pub elevation_gain_m: f64,
    pub current_speed_mps: f64,
    pub last_fix: Option<PositionFix>,
    samples: Vec<PositionFix>,
    pause_started: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

impl TrackingSession {
    fn new(activity_type: ActivityType, start_time: DateTime<Utc>) -> Self {
        Self {
            activity_type,
            start_time,
            paused_duration: TimeDelta::zero(),
            total_distance_m: 0.0,
            elevation_gain_m: 0.0,
            current_speed_mps: 0.0,
            last_fix: None,
            samples: Vec::new(),
            pause_started: None,
            stopped_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.stopped_at.is_some() {
            SessionState::Stopped
        } else if self.pause_started.is_some() {
            SessionState::Paused
        } else {
            SessionState::Active
        }
    }

    /// The fixes that contributed to this session, in arrival order.
    pub fn samples(&self) -> &[PositionFix] {
        &self.samples
    }

    /// (now - start) - paused, where an open pause counts up to `now`. Frozen once stopped.
    pub fn elapsed(&self, now: DateTime<Utc>) -> TimeDelta {
        let end = self.stopped_at.unwrap_or(now);
        let open_pause = self
            .pause_started
            .map(|since| end.signed_duration_since(since))
            .unwrap_or_else(TimeDelta::zero);

        let elapsed = end.signed_duration_since(self.start_time) - self.paused_duration - open_pause;
        elapsed.max(TimeDelta::zero())
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        let elapsed = self.elapsed(now);
        let seconds = elapsed.num_milliseconds() as f64 / 1000.0;
        let average_speed_mps = if seconds > 0.0 { self.total_distance_m / seconds } else { 0.0 };

        SessionSnapshot {
            activity_type: self.activity_type,
            state: self.state(),
            elapsed,
            total_distance_m: self.total_distance_m,
            elevation_gain_m: self.elevation_gain_m,
            current_speed_mps: self.current_speed_mps,
            average_speed_mps,
            sample_count: self.samples.len(),
        }
    }

    fn record(&mut self, fix: PositionFix) {
        if let Some(last) = self.last_fix {
            self.total_distance_m += geodesy::distance_m(last.point(), fix.point());

            if let (Some(previous), Some(current)) = (last.altitude, fix.altitude) {
                let climb = current - previous;
                if climb > 0.0 {
                    self.elevation_gain_m += climb;
                }
            }
        }

        if let Some(speed) = fix.speed {
            self.current_speed_mps = speed;
        }

        self.last_fix = Some(fix);
        self.samples.push(fix);
    }
}

/// Point in time read of a session's metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    pub activity_type: ActivityType,
    pub state: SessionState,
    pub elapsed: TimeDelta,
    pub total_distance_m: f64,
    pub elevation_gain_m: f64,
    pub current_speed_mps: f64,
    pub average_speed_mps: f64,
    pub sample_count: usize,
}

impl SessionSnapshot {
    pub fn idle(activity_type: ActivityType) -> Self {
        Self {
            activity_type,
            state: SessionState::Inactive,
            elapsed: TimeDelta::zero(),
            total_distance_m: 0.0,
            elevation_gain_m: 0.0,
            current_speed_mps: 0.0,
            average_speed_mps: 0.0,
            sample_count: 0,
        }
    }

    pub fn current_speed_kmh(&self) -> f64 {
        self.current_speed_mps * 3.6
    }

    pub fn average_speed_kmh(&self) -> f64 {
        self.average_speed_mps * 3.6
    }

    /// Seconds per kilometer over the whole session, `None` before any distance is covered.
    pub fn pace_s_per_km(&self) -> Option<f64> {
        if self.total_distance_m <= 0.0 {
            return None;
        }
        let seconds = self.elapsed.num_milliseconds() as f64 / 1000.0;
        Some(seconds / (self.total_distance_m / 1000.0))
    }

    /// Pace as `M:SS` per km.
    pub fn formatted_pace(&self) -> Option<String> {
        self.pace_s_per_km().map(|pace| {
            let whole = pace as i64;
            format!("{}:{:02}", whole / 60, whole % 60)
        })
    }

    /// Elapsed time as `HH:MM:SS`.
    pub fn formatted_elapsed(&self) -> String {
        let seconds = self.elapsed.num_seconds();
        format!("{:02}:{:02}:{:02}", seconds / 3600, (seconds / 60) % 60, seconds % 60)
    }
}

/// Turns a stream of position fixes into activity metrics.
///
/// Fixes are pushed one at a time through [`LocationAggregator::on_fix`]; readers pull
/// [`SessionSnapshot`] values which are plain copies and never observe a half applied fix.
pub struct LocationAggregator<C: Clock = SystemClock> {
    clock: C,
    session: Option<TrackingSession>,
}

impl LocationAggregator<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for LocationAggregator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> LocationAggregator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock, session: None }
    }

    pub fn state(&self) -> SessionState {
        self.session.as_ref().map(|session| session.state()).unwrap_or(SessionState::Inactive)
    }

    pub fn session(&self) -> Option<&TrackingSession> {
        self.session.as_ref()
    }

    /// Begins a fresh session. A stopped session is replaced; a running one is left alone.
    pub fn start(&mut self, activity_type: ActivityType) {
        if matches!(self.state(), SessionState::Active | SessionState::Paused) {
            tracing::warn!("Tracking already started, ignoring start of {}", activity_type);
            return;
        }

        let now = self.clock.now();
        self.session = Some(TrackingSession::new(activity_type, now));
        tracing::info!("Started tracking {} at {}", activity_type, now);
    }

    /// Fixes arriving while inactive, paused or stopped are dropped without touching any state.
    pub fn on_fix(&mut self, fix: PositionFix) {
        let Some(session) = self.session.as_mut().filter(|session| session.state() == SessionState::Active) else {
            tracing::debug!("Ignoring fix at {} while not actively tracking", fix.timestamp);
            return;
        };

        session.record(fix);
        tracing::debug!(
            "Fix {:.6},{:.6}: distance {:.1} m, elevation gain {:.1} m",
            fix.latitude,
            fix.longitude,
            session.total_distance_m,
            session.elevation_gain_m
        );
    }

    pub fn pause(&mut self) {
        let now = self.clock.now();
        match self.session.as_mut() {
            Some(session) if session.state() == SessionState::Active => {
                session.pause_started = Some(now);
                tracing::info!("Tracking paused");
            }
            _ => tracing::warn!("Pause requested while not actively tracking"),
        }
    }

    pub fn resume(&mut self) {
        let now = self.clock.now();
        match self.session.as_mut() {
            Some(session) if session.state() == SessionState::Paused => {
                if let Some(since) = session.pause_started.take() {
                    session.paused_duration += now.signed_duration_since(since).max(TimeDelta::zero());
                }
                tracing::info!("Tracking resumed");
            }
            _ => tracing::warn!("Resume requested while not paused"),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        match &self.session {
            Some(session) => session.snapshot(self.clock.now()),
            None => SessionSnapshot::idle(ActivityType::default()),
        }
    }

    /// Freezes the session and returns its final metrics. `None` if tracking never started.
    /// Stopping twice returns the same frozen snapshot.
    pub fn stop(&mut self) -> Option<SessionSnapshot> {
        let now = self.clock.now();
        let session = self.session.as_mut()?;

        if session.stopped_at.is_none() {
            if let Some(since) = session.pause_started.take() {
                session.paused_duration += now.signed_duration_since(since).max(TimeDelta::zero());
            }
            session.stopped_at = Some(now);
            tracing::info!(
                "Stopped tracking. Points: {}, Distance: {:.1} m",
                session.samples.len(),
                session.total_distance_m
            );
        }

        Some(session.snapshot(now))
    }

    /// Upload record of a stopped session. `None` while running or when no fix was recorded.
    pub fn summary(&self) -> Option<ActivitySummary> {
        let session = self.session.as_ref().filter(|session| session.state() == SessionState::Stopped)?;

        if session.samples.is_empty() {
            tracing::warn!("No location points to save");
            return None;
        }

        let elapsed = session.elapsed(self.clock.now());
        Some(ActivitySummary::new(
            session.activity_type,
            session.start_time,
            elapsed.num_seconds(),
            session.total_distance_m,
            session.elevation_gain_m,
            &session.samples,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, geodesy::tests::equator_lon};

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_714_550_400, 0).unwrap()
    }

    fn started(activity: ActivityType) -> (ManualClock, LocationAggregator<ManualClock>) {
        let clock = ManualClock::new(t0());
        let mut aggregator = LocationAggregator::with_clock(clock.clone());
        aggregator.start(activity);
        (clock, aggregator)
    }

    fn fix_east(meters: f64, seconds: i64) -> PositionFix {
        PositionFix::new(0.0, equator_lon(meters), t0() + TimeDelta::seconds(seconds))
    }

    #[test]
    fn fixes_before_start_are_ignored() {
        let mut aggregator = LocationAggregator::with_clock(ManualClock::new(t0()));
        aggregator.on_fix(fix_east(0.0, 0));
        aggregator.on_fix(fix_east(50.0, 1));

        assert_eq!(aggregator.state(), SessionState::Inactive);
        assert_eq!(aggregator.snapshot(), SessionSnapshot::idle(ActivityType::Run));
        assert!(aggregator.stop().is_none());
    }

    #[test]
    fn distance_is_sum_of_consecutive_fix_distances() {
        let (_, mut aggregator) = started(ActivityType::Run);
        let fixes = [
            PositionFix::new(55.6761, 12.5683, t0()),
            PositionFix::new(55.6770, 12.5690, t0() + TimeDelta::seconds(5)),
            PositionFix::new(55.6775, 12.5712, t0() + TimeDelta::seconds(10)),
            PositionFix::new(55.6771, 12.5730, t0() + TimeDelta::seconds(15)),
        ];

        for fix in fixes {
            aggregator.on_fix(fix);
        }

        let expected: f64 = fixes
            .windows(2)
            .map(|pair| geodesy::distance_m(pair[0].point(), pair[1].point()))
            .sum();
        assert!((aggregator.snapshot().total_distance_m - expected).abs() < 1e-9);
        assert_eq!(aggregator.snapshot().sample_count, 4);
    }

    #[test]
    fn pause_between_fixes_keeps_full_distance() {
        let (clock, mut aggregator) = started(ActivityType::Run);

        aggregator.on_fix(fix_east(0.0, 0));
        aggregator.on_fix(fix_east(100.0, 30));

        aggregator.pause();
        // Ignored while paused, and does not become the delta origin
        aggregator.on_fix(fix_east(5_000.0, 60));
        clock.advance(TimeDelta::seconds(120));
        aggregator.resume();

        aggregator.on_fix(fix_east(250.0, 150));

        let snapshot = aggregator.snapshot();
        assert!((snapshot.total_distance_m - 250.0).abs() < 1e-6, "got {}", snapshot.total_distance_m);
        assert_eq!(snapshot.sample_count, 3);
    }

    #[test]
    fn elapsed_excludes_paused_time() {
        let (clock, mut aggregator) = started(ActivityType::Ride);

        clock.advance(TimeDelta::seconds(60));
        aggregator.pause();
        clock.advance(TimeDelta::seconds(30));
        assert_eq!(aggregator.snapshot().elapsed, TimeDelta::seconds(60));
        assert_eq!(aggregator.snapshot().state, SessionState::Paused);

        aggregator.resume();
        clock.advance(TimeDelta::seconds(40));
        aggregator.pause();
        clock.advance(TimeDelta::seconds(10));
        aggregator.resume();
        clock.advance(TimeDelta::seconds(5));

        // 145 - (30 + 10)
        assert_eq!(aggregator.snapshot().elapsed, TimeDelta::seconds(105));
    }

    #[test]
    fn repeated_pause_and_stray_resume_are_noops() {
        let (clock, mut aggregator) = started(ActivityType::Walk);

        aggregator.resume();
        clock.advance(TimeDelta::seconds(10));
        aggregator.pause();
        clock.advance(TimeDelta::seconds(10));
        aggregator.pause();
        clock.advance(TimeDelta::seconds(10));
        aggregator.resume();

        assert_eq!(aggregator.snapshot().elapsed, TimeDelta::seconds(10));
    }

    #[test]
    fn elevation_gain_counts_only_climbs_with_known_altitude() {
        let (_, mut aggregator) = started(ActivityType::Ride);

        aggregator.on_fix(fix_east(0.0, 0).with_altitude(100.0));
        aggregator.on_fix(fix_east(10.0, 1).with_altitude(104.5));
        aggregator.on_fix(fix_east(20.0, 2).with_altitude(101.0));
        aggregator.on_fix(fix_east(30.0, 3));
        aggregator.on_fix(fix_east(40.0, 4).with_altitude(150.0));
        aggregator.on_fix(fix_east(50.0, 5).with_altitude(152.0));

        assert!((aggregator.snapshot().elevation_gain_m - 6.5).abs() < 1e-9);
    }

    #[test]
    fn current_speed_persists_until_next_reported_speed() {
        let (_, mut aggregator) = started(ActivityType::Run);

        aggregator.on_fix(fix_east(0.0, 0).with_speed(3.0));
        aggregator.on_fix(fix_east(10.0, 1));
        assert_eq!(aggregator.snapshot().current_speed_mps, 3.0);
        assert!((aggregator.snapshot().current_speed_kmh() - 10.8).abs() < 1e-9);

        aggregator.on_fix(fix_east(20.0, 2).with_speed(4.0));
        assert_eq!(aggregator.snapshot().current_speed_mps, 4.0);
    }

    #[test]
    fn average_speed_is_distance_over_elapsed() {
        let (clock, mut aggregator) = started(ActivityType::Run);
        assert_eq!(aggregator.snapshot().average_speed_mps, 0.0);

        aggregator.on_fix(fix_east(0.0, 0));
        aggregator.on_fix(fix_east(1_000.0, 250));
        clock.advance(TimeDelta::seconds(250));

        let snapshot = aggregator.snapshot();
        assert!((snapshot.average_speed_mps - 4.0).abs() < 1e-6);
        assert!((snapshot.pace_s_per_km().unwrap() - 250.0).abs() < 1e-6);
        assert_eq!(snapshot.formatted_pace().as_deref(), Some("4:10"));
        assert_eq!(snapshot.formatted_elapsed(), "00:04:10");
    }

    #[test]
    fn stop_freezes_metrics() {
        let (clock, mut aggregator) = started(ActivityType::Run);

        aggregator.on_fix(fix_east(0.0, 0));
        aggregator.on_fix(fix_east(100.0, 20));
        clock.advance(TimeDelta::seconds(20));
        aggregator.pause();
        clock.advance(TimeDelta::seconds(5));

        let final_snapshot = aggregator.stop().unwrap();
        assert_eq!(final_snapshot.state, SessionState::Stopped);
        assert_eq!(final_snapshot.elapsed, TimeDelta::seconds(20));

        clock.advance(TimeDelta::hours(1));
        aggregator.on_fix(fix_east(900.0, 4_000));

        assert_eq!(aggregator.snapshot(), final_snapshot);
        assert_eq!(aggregator.stop(), Some(final_snapshot));
    }

    #[test]
    fn summary_requires_stop_and_samples() {
        let (clock, mut aggregator) = started(ActivityType::Walk);
        aggregator.stop();
        assert!(aggregator.summary().is_none());

        aggregator.start(ActivityType::Walk);
        aggregator.on_fix(fix_east(0.0, 0).with_altitude(3.0));
        aggregator.on_fix(fix_east(200.0, 95).with_altitude(5.0));
        assert!(aggregator.summary().is_none());

        clock.advance(TimeDelta::seconds(100));
        aggregator.stop();

        let summary = aggregator.summary().unwrap();
        assert_eq!(summary.activity_type, ActivityType::Walk);
        assert_eq!(summary.elapsed_time, 100);
        assert!((summary.distance - 200.0).abs() < 1e-6);
        assert_eq!(summary.total_elevation_gain, 2.0);
        assert_eq!(summary.time, vec![0, 95]);
        assert_eq!(summary.altitude, vec![3.0, 5.0]);
    }

    #[test]
    fn restart_after_stop_resets_accumulators() {
        let (_, mut aggregator) = started(ActivityType::Run);
        aggregator.on_fix(fix_east(0.0, 0));
        aggregator.on_fix(fix_east(100.0, 10));
        aggregator.stop();

        aggregator.start(ActivityType::Ride);
        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.activity_type, ActivityType::Ride);
        assert_eq!(snapshot.total_distance_m, 0.0);
        assert_eq!(snapshot.sample_count, 0);
        assert_eq!(snapshot.state, SessionState::Active);
    }
}
