use std::fmt;

use crate::{
    geodesy::{self, CompassDirection},
    position_fix::PositionFix,
    route::{leg_distances, Route},
};

/// A waypoint counts as reached once a fix lands closer than this.
pub const WAYPOINT_RADIUS_M: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationStatus {
    Idle,
    Navigating,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavigationError {
    NoRoute(String),
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::NoRoute(reason) => write!(f, "No route: {}", reason),
        }
    }
}

impl std::error::Error for NavigationError {}

/// Buckets a turn angle. Anything outside the two 90° wide windows is treated as straight on.
pub fn classify_turn(delta_deg: f64) -> Option<Turn> {
    let delta = geodesy::normalize_deg(delta_deg);
    if delta > 45.0 && delta < 135.0 {
        Some(Turn::Right)
    } else if delta > 225.0 && delta < 315.0 {
        Some(Turn::Left)
    } else {
        None
    }
}

/// Turn from following the previous leg to heading for the next waypoint.
pub fn turn_between(bearing_to_next: f64, leg_bearing: f64) -> Option<Turn> {
    classify_turn(bearing_to_next - leg_bearing + 360.0)
}

/// Progress along a loaded route.
#[derive(Debug, Clone)]
pub struct NavigationState {
    pub route: Route,
    pub current_waypoint_index: usize,
    pub remaining_distance_m: f64,
    // remaining_legs_m[i] is the length of the route from waypoint i to the end
    remaining_legs_m: Vec<f64>,
}

impl NavigationState {
    fn new(route: Route) -> Self {
        let legs = leg_distances(route.waypoints());
        let mut remaining_legs_m = vec![0.0; route.len() + 1];
        for i in (0..legs.len()).rev() {
            remaining_legs_m[i] = remaining_legs_m[i + 1] + legs[i];
        }

        Self {
            remaining_distance_m: route.total_distance_m,
            route,
            current_waypoint_index: 0,
            remaining_legs_m,
        }
    }

    fn is_finished(&self) -> bool {
        self.current_waypoint_index >= self.route.len()
    }
}

/// Read only view of the tracker for presentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationSnapshot {
    pub status: NavigationStatus,
    pub current_waypoint_index: usize,
    pub waypoint_count: usize,
    pub remaining_distance_m: f64,
    pub distance_to_waypoint_m: Option<f64>,
    pub bearing_deg: Option<f64>,
    pub direction: Option<CompassDirection>,
    pub turn: Option<Turn>,
}

/// Follows a [`Route`] waypoint by waypoint as fixes arrive.
///
/// `Idle -> Navigating` on load + start, `Navigating -> Complete` once the last waypoint is
/// reached. `Complete` is terminal.
#[derive(Debug, Clone)]
pub struct RouteTracker {
    waypoint_radius_m: f64,
    status: NavigationStatus,
    paused: bool,
    navigation: Option<NavigationState>,
    last_fix: Option<PositionFix>,
}

impl Default for RouteTracker {
    fn default() -> Self {
        Self::new(WAYPOINT_RADIUS_M)
    }
}

impl RouteTracker {
    pub fn new(waypoint_radius_m: f64) -> Self {
        Self {
            waypoint_radius_m,
            status: NavigationStatus::Idle,
            paused: false,
            navigation: None,
            last_fix: None,
        }
    }

    pub fn status(&self) -> NavigationStatus {
        self.status
    }

    pub fn load(&mut self, route: Route) -> Result<(), NavigationError> {
        if route.is_empty() {
            return Err(NavigationError::NoRoute(format!("route {} has no waypoints", route.id)));
        }

        tracing::info!("Loaded route {} ({}) with {} waypoints", route.id, route.name, route.len());
        self.navigation = Some(NavigationState::new(route));
        self.status = NavigationStatus::Idle;
        self.paused = false;
        self.last_fix = None;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), NavigationError> {
        if self.navigation.is_none() {
            return Err(NavigationError::NoRoute("no route loaded".into()));
        }

        if self.status == NavigationStatus::Idle {
            self.status = NavigationStatus::Navigating;
            tracing::info!("Navigation started");
        }
        Ok(())
    }

    /// Back to idle, keeping route and progress. No effect once complete.
    pub fn stop(&mut self) {
        if self.status == NavigationStatus::Navigating {
            self.status = NavigationStatus::Idle;
            tracing::info!("Navigation stopped");
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn on_fix(&mut self, fix: PositionFix) {
        if self.status != NavigationStatus::Navigating || self.paused {
            return;
        }
        let Some(navigation) = self.navigation.as_mut() else {
            return;
        };

        self.last_fix = Some(fix);

        let target = navigation.route.waypoints()[navigation.current_waypoint_index];
        let distance = geodesy::distance_m(fix.point(), target.point());

        let advanced = distance < self.waypoint_radius_m;
        if advanced {
            navigation.current_waypoint_index += 1;
            tracing::info!(
                "Reached waypoint {} of {}",
                navigation.current_waypoint_index,
                navigation.route.len()
            );

            if navigation.is_finished() {
                navigation.remaining_distance_m = 0.0;
                self.status = NavigationStatus::Complete;
                tracing::info!("Route complete");
                return;
            }
        }

        let index = navigation.current_waypoint_index;
        let next = navigation.route.waypoints()[index];
        navigation.remaining_distance_m =
            geodesy::distance_m(fix.point(), next.point()) + navigation.remaining_legs_m[index];

        if advanced {
            if let Some(turn) = self.turn_instruction() {
                tracing::info!("Turn {:?} towards waypoint {}", turn, index + 1);
            }
        }
    }

    fn target(&self) -> Option<(PositionFix, &NavigationState)> {
        let navigation = self.navigation.as_ref()?;
        if navigation.is_finished() {
            return None;
        }
        Some((self.last_fix?, navigation))
    }

    pub fn distance_to_waypoint(&self) -> Option<f64> {
        let (fix, navigation) = self.target()?;
        let waypoint = navigation.route.waypoints()[navigation.current_waypoint_index];
        Some(geodesy::distance_m(fix.point(), waypoint.point()))
    }

    pub fn bearing_to_waypoint(&self) -> Option<f64> {
        let (fix, navigation) = self.target()?;
        let waypoint = navigation.route.waypoints()[navigation.current_waypoint_index];
        Some(geodesy::bearing_deg(fix.point(), waypoint.point()))
    }

    /// Compares the heading from the last fix to the next waypoint with the leg arriving at
    /// that waypoint. `None` for the first waypoint or without a fix.
    pub fn turn_instruction(&self) -> Option<Turn> {
        let (fix, navigation) = self.target()?;
        let index = navigation.current_waypoint_index;
        if index == 0 {
            return None;
        }

        let waypoints = navigation.route.waypoints();
        let bearing = geodesy::bearing_deg(fix.point(), waypoints[index].point());
        let leg_bearing = geodesy::bearing_deg(waypoints[index - 1].point(), waypoints[index].point());
        turn_between(bearing, leg_bearing)
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        let bearing_deg = self.bearing_to_waypoint();
        let (current_waypoint_index, waypoint_count, remaining_distance_m) = match &self.navigation {
            Some(navigation) => (
                navigation.current_waypoint_index,
                navigation.route.len(),
                navigation.remaining_distance_m,
            ),
            None => (0, 0, 0.0),
        };

        NavigationSnapshot {
            status: self.status,
            current_waypoint_index,
            waypoint_count,
            remaining_distance_m,
            distance_to_waypoint_m: self.distance_to_waypoint(),
            bearing_deg,
            direction: bearing_deg.map(CompassDirection::from_bearing),
            turn: self.turn_instruction(),
        }
    }
}
