use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trip_metrics_lib::{activity::ActivityType, clock::ManualClock, configuration::TrackerConfig};
use trip_metrics_service::{TrackingService, gpx_util};

// CLI for replaying recorded tracks through the metrics engine
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// key = value configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Feed every point of a GPX track through a tracking session and print the summary
    Replay {
        #[arg(long)]
        track: PathBuf,
        /// GPX file whose first route (or track) is navigated while replaying
        #[arg(long)]
        route: Option<PathBuf>,
        #[arg(long)]
        activity: Option<ActivityType>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace,trip_metrics_service=debug,trip_metrics_lib=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TrackerConfig::from_file(path)?,
        None => TrackerConfig::default(),
    };

    match cli.command {
        Command::Replay { track, route, activity } => replay(&config, track, route, activity).await,
    }
}

async fn replay(
    config: &TrackerConfig,
    track: PathBuf,
    route: Option<PathBuf>,
    activity: Option<ActivityType>,
) -> anyhow::Result<()> {
    let fixes = gpx_util::read_track_file(&track).with_context(|| format!("reading track {:?}", track))?;
    let route = match route {
        Some(path) => Some(gpx_util::read_route_file(&path, 1).with_context(|| format!("reading route {:?}", path))?),
        None => None,
    };

    // Session time follows the recorded timestamps instead of the wall clock
    let first = fixes.first().context("track has no points")?;
    let clock = ManualClock::new(first.timestamp);
    let activity = activity.unwrap_or(config.activity_type);
    let service = TrackingService::start(config, activity, route, clock.clone()).await?;

    tracing::info!("Replaying {} fixes from {:?} as {}", fixes.len(), track, activity);

    for (i, fix) in fixes.iter().enumerate() {
        clock.set(fix.timestamp);
        service.push_fix(*fix).await?;
        let snapshot = service.wait_for_fixes(i as u64 + 1).await?;

        let session = snapshot.session;
        tracing::debug!(
            "{} | {:.2} km | {:.1} km/h (avg {:.1}) | +{:.0} m",
            session.formatted_elapsed(),
            session.total_distance_m / 1000.0,
            session.current_speed_kmh(),
            session.average_speed_kmh(),
            session.elevation_gain_m
        );

        if let Some(navigation) = snapshot.navigation {
            tracing::debug!(
                "waypoint {} of {} | remaining {:.1} km | heading {} | turn {:?}",
                navigation.current_waypoint_index + 1,
                navigation.waypoint_count,
                navigation.remaining_distance_m / 1000.0,
                navigation.direction.map(|d| d.abbreviation()).unwrap_or("-"),
                navigation.turn
            );
        }
    }

    let final_snapshot = service.snapshot();
    let summary = service.stop().await?.context("no fixes were recorded")?;

    tracing::info!(
        "Finished {} in {}: {:.2} km, pace {} min/km",
        activity,
        final_snapshot.session.formatted_elapsed(),
        summary.distance / 1000.0,
        final_snapshot.session.formatted_pace().unwrap_or_else(|| "-".into())
    );
    if let Some(navigation) = final_snapshot.navigation {
        tracing::info!("Route status: {:?}", navigation.status);
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
