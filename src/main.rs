use anyhow::Context;
use clap::Parser;
use guardian_watch::{
    sdk::util::log::init_logging, Coordinate, FeedSource, MapsConfig, MockFeed, NavigationSession,
    SessionOptions, SimulatedLocationProvider,
};
use std::{fs::File, io::Write, path::PathBuf, sync::Arc, time::Duration};

/// Plan a route from a fixed position and report nearby units
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Latitude of the current position (e.g., 47.610)
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    /// Longitude of the current position (e.g., -122.335)
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Where to go, as free text (e.g., "Coffee Shop")
    #[arg(short, long)]
    to: String,

    /// Pick the first autocomplete suggestion instead of a direct lookup
    #[arg(long)]
    autocomplete: bool,

    /// Re-center on every fix while navigating
    #[arg(long)]
    follow: bool,

    /// Leave turn-by-turn steps out of the report
    #[arg(long)]
    no_steps: bool,

    /// Radius in miles within which units are reported
    #[arg(long, default_value_t = 7.5)]
    radius_miles: f64,

    /// Also show the group roster on the map
    #[arg(long)]
    group: bool,

    /// Number of feed polling intervals to observe before reporting
    #[arg(long, default_value_t = 0)]
    feed_ticks: u32,

    /// Where to write the session snapshot
    #[arg(short, long, default_value = "navigation_session.json")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    // --- 1. Dependency Initialization ---
    let config = MapsConfig::from_env()?;
    let options = SessionOptions {
        enable_follow: cli.follow,
        enable_steps: !cli.no_steps,
        marker_radius_miles: cli.radius_miles,
        ..SessionOptions::default()
    };
    let poll_interval = options.feed_poll_interval;
    let origin = Coordinate::new(cli.lat, cli.lon);
    let location = Arc::new(SimulatedLocationProvider::stationary(origin));
    let session = NavigationSession::with_google(&config, location, options)?;

    session.request_location().await?;
    log::info!("Origin set to {}", origin);
    session.attach_feed(FeedSource::Mock(MockFeed::police()));
    if cli.group {
        session.attach_feed(FeedSource::Mock(MockFeed::group()));
    }

    // --- 2. Destination ---
    if cli.autocomplete {
        let candidates = session.autocomplete(&cli.to).await?;
        let pick = candidates
            .into_iter()
            .find(|c| !c.is_current_location())
            .with_context(|| format!("No suggestions for \"{}\"", cli.to))?;
        log::info!("Using suggestion: {}", pick.label);
        session.select_destination(&pick).await?;
    } else {
        session.lookup_destination(&cli.to).await?;
    }

    // --- 3. Route ---
    session.start_navigation().await?;
    if let Some(route) = session.route() {
        log::info!("{} to {}", route.headline(), cli.to);
    }

    let observe = if cli.feed_ticks == 0 {
        Duration::from_millis(200)
    } else {
        poll_interval * cli.feed_ticks
    };
    tokio::time::sleep(observe).await;

    // --- 4. Output Results ---
    let snapshot = session.snapshot();
    log::info!("{} unit(s) within {} miles", snapshot.markers.len(), cli.radius_miles);

    let json_output = serde_json::to_string_pretty(&snapshot)?;
    let mut file = File::create(&cli.out)?;
    file.write_all(json_output.as_bytes())?;
    log::info!("Session written to {}", cli.out.display());

    session.shutdown();
    Ok(())
}
