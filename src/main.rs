//! Commit-Reveal Voting Server
//!
//! Starts a ballot at launch and serves it over WebSocket until Ctrl-C.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use commit_reveal::{
    network::{AuthConfig, ServerConfig, VotingServer},
    BallotConfig, Clock, CommitRevealBallot, SystemClock, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Commit-Reveal Voting Server v{}", VERSION);

    let config = ServerConfig::from_env()?;
    let auth = AuthConfig::from_env();
    if !auth.is_configured() {
        warn!("AUTH_SECRET / AUTH_PUBLIC_KEY_PEM not set, running in open mode");
    }

    let BallotConfig { commit_duration, reveal_duration } = config.ballot;
    info!("Commit window: {}s, reveal window: {}s", commit_duration, reveal_duration);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ballot = Arc::new(CommitRevealBallot::initialize(config.ballot, clock.now()));
    let server = Arc::new(VotingServer::new(config, auth, ballot.clone(), clock.clone()));

    {
        let server = server.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down");
                server.shutdown();
            }
        });
    }

    server.run().await?;

    let tally = ballot.get_tally();
    info!(
        "Final tally: yes={}, no={} ({} participants, phase {})",
        tally.yes_votes,
        tally.no_votes,
        ballot.participant_count(),
        ballot.current_phase(clock.now())
    );

    Ok(())
}
