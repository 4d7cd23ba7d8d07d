//! phrase-rush binary entrypoint: plays a headless game against the
//! configured phrase library, with random guesses standing in for players.

use std::sync::Arc;

use anyhow::{Context, bail};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    time::sleep,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phrase_rush::{
    config::AppConfig,
    dao::phrase_store::{PhraseStore, memory::InMemoryStore},
    dto::{notice::Notice, phase::VisibleGamePhase, setup::GameSetup},
    error::SessionError,
    services::{
        game_service::{self, prepare_game, start_session},
        session::SessionHandle,
    },
};

/// Probability that the autoplayer guesses the phrase instead of passing.
const FOUND_PROBABILITY: f64 = 0.75;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = open_store(&config).await?;
    store
        .health_check()
        .await
        .context("checking phrase library")?;

    let categories = game_service::list_categories(store.as_ref())
        .await
        .context("listing categories")?;
    let teams = game_service::list_teams(store.as_ref())
        .await
        .context("listing teams")?;
    if categories.is_empty() {
        bail!("the phrase library has no category");
    }
    info!(
        categories = categories.len(),
        teams = teams.len(),
        "phrase library ready"
    );

    let setup = GameSetup::from_config(
        &config,
        categories.iter().map(|category| category.id).collect(),
        teams
            .iter()
            .filter(|team| team.is_eligible())
            .map(|team| team.id)
            .collect(),
    );
    let mut rng = StdRng::from_rng(&mut rand::rng());
    let prepared = prepare_game(store.as_ref(), setup, &mut rng)
        .await
        .context("preparing game")?;

    let handle = start_session(prepared, &config);
    tokio::spawn(log_notices(handle.subscribe()));

    tokio::select! {
        result = autoplay(&handle, &config, &mut rng) => result?,
        _ = shutdown_signal() => {
            info!("shutdown requested; leaving the game");
        }
    }

    let summary = handle.snapshot();
    for line in &summary.scores {
        info!(
            team = %line.team.name,
            team_id = line.team.id,
            score = line.total_score,
            "final score"
        );
    }
    handle.quit().await.context("leaving game")?;
    handle.closed().await;
    Ok(())
}

/// Open the SQLite library when configured, the JSON content file otherwise.
async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn PhraseStore>> {
    if let Some(path) = &config.database_path {
        #[cfg(feature = "sqlite-store")]
        {
            let store = phrase_rush::dao::phrase_store::sqlite::SqliteStore::open(path)
                .await
                .with_context(|| format!("opening database {}", path.display()))?;
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "sqlite-store"))]
        warn!(
            path = %path.display(),
            "built without sqlite support; using the content file"
        );
    }

    let store = InMemoryStore::load_json(&config.content_path).with_context(|| {
        format!("loading content file {}", config.content_path.display())
    })?;
    Ok(Arc::new(store))
}

/// Drive the session until the game is complete.
async fn autoplay(
    handle: &SessionHandle,
    config: &AppConfig,
    rng: &mut StdRng,
) -> anyhow::Result<()> {
    loop {
        let snapshot = handle.snapshot();
        let outcome = match snapshot.phase {
            VisibleGamePhase::NotStarted => handle.start_game().await.map(drop),
            VisibleGamePhase::AwaitingTeamReady => {
                info!(
                    round = snapshot.round,
                    team = snapshot.current_team.as_ref().map(|team| team.name),
                    "team ready"
                );
                handle.start_turn().await.map(drop)
            }
            VisibleGamePhase::Active => {
                sleep(config.tick_interval * rng.random_range(1..=3u32)).await;
                match handle.snapshot().current_phrase_id {
                    Some(phrase_id) if rng.random_bool(FOUND_PROBABILITY) => {
                        handle.mark_found(phrase_id).await.map(drop)
                    }
                    Some(phrase_id) => handle.mark_skip(phrase_id).await.map(drop),
                    None => Ok(()),
                }
            }
            VisibleGamePhase::GameComplete | VisibleGamePhase::Abandoned => return Ok(()),
        };

        match outcome {
            Ok(()) => {}
            Err(SessionError::Rejected(rejection)) => {
                debug!(error = %rejection, "autoplay action rejected");
            }
            Err(err @ SessionError::Closed) => return Err(err).context("session stopped early"),
        }
    }
}

/// Log every notice of the session until it closes.
async fn log_notices(mut notices: broadcast::Receiver<Notice>) {
    loop {
        match notices.recv().await {
            Ok(notice) => info!(?notice, "notice"),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "notice stream lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,phrase_rush=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
