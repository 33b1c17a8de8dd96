//! Run ID completion backed by a short-lived, process-wide cache.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::Result;
use conductor_rest_api_contract::RunSummary;
use conductor_rest_client::{ClientResult, ControlPlane};
use tokio::sync::RwLock;
use tracing::debug;

use super::{candidate, Completion};

/// How long a fetched run list is served without asking the daemon again.
pub const RUN_CACHE_TTL: Duration = Duration::from_secs(2);

static GLOBAL_RUN_CACHE: OnceLock<RunCache> = OnceLock::new();

#[derive(Debug, Default)]
enum CacheState {
    #[default]
    Empty,
    Valid {
        runs: Arc<Vec<RunSummary>>,
        expires_at: Instant,
    },
}

/// Cached projection of `GET /v1/runs`.
///
/// `Empty -> Valid -> (expired) -> Valid`; a failed fetch resets to `Empty`.
#[derive(Debug)]
pub struct RunCache {
    state: RwLock<CacheState>,
    ttl: Duration,
}

impl RunCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState::Empty),
            ttl,
        }
    }

    /// The cache shared by every completion in this process.
    pub fn global() -> &'static RunCache {
        GLOBAL_RUN_CACHE.get_or_init(|| RunCache::new(RUN_CACHE_TTL))
    }

    /// Cached runs while fresh, otherwise fetch from `daemon` and store them.
    pub async fn get(&self, daemon: &dyn ControlPlane) -> ClientResult<Arc<Vec<RunSummary>>> {
        {
            let state = self.state.read().await;
            if let CacheState::Valid { runs, expires_at } = &*state {
                if Instant::now() < *expires_at {
                    return Ok(Arc::clone(runs));
                }
            }
        }
        self.refresh(daemon).await
    }

    async fn refresh(&self, daemon: &dyn ControlPlane) -> ClientResult<Arc<Vec<RunSummary>>> {
        match daemon.list_runs().await {
            Ok(runs) => {
                let runs = Arc::new(runs);
                *self.state.write().await = CacheState::Valid {
                    runs: Arc::clone(&runs),
                    expires_at: Instant::now() + self.ttl,
                };
                Ok(runs)
            }
            Err(e) => {
                debug!("run list fetch failed: {}", e);
                *self.state.write().await = CacheState::Empty;
                Err(e)
            }
        }
    }

    /// Whether a fresh entry is held right now.
    pub async fn is_fresh(&self) -> bool {
        matches!(
            &*self.state.read().await,
            CacheState::Valid { expires_at, .. } if Instant::now() < *expires_at
        )
    }
}

/// `id\tworkflow (status)` for every run, or only pending/running ones.
pub async fn complete_runs(
    cache: &RunCache,
    daemon: &dyn ControlPlane,
    active_only: bool,
) -> Result<Completion> {
    let runs = cache.get(daemon).await?;
    Ok(Completion::values(
        runs.iter()
            .filter(|run| !active_only || run.status.is_active())
            .map(|run| candidate(&run.id, &format!("{} ({})", run.workflow, run.status)))
            .collect(),
    ))
}
