//! Safety envelopes around completion sources.
//!
//! A source may fail, panic or hang; the shell must still get an answer.
//! Errors and panics become [`Completion::empty`], and anything that does
//! I/O is bounded by [`COMPLETION_DEADLINE`].

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use anyhow::Result;
use futures::FutureExt;
use tracing::debug;

use super::{Completion, COMPLETION_DEADLINE};

/// Run a synchronous, I/O-free source.
pub fn safe_complete<F>(source: F) -> Completion
where
    F: FnOnce() -> Result<Completion>,
{
    match catch_unwind(AssertUnwindSafe(source)) {
        Ok(result) => settle(result),
        Err(_) => Completion::empty(),
    }
}

/// Run an async source within [`COMPLETION_DEADLINE`].
pub async fn safe_complete_async<Fut>(source: Fut) -> Completion
where
    Fut: Future<Output = Result<Completion>>,
{
    safe_complete_within(COMPLETION_DEADLINE, source).await
}

pub async fn safe_complete_within<Fut>(limit: Duration, source: Fut) -> Completion
where
    Fut: Future<Output = Result<Completion>>,
{
    match tokio::time::timeout(limit, AssertUnwindSafe(source).catch_unwind()).await {
        Ok(Ok(result)) => settle(result),
        Ok(Err(_)) => Completion::empty(),
        Err(_) => {
            debug!(?limit, "completion source timed out");
            Completion::empty()
        }
    }
}

/// Run a blocking source (filesystem, SQLite) on the blocking pool within
/// [`COMPLETION_DEADLINE`].
pub async fn safe_complete_blocking<F>(source: F) -> Completion
where
    F: FnOnce() -> Result<Completion> + Send + 'static,
{
    safe_complete_blocking_within(COMPLETION_DEADLINE, source).await
}

pub async fn safe_complete_blocking_within<F>(limit: Duration, source: F) -> Completion
where
    F: FnOnce() -> Result<Completion> + Send + 'static,
{
    // A panic inside the task surfaces as a JoinError.
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(source)).await {
        Ok(Ok(result)) => settle(result),
        Ok(Err(_)) => Completion::empty(),
        Err(_) => {
            debug!(?limit, "blocking completion source timed out");
            Completion::empty()
        }
    }
}

fn settle(result: Result<Completion>) -> Completion {
    match result {
        Ok(completion) => completion,
        Err(e) => {
            debug!("completion source failed: {:#}", e);
            Completion::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Directive;

    fn one() -> Result<Completion> {
        Ok(Completion::values(vec!["x".into()]))
    }

    #[test]
    fn test_sync_panic_becomes_empty() {
        let completion = safe_complete(|| -> Result<Completion> { panic!("source blew up") });
        assert_eq!(completion, Completion::empty());
        assert_eq!(completion.directive, Directive::NO_FILE_COMP);
    }

    #[test]
    fn test_sync_error_becomes_empty() {
        assert_eq!(
            safe_complete(|| anyhow::bail!("no config")),
            Completion::empty()
        );
        assert_eq!(safe_complete(one).candidates, vec!["x"]);
    }

    #[tokio::test]
    async fn test_async_panic_and_timeout_become_empty() {
        let panicking = safe_complete_async(async {
            if true {
                panic!("daemon client blew up");
            }
            one()
        })
        .await;
        assert_eq!(panicking, Completion::empty());

        let slow = safe_complete_within(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            one()
        })
        .await;
        assert_eq!(slow, Completion::empty());

        assert_eq!(safe_complete_async(async { one() }).await.candidates, vec!["x"]);
    }

    #[tokio::test]
    async fn test_blocking_panic_and_timeout_become_empty() {
        let panicking =
            safe_complete_blocking(|| -> Result<Completion> { panic!("walk blew up") }).await;
        assert_eq!(panicking, Completion::empty());

        let slow = safe_complete_blocking_within(Duration::from_millis(50), || {
            std::thread::sleep(Duration::from_millis(500));
            one()
        })
        .await;
        assert_eq!(slow, Completion::empty());
    }
}
