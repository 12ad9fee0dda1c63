use std::future::Future;
use std::time::Duration;

/// Runs `operation` up to `attempts` times, pausing `delay` between failures.
pub async fn times<T, E, F, Fut>(attempts: usize, delay: Duration, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::debug!("Attempt {}/{} failed: {}", attempt, attempts, e);
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let result: Result<usize, String> = times(3, Duration::from_millis(10), move || async move {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call < 3 { Err(format!("call {call}")) } else { Ok(call) }
        })
        .await;

        assert_eq!(result, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_attempts() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let result: Result<(), String> = times(3, Duration::from_millis(10), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("busy".to_string())
        })
        .await;

        assert_eq!(result, Err("busy".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
