//! Post-start health waits.
//!
//! An integer check sleeps that many seconds; a URL check polls with GET
//! until a 2xx lands. A probe that never succeeds is a warning, not an
//! error: the wave proceeds and a genuinely broken service surfaces in the
//! next wave's failures.

use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use tracing::{debug, warn};

use crate::config::model::HealthCheck;

const PROBE_ATTEMPTS: usize = 120;
const PROBE_INTERVAL: Duration = Duration::from_secs(1);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn wait_healthy(service: &str, check: &HealthCheck) {
    match check {
        HealthCheck::Seconds(seconds) => {
            debug!(service, seconds, "health wait");
            tokio::time::sleep(Duration::from_secs(*seconds)).await;
        }
        HealthCheck::Url(url) => probe_until_healthy(service, url).await,
    }
}

async fn probe_until_healthy(service: &str, url: &str) {
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(service, error = %e, "could not build HTTP client for health probe");
            return;
        }
    };

    let result = (|| async { probe_once(&client, url).await })
        .retry(
            ConstantBuilder::default()
                .with_delay(PROBE_INTERVAL)
                .with_max_times(PROBE_ATTEMPTS - 1),
        )
        .notify(|err: &anyhow::Error, _dur: Duration| {
            debug!(service, "health probe not ready: {}", err);
        })
        .await;

    if let Err(e) = result {
        warn!(
            service,
            url,
            attempts = PROBE_ATTEMPTS,
            "health probe never succeeded, continuing anyway: {}",
            e
        );
    }
}

async fn probe_once(client: &reqwest::Client, url: &str) -> anyhow::Result<()> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("status {}", response.status());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn zero_seconds_returns_immediately() {
        let started = Instant::now();
        wait_healthy("api", &HealthCheck::Seconds(0)).await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn seconds_wait_sleeps_for_the_configured_duration() {
        let started = Instant::now();
        wait_healthy("api", &HealthCheck::Seconds(7)).await;
        assert!(started.elapsed() >= Duration::from_secs(7));
    }

    #[tokio::test]
    async fn successful_probe_returns() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                use tokio::io::{AsyncReadExt, AsyncWriteExt};
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
                    .await;
            }
        });

        wait_healthy("api", &HealthCheck::Url(format!("http://{addr}/health"))).await;
    }
}
