//! Best-effort warmup of backend health endpoints at startup.
//!
//! Every model that declares a health URL gets one independent GET with a
//! fixed timeout. Failures are aggregated and logged; nothing here delays
//! or blocks serving.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::config::GatewayConfig;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Pings every declared backend health endpoint once, concurrently.
pub async fn ping_backends(config: Arc<GatewayConfig>) {
    let targets: Vec<(String, String)> = config
        .models
        .iter()
        .filter_map(|(id, spec)| spec.health.clone().map(|url| (id.clone(), url)))
        .collect();
    if targets.is_empty() {
        return;
    }

    let client = match reqwest::Client::builder().timeout(PING_TIMEOUT).build() {
        Ok(client) => client,
        Err(err) => {
            tracing::warn!(error = %err, "skipping backend warmup: cannot build HTTP client");
            return;
        }
    };

    let checks = targets.into_iter().map(|(id, url)| {
        let client = client.clone();
        async move {
            match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => Ok(id),
                Ok(response) => Err((id, format!("answered {}", response.status()))),
                Err(err) => Err((id, err.to_string())),
            }
        }
    });

    let mut healthy = 0usize;
    let mut failures = Vec::new();
    for result in join_all(checks).await {
        match result {
            Ok(_) => healthy += 1,
            Err(failure) => failures.push(failure),
        }
    }
    for (model, reason) in &failures {
        tracing::warn!(model = %model, reason = %reason, "backend health ping failed");
    }
    tracing::info!(healthy, failed = failures.len(), "backend warmup finished");
}

// ---------------------------------------------------------------------------
