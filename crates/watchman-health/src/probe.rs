//! Probe client — one health check against one model server instance.
//!
//! Stateless and side-effect-free beyond the network call. Every failure
//! mode comes back as a [`ProbeOutcome`] variant; this function never
//! returns an error.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use watchman_fleet::{DeploymentTarget, ModelMetadata, ProbeOutcome, ProbeResult, epoch_secs};

/// Healthcheck payload a model server reports about itself.
#[derive(Debug, Deserialize)]
struct ReportedHealth {
    /// Self-reported health; a server that answers but flags itself
    /// degraded is Unhealthy, not Unreachable.
    healthy: Option<bool>,
    project: Option<String>,
    #[serde(rename = "model-version")]
    model_version: Option<String>,
}

/// Probe a target's healthcheck endpoint within the given timeout.
///
/// Classification:
/// - connect/handshake failure → `Unreachable`
/// - no answer within `timeout` → `Timeout`
/// - non-2xx, malformed body, degraded self-report, or reported
///   metadata differing from the registered expectation → `Unhealthy`
/// - otherwise → `Healthy`
pub async fn probe(target: &DeploymentTarget, health_path: &str, timeout: Duration) -> ProbeResult {
    let attempt = tokio::time::timeout(timeout, probe_once(target, health_path)).await;
    let (outcome, reported) = match attempt {
        Ok(classified) => classified,
        Err(_) => {
            debug!(name = %target.name, endpoint = %target.endpoint, "probe timed out");
            (ProbeOutcome::Timeout, None)
        }
    };
    ProbeResult {
        target: target.name.clone(),
        at: epoch_secs(),
        outcome,
        reported,
    }
}

async fn probe_once(
    target: &DeploymentTarget,
    health_path: &str,
) -> (ProbeOutcome, Option<ModelMetadata>) {
    let uri = format!("http://{}{}", target.endpoint, health_path);

    let stream = match tokio::net::TcpStream::connect(&target.endpoint).await {
        Ok(stream) => stream,
        Err(e) => {
            debug!(error = %e, %uri, "probe connection failed");
            return (ProbeOutcome::Unreachable, None);
        }
    };

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
        Ok(pair) => pair,
        Err(e) => {
            debug!(error = %e, %uri, "probe handshake failed");
            return (ProbeOutcome::Unreachable, None);
        }
    };

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = match http::Request::builder()
        .method("GET")
        .uri(&uri)
        .header("host", &target.endpoint)
        .header("user-agent", "watchman-health/0.1")
        .body(http_body_util::Empty::<bytes::Bytes>::new())
    {
        Ok(req) => req,
        Err(e) => {
            debug!(error = %e, %uri, "probe request invalid");
            return (ProbeOutcome::Unreachable, None);
        }
    };

    let resp = match sender.send_request(req).await {
        Ok(resp) => resp,
        Err(e) => {
            debug!(error = %e, %uri, "probe request failed");
            return (ProbeOutcome::Unreachable, None);
        }
    };

    let status = resp.status();
    if !status.is_success() {
        debug!(%status, %uri, "probe non-2xx");
        return (
            ProbeOutcome::Unhealthy {
                reason: format!("healthcheck returned {status}"),
            },
            None,
        );
    }

    let body = match read_body(resp).await {
        Ok(body) => body,
        Err(reason) => {
            debug!(%reason, %uri, "probe body unreadable");
            return (ProbeOutcome::Unhealthy { reason }, None);
        }
    };

    classify_body(target, &body)
}

async fn read_body(
    resp: http::Response<hyper::body::Incoming>,
) -> Result<bytes::Bytes, String> {
    use http_body_util::BodyExt;
    resp.into_body()
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| format!("failed to read healthcheck body: {e}"))
}

/// Classify a 2xx healthcheck body against the target's expectations.
fn classify_body(
    target: &DeploymentTarget,
    body: &[u8],
) -> (ProbeOutcome, Option<ModelMetadata>) {
    let report: ReportedHealth = match serde_json::from_slice(body) {
        Ok(report) => report,
        Err(e) => {
            return (
                ProbeOutcome::Unhealthy {
                    reason: format!("malformed healthcheck response: {e}"),
                },
                None,
            );
        }
    };

    let reported = match (report.project, report.model_version) {
        (Some(project), Some(model_version)) => Some(ModelMetadata {
            project,
            model_version,
        }),
        _ => None,
    };

    if report.healthy == Some(false) {
        return (
            ProbeOutcome::Unhealthy {
                reason: "instance reports degraded state".to_string(),
            },
            reported,
        );
    }

    match &reported {
        None => (
            ProbeOutcome::Unhealthy {
                reason: "healthcheck response missing model metadata".to_string(),
            },
            None,
        ),
        Some(metadata) if *metadata != target.metadata => (
            ProbeOutcome::Unhealthy {
                reason: format!(
                    "metadata mismatch: expected {}/{}, got {}/{}",
                    target.metadata.project,
                    target.metadata.model_version,
                    metadata.project,
                    metadata.model_version
                ),
            },
            reported.clone(),
        ),
        Some(_) => (ProbeOutcome::Healthy, reported.clone()),
    }
}
