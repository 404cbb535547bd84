//! Optional message enrichment
//!
//! A formatter may reword a fired decision's message. The rewrite is
//! time-boxed; on timeout, error or empty output the templated message
//! stays. Direction, urgency and distance are never touched.

use crate::domain::types::AlertDecision;
use crate::infra::metrics::Metrics;
use crate::services::messages::MessageFormatter;
use std::time::Duration;
use tracing::{debug, warn};

/// Reword `decision.message` through `formatter`, falling back to the
/// decision unchanged when the rewrite does not arrive in time.
pub async fn enrich(
    decision: AlertDecision,
    formatter: &dyn MessageFormatter,
    timeout: Duration,
    metrics: Option<&Metrics>,
) -> AlertDecision {
    if !decision.fired {
        return decision;
    }

    let outcome = tokio::time::timeout(timeout, formatter.format(&decision)).await;

    let rewritten = match outcome {
        Ok(Ok(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(Ok(_)) => {
            warn!(reason = "empty", "enrichment_fallback");
            None
        }
        Ok(Err(e)) => {
            warn!(reason = "error", error = %e, "enrichment_fallback");
            None
        }
        Err(_) => {
            warn!(reason = "timeout", timeout_ms = %timeout.as_millis(), "enrichment_fallback");
            None
        }
    };

    if let Some(m) = metrics {
        m.record_enrichment(rewritten.is_none());
    }

    match rewritten {
        Some(message) => {
            debug!(urgency = %decision.urgency, direction = %decision.direction, "enrichment_applied");
            AlertDecision { message, ..decision }
        }
        None => decision,
    }
}
