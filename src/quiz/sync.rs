use log::{debug, warn};

/// One per-question delta, as it travels to the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatUpdate {
    pub id: String,
    #[serde(rename = "attemptsDelta", default)]
    pub attempts_delta: i64,
    #[serde(rename = "correctDelta", default)]
    pub correct_delta: i64,
}

/// A single atomic increment against the backing counter store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrOp {
    pub key: String,
    pub by: i64,
}

/// Expands a batch of updates into counter increments. Updates with an
/// empty id are dropped, and zero deltas emit no operation, so a batch of
/// two updates can yield anywhere from zero to four operations.
pub fn build_increment_ops(updates: &[StatUpdate]) -> Vec<IncrOp> {
    let mut ops = Vec::new();
    for u in updates {
        if u.id.is_empty() {
            continue;
        }
        if u.attempts_delta != 0 {
            ops.push(IncrOp {
                key: format!("q:{}:attempts", u.id),
                by: u.attempts_delta,
            });
        }
        if u.correct_delta != 0 {
            ops.push(IncrOp {
                key: format!("q:{}:correct", u.id),
                by: u.correct_delta,
            });
        }
    }
    ops
}

#[derive(serde::Serialize)]
struct SyncRequest<'a> {
    updates: &'a [StatUpdate],
}

/// Best-effort mirror of the local counters. Every push runs detached;
/// failures are logged and swallowed, and the local store stays the source
/// of truth for this device.
#[derive(Debug, Clone)]
pub struct SyncClient {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl SyncClient {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Fires one batched update at the stats endpoint without awaiting it.
    pub fn push_detached(&self, updates: Vec<StatUpdate>) {
        if updates.is_empty() {
            return;
        }
        let Some(endpoint) = self.endpoint.clone() else {
            debug!("Stats endpoint not configured, skipping remote sync");
            return;
        };
        let client = self.client.clone();
        tokio::spawn(async move {
            let result = client
                .post(&endpoint)
                .json(&SyncRequest { updates: &updates })
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => {
                    debug!("Synced {} stat update(s)", updates.len());
                }
                Ok(response) => {
                    warn!("Stats endpoint returned {}", response.status());
                }
                Err(e) => {
                    warn!("Stats sync failed: {}", e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: &str, attempts: i64, correct: i64) -> StatUpdate {
        StatUpdate {
            id: id.to_string(),
            attempts_delta: attempts,
            correct_delta: correct,
        }
    }

    #[test]
    fn batch_expands_to_one_op_per_nonzero_delta() {
        let ops = build_increment_ops(&[update("a", 1, 1), update("b", 1, 0)]);
        assert_eq!(
            ops,
            vec![
                IncrOp { key: "q:a:attempts".into(), by: 1 },
                IncrOp { key: "q:a:correct".into(), by: 1 },
                IncrOp { key: "q:b:attempts".into(), by: 1 },
            ]
        );
    }

    #[test]
    fn empty_ids_and_zero_deltas_are_skipped() {
        let ops = build_increment_ops(&[update("", 1, 1), update("c", 0, 0)]);
        assert!(ops.is_empty());
    }

    #[test]
    fn wire_format_uses_camel_case_deltas() {
        let json = serde_json::to_value(update("사회문화:3", 1, 0)).unwrap();
        assert_eq!(json["id"], "사회문화:3");
        assert_eq!(json["attemptsDelta"], 1);
        assert_eq!(json["correctDelta"], 0);
    }

    #[test]
    fn missing_deltas_deserialize_to_zero() {
        let u: StatUpdate = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert_eq!(u.attempts_delta, 0);
        assert_eq!(u.correct_delta, 0);
    }
}
