use std::path::Path;

use chrono::{DateTime, Utc};
use propline_core::cache::{SnapshotCache, TtlCache};
use propline_core::config::{AppConfig, EngineConfig};
use propline_core::domain::snapshot::PropSnapshot;
use propline_core::report::{analyze_prop, snapshot_fingerprint, PropReport};
use serde::Serialize;
use tracing::debug;

use crate::commands::{read_json, CommandResult};

#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub index: usize,
    pub fingerprint: String,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PropReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub submitted: usize,
    pub evaluated: usize,
    pub cache_hits: usize,
    pub failed: usize,
    pub items: Vec<BatchItem>,
}

pub fn run(config: &AppConfig, snapshots_path: &Path, pretty: bool) -> CommandResult {
    let snapshots: Vec<PropSnapshot> = match read_json(snapshots_path) {
        Ok(snapshots) => snapshots,
        Err(error) => return CommandResult::from_application_error("batch", error),
    };

    let mut cache = TtlCache::with_ttl_secs(config.cache.ttl_secs);
    let summary = evaluate_batch(&snapshots, &config.engine, &mut cache, Utc::now());
    debug!(
        event_name = "cli.batch.cache",
        ttl_secs = cache.ttl().num_seconds(),
        cached_reports = cache.len(),
        "batch cache state"
    );
    CommandResult::success("batch", &summary, pretty)
}

/// Scores each snapshot, serving repeats of an already-scored snapshot from
/// `cache`. A snapshot that fails validation is reported in place and does
/// not stop the batch.
pub fn evaluate_batch<C>(
    snapshots: &[PropSnapshot],
    config: &EngineConfig,
    cache: &mut C,
    now: DateTime<Utc>,
) -> BatchSummary
where
    C: SnapshotCache<PropReport>,
{
    let purged = cache.purge_expired(now);
    let mut items = Vec::with_capacity(snapshots.len());
    let (mut evaluated, mut cache_hits, mut failed) = (0, 0, 0);

    for (index, snapshot) in snapshots.iter().enumerate() {
        let fingerprint = snapshot_fingerprint(snapshot);

        if let Some(report) = cache.get(&fingerprint, now) {
            cache_hits += 1;
            items.push(BatchItem {
                index,
                fingerprint,
                cached: true,
                report: Some(report.clone()),
                error: None,
            });
            continue;
        }

        match analyze_prop(snapshot, config) {
            Ok(report) => {
                evaluated += 1;
                cache.insert(fingerprint.clone(), report.clone(), now);
                items.push(BatchItem {
                    index,
                    fingerprint,
                    cached: false,
                    report: Some(report),
                    error: None,
                });
            }
            Err(error) => {
                failed += 1;
                items.push(BatchItem {
                    index,
                    fingerprint,
                    cached: false,
                    report: None,
                    error: Some(error.to_string()),
                });
            }
        }
    }

    debug!(
        event_name = "cli.batch.completed",
        submitted = snapshots.len(),
        evaluated,
        cache_hits,
        failed,
        purged,
        "batch evaluation completed"
    );

    BatchSummary { submitted: snapshots.len(), evaluated, cache_hits, failed, items }
}
