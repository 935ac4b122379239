use crate::application::ports::RemoteStore;
use crate::domain::entities::{
    ExternalRecord, ReconcileSummary, RecordUpsert, RemoteRecord, UpsertOutcome,
};
use crate::domain::value_objects::IntegrationKind;
use crate::shared::error::AppError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// Fingerprint of the fields that matter for change detection.
///
/// serde_json maps are ordered by key, so the serialized form is canonical
/// regardless of the order the source emitted its payload keys in.
pub fn fingerprint(record: &ExternalRecord) -> String {
    let projection = serde_json::json!({
        "displayName": record.display_name.trim(),
        "payload": record.payload,
        "sourceCreatedAt": record.source_created_at.timestamp_millis(),
        "sourceUpdatedAt": record.source_updated_at.map(|at| at.timestamp_millis()),
    });
    let digest = Sha256::digest(projection.to_string().as_bytes());
    format!("{digest:x}")
}

/// Writes needed to bring the mirror in line with a fetched batch.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub inserts: Vec<RecordUpsert>,
    pub updates: Vec<RecordUpsert>,
    pub unchanged_count: u64,
}

impl ReconcilePlan {
    pub fn summary(&self) -> ReconcileSummary {
        ReconcileSummary {
            inserted_count: self.inserts.len() as u64,
            updated_count: self.updates.len() as u64,
            unchanged_count: self.unchanged_count,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }
}

/// Duplicate ids keep the most recently modified entry; ties go to the later one.
fn dedupe(fetched: Vec<ExternalRecord>) -> Vec<ExternalRecord> {
    let mut order: Vec<ExternalRecord> = Vec::with_capacity(fetched.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in fetched {
        match index.get(record.external_id.as_str()) {
            Some(&slot) => {
                if record.last_modified() >= order[slot].last_modified() {
                    order[slot] = record;
                }
            }
            None => {
                index.insert(record.external_id.as_str().to_string(), order.len());
                order.push(record);
            }
        }
    }
    order
}

/// Pure diff of `fetched` against the mirrored rows.
pub fn plan(existing: &[RemoteRecord], fetched: Vec<ExternalRecord>) -> ReconcilePlan {
    let mirrored: HashMap<&str, &str> = existing
        .iter()
        .map(|row| (row.external_id.as_str(), row.content_hash.as_str()))
        .collect();

    let mut result = ReconcilePlan::default();
    for record in dedupe(fetched) {
        let content_hash = fingerprint(&record);
        let previous = mirrored.get(record.external_id.as_str()).copied();

        if previous == Some(content_hash.as_str()) {
            result.unchanged_count += 1;
            continue;
        }

        let upsert = RecordUpsert {
            display_name: record.display_name.trim().to_string(),
            external_id: record.external_id,
            payload: record.payload,
            source_created_at: record.source_created_at,
            source_updated_at: record.source_updated_at,
            content_hash,
        };
        if previous.is_some() {
            result.updates.push(upsert);
        } else {
            result.inserts.push(upsert);
        }
    }
    result
}

/// Partial application: `applied` records were written before `error`.
#[derive(Debug)]
pub struct ReconcileFailure {
    pub error: AppError,
    pub applied: u64,
}

pub struct Reconciler {
    store: Arc<dyn RemoteStore>,
    batch_size: usize,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RemoteStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn merge(
        &self,
        integration: IntegrationKind,
        fetched: Vec<ExternalRecord>,
    ) -> Result<ReconcileSummary, ReconcileFailure> {
        let existing = self
            .store
            .list_records(integration)
            .await
            .map_err(|error| ReconcileFailure { error, applied: 0 })?;

        let plan = plan(&existing, fetched);
        let planned = plan.summary();
        tracing::debug!(
            target: "sync::reconcile",
            integration = %integration,
            inserts = planned.inserted_count,
            updates = planned.updated_count,
            unchanged = planned.unchanged_count,
            "reconcile plan ready"
        );
        if plan.is_noop() {
            return Ok(planned);
        }

        let writes: Vec<RecordUpsert> = plan.inserts.into_iter().chain(plan.updates).collect();
        let mut outcome = UpsertOutcome::default();
        for chunk in writes.chunks(self.batch_size) {
            match self.store.upsert_batch(integration, chunk).await {
                Ok(applied) => outcome.absorb(applied),
                Err(error) => {
                    let applied = outcome.inserted_count + outcome.updated_count;
                    tracing::warn!(
                        target: "sync::reconcile",
                        integration = %integration,
                        applied,
                        error = %error,
                        "upsert batch failed"
                    );
                    return Err(ReconcileFailure { error, applied });
                }
            }
        }

        // ストアが差分なしと判断した分はunchangedに寄せる
        let written = outcome.inserted_count + outcome.updated_count;
        let skipped = (writes.len() as u64).saturating_sub(written);
        Ok(ReconcileSummary {
            inserted_count: outcome.inserted_count,
            updated_count: outcome.updated_count,
            unchanged_count: planned.unchanged_count + skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::ExternalId;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap()
    }

    fn record(id: &str, title: &str) -> ExternalRecord {
        ExternalRecord::new(
            ExternalId::new(id.to_string()).unwrap(),
            title,
            json!({"title": title, "participants": ["a", "b"]}),
            created(),
            None,
        )
    }

    fn mirrored(record: &ExternalRecord) -> RemoteRecord {
        RemoteRecord {
            id: format!("row-{}", record.external_id),
            integration: IntegrationKind::Granola,
            external_id: record.external_id.clone(),
            display_name: record.display_name.clone(),
            payload: record.payload.clone(),
            source_created_at: record.source_created_at,
            source_updated_at: record.source_updated_at,
            content_hash: fingerprint(record),
            created_at: created(),
            updated_at: created(),
        }
    }

    #[test]
    fn fingerprint_ignores_key_order_and_name_padding() {
        let a = ExternalRecord::new(
            ExternalId::new("m1".to_string()).unwrap(),
            "Weekly sync",
            serde_json::from_str(r#"{"b": 1, "a": {"y": 2, "x": 1}}"#).unwrap(),
            created(),
            None,
        );
        let mut b = a.clone();
        b.display_name = "  Weekly sync ".to_string();
        b.payload = serde_json::from_str(r#"{"a": {"x": 1, "y": 2}, "b": 1}"#).unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));

        b.source_updated_at = Some(created() + Duration::minutes(1));
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn plan_splits_inserts_updates_and_unchanged() {
        let kept = record("m1", "Kept");
        let edited = record("m2", "Before");
        let existing = vec![mirrored(&kept), mirrored(&edited)];

        let fetched = vec![kept.clone(), record("m2", "After"), record("m3", "New")];
        let plan = plan(&existing, fetched);

        assert_eq!(
            plan.summary(),
            ReconcileSummary {
                inserted_count: 1,
                updated_count: 1,
                unchanged_count: 1,
            }
        );
        assert_eq!(plan.inserts[0].external_id.as_str(), "m3");
        assert_eq!(plan.updates[0].display_name, "After");
    }

    #[test]
    fn duplicates_collapse_to_latest_update() {
        let mut older = record("m1", "Old title");
        older.source_updated_at = Some(created() + Duration::hours(2));
        let mut newer = record("m1", "New title");
        newer.source_updated_at = Some(created() + Duration::hours(3));

        let plan = plan(&[], vec![newer, older]);
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].display_name, "New title");
    }

    #[test]
    fn replaying_mirrored_batch_is_a_noop() {
        let batch = vec![record("m1", "One"), record("m2", "Two")];
        let existing: Vec<RemoteRecord> = batch.iter().map(mirrored).collect();

        let plan = plan(&existing, batch);
        assert!(plan.is_noop());
        assert_eq!(plan.unchanged_count, 2);
    }
}
