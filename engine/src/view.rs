//! The merged view - a single deduplicated, sorted projection of a
//! collection fed by two asynchronous sources.
//!
//! # Algorithm
//!
//! 1. Coerce every record in the incoming batch (skip missing ids)
//! 2. Build a map keyed by id from the current view
//! 3. Overlay the batch: remote records replace unconditionally, local
//!    records only fill vacant ids
//! 4. Replace the view with the map's values sorted by date descending
//!
//! The view is rebuilt from scratch on every merge - it is a pure
//! projection, not an incrementally updated structure. The caller owns it
//! between invocations and supplies the wall-clock instant used as the
//! fallback for unparseable dates, so the view itself performs no IO.

use crate::record::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Which side of the sync a batch came from.
///
/// Remote records replace any existing entry for their id; local records
/// never displace one, so remote precedence is sticky across repeated
/// local refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchSource {
    Local,
    Remote,
}

/// Counters describing what one merge did with a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    /// Records in the incoming batch
    pub received: usize,
    /// Records inserted or replaced
    pub merged: usize,
    /// Records skipped (missing id, or shielded by an existing entry)
    pub skipped: usize,
}

/// The deduplicated, date-descending view of one synced collection.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedView<R> {
    records: Vec<R>,
}

impl<R> Default for MergedView<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<R: Entity> MergedView<R> {
    /// Create an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a batch of raw remote records into the view.
    ///
    /// Remote records overwrite any existing entry sharing their id,
    /// whether it came from the local cache or an earlier push. A
    /// non-array `batch` is a no-op.
    pub fn merge_remote(&mut self, batch: &Value, now: DateTime<Utc>) -> MergeOutcome {
        self.merge(batch, now, BatchSource::Remote)
    }

    /// Fold a batch of raw local records into the view.
    ///
    /// A local record is only inserted when no entry exists for its id -
    /// local never overwrites a (possibly remote) entry. A non-array
    /// `batch` is a no-op.
    pub fn merge_local(&mut self, batch: &Value, now: DateTime<Utc>) -> MergeOutcome {
        self.merge(batch, now, BatchSource::Local)
    }

    fn merge(&mut self, batch: &Value, now: DateTime<Utc>, source: BatchSource) -> MergeOutcome {
        let Some(items) = batch.as_array() else {
            tracing::debug!(collection = R::COLLECTION, "ignoring non-array batch");
            return MergeOutcome::default();
        };

        let mut outcome = MergeOutcome {
            received: items.len(),
            ..MergeOutcome::default()
        };

        let mut map: HashMap<String, R> =
            HashMap::with_capacity(self.records.len() + items.len());
        for existing in self.records.drain(..) {
            map.insert(existing.id().to_string(), existing);
        }

        for item in items {
            let Some(record) = R::from_raw(item, now) else {
                outcome.skipped += 1;
                continue;
            };
            match source {
                BatchSource::Remote => {
                    map.insert(record.id().to_string(), record);
                    outcome.merged += 1;
                }
                BatchSource::Local => match map.entry(record.id().to_string()) {
                    Entry::Occupied(_) => outcome.skipped += 1,
                    Entry::Vacant(slot) => {
                        slot.insert(record);
                        outcome.merged += 1;
                    }
                },
            }
        }

        self.records = map.into_values().collect();
        self.records
            .sort_by(|a, b| b.occurred_at().cmp(&a.occurred_at()));

        tracing::debug!(
            collection = R::COLLECTION,
            received = outcome.received,
            merged = outcome.merged,
            skipped = outcome.skipped,
            total = self.records.len(),
            "merged batch"
        );

        outcome
    }

    /// Records in date-descending order.
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Look up a record by id.
    pub fn get(&self, id: &str) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Remove a record by id.
    ///
    /// This is the explicit local deletion path - the merge itself is
    /// additive/overwrite-only, so a record absent from a later remote
    /// batch stays in the view until removed here.
    pub fn remove(&mut self, id: &str) -> Option<R> {
        let pos = self.records.iter().position(|r| r.id() == id)?;
        Some(self.records.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Start a filtered query over the view.
    pub fn query(&self) -> Query<'_, R> {
        Query {
            records: self.records.iter().collect(),
        }
    }
}

/// Builder for filtering and summarizing view records.
#[derive(Debug)]
pub struct Query<'a, R> {
    records: Vec<&'a R>,
}

impl<'a, R: Entity> Query<'a, R> {
    /// Keep only records matching the predicate.
    pub fn matching<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&R) -> bool,
    {
        self.records.retain(|r| predicate(r));
        self
    }

    /// Get all matching records, view order preserved.
    pub fn all(self) -> Vec<&'a R> {
        self.records
    }

    /// Count matching records.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Sum of the monetary quantity over matching records.
    pub fn total_amount(&self) -> i64 {
        self.records.iter().map(|r| r.amount()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{PaymentMethod, Receipt};
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn view_ids(view: &MergedView<Receipt>) -> Vec<&str> {
        view.records().iter().map(|r| r.id()).collect()
    }

    #[test]
    fn remote_overwrites_local() {
        let now = fixed_now();
        let mut view = MergedView::<Receipt>::new();

        view.merge_local(&json!([{"id": "1", "amount": 100}]), now);
        view.merge_remote(&json!([{"id": "1", "amount": 200}]), now);

        assert_eq!(view.len(), 1);
        assert_eq!(view.get("1").unwrap().amount, 200);
    }

    #[test]
    fn local_never_overwrites_remote() {
        let now = fixed_now();
        let mut view = MergedView::<Receipt>::new();

        view.merge_remote(&json!([{"id": "1", "amount": 200}]), now);
        let outcome = view.merge_local(&json!([{"id": "1", "amount": 100}]), now);

        assert_eq!(view.get("1").unwrap().amount, 200);
        assert_eq!(outcome.merged, 0);
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn remote_precedence_is_sticky_across_refreshes() {
        let now = fixed_now();
        let mut view = MergedView::<Receipt>::new();

        view.merge_remote(&json!([{"id": "1", "amount": 200}]), now);
        for _ in 0..5 {
            view.merge_local(&json!([{"id": "1", "amount": 100}]), now);
        }

        assert_eq!(view.get("1").unwrap().amount, 200);
    }

    #[test]
    fn overlapping_remote_batches_keep_latest() {
        let now = fixed_now();
        let mut view = MergedView::<Receipt>::new();

        view.merge_remote(&json!([{"id": "5", "amount": 10}]), now);
        view.merge_remote(&json!([{"id": "5", "amount": 99}]), now);

        assert_eq!(view.len(), 1);
        assert_eq!(view.get("5").unwrap().amount, 99);
    }

    #[test]
    fn merge_remote_is_idempotent() {
        let now = fixed_now();
        let batch = json!([
            {"id": "a", "amount": 1, "date": "2024-01-01"},
            {"id": "b", "amount": 2, "date": "2024-02-01"},
        ]);

        let mut view = MergedView::<Receipt>::new();
        view.merge_remote(&batch, now);
        let once = view.clone();
        view.merge_remote(&batch, now);

        assert_eq!(view, once);
    }

    #[test]
    fn view_is_sorted_date_descending() {
        let now = fixed_now();
        let mut view = MergedView::<Receipt>::new();

        view.merge_remote(
            &json!([
                {"id": "jan", "date": "2024-01-01"},
                {"id": "mar", "date": "2024-03-01"},
                {"id": "feb", "date": "2024-02-01"},
            ]),
            now,
        );

        assert_eq!(view_ids(&view), vec!["mar", "feb", "jan"]);
    }

    #[test]
    fn missing_id_is_skipped() {
        let now = fixed_now();
        let mut view = MergedView::<Receipt>::new();
        view.merge_remote(&json!([{"id": "1", "amount": 5}]), now);

        let outcome = view.merge_remote(&json!([{"amount": 7}]), now);

        assert_eq!(view.len(), 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.merged, 0);
    }

    #[test]
    fn non_array_batch_is_a_no_op() {
        let now = fixed_now();
        let mut view = MergedView::<Receipt>::new();
        view.merge_remote(&json!([{"id": "1"}]), now);
        let before = view.clone();

        assert_eq!(view.merge_remote(&json!({"id": "2"}), now), MergeOutcome::default());
        assert_eq!(view.merge_local(&json!("nope"), now), MergeOutcome::default());
        assert_eq!(view.merge_remote(&json!(null), now), MergeOutcome::default());
        assert_eq!(view, before);
    }

    #[test]
    fn numeric_and_string_ids_collide() {
        let now = fixed_now();
        let mut view = MergedView::<Receipt>::new();

        view.merge_local(&json!([{"id": 7, "amount": 1}]), now);
        view.merge_remote(&json!([{"id": "7", "amount": 2}]), now);

        assert_eq!(view.len(), 1);
        assert_eq!(view.get("7").unwrap().amount, 2);
    }

    #[test]
    fn union_of_both_sources_survives() {
        let now = fixed_now();
        let mut view = MergedView::<Receipt>::new();

        view.merge_local(
            &json!([{"id": "l1", "date": "2024-01-05"}, {"id": "both", "date": "2024-01-06"}]),
            now,
        );
        view.merge_remote(
            &json!([{"id": "r1", "date": "2024-01-07"}, {"id": "both", "date": "2024-01-08"}]),
            now,
        );

        assert_eq!(view.len(), 3);
        assert!(view.get("l1").is_some());
        assert!(view.get("r1").is_some());
        assert!(view.get("both").is_some());
    }

    #[test]
    fn remote_absence_does_not_delete() {
        let now = fixed_now();
        let mut view = MergedView::<Receipt>::new();

        view.merge_remote(&json!([{"id": "1"}, {"id": "2"}]), now);
        view.merge_remote(&json!([{"id": "2"}]), now);

        // the merge is additive: "1" stays until explicitly removed
        assert_eq!(view.len(), 2);
        assert!(view.remove("1").is_some());
        assert_eq!(view.len(), 1);
        assert!(view.remove("1").is_none());
    }

    #[test]
    fn query_filters_and_sums() {
        let now = fixed_now();
        let mut view = MergedView::<Receipt>::new();
        view.merge_remote(
            &json!([
                {"id": "1", "amount": 100, "paymentMethod": "cash", "date": "2024-03-01"},
                {"id": "2", "amount": 250, "paymentMethod": "card", "date": "2024-02-01"},
                {"id": "3", "amount": 50, "paymentMethod": "cash", "date": "2024-01-01"},
            ]),
            now,
        );

        assert_eq!(view.query().total_amount(), 400);

        let cash = view
            .query()
            .matching(|r| r.payment_method == PaymentMethod::Cash);
        assert_eq!(cash.count(), 2);
        assert_eq!(cash.total_amount(), 150);

        let ids: Vec<&str> = cash.all().into_iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashMap;

        // date derives from the id so equal-date ties (whose order is
        // unspecified) never make two runs incomparable
        fn arb_raw_receipt() -> impl Strategy<Value = serde_json::Value> {
            (0u32..25, 0i64..100_000).prop_map(|(id, amount)| {
                json!({
                    "id": id.to_string(),
                    "clientName": format!("client {id}"),
                    "amount": amount,
                    "date": 1_600_000_000_000_i64 + i64::from(id) * 86_400_000,
                })
            })
        }

        fn arb_batch() -> impl Strategy<Value = serde_json::Value> {
            proptest::collection::vec(arb_raw_receipt(), 0..20).prop_map(serde_json::Value::Array)
        }

        fn by_id(view: &MergedView<Receipt>) -> HashMap<String, Receipt> {
            view.iter().map(|r| (r.id.clone(), r.clone())).collect()
        }

        proptest! {
            #[test]
            fn prop_merge_remote_idempotent(batch in arb_batch()) {
                let now = fixed_now();
                let mut view = MergedView::<Receipt>::new();
                view.merge_remote(&batch, now);
                let once = view.clone();
                view.merge_remote(&batch, now);
                prop_assert_eq!(view, once);
            }

            #[test]
            fn prop_no_duplicate_ids(local in arb_batch(), remote in arb_batch()) {
                let now = fixed_now();
                let mut view = MergedView::<Receipt>::new();
                view.merge_local(&local, now);
                view.merge_remote(&remote, now);

                let ids: std::collections::HashSet<_> =
                    view.iter().map(|r| r.id.clone()).collect();
                prop_assert_eq!(ids.len(), view.len());
            }

            #[test]
            fn prop_sorted_descending(local in arb_batch(), remote in arb_batch()) {
                let now = fixed_now();
                let mut view = MergedView::<Receipt>::new();
                view.merge_remote(&remote, now);
                view.merge_local(&local, now);

                prop_assert!(view
                    .records()
                    .windows(2)
                    .all(|w| w[0].date >= w[1].date));
            }

            #[test]
            fn prop_remote_wins_in_either_order(local in arb_batch(), remote in arb_batch()) {
                let now = fixed_now();

                let mut local_first = MergedView::<Receipt>::new();
                local_first.merge_local(&local, now);
                local_first.merge_remote(&remote, now);

                let mut remote_first = MergedView::<Receipt>::new();
                remote_first.merge_remote(&remote, now);
                remote_first.merge_local(&local, now);

                // same id -> record mapping regardless of arrival order
                prop_assert_eq!(by_id(&local_first), by_id(&remote_first));
            }
        }
    }
}
