use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::ValidationResult;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
}

/// Aggregate over a batch. Built by folding independent results; nothing
/// here is shared while units are being validated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: f64,
    /// Units never started because the run was cancelled.
    #[serde(default)]
    pub skipped: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub by_category: BTreeMap<String, CategoryStats>,
}

/// `successful / total`, or 0 for an empty batch.
pub fn success_rate(successful: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        successful as f64 / total as f64
    }
}

impl BatchStatistics {
    pub fn record(mut self, r: &ValidationResult) -> Self {
        self.total += 1;
        if r.is_valid {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        if let Some(cat) = &r.category {
            let c = self.by_category.entry(cat.clone()).or_default();
            c.total += 1;
            if r.is_valid {
                c.successful += 1;
            } else {
                c.failed += 1;
            }
        }
        self.success_rate = success_rate(self.successful, self.total);
        self
    }

    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ValidationResult>) -> Self {
        results
            .into_iter()
            .fold(BatchStatistics::default(), BatchStatistics::record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(valid: bool, cat: Option<&str>) -> ValidationResult {
        ValidationResult {
            unit: "u".into(),
            chunk_id: Some(0),
            original_hash: None,
            reconstructed_hash: None,
            is_valid: valid,
            failure: None,
            error: None,
            stats: None,
            category: cat.map(str::to_string),
        }
    }

    #[test]
    fn empty_batch_has_zero_rate() {
        let s = BatchStatistics::from_results(&[]);
        assert_eq!((s.total, s.successful, s.failed), (0, 0, 0));
        assert_eq!(s.success_rate, 0.0);
    }

    #[test]
    fn counts_and_categories() {
        let rs = vec![
            result(true, Some("text")),
            result(false, Some("text")),
            result(true, Some("image")),
            result(true, None),
        ];
        let s = BatchStatistics::from_results(&rs);
        assert_eq!((s.total, s.successful, s.failed), (4, 3, 1));
        assert_eq!(s.success_rate, 0.75);
        assert_eq!(
            s.by_category["text"],
            CategoryStats {
                total: 2,
                successful: 1,
                failed: 1
            }
        );
        assert_eq!(s.by_category["image"].successful, 1);
        assert_eq!(s.by_category.len(), 2);
    }
}
