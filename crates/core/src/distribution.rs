// crates/core/src/distribution.rs
//! Bucketed counts with rounded percentages.

use std::collections::{BTreeMap, HashMap};

/// Map a nullable column value to its bucket key. Null and blank values fall
/// into the `unknown` bucket.
pub fn bucket_key(value: Option<&str>, unknown: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => unknown.to_string(),
    }
}

/// `round(count / total * 100)`, 0 when `total` is 0.
pub fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as u32
}

/// One ranked bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub key: String,
    pub count: usize,
    pub percentage: u32,
}

/// Accumulates counts per key along with the grand total.
#[derive(Debug, Clone, Default)]
pub struct Distribution {
    counts: HashMap<String, usize>,
    total: usize,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>) {
        *self.counts.entry(key.into()).or_insert(0) += 1;
        self.total += 1;
    }

    /// Add a nullable value, bucketing blanks under `unknown`.
    pub fn add_value(&mut self, value: Option<&str>, unknown: &str) {
        self.add(bucket_key(value, unknown));
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn count(&self, key: &str) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Buckets sorted by count descending, ties by key ascending, cut to
    /// `limit` when given.
    pub fn ranked(&self, limit: Option<usize>) -> Vec<Bucket> {
        let mut buckets: Vec<Bucket> = self
            .counts
            .iter()
            .map(|(key, &count)| Bucket {
                key: key.clone(),
                count,
                percentage: percentage(count, self.total),
            })
            .collect();
        buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
        if let Some(limit) = limit {
            buckets.truncate(limit);
        }
        buckets
    }

    pub fn into_counts(self) -> BTreeMap<String, usize> {
        self.counts.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Distribution {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut dist = Distribution::new();
        for key in iter {
            dist.add(key);
        }
        dist
    }
}
