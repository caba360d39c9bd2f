// Run summaries → rectangular run × metric table

use super::condition::ShapeError;
use crate::aggregate::RunSummary;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Strip any module qualifier and join the remaining path with `_`
///
/// `analysis::host_energy.total` → `host_energy_total`
pub fn normalize_key(key: &str) -> String {
    let unqualified = key.rsplit("::").next().unwrap_or(key);
    unqualified.replace('.', "_")
}

/// One row per run, one column per metric
///
/// Rows follow ascending run index; every row has a value for every column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTable {
    pub runs: Vec<usize>,
    pub columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl RunTable {
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Values of one metric across runs, in run order
    pub fn column(&self, metric: &str) -> Option<Vec<f64>> {
        let index = self.columns.iter().position(|c| c == metric)?;
        Some(self.rows.iter().map(|row| row[index]).collect())
    }

    /// Position of a run index within the table
    pub fn position(&self, run: usize) -> Option<usize> {
        self.runs.iter().position(|&r| r == run)
    }

    pub fn row(&self, position: usize) -> Option<&[f64]> {
        self.rows.get(position).map(Vec::as_slice)
    }

    pub fn value(&self, run: usize, metric: &str) -> Option<f64> {
        let row = self.position(run)?;
        let col = self.columns.iter().position(|c| c == metric)?;
        Some(self.rows[row][col])
    }
}

/// Flatten per-run summaries into a comparable table
///
/// Columns are the union of all normalised metric keys. A run lacking any of
/// them makes the table ragged, which is a fatal shape error.
pub fn flatten(summaries: &BTreeMap<usize, RunSummary>) -> Result<RunTable, ShapeError> {
    if summaries.is_empty() {
        return Err(ShapeError::NoRuns);
    }

    let mut normalized: Vec<(usize, BTreeMap<String, f64>)> = Vec::with_capacity(summaries.len());
    for (&run, summary) in summaries {
        let mut metrics = BTreeMap::new();
        for (key, &value) in &summary.metrics {
            let name = normalize_key(key);
            if metrics.insert(name.clone(), value).is_some() {
                return Err(ShapeError::DuplicateMetric { run, metric: name });
            }
        }
        normalized.push((run, metrics));
    }

    let columns: BTreeSet<&String> = normalized.iter().flat_map(|(_, m)| m.keys()).collect();
    let columns: Vec<String> = columns.into_iter().cloned().collect();

    let mut rows = Vec::with_capacity(normalized.len());
    for (run, metrics) in &normalized {
        let row = columns
            .iter()
            .map(|column| {
                metrics
                    .get(column)
                    .copied()
                    .ok_or_else(|| ShapeError::MissingMetric {
                        run: *run,
                        metric: column.clone(),
                    })
            })
            .collect::<Result<Vec<f64>, ShapeError>>()?;
        rows.push(row);
    }

    Ok(RunTable {
        runs: normalized.iter().map(|(run, _)| *run).collect(),
        columns,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(entries: &[(&str, f64)]) -> RunSummary {
        let mut s = RunSummary::default();
        for (k, v) in entries {
            s.insert(k, *v);
        }
        s
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("host_energy.total"), "host_energy_total");
        assert_eq!(
            normalize_key("analysis::host_energy.total"),
            "host_energy_total"
        );
        assert_eq!(normalize_key("a::b::timestamp.mean"), "timestamp_mean");
        assert_eq!(normalize_key("plain"), "plain");
    }

    #[test]
    fn test_flatten_rows_follow_run_order() {
        let summaries = BTreeMap::from([
            (2, summary(&[("host_energy.total", 11.0)])),
            (0, summary(&[("host_energy.total", 10.0)])),
            (1, summary(&[("host_energy.total", 9.0)])),
        ]);
        let table = flatten(&summaries).unwrap();
        assert_eq!(table.runs, vec![0, 1, 2]);
        assert_eq!(table.column("host_energy_total").unwrap(), vec![10.0, 9.0, 11.0]);
        assert_eq!(table.value(2, "host_energy_total"), Some(11.0));
        assert_eq!(table.row(1), Some(&[9.0][..]));
    }

    #[test]
    fn test_flatten_duplicate_after_normalisation() {
        let summaries = BTreeMap::from([(
            0,
            summary(&[("analysis::host_energy.total", 1.0), ("host_energy.total", 2.0)]),
        )]);
        assert!(matches!(
            flatten(&summaries),
            Err(ShapeError::DuplicateMetric { run: 0, .. })
        ));
    }

    #[test]
    fn test_flatten_empty() {
        assert_eq!(flatten(&BTreeMap::new()), Err(ShapeError::NoRuns));
    }
}
