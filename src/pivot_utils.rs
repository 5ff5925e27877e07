// pivot_utils.rs
use crate::table_utils::{parse_numeric, TableBuilder};
use anyhow::{bail, Result as AnyhowResult};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifies one data-collection cycle. Cycles are totally ordered by the embedded
/// integer and rendered as `cycle_<n>` in the observation table.
///
/// ```
/// use markettab::pivot_utils::CycleId;
///
/// let cycle = CycleId::parse("cycle_3").unwrap();
/// assert_eq!(cycle.index(), 3);
/// assert_eq!(cycle.label(), "cycle_3");
/// assert_eq!(cycle.prev(), Some(CycleId::new(2)));
/// assert_eq!(CycleId::new(1).prev(), None);
/// assert!(CycleId::parse("baseline").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CycleId(u32);

impl CycleId {
    pub fn new(index: u32) -> Self {
        CycleId(index)
    }

    /// Parses a `cycle_<n>` label.
    pub fn parse(label: &str) -> Option<Self> {
        label
            .trim()
            .strip_prefix("cycle_")
            .and_then(|digits| digits.parse::<u32>().ok())
            .map(CycleId)
    }

    pub fn index(&self) -> u32 {
        self.0
    }

    pub fn label(&self) -> String {
        format!("cycle_{}", self.0)
    }

    /// The immediately preceding cycle, or `None` for the first cycle.
    pub fn prev(&self) -> Option<CycleId> {
        if self.0 <= 1 {
            None
        } else {
            Some(CycleId(self.0 - 1))
        }
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle_{}", self.0)
    }
}

/// Duplicate-resolution policy applied to each `(row, column)` group during pivoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregator {
    Median,
    Mean,
}

impl Aggregator {
    /// Aggregates a group of observed values. Empty groups aggregate to `None`.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            Aggregator::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
                } else {
                    Some(sorted[mid])
                }
            }
            Aggregator::Mean => {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
    }
}

/// Represents a pivot transformation on an observation table. This struct specifies the
/// target cycle, the filter selections to narrow the row set, the dimensions to use as
/// row and column index, and the aggregation policy.
#[derive(Debug, Clone)]
pub struct PivotSpec {
    pub cycle: CycleId,
    pub cycle_column: String,
    /// Filter selections as `(dimension, selected value)`; a dimension left out of the
    /// list is unconstrained.
    pub filters: Vec<(String, String)>,
    pub row_dim: String,
    pub col_dim: String,
    pub value_column: String,
    pub aggregator: Aggregator,
    /// Label of the whole-country aggregate column, pinned to the last column position
    /// when present.
    pub aggregate_label: Option<String>,
    /// Label of the total row, pinned to the last row position when present.
    pub total_label: Option<String>,
}

/// A rectangular cross-tab of aggregated values. Cell values are un-rounded; rounding
/// and separators are applied by the presentation layer only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub row_dim: String,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// One inner vector per row, one entry per column; `None` marks a missing cell.
    pub values: Vec<Vec<Option<f64>>>,
}

impl PivotTable {
    /// Looks up one cell by row and column label.
    pub fn value(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.rows.iter().position(|label| label == row)?;
        let c = self.columns.iter().position(|label| label == column)?;
        self.values[r][c]
    }

    pub fn to_json(&self) -> AnyhowResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Result of a single-cycle pivot: either a table, or the explicit empty sentinel when
/// the filter selections match no observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PivotOutcome {
    Table(PivotTable),
    Empty,
}

/// Result of a cycle-over-cycle comparison. `NoPriorPeriod` is a distinct condition
/// from `Empty`: the first cycle has nothing to compare against, which the caller must
/// report differently from a selection that matches no data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DiffOutcome {
    Table(PivotTable),
    Empty,
    NoPriorPeriod,
}

/// Pivots the observation table for the cycle named in the spec.
///
/// Retains observations whose cycle matches and whose trimmed cells equal every filter
/// selection, groups them by `(row_dim, col_dim)`, aggregates the value column per
/// group, and reshapes into a rectangular table. Columns are sorted ascending by label
/// with the aggregate column last; rows likewise with the total row last.
///
/// ```
/// use markettab::pivot_utils::{build_pivot, Aggregator, CycleId, PivotOutcome, PivotSpec};
/// use markettab::table_utils::TableBuilder;
///
/// let table = TableBuilder::from_raw_data(
///     vec!["Cycle".to_string(), "Produit".to_string(), "Disag".to_string(), "Value".to_string()],
///     vec![
///         vec!["cycle_2".to_string(), "Savon".to_string(), "Nord".to_string(), "150".to_string()],
///         vec!["cycle_2".to_string(), "Savon".to_string(), "Sud".to_string(), "180".to_string()],
///     ],
/// );
///
/// let spec = PivotSpec {
///     cycle: CycleId::new(2),
///     cycle_column: "Cycle".to_string(),
///     filters: vec![],
///     row_dim: "Produit".to_string(),
///     col_dim: "Disag".to_string(),
///     value_column: "Value".to_string(),
///     aggregator: Aggregator::Median,
///     aggregate_label: None,
///     total_label: None,
/// };
///
/// match build_pivot(&table, &spec).unwrap() {
///     PivotOutcome::Table(pivot) => {
///         assert_eq!(pivot.value("Savon", "Nord"), Some(150.0));
///         assert_eq!(pivot.value("Savon", "Sud"), Some(180.0));
///     }
///     PivotOutcome::Empty => panic!("selection matched no observations"),
/// }
/// ```
pub fn build_pivot(table: &TableBuilder, spec: &PivotSpec) -> AnyhowResult<PivotOutcome> {
    match compute_pivot(table, spec, spec.cycle)? {
        Some(pivot) => Ok(PivotOutcome::Table(pivot)),
        None => Ok(PivotOutcome::Empty),
    }
}

/// Builds the percent-difference cross-tab between the cycle named in the spec and the
/// cycle immediately before it.
///
/// The first cycle yields `NoPriorPeriod`. Otherwise both cycles are pivoted with
/// identical filters and dimensions; if either side is empty the outcome is `Empty`.
/// The two pivots are outer-joined on the row key, so rows present in only one cycle
/// still appear; columns are restricted to those present in both. A cell is
/// `(curr - prev) / prev * 100`, defined only when both sides are present and the
/// previous value is nonzero. Every other case is missing, never infinity and never
/// zero.
pub fn build_difference(table: &TableBuilder, spec: &PivotSpec) -> AnyhowResult<DiffOutcome> {
    let prev_cycle = match spec.cycle.prev() {
        Some(prev) => prev,
        None => return Ok(DiffOutcome::NoPriorPeriod),
    };

    let current = compute_pivot(table, spec, spec.cycle)?;
    let previous = compute_pivot(table, spec, prev_cycle)?;

    let (current, previous) = match (current, previous) {
        (Some(current), Some(previous)) => (current, previous),
        _ => return Ok(DiffOutcome::Empty),
    };

    let mut row_set: BTreeSet<String> = current.rows.iter().cloned().collect();
    row_set.extend(previous.rows.iter().cloned());
    let rows = order_labels(row_set, spec.total_label.as_deref());

    let columns: Vec<String> = current
        .columns
        .iter()
        .filter(|col| previous.columns.contains(*col))
        .cloned()
        .collect();

    let values: Vec<Vec<Option<f64>>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| match (current.value(row, col), previous.value(row, col)) {
                    (Some(curr), Some(prev)) if prev != 0.0 => {
                        Some((curr - prev) / prev * 100.0)
                    }
                    _ => None,
                })
                .collect()
        })
        .collect();

    Ok(DiffOutcome::Table(PivotTable {
        row_dim: current.row_dim,
        rows,
        columns,
        values,
    }))
}

/// Sorts labels ascending, moving the pinned label to the last position if present.
fn order_labels(labels: BTreeSet<String>, pinned_last: Option<&str>) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::with_capacity(labels.len());
    let mut pinned: Option<String> = None;

    for label in labels {
        if Some(label.as_str()) == pinned_last {
            pinned = Some(label);
        } else {
            ordered.push(label);
        }
    }
    if let Some(label) = pinned {
        ordered.push(label);
    }

    ordered
}

fn compute_pivot(
    table: &TableBuilder,
    spec: &PivotSpec,
    cycle: CycleId,
) -> AnyhowResult<Option<PivotTable>> {
    let headers = match table.get_headers() {
        Some(headers) => headers,
        None => return Ok(None),
    };

    let col_of = |name: &str| headers.iter().position(|h| h == name);

    let cycle_idx = match col_of(&spec.cycle_column) {
        Some(idx) => idx,
        None => bail!("cycle column '{}' not found in table", spec.cycle_column),
    };
    let row_idx = match col_of(&spec.row_dim) {
        Some(idx) => idx,
        None => bail!("row dimension '{}' not found in table", spec.row_dim),
    };
    let col_idx = match col_of(&spec.col_dim) {
        Some(idx) => idx,
        None => bail!("column dimension '{}' not found in table", spec.col_dim),
    };
    let value_idx = match col_of(&spec.value_column) {
        Some(idx) => idx,
        None => bail!("value column '{}' not found in table", spec.value_column),
    };

    let mut filter_indices: Vec<(usize, String)> = Vec::with_capacity(spec.filters.len());
    for (dim, selected) in &spec.filters {
        match col_of(dim) {
            Some(idx) => filter_indices.push((idx, selected.trim().to_string())),
            None => {
                log::warn!("filter dimension '{}' not found in table", dim);
                return Ok(None);
            }
        }
    }

    let cycle_label = cycle.label();

    let mut groups: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    let mut row_set: BTreeSet<String> = BTreeSet::new();
    let mut col_set: BTreeSet<String> = BTreeSet::new();

    let data = match table.get_data() {
        Some(data) => data,
        None => return Ok(None),
    };

    for row in data {
        let cell = |idx: usize| row.get(idx).map(|c| c.trim()).unwrap_or("");

        if cell(cycle_idx) != cycle_label {
            continue;
        }
        if !filter_indices
            .iter()
            .all(|(idx, selected)| cell(*idx) == selected)
        {
            continue;
        }

        let row_label = cell(row_idx).to_string();
        let col_label = cell(col_idx).to_string();
        row_set.insert(row_label.clone());
        col_set.insert(col_label.clone());

        if let Some(value) = parse_numeric(cell(value_idx)) {
            groups.entry((row_label, col_label)).or_default().push(value);
        }
    }

    if row_set.is_empty() {
        return Ok(None);
    }

    let rows = order_labels(row_set, spec.total_label.as_deref());
    let columns = order_labels(col_set, spec.aggregate_label.as_deref());

    let values: Vec<Vec<Option<f64>>> = rows
        .iter()
        .map(|row_label| {
            columns
                .iter()
                .map(|col_label| {
                    groups
                        .get(&(row_label.clone(), col_label.clone()))
                        .and_then(|observed| spec.aggregator.apply(observed))
                })
                .collect()
        })
        .collect();

    Ok(Some(PivotTable {
        row_dim: spec.row_dim.clone(),
        rows,
        columns,
        values,
    }))
}
