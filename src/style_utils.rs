// style_utils.rs
use crate::pivot_utils::PivotTable;
use anyhow::Result as AnyhowResult;
use rayon::prelude::*;
use serde::Serialize;

/// Severity tier of a cell relative to the other cells of its own row, from the
/// quantile band the value falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// At or below the row's 25th percentile.
    Lowest,
    /// Above the 25th, at or below the 50th.
    Light,
    /// Above the 50th, at or below the 75th.
    Medium,
    /// Above the 75th.
    High,
}

/// Three-way sign classification of a percent difference. `Flat` is reserved for an
/// exactly-zero difference; an undefined difference has no trend at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// One formatted pivot cell: display text plus its severity tier. Missing cells and
/// aggregate-column cells carry no tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledCell {
    pub text: String,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledRow {
    pub label: String,
    pub cells: Vec<StyledCell>,
}

/// A pivot table ready for the rendering layer: formatted value strings plus per-cell
/// severity tiers. Carries no markup; turning tiers into colors is the renderer's job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledTable {
    pub row_dim: String,
    pub columns: Vec<String>,
    pub rows: Vec<StyledRow>,
}

impl StyledTable {
    pub fn to_json(&self) -> AnyhowResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One percent-difference cell: the signed percentage, its formatted text, and its
/// sign classification. All three are absent for an undefined difference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendCell {
    pub text: String,
    pub pct: Option<f64>,
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub label: String,
    pub cells: Vec<TrendCell>,
}

/// A difference table ready for the rendering layer: signed percentages plus per-cell
/// sign classifications. Glyph and color assignment stay with the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendTable {
    pub row_dim: String,
    pub columns: Vec<String>,
    pub rows: Vec<TrendRow>,
}

impl TrendTable {
    pub fn to_json(&self) -> AnyhowResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Formats a value for display: rounded to the nearest integer, with a thousands
/// separator. The un-rounded value stays in the pivot table for later diffing.
///
/// ```
/// use markettab::style_utils::format_count;
///
/// assert_eq!(format_count(1249.6), "1,250");
/// assert_eq!(format_count(85.2), "85");
/// assert_eq!(format_count(-1200.0), "-1,200");
/// ```
pub fn format_count(value: f64) -> String {
    let rounded = value.round() as i64;
    let negative = rounded < 0;
    let digits = rounded.abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Formats a percent difference: signed, one decimal place.
///
/// ```
/// use markettab::style_utils::format_percent;
///
/// assert_eq!(format_percent(50.0), "+50.0%");
/// assert_eq!(format_percent(-10.0), "-10.0%");
/// assert_eq!(format_percent(0.0), "+0.0%");
/// ```
pub fn format_percent(pct: f64) -> String {
    format!("{:+.1}%", pct)
}

/// Returns the 25th/50th/75th percentiles of a set of values, with linear
/// interpolation between order statistics. `None` when the set is empty.
///
/// ```
/// use markettab::style_utils::row_quantiles;
///
/// let (q25, q50, q75) = row_quantiles(&[10.0, 20.0, 30.0, 40.0]).unwrap();
/// assert_eq!(q25, 17.5);
/// assert_eq!(q50, 25.0);
/// assert_eq!(q75, 35.0);
/// ```
pub fn row_quantiles(values: &[f64]) -> Option<(f64, f64, f64)> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let pick = |q: f64| -> f64 {
        let pos = (sorted.len() - 1) as f64 * q;
        let lower = pos.floor() as usize;
        let upper = pos.ceil() as usize;
        if lower == upper {
            sorted[lower]
        } else {
            sorted[lower] + (pos - lower as f64) * (sorted[upper] - sorted[lower])
        }
    };

    Some((pick(0.25), pick(0.5), pick(0.75)))
}

/// Assigns a severity tier from the quantile band a value falls in.
pub fn severity_for(value: f64, quantiles: (f64, f64, f64)) -> Severity {
    let (q25, q50, q75) = quantiles;
    if value > q75 {
        Severity::High
    } else if value > q50 {
        Severity::Medium
    } else if value > q25 {
        Severity::Light
    } else {
        Severity::Lowest
    }
}

/// Classifies the sign of a percent difference.
pub fn classify_trend(pct: f64) -> Trend {
    if pct > 0.0 {
        Trend::Up
    } else if pct < 0.0 {
        Trend::Down
    } else {
        Trend::Flat
    }
}

/// Formats a pivot table and assigns per-row quantile severity tiers.
///
/// The quantile basis is each row's own values, excluding the designated aggregate
/// column. The per-row scope determines which cells read as most and least severe,
/// so it must not be widened to the whole table. Aggregate-column cells are formatted
/// but carry no tier; missing cells render blank, never "0".
pub fn style_pivot(pivot: &PivotTable, aggregate_label: Option<&str>) -> StyledTable {
    let aggregate_idx = aggregate_label
        .and_then(|label| pivot.columns.iter().position(|col| col == label));

    let rows: Vec<StyledRow> = pivot
        .rows
        .par_iter()
        .zip(pivot.values.par_iter())
        .map(|(label, row_values)| {
            let basis: Vec<f64> = row_values
                .iter()
                .enumerate()
                .filter(|(idx, _)| Some(*idx) != aggregate_idx)
                .filter_map(|(_, cell)| *cell)
                .collect();
            let quantiles = row_quantiles(&basis);

            let cells: Vec<StyledCell> = row_values
                .iter()
                .enumerate()
                .map(|(idx, cell)| match cell {
                    Some(value) => {
                        let severity = if Some(idx) == aggregate_idx {
                            None
                        } else {
                            Some(
                                quantiles
                                    .map(|q| severity_for(*value, q))
                                    .unwrap_or(Severity::Lowest),
                            )
                        };
                        StyledCell {
                            text: format_count(*value),
                            severity,
                        }
                    }
                    None => StyledCell {
                        text: String::new(),
                        severity: None,
                    },
                })
                .collect();

            StyledRow {
                label: label.clone(),
                cells,
            }
        })
        .collect();

    StyledTable {
        row_dim: pivot.row_dim.clone(),
        columns: pivot.columns.clone(),
        rows,
    }
}

/// Formats a percent-difference table and assigns per-cell sign classifications.
///
/// Exactly-zero and undefined cells are distinct: zero formats as a signed `+0.0%`
/// with a `Flat` trend, while an undefined cell renders blank with no trend.
pub fn style_difference(diff: &PivotTable) -> TrendTable {
    let rows: Vec<TrendRow> = diff
        .rows
        .iter()
        .zip(diff.values.iter())
        .map(|(label, row_values)| {
            let cells: Vec<TrendCell> = row_values
                .iter()
                .map(|cell| match cell {
                    Some(pct) => TrendCell {
                        text: format_percent(*pct),
                        pct: Some(*pct),
                        trend: Some(classify_trend(*pct)),
                    },
                    None => TrendCell {
                        text: String::new(),
                        pct: None,
                        trend: None,
                    },
                })
                .collect();

            TrendRow {
                label: label.clone(),
                cells,
            }
        })
        .collect();

    TrendTable {
        row_dim: diff.row_dim.clone(),
        columns: diff.columns.clone(),
        rows,
    }
}
