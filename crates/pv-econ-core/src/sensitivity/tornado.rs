use rust_decimal::prelude::*;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use super::log::{SensitivityLog, Snapshot, OUTPUT_PREFIX};
use crate::error::PvEconError;
use crate::types::{with_metadata, Availability, ComputationOutput};
use crate::PvEconResult;

/// Fewest logged runs a ranking is computed from.
pub const MIN_LOG_ENTRIES: usize = 5;

/// Added to the min-max range so constant columns normalise to zero.
pub const NORMALIZATION_EPSILON: Decimal = dec!(0.00000001);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoRow {
    pub parameter: String,
    /// Pearson coefficient of normalised columns; `None` when either column
    /// has zero variance
    pub correlation: Option<Decimal>,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoReport {
    pub rows: Vec<TornadoRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TornadoAnalysis {
    pub metric: String,
    pub sample_size: usize,
    pub ranking: Availability<TornadoReport>,
}

type Column = Vec<Option<Decimal>>;

fn numeric(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .ok(),
        _ => None,
    }
}

/// Gather each key into a column. A column is kept only if every non-null
/// value is numeric and at least one value is present.
fn numeric_columns<'a>(snapshots: impl Iterator<Item = &'a Snapshot> + Clone) -> BTreeMap<String, Column> {
    let keys: BTreeSet<&String> = snapshots.clone().flat_map(|s| s.keys()).collect();
    let mut columns = BTreeMap::new();

    'keys: for key in keys {
        let mut column = Vec::new();
        for snap in snapshots.clone() {
            match snap.get(key) {
                None | Some(Value::Null) => column.push(None),
                Some(v) => match numeric(v) {
                    Some(d) => column.push(Some(d)),
                    None => continue 'keys,
                },
            }
        }
        if column.iter().any(Option::is_some) {
            columns.insert(key.clone(), column);
        }
    }
    columns
}

/// `(v - min) / (max - min + ε)` over the present values.
pub fn normalize(column: &[Option<Decimal>]) -> Column {
    let present = column.iter().flatten();
    let (min, max) = match (present.clone().min(), present.max()) {
        (Some(min), Some(max)) => (*min, *max),
        _ => return column.to_vec(),
    };
    let range = max - min + NORMALIZATION_EPSILON;
    column.iter().map(|v| v.map(|v| (v - min) / range)).collect()
}

/// Pearson correlation over pairs where both values are present. `None` for
/// fewer than two pairs or zero variance.
pub fn pearson(xs: &[Option<Decimal>], ys: &[Option<Decimal>]) -> Option<Decimal> {
    let pairs: Vec<(Decimal, Decimal)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = Decimal::from(pairs.len());
    let mean_x = pairs.iter().map(|p| p.0).sum::<Decimal>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<Decimal>() / n;

    let mut cov = Decimal::ZERO;
    let mut var_x = Decimal::ZERO;
    let mut var_y = Decimal::ZERO;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x.is_zero() || var_y.is_zero() {
        return None;
    }
    let denom = (var_x * var_y).sqrt()?;
    let r = cov.checked_div(denom)?;
    // Rounding can push |r| a hair past 1
    Some(r.max(-Decimal::ONE).min(Decimal::ONE))
}

fn direction(correlation: Option<Decimal>) -> Direction {
    match correlation {
        Some(c) if c > Decimal::ZERO => Direction::Positive,
        Some(c) if c < Decimal::ZERO => Direction::Negative,
        _ => Direction::Neutral,
    }
}

fn by_abs_correlation(a: &TornadoRow, b: &TornadoRow) -> Ordering {
    match (a.correlation, b.correlation) {
        (Some(x), Some(y)) => y.abs().cmp(&x.abs()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn qualified_metric(metric: &str) -> String {
    if metric.starts_with(&format!("{OUTPUT_PREFIX}.")) {
        metric.to_string()
    } else {
        format!("{OUTPUT_PREFIX}.{metric}")
    }
}

/// Rank logged inputs by the absolute correlation of their normalised values
/// with the normalised `metric` output.
///
/// Fewer than [`MIN_LOG_ENTRIES`] runs yields an unavailable ranking rather
/// than an error. An unknown metric name is an `InvalidParameter`.
pub fn analyze(
    log: &SensitivityLog,
    metric: &str,
) -> PvEconResult<ComputationOutput<TornadoAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let metric = qualified_metric(metric);
    let sample_size = log.len();

    let ranking: Availability<TornadoReport> = if sample_size < MIN_LOG_ENTRIES {
        Availability::from_result(
            Err(PvEconError::InsufficientSampleSize {
                required: MIN_LOG_ENTRIES,
                available: sample_size,
            }),
            "tornado",
            &mut warnings,
        )?
    } else {
        let known_outputs: BTreeSet<&String> =
            log.entries().iter().flat_map(|e| e.outputs.keys()).collect();
        if !known_outputs.contains(&metric) {
            return Err(PvEconError::invalid(
                "metric",
                format!(
                    "unknown output '{metric}', expected one of: {}",
                    known_outputs
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ));
        }

        let inputs = numeric_columns(log.entries().iter().map(|e| &e.inputs));
        let outputs = numeric_columns(log.entries().iter().map(|e| &e.outputs));

        match outputs.get(&metric) {
            None => {
                let reason = format!("output '{metric}' has no numeric values in the log");
                tracing::warn!(%metric, "tornado metric not numeric");
                warnings.push(reason.clone());
                Availability::Unavailable { reason }
            }
            Some(target) => {
                let target = normalize(target);
                let mut rows: Vec<TornadoRow> = inputs
                    .iter()
                    .map(|(name, column)| {
                        let correlation = pearson(&normalize(column), &target);
                        TornadoRow {
                            parameter: name.clone(),
                            correlation,
                            direction: direction(correlation),
                        }
                    })
                    .collect();
                rows.sort_by(by_abs_correlation);

                let undefined = rows.iter().filter(|r| r.correlation.is_none()).count();
                if undefined > 0 {
                    warnings.push(format!(
                        "{undefined} of {} inputs have no variance across the log; correlation undefined",
                        rows.len()
                    ));
                }
                Availability::Available {
                    value: TornadoReport { rows },
                }
            }
        }
    };

    tracing::debug!(%metric, sample_size, "tornado analysis complete");

    let output = TornadoAnalysis {
        metric: metric.clone(),
        sample_size,
        ranking,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Tornado Sensitivity (min-max normalised Pearson correlation)",
        &serde_json::json!({
            "metric": metric,
            "min_entries": MIN_LOG_ENTRIES,
            "epsilon": NORMALIZATION_EPSILON.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(values: &[i64]) -> Column {
        values.iter().map(|v| Some(Decimal::from(*v))).collect()
    }

    #[test]
    fn test_numeric_parsing() {
        assert_eq!(numeric(&Value::String("1.5".into())), Some(dec!(1.5)));
        assert_eq!(numeric(&serde_json::json!(20)), Some(dec!(20)));
        assert_eq!(numeric(&Value::String("Hangzhou".into())), None);
        assert_eq!(numeric(&Value::Bool(true)), None);
    }

    #[test]
    fn test_normalize_range() {
        let n = normalize(&col(&[10, 20, 30]));
        assert_eq!(n[0], Some(Decimal::ZERO));
        assert!((n[2].unwrap() - Decimal::ONE).abs() < dec!(0.000001));
    }

    #[test]
    fn test_constant_column_normalises_to_zero() {
        let n = normalize(&col(&[7, 7, 7]));
        assert!(n.iter().all(|v| *v == Some(Decimal::ZERO)));
    }

    #[test]
    fn test_pearson_perfect() {
        let r = pearson(&col(&[1, 2, 3, 4]), &col(&[2, 4, 6, 8])).unwrap();
        assert!((r - Decimal::ONE).abs() < dec!(0.000001));
        let r = pearson(&col(&[1, 2, 3, 4]), &col(&[8, 6, 4, 2])).unwrap();
        assert!((r + Decimal::ONE).abs() < dec!(0.000001));
    }

    #[test]
    fn test_pearson_zero_variance_undefined() {
        assert_eq!(pearson(&col(&[1, 1, 1]), &col(&[1, 2, 3])), None);
    }

    #[test]
    fn test_pearson_skips_missing_pairs() {
        let xs = vec![Some(dec!(1)), None, Some(dec!(3)), Some(dec!(4))];
        let ys = vec![Some(dec!(1)), Some(dec!(100)), Some(dec!(3)), Some(dec!(4))];
        let r = pearson(&xs, &ys).unwrap();
        assert!((r - Decimal::ONE).abs() < dec!(0.000001));
    }

    #[test]
    fn test_undefined_ranked_last() {
        let mut rows = vec![
            TornadoRow {
                parameter: "a".into(),
                correlation: None,
                direction: Direction::Neutral,
            },
            TornadoRow {
                parameter: "b".into(),
                correlation: Some(dec!(-0.9)),
                direction: Direction::Negative,
            },
            TornadoRow {
                parameter: "c".into(),
                correlation: Some(dec!(0.5)),
                direction: Direction::Positive,
            },
        ];
        rows.sort_by(by_abs_correlation);
        let order: Vec<&str> = rows.iter().map(|r| r.parameter.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_metric_prefix_optional() {
        assert_eq!(qualified_metric("static_npv"), "output.static_npv");
        assert_eq!(qualified_metric("output.static_npv"), "output.static_npv");
    }
}
