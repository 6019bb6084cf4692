//! One-factor-at-a-time screening: how each class share co-varies with an
//! emission total across the completed rows.

use serde::Serialize;

use crate::error::AnalysisError;
use crate::model::ResultRow;

use super::check_column;

/// Rank correlation and least-squares line of one output against one
/// factor. Values are `None` when the factor never varies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorScreening {
    pub factor: String,
    pub spearman: Option<f64>,
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
}

const MIN_ROWS: usize = 3;

/// Screen every factor against `column` over the completed rows
pub fn screen(
    rows: &[ResultRow],
    factors: &[String],
    column: &str,
) -> Result<Vec<FactorScreening>, AnalysisError> {
    check_column(column)?;

    let usable: Vec<(&[f64], f64)> = rows
        .iter()
        .filter(|r| r.proportions.len() == factors.len())
        .filter_map(|r| Some((r.proportions.as_slice(), r.outcome.emissions()?.get(column)?)))
        .collect();
    if usable.len() < MIN_ROWS {
        return Err(AnalysisError::TooFewRows(usable.len()));
    }

    let y: Vec<f64> = usable.iter().map(|(_, value)| *value).collect();
    Ok(factors
        .iter()
        .enumerate()
        .map(|(j, factor)| {
            let x: Vec<f64> = usable.iter().map(|(mix, _)| mix[j]).collect();
            let line = least_squares(&x, &y);
            FactorScreening {
                factor: factor.clone(),
                spearman: spearman(&x, &y),
                slope: line.map(|(slope, _)| slope),
                intercept: line.map(|(_, intercept)| intercept),
            }
        })
        .collect())
}

/// Spearman rank correlation; ties get their average rank
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    pearson(&ranks(x), &ranks(y))
}

fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; a tie group shares the mean of its positions
        let rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let (mx, my) = (mean(x), mean(y));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Slope and intercept of the least-squares line `y = slope * x + intercept`
fn least_squares(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let (mx, my) = (mean(x), mean(y));
    let sxx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
    if sxx <= 0.0 {
        return None;
    }
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}
