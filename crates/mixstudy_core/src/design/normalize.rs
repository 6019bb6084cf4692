use crate::error::DegenerateSampleError;
use crate::model::ProportionVector;

/// Project a raw sample row onto the unit simplex by dividing each entry by
/// the row sum.
pub fn normalize(raw: &[f64]) -> Result<ProportionVector, DegenerateSampleError> {
    if raw.is_empty() {
        return Err(DegenerateSampleError::Empty);
    }
    if let Some((index, &value)) = raw
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        return Err(DegenerateSampleError::InvalidEntry { index, value });
    }

    let sum: f64 = raw.iter().sum();
    if sum <= 0.0 {
        return Err(DegenerateSampleError::ZeroSum);
    }

    Ok(ProportionVector::from_normalized(
        raw.iter().map(|v| v / sum).collect(),
    ))
}
