//! Das–Dennis reference points
//!
//! Systematic sampling of the unit simplex: every vector of `dim`
//! non-negative multiples of `1/partitions` summing to one. The number of
//! points is the multiset coefficient `C(dim + partitions - 1, partitions)`.

use crate::error::{ContractViolation, EngineError, GaResult};

/// Number of Das–Dennis points, `None` on overflow
pub fn das_dennis_count(dim: usize, partitions: usize) -> Option<usize> {
    // C(n, k) with k = min(partitions, dim - 1), multiplied incrementally so
    // every intermediate value is itself a binomial coefficient.
    let n = dim.checked_add(partitions)?.checked_sub(1)?;
    let k = partitions.min(dim.checked_sub(1)?);
    let mut result: usize = 1;
    for i in 1..=k {
        result = result.checked_mul(n - k + i)? / i;
    }
    Some(result)
}

fn check_arguments(dim: usize, partitions: usize) -> Result<(), ContractViolation> {
    if dim < 2 {
        return Err(ContractViolation::InvalidParameter {
            parameter: "dimension",
            value: dim.to_string(),
        });
    }
    if partitions < 1 {
        return Err(ContractViolation::InvalidParameter {
            parameter: "partitions",
            value: partitions.to_string(),
        });
    }
    Ok(())
}

/// Generate the Das–Dennis points on the unit simplex
///
/// Points are emitted in lexicographic order of their integer numerators,
/// last coordinate varying fastest.
pub fn das_dennis(dim: usize, partitions: usize) -> GaResult<Vec<Vec<f64>>> {
    check_arguments(dim, partitions)?;
    let count = das_dennis_count(dim, partitions).ok_or_else(|| {
        EngineError::ResourceExhaustion(format!(
            "Das-Dennis point count overflows for dimension {dim}, {partitions} partitions"
        ))
    })?;
    let mut points: Vec<Vec<f64>> = Vec::new();
    points.try_reserve_exact(count).map_err(|e| {
        EngineError::ResourceExhaustion(format!("cannot allocate {count} reference points: {e}"))
    })?;

    let p = partitions as f64;
    let mut numerators = vec![0usize; dim];
    fill(&mut numerators, 0, partitions, &mut |n| {
        points.push(n.iter().map(|&x| x as f64 / p).collect());
    });
    Ok(points)
}

fn fill(numerators: &mut [usize], position: usize, left: usize, emit: &mut dyn FnMut(&[usize])) {
    if position == numerators.len() - 1 {
        numerators[position] = left;
        emit(numerators);
        return;
    }
    for value in 0..=left {
        numerators[position] = value;
        fill(numerators, position + 1, left - value, emit);
    }
}

/// Generate Das–Dennis points shrunk by `scale` around the simplex centre
/// and re-centred on `direction`
///
/// Each point becomes `(x - 1/dim) * scale + d`, where `d` is `direction`
/// normalised to sum to one (the centroid when absent).
pub fn das_dennis_scaled(
    dim: usize,
    partitions: usize,
    scale: f64,
    direction: Option<&[f64]>,
) -> GaResult<Vec<Vec<f64>>> {
    check_arguments(dim, partitions)?;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(ContractViolation::InvalidParameter {
            parameter: "scale",
            value: scale.to_string(),
        }
        .into());
    }
    let centre = 1.0 / dim as f64;
    let target = match direction {
        None => vec![centre; dim],
        Some(d) => {
            if d.len() != dim {
                return Err(ContractViolation::InvalidParameter {
                    parameter: "direction",
                    value: format!("{} components for dimension {dim}", d.len()),
                }
                .into());
            }
            let sum: f64 = d.iter().sum();
            if !sum.is_finite() || sum <= 0.0 || d.iter().any(|x| !x.is_finite() || *x < 0.0) {
                return Err(ContractViolation::InvalidParameter {
                    parameter: "direction",
                    value: format!("{d:?}"),
                }
                .into());
            }
            d.iter().map(|x| x / sum).collect()
        }
    };

    let mut points = das_dennis(dim, partitions)?;
    for point in &mut points {
        for (x, t) in point.iter_mut().zip(&target) {
            *x = (*x - centre) * scale + t;
        }
    }
    Ok(points)
}
