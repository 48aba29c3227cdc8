use mdp_challenges::TOLERANCE;
use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("instance has no items")]
    EmptyInstance,

    #[error("invalid size bounds [{lower}, {upper}] for {size} items, expected 1 <= lower <= upper <= size")]
    InvalidBounds {
        lower: usize,
        upper: usize,
        size: usize,
    },

    #[error("failed to allocate {what}")]
    OutOfMemory {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },

    /// Incrementally tracked objective disagrees with a from-scratch recomputation.
    #[error("discrepancy in solution values: tracked {tracked:.3}, recomputed {recomputed:.3}")]
    ValueDiscrepancy { tracked: f64, recomputed: f64 },
}

impl SolveError {
    /// Caller supplied an unusable instance or parameters; nothing was searched.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::EmptyInstance | Self::InvalidBounds { .. })
    }

    /// Bookkeeping bug inside the engine.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::ValueDiscrepancy { .. })
    }
}

pub(crate) fn try_vec<T: Clone>(len: usize, value: T, what: &'static str) -> Result<Vec<T>, SolveError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|source| SolveError::OutOfMemory { what, source })?;
    v.resize(len, value);
    Ok(v)
}

/// Compares an incrementally tracked objective with its recomputation.
pub(crate) fn check_value(tracked: f64, recomputed: f64) -> Result<(), SolveError> {
    if (tracked - recomputed).abs() > TOLERANCE {
        return Err(SolveError::ValueDiscrepancy {
            tracked,
            recomputed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_within_tolerance_passes() {
        assert!(check_value(10.0, 10.0).is_ok());
        assert!(check_value(10.0, 10.0 + 0.5 * TOLERANCE).is_ok());
        assert!(check_value(-3.25, -3.25 - 0.9 * TOLERANCE).is_ok());
    }

    #[test]
    fn test_value_mismatch_is_internal_error() {
        let err = check_value(10.0, 10.001).unwrap_err();
        assert!(err.is_internal());
        assert!(!err.is_configuration());
        match err {
            SolveError::ValueDiscrepancy {
                tracked,
                recomputed,
            } => {
                assert_eq!(tracked, 10.0);
                assert_eq!(recomputed, 10.001);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(check_value(0.0, -2.0 * TOLERANCE).unwrap_err().is_internal());
    }

    #[test]
    fn test_configuration_errors_are_not_internal() {
        let err = SolveError::InvalidBounds {
            lower: 3,
            upper: 2,
            size: 4,
        };
        assert!(err.is_configuration());
        assert!(!err.is_internal());
        assert!(SolveError::EmptyInstance.is_configuration());
    }
}
