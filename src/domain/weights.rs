//! Weight vectors, allocation constraints and the capping helpers shared by
//! the strategies.

use crate::domain::error::EngineError;
use crate::domain::strategy::StrategyKind;
use serde::Serialize;

/// Tolerance used for sum and cap checks.
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// Non-negative weights aligned with a list of codes. The residual
/// `1 - sum()` is uninvested cash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightVector {
    codes: Vec<String>,
    weights: Vec<f64>,
}

impl WeightVector {
    pub fn new(codes: Vec<String>, weights: Vec<f64>) -> Self {
        debug_assert_eq!(codes.len(), weights.len());
        Self { codes, weights }
    }

    pub fn equal(codes: &[String]) -> Self {
        let n = codes.len();
        let w = if n > 0 { 1.0 / n as f64 } else { 0.0 };
        Self::new(codes.to_vec(), vec![w; n])
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.codes
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn cash(&self) -> f64 {
        (1.0 - self.sum()).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraints {
    /// Per-instrument cap in (0, 1]. `None` means unconstrained.
    pub max_weight: Option<f64>,
    /// Redistribute capped excess so weights sum to 1.
    pub fully_invested: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_weight: None,
            fully_invested: true,
        }
    }
}

impl Constraints {
    pub fn cap(&self) -> f64 {
        self.max_weight.unwrap_or(1.0)
    }

    /// Rejects caps outside (0, 1] and caps that cannot hold a fully
    /// invested portfolio over `instruments` names.
    pub fn check(&self, instruments: usize) -> Result<(), EngineError> {
        if let Some(cap) = self.max_weight {
            if !(cap > 0.0 && cap <= 1.0) {
                return Err(EngineError::ConfigInvalid {
                    section: "engine".into(),
                    key: "max_weight".into(),
                    reason: "max_weight must be in (0, 1]".into(),
                });
            }
            if self.fully_invested && cap * (instruments as f64) < 1.0 - WEIGHT_EPSILON {
                return Err(EngineError::InfeasibleConstraints {
                    max_weight: cap,
                    instruments,
                });
            }
        }
        Ok(())
    }
}

/// A strategy that could not run its own algorithm and substituted another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fallback {
    pub from: StrategyKind,
    pub to: StrategyKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub strategy: StrategyKind,
    pub weights: WeightVector,
    pub fallback: Option<Fallback>,
}

impl Allocation {
    pub fn new(strategy: StrategyKind, weights: WeightVector) -> Self {
        Self {
            strategy,
            weights,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, to: StrategyKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(strategy = %self.strategy, fallback = %to, reason = %reason, "strategy fell back");
        self.fallback = Some(Fallback {
            from: self.strategy,
            to,
            reason,
        });
        self
    }
}

/// Scales non-negative raw scores to sum to 1. Returns `None` when the
/// scores carry no weight.
pub fn normalize(raw: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = raw.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        return None;
    }
    Some(raw.iter().map(|v| v / total).collect())
}

/// Whether the names holding weight can absorb the full allocation under
/// the cap. Names at zero never receive redistributed excess, so a fully
/// invested allocation needs `held * cap >= total`.
pub fn cap_is_feasible(weights: &[f64], constraints: &Constraints) -> bool {
    if !constraints.fully_invested {
        return true;
    }
    let held = weights.iter().filter(|&&v| v > 0.0).count() as f64;
    let target = weights.iter().sum::<f64>().min(1.0);
    held * constraints.cap() >= target - WEIGHT_EPSILON
}

/// Clips weights to the cap. With `fully_invested`, the clipped excess is
/// handed to the uncapped names in proportion to their weight until the
/// total is restored or every held name sits at the cap; otherwise it stays
/// as cash. Zero weights stay zero.
pub fn apply_cap(weights: &[f64], constraints: &Constraints) -> Vec<f64> {
    let cap = constraints.cap();
    let target: f64 = weights.iter().sum::<f64>().min(1.0);
    let mut w: Vec<f64> = weights.iter().map(|v| v.min(cap)).collect();

    if !constraints.fully_invested {
        return w;
    }

    // Each pass pins at least one more name at the cap or exhausts the excess.
    for _ in 0..=2 * w.len() {
        let excess = target - w.iter().sum::<f64>();
        if excess <= WEIGHT_EPSILON {
            break;
        }
        let free: f64 = w.iter().filter(|&&v| v < cap - WEIGHT_EPSILON).sum();
        if free <= 0.0 {
            break;
        }
        let scale = 1.0 + excess / free;
        for v in w.iter_mut() {
            if *v < cap - WEIGHT_EPSILON {
                *v = (*v * scale).min(cap);
            }
        }
    }

    w
}

/// Euclidean projection onto `{ w : Σw = total, 0 ≤ w ≤ cap }` by bisection
/// on the shift `tau` in `w_i = clamp(v_i - tau, 0, cap)`.
pub fn project_capped_simplex(v: &[f64], total: f64, cap: f64) -> Vec<f64> {
    const BISECTION_STEPS: usize = 200;

    let clamp_sum = |tau: f64| -> f64 { v.iter().map(|x| (x - tau).clamp(0.0, cap)).sum() };

    let max_v = v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_v = v.iter().cloned().fold(f64::INFINITY, f64::min);
    // clamp_sum(lo) = n * cap >= total, clamp_sum(hi) = 0 <= total
    let mut lo = min_v - cap;
    let mut hi = max_v;

    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if clamp_sum(mid) > total {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let tau = 0.5 * (lo + hi);
    v.iter().map(|x| (x - tau).clamp(0.0, cap)).collect()
}
