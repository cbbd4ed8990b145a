//! Generic, model-agnostic RANSAC.
//!
//! Implement [`Estimator`] for a model and call [`ransac`] with the data and
//! [`RansacOptions`]. Sampling uses a seeded `StdRng`, so identical inputs
//! give identical consensus sets.
//!
//! A failed search is not an error: the returned [`RansacResult`] has
//! `success == false` and `model == None`.

use rand::{rngs::StdRng, seq::index, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration of the RANSAC search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RansacOptions {
    /// Maximum number of sampling iterations.
    pub max_iters: usize,
    /// Inlier residual threshold (same unit as [`Estimator::residual`]).
    pub thresh: f64,
    /// Minimum absolute number of inliers to accept a model.
    pub min_inliers: usize,
    /// Minimum inlier fraction of the data to accept a model.
    pub min_inlier_ratio: f64,
    /// Desired probability in `[0, 1]` of drawing one all-inlier sample.
    pub confidence: f64,
    /// Seed of the sampling RNG.
    pub seed: u64,
    /// Refit on the full consensus set before scoring.
    pub refit_on_inliers: bool,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            max_iters: 10_000,
            thresh: 5.0,
            min_inliers: 4,
            min_inlier_ratio: 0.1,
            confidence: 0.99,
            seed: 1_234_567,
            refit_on_inliers: true,
        }
    }
}

/// Output of a RANSAC run.
#[derive(Debug, Clone)]
pub struct RansacResult<M> {
    pub success: bool,
    pub model: Option<M>,
    /// Indices of inlier data, ascending.
    pub inliers: Vec<usize>,
    /// Root-mean-square residual over inliers.
    pub inlier_rms: f64,
    /// Iterations actually performed.
    pub iters: usize,
}

impl<M> Default for RansacResult<M> {
    fn default() -> Self {
        Self {
            success: false,
            model: None,
            inliers: Vec::new(),
            inlier_rms: f64::INFINITY,
            iters: 0,
        }
    }
}

/// A model that can be hypothesised from a minimal sample and scored per datum.
pub trait Estimator {
    type Datum;
    type Model;

    /// Minimal number of samples needed to estimate a model.
    const MIN_SAMPLES: usize;

    /// Fit a model from the sampled indices; `None` if degenerate.
    fn fit(data: &[Self::Datum], sample_indices: &[usize]) -> Option<Self::Model>;

    /// Non-negative residual of one datum under the model.
    fn residual(model: &Self::Model, datum: &Self::Datum) -> f64;

    /// Cheap rejection of degenerate samples before fitting.
    fn is_degenerate(_data: &[Self::Datum], _sample_indices: &[usize]) -> bool {
        false
    }

    /// Refit on the whole consensus set. Default: keep the sampled model.
    fn refit(_data: &[Self::Datum], _inliers: &[usize]) -> Option<Self::Model> {
        None
    }
}

fn rms(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::INFINITY;
    }
    let ss: f64 = vals.iter().map(|&v| v * v).sum();
    (ss / vals.len() as f64).sqrt()
}

/// Adaptive iteration bound from the best inlier ratio seen so far.
fn adaptive_iterations(
    confidence: f64,
    inlier_ratio: f64,
    min_samples: usize,
    iters_so_far: usize,
    max_iters: usize,
) -> usize {
    if confidence <= 0.0 || inlier_ratio <= 0.0 {
        return max_iters;
    }
    let denom = (1.0 - inlier_ratio.powi(min_samples as i32)).max(1e-12).ln();
    if denom >= 0.0 {
        return max_iters;
    }
    let n = ((1.0 - confidence.min(1.0 - 1e-12)).ln() / denom).ceil() as usize;
    n.clamp(iters_so_far, max_iters)
}

fn consensus<E: Estimator>(
    data: &[E::Datum],
    model: &E::Model,
    thresh: f64,
    inliers: &mut Vec<usize>,
    residuals: &mut Vec<f64>,
) {
    inliers.clear();
    residuals.clear();
    for (i, datum) in data.iter().enumerate() {
        let r = E::residual(model, datum);
        if r <= thresh {
            inliers.push(i);
            residuals.push(r);
        }
    }
}

/// Run RANSAC for the given [`Estimator`].
///
/// Candidate models are ranked by inlier count, ties broken by lower inlier
/// RMS. Acceptance requires both `min_inliers` and `min_inlier_ratio`.
pub fn ransac<E: Estimator>(data: &[E::Datum], opts: &RansacOptions) -> RansacResult<E::Model> {
    let mut best: RansacResult<E::Model> = RansacResult::default();
    let n = data.len();
    if n < E::MIN_SAMPLES || E::MIN_SAMPLES == 0 {
        return best;
    }
    let required = opts
        .min_inliers
        .max(E::MIN_SAMPLES)
        .max((opts.min_inlier_ratio * n as f64).ceil() as usize);

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut budget = opts.max_iters;
    let mut sample = Vec::with_capacity(E::MIN_SAMPLES);
    let mut inliers = Vec::with_capacity(n);
    let mut residuals = Vec::with_capacity(n);

    let mut iter = 0;
    while iter < budget {
        iter += 1;
        sample.clear();
        sample.extend(index::sample(&mut rng, n, E::MIN_SAMPLES).iter());
        sample.sort_unstable();

        if E::is_degenerate(data, &sample) {
            continue;
        }
        let Some(mut model) = E::fit(data, &sample) else {
            continue;
        };

        consensus::<E>(data, &model, opts.thresh, &mut inliers, &mut residuals);
        if inliers.len() < required {
            continue;
        }

        if opts.refit_on_inliers {
            if let Some(refit) = E::refit(data, &inliers) {
                model = refit;
                consensus::<E>(data, &model, opts.thresh, &mut inliers, &mut residuals);
                if inliers.len() < required {
                    continue;
                }
            }
        }

        let score = rms(&residuals);
        let better = !best.success
            || inliers.len() > best.inliers.len()
            || (inliers.len() == best.inliers.len() && score < best.inlier_rms);
        if better {
            best.success = true;
            best.model = Some(model);
            best.inliers.clone_from(&inliers);
            best.inlier_rms = score;
            best.iters = iter;
            budget = adaptive_iterations(
                opts.confidence,
                inliers.len() as f64 / n as f64,
                E::MIN_SAMPLES,
                iter,
                opts.max_iters,
            );
        }
    }

    if best.success {
        best.iters = iter;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pt3, Vec3};

    /// Pure 3D translation between paired points.
    struct ShiftEstimator;

    impl Estimator for ShiftEstimator {
        type Datum = (Pt3, Pt3);
        type Model = Vec3;

        const MIN_SAMPLES: usize = 1;

        fn fit(data: &[Self::Datum], sample_indices: &[usize]) -> Option<Self::Model> {
            let (a, b) = data[sample_indices[0]];
            Some(a - b)
        }

        fn residual(model: &Self::Model, datum: &Self::Datum) -> f64 {
            (datum.0 - (datum.1 + model)).norm()
        }

        fn refit(data: &[Self::Datum], inliers: &[usize]) -> Option<Self::Model> {
            let sum = inliers
                .iter()
                .fold(Vec3::zeros(), |acc, &i| acc + (data[i].0 - data[i].1));
            Some(sum / inliers.len() as f64)
        }
    }

    fn opts() -> RansacOptions {
        RansacOptions {
            max_iters: 200,
            thresh: 0.1,
            min_inliers: 5,
            min_inlier_ratio: 0.3,
            seed: 7,
            ..RansacOptions::default()
        }
    }

    #[test]
    fn insufficient_data_is_not_a_panic() {
        let res = ransac::<ShiftEstimator>(&[], &opts());
        assert!(!res.success);
        assert!(res.model.is_none());
    }

    #[test]
    fn recovers_shift_with_gross_outliers() {
        let shift = Vec3::new(10.0, -4.0, 2.5);
        let mut data: Vec<(Pt3, Pt3)> = (0..12)
            .map(|i| {
                let b = Pt3::new(i as f64, (i * i) as f64 * 0.1, 3.0);
                let jitter = if i % 2 == 0 { 0.01 } else { -0.01 };
                (b + shift + Vec3::new(jitter, 0.0, 0.0), b)
            })
            .collect();
        data.push((Pt3::new(100.0, 0.0, 0.0), Pt3::origin()));
        data.push((Pt3::new(-50.0, 3.0, 0.0), Pt3::new(1.0, 1.0, 1.0)));

        let res = ransac::<ShiftEstimator>(&data, &opts());
        assert!(res.success);
        let model = res.model.expect("model");
        assert!((model - shift).norm() < 0.02);
        assert_eq!(res.inliers.len(), 12);
        assert!(!res.inliers.contains(&12));
    }

    #[test]
    fn ratio_requirement_rejects_sparse_consensus() {
        let mut data = vec![(Pt3::new(1.0, 0.0, 0.0), Pt3::origin()); 2];
        for i in 0..10 {
            data.push((Pt3::new(0.0, 10.0 * i as f64, 0.0), Pt3::origin()));
        }
        let o = RansacOptions {
            min_inliers: 2,
            min_inlier_ratio: 0.5,
            ..opts()
        };
        assert!(!ransac::<ShiftEstimator>(&data, &o).success);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let data: Vec<(Pt3, Pt3)> = (0..20)
            .map(|i| (Pt3::new(i as f64 + 1.0, 0.0, 0.0), Pt3::new(i as f64, 0.0, 0.0)))
            .collect();
        let a = ransac::<ShiftEstimator>(&data, &opts());
        let b = ransac::<ShiftEstimator>(&data, &opts());
        assert_eq!(a.inliers, b.inliers);
        assert_eq!(a.iters, b.iters);
    }
}
