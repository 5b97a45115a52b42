use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{check_training_set, check_width, distinct_classes, Classifier};
use crate::error::ModelError;

/// Soft-margin SVM settings.
#[derive(Debug, Clone, Copy)]
pub struct SvcConfig {
    /// Penalty on margin violations.
    pub c: f64,
    /// RBF width; `None` uses `1 / (n_features * var(X))`.
    pub gamma: Option<f64>,
    /// KKT violation tolerance.
    pub tol: f64,
    /// Consecutive sweeps without an update before SMO stops.
    pub max_passes: usize,
    /// Hard cap on SMO sweeps.
    pub max_iter: usize,
    pub seed: u64,
}

impl Default for SvcConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: None,
            tol: 1e-3,
            max_passes: 10,
            max_iter: 1000,
            seed: 0,
        }
    }
}

/// Binary machine separating `positive` (+1) from `negative` (-1).
#[derive(Debug, Clone)]
struct BinaryMachine {
    positive: usize,
    negative: usize,
    support: Vec<Vec<f64>>,
    /// `alpha_i * y_i` per support vector.
    coef: Vec<f64>,
    bias: f64,
}

impl BinaryMachine {
    fn decision(&self, x: &[f64], gamma: f64) -> f64 {
        self.support
            .iter()
            .zip(&self.coef)
            .map(|(sv, coef)| coef * rbf(sv, x, gamma))
            .sum::<f64>()
            + self.bias
    }
}

/// RBF-kernel support vector classifier, multi-class by one-vs-one voting.
#[derive(Debug, Clone)]
pub struct SupportVectorClassifier {
    config: SvcConfig,
    gamma: f64,
    width: usize,
    classes: Vec<usize>,
    machines: Vec<BinaryMachine>,
}

impl SupportVectorClassifier {
    pub fn new(config: SvcConfig) -> Self {
        Self {
            config,
            gamma: 0.0,
            width: 0,
            classes: Vec::new(),
            machines: Vec::new(),
        }
    }
}

impl Default for SupportVectorClassifier {
    fn default() -> Self {
        Self::new(SvcConfig::default())
    }
}

impl Classifier for SupportVectorClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<(), ModelError> {
        self.width = check_training_set(x, y)?;
        self.gamma = self
            .config
            .gamma
            .unwrap_or_else(|| scale_gamma(x, self.width));
        self.classes = distinct_classes(y);
        self.machines.clear();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        for (i, &positive) in self.classes.iter().enumerate() {
            for &negative in &self.classes[i + 1..] {
                let mut rows = Vec::new();
                let mut signs = Vec::new();
                for (row, class) in x.iter().zip(y) {
                    if *class == positive {
                        rows.push(row.clone());
                        signs.push(1.0);
                    } else if *class == negative {
                        rows.push(row.clone());
                        signs.push(-1.0);
                    }
                }
                let machine =
                    train_smo(&rows, &signs, self.gamma, &self.config, &mut rng, positive, negative);
                self.machines.push(machine);
            }
        }
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, ModelError> {
        if self.classes.is_empty() {
            return Err(ModelError::NotFitted);
        }
        check_width(x, self.width)?;
        if self.classes.len() == 1 {
            return Ok(vec![self.classes[0]; x.len()]);
        }
        Ok(x.iter().map(|row| self.vote(row)).collect())
    }
}

impl SupportVectorClassifier {
    fn vote(&self, row: &[f64]) -> usize {
        let mut votes = vec![0usize; self.classes.len()];
        for machine in &self.machines {
            // a zero decision counts for the lower class id
            let winner = if machine.decision(row, self.gamma) >= 0.0 {
                machine.positive
            } else {
                machine.negative
            };
            if let Some(pos) = self.classes.iter().position(|c| *c == winner) {
                votes[pos] += 1;
            }
        }
        // ties go to the lowest class id
        let mut best = 0;
        for (pos, count) in votes.iter().enumerate() {
            if *count > votes[best] {
                best = pos;
            }
        }
        self.classes[best]
    }
}

fn rbf(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    let dist: f64 = a.iter().zip(b).map(|(p, q)| (p - q).powi(2)).sum();
    (-gamma * dist).exp()
}

fn scale_gamma(x: &[Vec<f64>], width: usize) -> f64 {
    let values: Vec<f64> = x.iter().flatten().copied().collect();
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if var > 0.0 && width > 0 {
        1.0 / (width as f64 * var)
    } else {
        1.0
    }
}

/// Simplified sequential minimal optimisation over a precomputed kernel matrix.
fn train_smo(
    x: &[Vec<f64>],
    y: &[f64],
    gamma: f64,
    config: &SvcConfig,
    rng: &mut StdRng,
    positive: usize,
    negative: usize,
) -> BinaryMachine {
    let n = x.len();
    let kernel: Vec<Vec<f64>> = x
        .iter()
        .map(|a| x.iter().map(|b| rbf(a, b, gamma)).collect())
        .collect();
    let mut alpha = vec![0.0; n];
    let mut bias = 0.0;
    let c = config.c;
    let output = |alpha: &[f64], bias: f64, i: usize| -> f64 {
        (0..n).map(|k| alpha[k] * y[k] * kernel[k][i]).sum::<f64>() + bias
    };

    let mut passes = 0;
    let mut iter = 0;
    while n > 1 && passes < config.max_passes && iter < config.max_iter {
        iter += 1;
        let mut changed = 0;
        for i in 0..n {
            let err_i = output(&alpha, bias, i) - y[i];
            let violates = (y[i] * err_i < -config.tol && alpha[i] < c)
                || (y[i] * err_i > config.tol && alpha[i] > 0.0);
            if !violates {
                continue;
            }
            let mut j = rng.gen_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            let err_j = output(&alpha, bias, j) - y[j];
            let (ai_old, aj_old) = (alpha[i], alpha[j]);
            let (low, high) = if y[i] != y[j] {
                ((aj_old - ai_old).max(0.0), (c + aj_old - ai_old).min(c))
            } else {
                ((ai_old + aj_old - c).max(0.0), (ai_old + aj_old).min(c))
            };
            if (high - low).abs() < 1e-12 {
                continue;
            }
            let eta = 2.0 * kernel[i][j] - kernel[i][i] - kernel[j][j];
            if eta >= 0.0 {
                continue;
            }
            let aj = (aj_old - y[j] * (err_i - err_j) / eta).clamp(low, high);
            if (aj - aj_old).abs() < 1e-5 {
                continue;
            }
            let ai = ai_old + y[i] * y[j] * (aj_old - aj);
            alpha[i] = ai;
            alpha[j] = aj;
            let b1 = bias
                - err_i
                - y[i] * (ai - ai_old) * kernel[i][i]
                - y[j] * (aj - aj_old) * kernel[i][j];
            let b2 = bias
                - err_j
                - y[i] * (ai - ai_old) * kernel[i][j]
                - y[j] * (aj - aj_old) * kernel[j][j];
            bias = if ai > 0.0 && ai < c {
                b1
            } else if aj > 0.0 && aj < c {
                b2
            } else {
                (b1 + b2) / 2.0
            };
            changed += 1;
        }
        passes = if changed == 0 { passes + 1 } else { 0 };
    }

    let mut support = Vec::new();
    let mut coef = Vec::new();
    for k in 0..n {
        if alpha[k] > 1e-8 {
            support.push(x[k].clone());
            coef.push(alpha[k] * y[k]);
        }
    }
    BinaryMachine {
        positive,
        negative,
        support,
        coef,
        bias,
    }
}
