use crate::error::ModelError;
use crate::metrics::classification::accuracy;
use crate::models::Classifier;

/// Contiguous, unshuffled k-fold splits as `(train, test)` row indices. The first
/// `n % k` folds hold one extra row.
pub fn kfold_splits(n: usize, k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    if k == 0 || n == 0 {
        return Vec::new();
    }
    let base = n / k;
    let extra = n % k;
    let mut splits = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        let end = start + size;
        let test: Vec<usize> = (start..end).collect();
        let train: Vec<usize> = (0..start).chain(end..n).collect();
        splits.push((train, test));
        start = end;
    }
    splits
}

/// Mean test accuracy over `min(folds, n)` contiguous folds, fitting a fresh model per fold.
pub fn cross_val_accuracy<F>(
    mut build: F,
    x: &[Vec<f64>],
    y: &[usize],
    folds: usize,
) -> Result<f64, ModelError>
where
    F: FnMut() -> Box<dyn Classifier>,
{
    let k = folds.min(x.len());
    if k < 2 {
        return Err(ModelError::TooFewSamplesForCv { samples: x.len() });
    }
    let mut scores = Vec::with_capacity(k);
    for (train, test) in kfold_splits(x.len(), k) {
        let x_train: Vec<Vec<f64>> = train.iter().map(|i| x[*i].clone()).collect();
        let y_train: Vec<usize> = train.iter().map(|i| y[*i]).collect();
        let x_test: Vec<Vec<f64>> = test.iter().map(|i| x[*i].clone()).collect();
        let y_test: Vec<usize> = test.iter().map(|i| y[*i]).collect();
        let mut model = build();
        model.fit(&x_train, &y_train)?;
        let predicted = model.predict(&x_test)?;
        scores.push(accuracy(&y_test, &predicted));
    }
    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}
