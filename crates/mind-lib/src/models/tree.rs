use super::{check_training_set, check_width, Classifier};
use crate::error::ModelError;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// CART classifier with Gini impurity, grown until leaves are pure.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    /// Nodes with fewer rows than this become leaves.
    pub min_samples_split: usize,
    pub max_depth: Option<usize>,
    width: usize,
    root: Option<Node>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self {
            min_samples_split: 2,
            max_depth: None,
            width: 0,
            root: None,
        }
    }
}

impl DecisionTree {
    pub fn depth(&self) -> usize {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map(walk).unwrap_or(0)
    }

    fn grow(&self, x: &[Vec<f64>], y: &[usize], rows: &[usize], depth: usize) -> Node {
        let counts = class_counts(y, rows);
        let majority = majority(&counts);
        let pure = counts.iter().filter(|c| **c > 0).count() <= 1;
        let depth_reached = self.max_depth.map(|max| depth >= max).unwrap_or(false);
        if pure || rows.len() < self.min_samples_split || depth_reached {
            return Node::Leaf { class: majority };
        }
        match best_split(x, y, rows, self.width, counts.len()) {
            Some((feature, threshold)) => {
                let (left, right): (Vec<usize>, Vec<usize>) = rows
                    .iter()
                    .partition(|row| x[**row][feature] <= threshold);
                Node::Split {
                    feature,
                    threshold,
                    left: Box::new(self.grow(x, y, &left, depth + 1)),
                    right: Box::new(self.grow(x, y, &right, depth + 1)),
                }
            }
            None => Node::Leaf { class: majority },
        }
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<(), ModelError> {
        self.width = check_training_set(x, y)?;
        let rows: Vec<usize> = (0..x.len()).collect();
        self.root = Some(self.grow(x, y, &rows, 0));
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, ModelError> {
        let root = self.root.as_ref().ok_or(ModelError::NotFitted)?;
        check_width(x, self.width)?;
        Ok(x.iter().map(|row| descend(root, row)).collect())
    }
}

fn descend(mut node: &Node, row: &[f64]) -> usize {
    loop {
        match node {
            Node::Leaf { class } => return *class,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                node = if row[*feature] <= *threshold {
                    &**left
                } else {
                    &**right
                };
            }
        }
    }
}

fn class_counts(y: &[usize], rows: &[usize]) -> Vec<usize> {
    let n_classes = rows.iter().map(|r| y[*r] + 1).max().unwrap_or(0);
    let mut counts = vec![0; n_classes];
    for row in rows {
        counts[y[*row]] += 1;
    }
    counts
}

/// Most frequent class; ties go to the lowest class id.
fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, count) in counts.iter().enumerate() {
        if *count > counts[best] {
            best = class;
        }
    }
    best
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|c| {
            let p = *c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

/// Lowest weighted Gini over all midpoints between distinct sorted feature values.
fn best_split(
    x: &[Vec<f64>],
    y: &[usize],
    rows: &[usize],
    width: usize,
    n_classes: usize,
) -> Option<(usize, f64)> {
    let total = rows.len();
    let mut best: Option<(f64, usize, f64)> = None;
    for feature in 0..width {
        let mut sorted: Vec<usize> = rows.to_vec();
        sorted.sort_by(|a, b| x[*a][feature].total_cmp(&x[*b][feature]));
        let mut left = vec![0usize; n_classes];
        let mut right = vec![0usize; n_classes];
        for row in &sorted {
            right[y[*row]] += 1;
        }
        for pos in 0..total - 1 {
            let class = y[sorted[pos]];
            left[class] += 1;
            right[class] -= 1;
            let here = x[sorted[pos]][feature];
            let next = x[sorted[pos + 1]][feature];
            if here == next {
                continue;
            }
            let n_left = pos + 1;
            let n_right = total - n_left;
            let impurity = (n_left as f64 * gini(&left, n_left)
                + n_right as f64 * gini(&right, n_right))
                / total as f64;
            let threshold = here + (next - here) / 2.0;
            if best.map(|(score, _, _)| impurity < score).unwrap_or(true) {
                best = Some((impurity, feature, threshold));
            }
        }
    }
    best.map(|(_, feature, threshold)| (feature, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::accuracy;
    use crate::models::testing::blobs;

    #[test]
    fn fits_training_data_exactly() {
        let (x, y) = blobs(20);
        let mut tree = DecisionTree::default();
        tree.fit(&x, &y).unwrap();
        assert!((accuracy(&y, &tree.predict(&x).unwrap()) - 1.0).abs() < 1e-12);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn learns_interval_with_two_splits() {
        let x: Vec<Vec<f64>> = (0..9).map(|i| vec![i as f64]).collect();
        let y = vec![0, 0, 0, 1, 1, 1, 0, 0, 0];
        let mut tree = DecisionTree::default();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.predict(&[vec![4.2], vec![7.7]]).unwrap(), vec![1, 0]);
    }

    #[test]
    fn duplicate_rows_with_conflicting_labels_become_majority_leaf() {
        let x = vec![vec![1.0], vec![1.0], vec![1.0]];
        let y = vec![1, 0, 1];
        let mut tree = DecisionTree::default();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&[vec![1.0]]).unwrap(), vec![1]);
    }

    #[test]
    fn max_depth_limits_growth() {
        let x: Vec<Vec<f64>> = (0..9).map(|i| vec![i as f64]).collect();
        let y = vec![0, 0, 0, 1, 1, 1, 0, 0, 0];
        let mut tree = DecisionTree {
            max_depth: Some(1),
            ..DecisionTree::default()
        };
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn rejects_wrong_width_at_predict() {
        let mut tree = DecisionTree::default();
        tree.fit(&[vec![0.0, 1.0], vec![1.0, 0.0]], &[0, 1]).unwrap();
        assert!(matches!(
            tree.predict(&[vec![0.0]]),
            Err(ModelError::FeatureWidth { expected: 2, actual: 1 })
        ));
    }
}
