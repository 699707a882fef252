use std::cmp::Ordering;

use ndarray::ArrayView1;
use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::table::FeatureMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        proba: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features: usize,
}

/// Binary CART tree on weighted gini impurity. Leaves hold the weighted
/// share of the positive class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

struct Pending {
    samples: Vec<usize>,
    depth: usize,
    slot: usize,
}

struct Split {
    feature: usize,
    threshold: f64,
    children_impurity: f64,
}

fn gini(negative: f64, positive: f64) -> f64 {
    let total = negative + positive;
    if total <= 0.0 {
        return 0.0;
    }
    let p = positive / total;
    2.0 * p * (1.0 - p)
}

fn class_totals(samples: &[usize], labels: &[u8], weights: &[f64]) -> (f64, f64) {
    samples.iter().fold((0.0, 0.0), |(neg, pos), &s| {
        if labels[s] == 1 {
            (neg, pos + weights[s])
        } else {
            (neg + weights[s], pos)
        }
    })
}

impl DecisionTree {
    /// Grows a tree over `samples` (indices into `features`, repeats allowed).
    /// Returns the tree and the unnormalized impurity decrease per feature.
    pub fn fit<R: Rng>(
        features: &FeatureMatrix,
        labels: &[u8],
        weights: &[f64],
        samples: Vec<usize>,
        params: &TreeParams,
        rng: &mut R,
    ) -> (DecisionTree, Vec<f64>) {
        let mut importances = vec![0.0; features.width()];
        let mut nodes = vec![Node::Leaf { proba: 0.0 }];
        let mut stack = vec![Pending {
            samples,
            depth: 0,
            slot: 0,
        }];

        while let Some(pending) = stack.pop() {
            let (negative, positive) = class_totals(&pending.samples, labels, weights);
            let total = negative + positive;
            let proba = if total > 0.0 { positive / total } else { 0.0 };
            let impurity = gini(negative, positive);

            let splittable = impurity > 0.0
                && pending.samples.len() >= params.min_samples_split
                && params.max_depth.map_or(true, |d| pending.depth < d);
            let split = if splittable {
                best_split(features, labels, weights, &pending.samples, params, rng)
            } else {
                None
            };

            let Some(split) = split else {
                nodes[pending.slot] = Node::Leaf { proba };
                continue;
            };

            importances[split.feature] += total * impurity - split.children_impurity;
            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = pending
                .samples
                .into_iter()
                .partition(|&s| features.get(s, split.feature) <= split.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { proba });
            nodes.push(Node::Leaf { proba });
            nodes[pending.slot] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            stack.push(Pending {
                samples: left_samples,
                depth: pending.depth + 1,
                slot: left,
            });
            stack.push(Pending {
                samples: right_samples,
                depth: pending.depth + 1,
                slot: right,
            });
        }

        (DecisionTree { nodes }, importances)
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { proba } => return *proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Node::Split { left, right, .. } = &self.nodes[index] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        deepest
    }
}

/// Visits features in random order and keeps looking past `max_features`
/// until at least one valid split has been seen.
fn best_split<R: Rng>(
    features: &FeatureMatrix,
    labels: &[u8],
    weights: &[f64],
    samples: &[usize],
    params: &TreeParams,
    rng: &mut R,
) -> Option<Split> {
    let width = features.width();
    let order = sample(rng, width, width);
    let mut best: Option<Split> = None;
    let mut sorted = samples.to_vec();

    for (visited, feature) in order.into_iter().enumerate() {
        if visited >= params.max_features && best.is_some() {
            break;
        }
        sorted.sort_by(|&a, &b| {
            features.get(a, feature)
                .partial_cmp(&features.get(b, feature))
                .unwrap_or(Ordering::Equal)
        });

        let (total_negative, total_positive) = class_totals(&sorted, labels, weights);
        let (mut left_negative, mut left_positive) = (0.0, 0.0);
        for i in 0..sorted.len().saturating_sub(1) {
            let s = sorted[i];
            if labels[s] == 1 {
                left_positive += weights[s];
            } else {
                left_negative += weights[s];
            }
            let current = features.get(s, feature);
            let next = features.get(sorted[i + 1], feature);
            if current >= next {
                continue;
            }
            let right_negative = total_negative - left_negative;
            let right_positive = total_positive - left_positive;
            let children_impurity = (left_negative + left_positive)
                * gini(left_negative, left_positive)
                + (right_negative + right_positive) * gini(right_negative, right_positive);
            if best
                .as_ref()
                .map_or(true, |b| children_impurity < b.children_impurity)
            {
                let mut threshold = current / 2.0 + next / 2.0;
                if threshold >= next {
                    threshold = current;
                }
                best = Some(Split {
                    feature,
                    threshold,
                    children_impurity,
                });
            }
        }
    }
    best
}
