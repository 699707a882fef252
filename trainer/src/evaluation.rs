use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    pub label: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision, recall and F1 for a binary classifier, plus accuracy
/// and the macro and support-weighted averages.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub total: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ClassificationReport {
    pub fn new(truth: &[u8], predicted: &[u8]) -> Self {
        let classes = [0u8, 1u8]
            .into_iter()
            .map(|label| {
                let pairs = truth.iter().zip(predicted);
                let true_positive = pairs
                    .clone()
                    .filter(|(t, p)| **t == label && **p == label)
                    .count();
                let predicted_positive = predicted.iter().filter(|&&p| p == label).count();
                let support = truth.iter().filter(|&&t| t == label).count();
                let precision = ratio(true_positive, predicted_positive);
                let recall = ratio(true_positive, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();
        let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
        ClassificationReport {
            classes,
            accuracy: ratio(correct, truth.len()),
            total: truth.len(),
        }
    }

    fn average<F: Fn(&ClassMetrics) -> f64>(&self, metric: F, weighted: bool) -> f64 {
        if weighted {
            let sum: f64 = self
                .classes
                .iter()
                .map(|c| metric(c) * c.support as f64)
                .sum();
            sum / self.total.max(1) as f64
        } else {
            self.classes.iter().map(&metric).sum::<f64>() / self.classes.len() as f64
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        for (name, weighted) in [("macro avg", false), ("weighted avg", true)] {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name,
                self.average(|c| c.precision, weighted),
                self.average(|c| c.recall, weighted),
                self.average(|c| c.f1, weighted),
                self.total
            )?;
        }
        Ok(())
    }
}
