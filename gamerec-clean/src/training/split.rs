//! Hold-out and k-fold partitioning

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Seeded shuffle split with `ceil(test_fraction * n)` test rows
///
/// At least one row always stays in the training partition.
pub fn shuffle_split(n: usize, test_fraction: f64, seed: u64) -> Split {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_len = ((test_fraction * n as f64).ceil() as usize).min(n.saturating_sub(1));
    let train = indices.split_off(test_len);
    Split {
        train,
        test: indices,
    }
}

/// Contiguous folds over `0..n`; the first `n % k` folds get one extra row
pub fn k_fold(n: usize, k: usize) -> Vec<Split> {
    let k = k.min(n);
    if k < 2 {
        return Vec::new();
    }

    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let len = base + usize::from(fold < extra);
        let end = start + len;
        folds.push(Split {
            train: (0..start).chain(end..n).collect(),
            test: (start..end).collect(),
        });
        start = end;
    }
    folds
}
