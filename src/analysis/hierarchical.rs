//! Agglomerative clustering with Ward linkage
//!
//! Uses the nearest-neighbour chain algorithm over a condensed matrix of
//! squared Euclidean distances with Lance–Williams updates, then cuts the
//! sorted dendrogram into the requested number of clusters.

use ndarray::ArrayView2;

/// One dendrogram merge of the clusters held in slots `a` and `b`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub a: usize,
    pub b: usize,
    /// Ward merge cost (squared-distance scale)
    pub height: f64,
}

/// Upper-triangle distance storage
struct Condensed {
    n: usize,
    values: Vec<f64>,
}

impl Condensed {
    fn squared_euclidean(data: ArrayView2<f64>) -> Self {
        let n = data.nrows();
        let mut values = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                let d = data
                    .row(i)
                    .iter()
                    .zip(data.row(j).iter())
                    .map(|(x, y)| (x - y).powi(2))
                    .sum::<f64>();
                values.push(d);
            }
        }
        Self { n, values }
    }

    fn index(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        i * self.n - i * (i + 1) / 2 + (j - i - 1)
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.values[self.index(i, j)]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        let idx = self.index(i, j);
        self.values[idx] = value;
    }
}

/// Full Ward dendrogram (n - 1 merges), sorted by height.
///
/// Slot ids are original row indices: after merging, slot `a` holds the
/// union and slot `b` is retired.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ward_linkage(data: ArrayView2<f64>) -> Vec<Merge> {
    let n = data.nrows();
    if n < 2 {
        return Vec::new();
    }

    let mut dist = Condensed::squared_euclidean(data);
    let mut size = vec![1usize; n];
    let mut active = vec![true; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut merges = Vec::with_capacity(n - 1);

    while merges.len() < n - 1 {
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|&alive| alive) {
                chain.push(first);
            }
        }

        // Grow the chain until two clusters are reciprocal nearest neighbours
        let (a, b) = loop {
            let current = chain[chain.len() - 1];
            let previous = chain.len().checked_sub(2).map(|i| chain[i]);

            let mut best = previous;
            let mut best_dist = previous.map_or(f64::INFINITY, |p| dist.get(current, p));
            for candidate in (0..n).filter(|&x| active[x] && x != current) {
                let d = dist.get(current, candidate);
                if d < best_dist {
                    best_dist = d;
                    best = Some(candidate);
                }
            }

            match best {
                Some(next) if Some(next) == previous => break (current, next),
                Some(next) => chain.push(next),
                None => break (current, current),
            }
        };
        chain.truncate(chain.len().saturating_sub(2));

        let (a, b) = if a < b { (a, b) } else { (b, a) };
        let d_ab = dist.get(a, b);
        merges.push(Merge { a, b, height: d_ab });

        let (n_a, n_b) = (size[a] as f64, size[b] as f64);
        for k in (0..n).filter(|&x| active[x] && x != a && x != b) {
            let n_k = size[k] as f64;
            let updated = ((n_a + n_k) * dist.get(a, k) + (n_b + n_k) * dist.get(b, k)
                - n_k * d_ab)
                / (n_a + n_b + n_k);
            dist.set(a, k, updated);
        }
        active[b] = false;
        size[a] += size[b];
    }

    merges.sort_by(|x, y| x.height.total_cmp(&y.height));
    merges
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// Labels `0..n_clusters` from applying the lowest `n - n_clusters` merges.
///
/// Labels are numbered in order of first appearance.
#[must_use]
pub fn cut_tree(n: usize, merges: &[Merge], n_clusters: usize) -> Vec<usize> {
    let mut parent: Vec<usize> = (0..n).collect();
    for merge in merges.iter().take(n.saturating_sub(n_clusters)) {
        let ra = find(&mut parent, merge.a);
        let rb = find(&mut parent, merge.b);
        if ra != rb {
            parent[rb] = ra;
        }
    }

    let mut relabel = vec![usize::MAX; n];
    let mut next = 0;
    (0..n)
        .map(|i| {
            let root = find(&mut parent, i);
            if relabel[root] == usize::MAX {
                relabel[root] = next;
                next += 1;
            }
            relabel[root]
        })
        .collect()
}

/// Ward clustering of the rows of `data` into `n_clusters` groups
#[must_use]
pub fn ward_clusters(data: ArrayView2<f64>, n_clusters: usize) -> Vec<usize> {
    let merges = ward_linkage(data);
    cut_tree(data.nrows(), &merges, n_clusters)
}
