//! Prototype clustering of reduced vectors (Lloyd's k-means).

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result, types::ReducedVector};

/// One codebook entry: a centroid in the reduced space and its index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prototype {
    pub index: usize,
    pub centroid: ReducedVector,
}

/// Result of a k-means run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clustering {
    /// Cluster index per input vector, in input order
    pub assignments: Vec<usize>,
    /// Number of assignment passes performed
    pub iterations: usize,
    /// Whether the run stopped because no assignment changed
    pub converged: bool,
}

impl Clustering {
    /// Member vectors of each cluster, preserving input order.
    pub fn groups(&self, vectors: &[ReducedVector], count: usize) -> Vec<Vec<ReducedVector>> {
        let mut groups = vec![Vec::new(); count];
        for (vector, &cluster) in vectors.iter().zip(&self.assignments) {
            groups[cluster].push(vector.clone());
        }
        groups
    }
}

/// Seeded k-means clusterer.
///
/// The first centroid is a seeded random input point; each further centroid
/// is the point farthest from the centroids chosen so far (lowest index on
/// ties). When a cluster ends an assignment pass empty, it takes over the point
/// farthest from its own centroid among clusters with more than one member
/// (lowest point index on ties), so every returned group is non-empty.
#[derive(Debug, Clone)]
pub struct KMeans {
    count: usize,
    iterations: usize,
    seed: Option<u64>,
}

impl KMeans {
    pub fn new(count: usize, iterations: usize) -> Self {
        Self {
            count,
            iterations,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Partition `vectors` into `count` non-empty groups.
    ///
    /// # Errors
    ///
    /// See [`KMeans::fit`].
    pub fn cluster(&self, vectors: &[ReducedVector]) -> Result<Vec<Vec<ReducedVector>>> {
        let clustering = self.fit(vectors)?;
        Ok(clustering.groups(vectors, self.count))
    }

    /// Run Lloyd iterations and return the final assignment.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfiguration`] if `count` or `iterations` is zero
    /// - [`Error::InsufficientData`] if there are fewer vectors than clusters
    pub fn fit(&self, vectors: &[ReducedVector]) -> Result<Clustering> {
        if self.count == 0 {
            return Err(Error::invalid_config("cluster count must be positive"));
        }
        if self.iterations == 0 {
            return Err(Error::invalid_config("clustering needs at least one iteration"));
        }
        let n = vectors.len();
        if n < self.count {
            return Err(Error::InsufficientData {
                operation: "k-means".to_string(),
                required: self.count,
                available: n,
            });
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let mut centroids = farthest_point_init(vectors, self.count, rng.random_range(0..n));

        let mut assignments = vec![usize::MAX; n];
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.iterations {
            iterations += 1;
            let mut changed = false;

            for (i, vector) in vectors.iter().enumerate() {
                let best = nearest(vector, centroids.iter());
                if assignments[i] != best {
                    assignments[i] = best;
                    changed = true;
                }
            }

            if reseed_empty(&mut assignments, &centroids, vectors, self.count) {
                changed = true;
            }

            centroids = cluster_means(vectors, &assignments, self.count);

            if !changed {
                converged = true;
                break;
            }
        }

        debug!(
            clusters = self.count,
            points = n,
            iterations,
            converged,
            "k-means finished"
        );

        Ok(Clustering {
            assignments,
            iterations,
            converged,
        })
    }
}

/// Arithmetic mean of each group.
///
/// # Errors
///
/// Returns [`Error::EmptyCluster`] for a group with no members.
pub fn centroids(groups: &[Vec<ReducedVector>]) -> Result<Vec<Prototype>> {
    groups
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let first = group.first().ok_or(Error::EmptyCluster { index })?;
            let mut centroid = vec![0.0; first.len()];
            for member in group {
                for (c, v) in centroid.iter_mut().zip(member) {
                    *c += v;
                }
            }
            centroid.iter_mut().for_each(|c| *c /= group.len() as f64);
            Ok(Prototype { index, centroid })
        })
        .collect()
}

/// Index of the Euclidean-nearest prototype, lowest index on ties.
///
/// # Errors
///
/// Returns [`Error::NotTrained`] if `prototypes` is empty.
pub fn nearest_index(vector: &[f64], prototypes: &[Prototype]) -> Result<usize> {
    if prototypes.is_empty() {
        return Err(Error::not_trained("codebook"));
    }
    Ok(nearest(vector, prototypes.iter().map(|p| &p.centroid)))
}

pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest<'a, I>(vector: &[f64], candidates: I) -> usize
where
    I: IntoIterator<Item = &'a ReducedVector>,
{
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, candidate) in candidates.into_iter().enumerate() {
        let dist = squared_distance(vector, candidate);
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }
    best
}

fn farthest_point_init(vectors: &[ReducedVector], count: usize, first: usize) -> Vec<ReducedVector> {
    let mut centroids = Vec::with_capacity(count);
    centroids.push(vectors[first].clone());
    while centroids.len() < count {
        let mut best_idx = 0;
        let mut best_min_dist = f64::NEG_INFINITY;
        for (i, vector) in vectors.iter().enumerate() {
            let min_dist = centroids
                .iter()
                .map(|c| squared_distance(vector, c))
                .fold(f64::INFINITY, f64::min);
            if min_dist > best_min_dist {
                best_min_dist = min_dist;
                best_idx = i;
            }
        }
        centroids.push(vectors[best_idx].clone());
    }
    centroids
}

fn cluster_means(vectors: &[ReducedVector], assignments: &[usize], count: usize) -> Vec<ReducedVector> {
    let dim = vectors.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dim]; count];
    let mut sizes = vec![0usize; count];
    for (vector, &cluster) in vectors.iter().zip(assignments) {
        sizes[cluster] += 1;
        for (s, v) in sums[cluster].iter_mut().zip(vector) {
            *s += v;
        }
    }
    for (sum, size) in sums.iter_mut().zip(sizes) {
        if size > 0 {
            sum.iter_mut().for_each(|s| *s /= size as f64);
        }
    }
    sums
}

/// Give every empty cluster one point; returns whether anything moved.
fn reseed_empty(
    assignments: &mut [usize],
    centroids: &[ReducedVector],
    vectors: &[ReducedVector],
    count: usize,
) -> bool {
    let mut sizes = vec![0usize; count];
    for &cluster in assignments.iter() {
        sizes[cluster] += 1;
    }

    let mut moved = false;
    for empty in 0..count {
        if sizes[empty] > 0 {
            continue;
        }
        let mut donor: Option<(usize, f64)> = None;
        for (i, vector) in vectors.iter().enumerate() {
            let owner = assignments[i];
            if sizes[owner] <= 1 {
                continue;
            }
            let dist = squared_distance(vector, &centroids[owner]);
            if donor.is_none_or(|(_, best)| dist > best) {
                donor = Some((i, dist));
            }
        }
        if let Some((point, _)) = donor {
            debug!(cluster = empty, point, "re-seeding empty cluster");
            sizes[assignments[point]] -= 1;
            sizes[empty] += 1;
            assignments[point] = empty;
            moved = true;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<ReducedVector> {
        let mut points = Vec::new();
        for center in [(0.0, 0.0), (10.0, 10.0), (-10.0, 10.0)] {
            for (dx, dy) in [(0.1, 0.0), (-0.1, 0.0), (0.0, 0.1), (0.0, -0.1)] {
                points.push(vec![center.0 + dx, center.1 + dy]);
            }
        }
        points
    }

    #[test]
    fn test_separates_well_spaced_blobs() {
        let points = blobs();
        let clustering = KMeans::new(3, 50).with_seed(7).fit(&points).unwrap();
        for blob in clustering.assignments.chunks(4) {
            assert!(blob.iter().all(|&c| c == blob[0]));
        }
        let mut distinct = clustering.assignments.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 3);
        assert!(clustering.converged);
    }

    #[test]
    fn test_same_seed_same_grouping() {
        let points = blobs();
        let first = KMeans::new(3, 20).with_seed(99).cluster(&points).unwrap();
        let second = KMeans::new(3, 20).with_seed(99).cluster(&points).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_groups_are_never_empty() {
        // Duplicate points make empty clusters likely without re-seeding.
        let mut points = vec![vec![0.0, 0.0]; 6];
        points.push(vec![5.0, 5.0]);
        for seed in 0..20 {
            let groups = KMeans::new(4, 10).with_seed(seed).cluster(&points).unwrap();
            assert_eq!(groups.len(), 4);
            assert!(groups.iter().all(|g| !g.is_empty()));
            assert_eq!(groups.iter().map(Vec::len).sum::<usize>(), points.len());
        }
    }

    #[test]
    fn test_centroids_are_means() {
        let groups = vec![
            vec![vec![0.0, 0.0], vec![2.0, 4.0]],
            vec![vec![1.0, 1.0]],
        ];
        let prototypes = centroids(&groups).unwrap();
        assert_eq!(prototypes[0].centroid, vec![1.0, 2.0]);
        assert_eq!(prototypes[1].centroid, vec![1.0, 1.0]);
        assert_eq!(prototypes[1].index, 1);
    }

    #[test]
    fn test_centroids_guard_empty_group() {
        let groups = vec![vec![vec![1.0]], vec![]];
        assert!(matches!(
            centroids(&groups),
            Err(Error::EmptyCluster { index: 1 })
        ));
    }

    #[test]
    fn test_nearest_index_ties_lowest() {
        let prototypes = vec![
            Prototype {
                index: 0,
                centroid: vec![-1.0],
            },
            Prototype {
                index: 1,
                centroid: vec![1.0],
            },
        ];
        assert_eq!(nearest_index(&[0.0], &prototypes).unwrap(), 0);
        assert_eq!(nearest_index(&[0.5], &prototypes).unwrap(), 1);
        assert!(nearest_index(&[0.0], &[]).is_err());
    }

    #[test]
    fn test_rejects_more_clusters_than_points() {
        let points = vec![vec![0.0], vec![1.0]];
        assert!(matches!(
            KMeans::new(3, 5).fit(&points),
            Err(Error::InsufficientData { .. })
        ));
        assert!(matches!(
            KMeans::new(0, 5).fit(&points),
            Err(Error::InvalidConfiguration { .. })
        ));
    }
}
