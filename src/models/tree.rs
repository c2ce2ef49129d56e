//! Randomized isolation tree
//!
//! A tree recursively partitions its sample set by picking a random feature
//! and a random split value inside that feature's observed range. Points in
//! sparse regions end up alone in a leaf after few splits, so a short path
//! from the root marks an anomaly.
//!
//! Nodes live in an arena (`Vec<Node>`) addressed by index; the root is
//! always node 0 and children are only ever pushed after their parent.

use crate::error::{Result, ScoringError};
use crate::types::FeatureVector;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Euler-Mascheroni constant used by the harmonic number approximation
pub const EULER_GAMMA: f64 = 0.5772156649;

/// Draws of a split value before falling back to the range midpoint
const SPLIT_RETRIES: usize = 8;

/// Harmonic number approximation `H(i) = ln(i) + γ`
pub fn harmonic(i: f64) -> f64 {
    i.ln() + EULER_GAMMA
}

/// Expected path length of an unsuccessful search in a random binary tree
/// built from `n` points: `c(n) = 2 H(n-1) - 2 (n-1) / n`, with `c(0) = c(1) = 0`.
pub fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * harmonic(n - 1.0) - 2.0 * (n - 1.0) / n
}

/// Index of a node in the tree arena
pub type NodeId = usize;

/// A node in an isolation tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    /// Split on `feature`: values `< split` go left, everything else right
    Internal {
        feature: usize,
        split: f64,
        left: NodeId,
        right: NodeId,
    },
    /// Terminal node with the number of training points routed here
    Leaf { size: usize, depth: usize },
}

/// Single isolation tree stored as a node arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    nodes: Vec<Node>,
    /// Number of points the tree was built from
    sample_size: usize,
    max_depth: usize,
}

impl IsolationTree {
    /// Build a tree from `samples`, stopping at `max_depth`.
    ///
    /// All samples are expected to share one dimensionality; the forest
    /// validates this before any tree is built.
    pub fn build<R: Rng + ?Sized>(samples: &[&FeatureVector], max_depth: usize, rng: &mut R) -> Self {
        let dimensions = samples.first().map(|s| s.dim()).unwrap_or(0);
        let mut tree = Self {
            nodes: Vec::with_capacity(2 * samples.len().max(1)),
            sample_size: samples.len(),
            max_depth,
        };
        tree.grow(samples.to_vec(), 0, dimensions, rng);
        tree
    }

    fn grow<R: Rng + ?Sized>(
        &mut self,
        points: Vec<&FeatureVector>,
        depth: usize,
        dimensions: usize,
        rng: &mut R,
    ) -> NodeId {
        if points.len() <= 1 || depth >= self.max_depth {
            return self.push(Node::Leaf {
                size: points.len(),
                depth,
            });
        }

        // Visiting features in random order and taking the first with a
        // non-degenerate range is a uniform pick among the usable features.
        let mut features: Vec<usize> = (0..dimensions).collect();
        features.shuffle(rng);
        let chosen = features.into_iter().find_map(|feature| {
            let (min, max) = feature_range(&points, feature);
            (min < max).then_some((feature, min, max))
        });

        // No usable feature means every routed point is identical
        let Some((feature, min, max)) = chosen else {
            return self.push(Node::Leaf {
                size: points.len(),
                depth,
            });
        };

        let split = split_value(min, max, rng);
        let (left_points, right_points): (Vec<_>, Vec<_>) =
            points.into_iter().partition(|p| p[feature] < split);

        // Reserve the parent slot so the root stays at index 0
        let id = self.push(Node::Leaf { size: 0, depth });
        let left = self.grow(left_points, depth + 1, dimensions, rng);
        let right = self.grow(right_points, depth + 1, dimensions, rng);
        self.nodes[id] = Node::Internal {
            feature,
            split,
            left,
            right,
        };
        id
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Path length of `vector`: depth of the leaf it reaches plus the
    /// expected remaining depth `c(leaf.size)` for unresolved points.
    ///
    /// Values outside the training range route through the same `<`
    /// comparisons; there is no error case. The caller guarantees that
    /// `vector` has the tree's dimensionality.
    pub fn path_length(&self, vector: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Internal {
                    feature,
                    split,
                    left,
                    right,
                } => {
                    id = if vector[*feature] < *split { *left } else { *right };
                }
                Node::Leaf { size, depth } => {
                    return *depth as f64 + average_path_length(*size);
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Deepest leaf depth actually reached
    pub fn height(&self) -> usize {
        self.leaves().map(|(_, depth)| depth).max().unwrap_or(0)
    }

    /// `(size, depth)` of every leaf
    pub fn leaves(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            Node::Leaf { size, depth } => Some((*size, *depth)),
            Node::Internal { .. } => None,
        })
    }

    /// Check the arena of a deserialized tree against the model dimensionality.
    pub fn validate(&self, dimensions: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(ScoringError::InvalidArtifact("tree has no nodes".to_string()));
        }

        for (id, node) in self.nodes.iter().enumerate() {
            if let Node::Internal {
                feature,
                split,
                left,
                right,
            } = node
            {
                if *feature >= dimensions {
                    return Err(ScoringError::InvalidArtifact(format!(
                        "node {} splits on feature {} but model has {} features",
                        id, feature, dimensions
                    )));
                }
                if !split.is_finite() {
                    return Err(ScoringError::InvalidArtifact(format!(
                        "node {} has a non-finite split value",
                        id
                    )));
                }
                // Children always come after their parent, which rules out cycles
                for child in [*left, *right] {
                    if child <= id || child >= self.nodes.len() {
                        return Err(ScoringError::InvalidArtifact(format!(
                            "node {} has invalid child handle {}",
                            id, child
                        )));
                    }
                }
            }
        }

        let leaf_total: usize = self.leaves().map(|(size, _)| size).sum();
        if leaf_total != self.sample_size {
            return Err(ScoringError::InvalidArtifact(format!(
                "leaf sizes sum to {} but tree was built from {} points",
                leaf_total, self.sample_size
            )));
        }

        Ok(())
    }
}

fn feature_range(points: &[&FeatureVector], feature: usize) -> (f64, f64) {
    points
        .iter()
        .map(|p| p[feature])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
            (min.min(v), max.max(v))
        })
}

/// Uniform draw from the open interval `(min, max)`.
///
/// When the two bounds are adjacent floats no value lies strictly between
/// them; splitting at `max` still separates the two groups. Ranges whose
/// width overflows `f64` are interpolated instead of offset from `min`.
fn split_value<R: Rng + ?Sized>(min: f64, max: f64, rng: &mut R) -> f64 {
    let span = max - min;
    for _ in 0..SPLIT_RETRIES {
        let t: f64 = rng.gen();
        let value = if span.is_finite() {
            min + t * span
        } else {
            min * (1.0 - t) + max * t
        };
        if value > min && value < max {
            return value;
        }
    }
    let mid = if span.is_finite() {
        min + span / 2.0
    } else {
        min / 2.0 + max / 2.0
    };
    if mid > min && mid < max {
        mid
    } else {
        max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn cluster(n: usize, seed: u64) -> Vec<FeatureVector> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n)
            .map(|_| {
                FeatureVector::new(vec![
                    normal.sample(&mut rng),
                    normal.sample(&mut rng),
                    normal.sample(&mut rng),
                ])
            })
            .collect()
    }

    fn max_depth_for(n: usize) -> usize {
        (n as f64).log2().ceil() as usize
    }

    /// Route every training point and collect the points reaching each node
    fn routed_points<'a>(tree: &IsolationTree, points: &[&'a FeatureVector]) -> Vec<Vec<&'a FeatureVector>> {
        let mut routed = vec![Vec::new(); tree.nodes.len()];
        for &p in points {
            let mut id = 0;
            loop {
                routed[id].push(p);
                match &tree.nodes[id] {
                    Node::Internal {
                        feature,
                        split,
                        left,
                        right,
                    } => id = if p[*feature] < *split { *left } else { *right },
                    Node::Leaf { .. } => break,
                }
            }
        }
        routed
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert!((average_path_length(2) - (2.0 * EULER_GAMMA - 1.0)).abs() < 1e-12);
        // c(256) = 2 (ln 255 + γ) - 2 * 255 / 256
        assert!((average_path_length(256) - 10.2448).abs() < 1e-3);
    }

    #[test]
    fn test_single_point_is_leaf() {
        let v = FeatureVector::from([1.0, 2.0, 3.0]);
        let mut rng = StdRng::seed_from_u64(1);
        let tree = IsolationTree::build(&[&v], 8, &mut rng);

        assert_eq!(tree.nodes(), &[Node::Leaf { size: 1, depth: 0 }]);
        assert_eq!(tree.path_length(v.values()), 0.0);
    }

    #[test]
    fn test_identical_points_form_one_leaf() {
        let v = FeatureVector::from([0.5, 0.5, 0.5]);
        let samples: Vec<&FeatureVector> = std::iter::repeat(&v).take(10).collect();
        let mut rng = StdRng::seed_from_u64(2);
        let tree = IsolationTree::build(&samples, 8, &mut rng);

        assert_eq!(tree.nodes(), &[Node::Leaf { size: 10, depth: 0 }]);
        assert!((tree.path_length(v.values()) - average_path_length(10)).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_feature_is_never_split() {
        let data: Vec<FeatureVector> = (0..32)
            .map(|i| FeatureVector::from([i as f64, 7.0, 7.0]))
            .collect();
        let samples: Vec<&FeatureVector> = data.iter().collect();
        let mut rng = StdRng::seed_from_u64(3);
        let tree = IsolationTree::build(&samples, 10, &mut rng);

        for node in tree.nodes() {
            if let Node::Internal { feature, .. } = node {
                assert_eq!(*feature, 0);
            }
        }
    }

    #[test]
    fn test_split_values_lie_inside_routed_range() {
        let data = cluster(128, 4);
        let samples: Vec<&FeatureVector> = data.iter().collect();
        let mut rng = StdRng::seed_from_u64(5);
        let tree = IsolationTree::build(&samples, max_depth_for(128), &mut rng);
        let routed = routed_points(&tree, &samples);

        for (id, node) in tree.nodes().iter().enumerate() {
            if let Node::Internal { feature, split, .. } = node {
                let (min, max) = feature_range(&routed[id], *feature);
                assert!(min < *split && *split < max, "node {} split {} outside ({}, {})", id, split, min, max);
            }
        }
    }

    #[test]
    fn test_leaf_sizes_and_depths() {
        let data = cluster(256, 6);
        let samples: Vec<&FeatureVector> = data.iter().collect();
        let max_depth = max_depth_for(256);
        let mut rng = StdRng::seed_from_u64(7);
        let tree = IsolationTree::build(&samples, max_depth, &mut rng);

        let total: usize = tree.leaves().map(|(size, _)| size).sum();
        assert_eq!(total, 256);
        assert!(tree.height() <= max_depth);
        assert!(tree.validate(3).is_ok());
    }

    #[test]
    fn test_path_length_bound() {
        let n = 200;
        let data = cluster(n, 8);
        let samples: Vec<&FeatureVector> = data.iter().collect();
        let max_depth = max_depth_for(n) + 2;
        let mut rng = StdRng::seed_from_u64(9);
        let tree = IsolationTree::build(&samples, max_depth, &mut rng);

        let bound = max_depth as f64 + average_path_length(n);
        for (size, depth) in tree.leaves() {
            assert!(depth as f64 + average_path_length(size) <= bound + 1e-9);
        }
        for v in &data {
            assert!(tree.path_length(v.values()) <= bound + 1e-9);
        }
    }

    #[test]
    fn test_out_of_range_vector_routes_deterministically() {
        let data = cluster(64, 10);
        let samples: Vec<&FeatureVector> = data.iter().collect();
        let mut rng = StdRng::seed_from_u64(11);
        let tree = IsolationTree::build(&samples, max_depth_for(64), &mut rng);

        let far = [1e6, -1e6, 1e6];
        let first = tree.path_length(&far);
        assert!(first.is_finite());
        assert_eq!(first, tree.path_length(&far));
    }

    #[test]
    fn test_same_seed_builds_same_tree() {
        let data = cluster(100, 12);
        let samples: Vec<&FeatureVector> = data.iter().collect();
        let a = IsolationTree::build(&samples, 7, &mut StdRng::seed_from_u64(13));
        let b = IsolationTree::build(&samples, 7, &mut StdRng::seed_from_u64(13));
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_rejects_bad_feature_index() {
        let tree = IsolationTree {
            nodes: vec![
                Node::Internal {
                    feature: 2,
                    split: 0.5,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { size: 1, depth: 1 },
                Node::Leaf { size: 1, depth: 1 },
            ],
            sample_size: 2,
            max_depth: 4,
        };

        assert!(tree.validate(3).is_ok());
        assert!(matches!(tree.validate(2), Err(ScoringError::InvalidArtifact(_))));
    }

    #[test]
    fn test_validate_rejects_backward_child() {
        let tree = IsolationTree {
            nodes: vec![
                Node::Internal {
                    feature: 0,
                    split: 0.0,
                    left: 0,
                    right: 1,
                },
                Node::Leaf { size: 1, depth: 1 },
            ],
            sample_size: 1,
            max_depth: 4,
        };
        assert!(matches!(tree.validate(1), Err(ScoringError::InvalidArtifact(_))));
    }

    #[test]
    fn test_split_value_over_full_float_range() {
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..1000 {
            let split = split_value(-f64::MAX, f64::MAX, &mut rng);
            assert!(split.is_finite());
            assert!(split > -f64::MAX && split < f64::MAX);
        }
    }

    #[test]
    fn test_split_value_between_adjacent_floats() {
        let mut rng = StdRng::seed_from_u64(14);
        let min = 1.0_f64;
        let max = f64::from_bits(min.to_bits() + 1);
        assert_eq!(split_value(min, max, &mut rng), max);
    }

    #[test]
    fn test_extreme_column_builds_valid_tree() {
        let data = vec![
            FeatureVector::from([f64::MAX, 0.0]),
            FeatureVector::from([-f64::MAX, 1.0]),
            FeatureVector::from([0.0, 2.0]),
        ];
        let samples: Vec<&FeatureVector> = data.iter().collect();
        let mut rng = StdRng::seed_from_u64(15);
        let tree = IsolationTree::build(&samples, 4, &mut rng);

        assert!(tree.validate(2).is_ok());
        assert_eq!(tree.leaves().map(|(size, _)| size).sum::<usize>(), 3);
    }
}
