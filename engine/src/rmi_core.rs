//! Recursive Model Index (RMI)
//!
//! A fixed-shape tree of linear models over a sorted key array. Layer `i`
//! holds `width^i` models; internal layers route a key to one model of the
//! next layer, and the leaf layer predicts the key's rank directly.
//!
//! Nodes live in per-layer vectors addressed by `(layer, position)`, with the
//! children of `(layer, p)` at `(layer + 1, p * width + 0..width)`.

use num::{BigInt, BigRational, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::RmiError;
use crate::regression::{self, LinearFit};
use crate::rmi_config::{total_slots, RmiConfig};

/// One linear model `rank = slope * key + intercept` owned by a tree slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    slope: BigRational,
    intercept: BigRational,
    zero_crossing: BigRational,
    degenerate: bool,
}

impl Node {
    fn from_fit(fit: LinearFit) -> Self {
        Self {
            slope: fit.slope,
            intercept: fit.intercept,
            zero_crossing: fit.zero_crossing,
            degenerate: false,
        }
    }

    /// Flat model for a slot with nothing to fit: always predicts `offset`,
    /// the first rank of the nearest non-empty range it was carved from.
    fn fallback(offset: usize) -> Self {
        Self {
            slope: BigRational::zero(),
            intercept: BigRational::from_integer(BigInt::from(offset)),
            zero_crossing: BigRational::zero(),
            degenerate: true,
        }
    }

    #[inline]
    pub fn slope(&self) -> &BigRational {
        &self.slope
    }

    #[inline]
    pub fn intercept(&self) -> &BigRational {
        &self.intercept
    }

    /// Key at which this model predicts rank zero (zero for flat models)
    #[inline]
    pub fn zero_crossing(&self) -> &BigRational {
        &self.zero_crossing
    }

    /// True if this slot could not be fitted and holds the offset fallback
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Lossy views for diagnostics
    pub fn slope_f64(&self) -> f64 {
        self.slope.to_f64().unwrap_or(f64::NAN)
    }

    pub fn intercept_f64(&self) -> f64 {
        self.intercept.to_f64().unwrap_or(f64::NAN)
    }

    pub fn zero_crossing_f64(&self) -> f64 {
        self.zero_crossing.to_f64().unwrap_or(f64::NAN)
    }

    /// Evaluate `slope * key + intercept` exactly
    #[inline]
    pub fn predict(&self, key: &BigRational) -> BigRational {
        &self.slope * key + &self.intercept
    }
}

/// Summary of a built tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RmiStats {
    pub width: usize,
    pub depth: usize,
    pub max_index: usize,
    pub total_nodes: usize,
    pub degenerate_nodes: usize,
    pub layer_sizes: Vec<usize>,
}

/// Recursive model index over an immutable sorted key array.
///
/// Built once, read-only afterwards; `&Rmi` can be shared across threads
/// for concurrent queries.
#[derive(Debug, Clone)]
pub struct Rmi {
    width: usize,
    depth: usize,
    max_index: usize,
    nodes: Vec<Vec<Node>>,
}

impl Rmi {
    /// Build an index of the given shape over `keys`, which must be sorted in
    /// non-decreasing order (duplicates allowed).
    pub fn build<K>(keys: &[K], width: usize, depth: usize) -> Result<Self, RmiError>
    where
        K: Ord + Clone + Into<BigInt>,
    {
        Self::with_config(keys, &RmiConfig::new(width, depth))
    }

    /// Build an index using the shape and limits from `config`
    pub fn with_config<K>(keys: &[K], config: &RmiConfig) -> Result<Self, RmiError>
    where
        K: Ord + Clone + Into<BigInt>,
    {
        let (width, depth) = (config.width, config.depth);
        if width == 0 || depth == 0 {
            return Err(RmiError::InvalidShape { width, depth });
        }
        match total_slots(width, depth) {
            Some(slots) if slots <= config.max_nodes => {}
            _ => {
                return Err(RmiError::ShapeTooLarge {
                    width,
                    depth,
                    limit: config.max_nodes,
                })
            }
        }
        if keys.is_empty() {
            return Err(RmiError::EmptyInput);
        }
        if let Some(position) = keys.windows(2).position(|pair| pair[0] > pair[1]) {
            return Err(RmiError::Unsorted { position });
        }

        debug!(
            keys = keys.len(),
            width,
            depth,
            "building recursive model index"
        );

        let values: Vec<BigRational> = keys.iter().cloned().map(lift).collect();
        let ranks: Vec<BigRational> = (0..keys.len()).map(lift).collect();

        let mut builder = TreeBuilder {
            width,
            keys: &values,
            ranks: &ranks,
            degenerate: 0,
        };
        let nodes = builder.build_layers(depth);
        let total: usize = nodes.iter().map(Vec::len).sum();

        debug!(
            keys = keys.len(),
            width,
            depth,
            nodes = total,
            degenerate = builder.degenerate,
            "built recursive model index"
        );

        Ok(Self {
            width,
            depth,
            max_index: keys.len() - 1,
            nodes,
        })
    }

    /// Predicted position of `key`, always within `[0, max_index]`.
    ///
    /// Touches exactly one model per layer.
    pub fn get_index<K: Into<BigInt>>(&self, key: K) -> usize {
        self.descend(&lift(key), |_, _| {})
    }

    /// Slot chosen at every layer on the way to the prediction for `key`
    pub fn route<K: Into<BigInt>>(&self, key: K) -> Vec<usize> {
        let mut path = Vec::with_capacity(self.depth);
        self.descend(&lift(key), |_, position| path.push(position));
        path
    }

    fn descend(&self, key: &BigRational, mut visit: impl FnMut(usize, usize)) -> usize {
        let leaf = self.depth - 1;

        // A single key has one valid answer; skip the division by max_index.
        if self.max_index == 0 {
            for layer in 0..self.depth {
                visit(layer, 0);
            }
            return 0;
        }

        let max_index = lift(self.max_index);
        let width = lift(self.width);
        let mut scale = width.clone();
        let mut position = 0usize;

        // Internal layers route: normalize the predicted rank to a fraction
        // of the key range, then scale it onto the next layer's slots.
        for layer in 0..leaf {
            visit(layer, position);
            let fraction = self.nodes[layer][position].predict(key) / &max_index;
            let last_slot = self.nodes[layer + 1].len() - 1;
            position = floor_clamped(&(fraction * &scale), last_slot);
            scale *= &width;
        }

        // The leaf predicts an absolute rank.
        visit(leaf, position);
        floor_clamped(&self.nodes[leaf][position].predict(key), self.max_index)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Largest valid position (`key count - 1`)
    #[inline]
    pub fn max_index(&self) -> usize {
        self.max_index
    }

    /// Number of keys the index was built over
    #[inline]
    pub fn key_count(&self) -> usize {
        self.max_index + 1
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0][0]
    }

    pub fn layer(&self, layer: usize) -> Option<&[Node]> {
        self.nodes.get(layer).map(Vec::as_slice)
    }

    pub fn node(&self, layer: usize, position: usize) -> Option<&Node> {
        self.nodes.get(layer)?.get(position)
    }

    pub fn layer_sizes(&self) -> Vec<usize> {
        self.nodes.iter().map(Vec::len).collect()
    }

    pub fn stats(&self) -> RmiStats {
        RmiStats {
            width: self.width,
            depth: self.depth,
            max_index: self.max_index,
            total_nodes: self.nodes.iter().map(Vec::len).sum(),
            degenerate_nodes: self
                .nodes
                .iter()
                .flatten()
                .filter(|node| node.is_degenerate())
                .count(),
            layer_sizes: self.layer_sizes(),
        }
    }
}

/// Contiguous slice `[left, right)` of the key array assigned to one slot.
/// `offset` is `left` for a non-empty range, or the carried-forward rank
/// when the range is empty.
#[derive(Debug, Clone, Copy)]
struct Range {
    left: usize,
    right: usize,
    offset: usize,
}

struct TreeBuilder<'a> {
    width: usize,
    keys: &'a [BigRational],
    ranks: &'a [BigRational],
    degenerate: usize,
}

impl TreeBuilder<'_> {
    /// Fit the tree one layer at a time. Each layer's ranges are carved from
    /// the previous layer's in position order, so slot `p` of a layer yields
    /// slots `p * width + 0..width` of the next one.
    fn build_layers(&mut self, depth: usize) -> Vec<Vec<Node>> {
        let mut nodes = Vec::with_capacity(depth);
        let mut ranges = vec![Range {
            left: 0,
            right: self.keys.len(),
            offset: 0,
        }];

        for layer in 0..depth {
            let fitted: Vec<Node> = ranges
                .iter()
                .enumerate()
                .map(|(position, range)| self.fit_range(layer, position, range))
                .collect();
            nodes.push(fitted);

            if layer + 1 < depth {
                ranges = ranges
                    .iter()
                    .flat_map(|range| self.split(range))
                    .collect();
            }
        }
        nodes
    }

    fn fit_range(&mut self, layer: usize, position: usize, range: &Range) -> Node {
        let keys = &self.keys[range.left..range.right];
        let ranks = &self.ranks[range.left..range.right];
        match regression::fit(keys, ranks) {
            Ok(fit) => Node::from_fit(fit),
            Err(reason) => {
                trace!(layer, position, offset = range.offset, %reason, "offset fallback model");
                self.degenerate += 1;
                Node::fallback(range.offset)
            }
        }
    }

    /// Carve `range` into `width` children; the last absorbs the remainder.
    fn split(&self, range: &Range) -> Vec<Range> {
        let n = range.right - range.left;
        let size = n / self.width;
        let mut carried = range.offset;

        (0..self.width)
            .map(|child| {
                let left = (child * size).min(n);
                let right = if child + 1 == self.width {
                    n
                } else {
                    ((child + 1) * size).min(n)
                };

                // A non-empty range's offset is its own first rank.
                if left < right {
                    carried = range.left + left;
                }

                Range {
                    left: range.left + left,
                    right: range.left + right,
                    offset: carried,
                }
            })
            .collect()
    }
}

#[inline]
fn lift<K: Into<BigInt>>(value: K) -> BigRational {
    BigRational::from_integer(value.into())
}

/// `floor(value)` clamped into `[0, upper]`
fn floor_clamped(value: &BigRational, upper: usize) -> usize {
    let floor = value.floor().to_integer();
    if floor.is_negative() {
        0
    } else {
        floor.to_usize().map_or(upper, |v| v.min(upper))
    }
}
