//! Tile coding: sparse coarse coding of continuous state vectors
//!
//! A [`TileCoding`] owns several overlapping [`Tiling`]s. Each tiling
//! quantizes the input into exactly one [`Tile`], and each distinct tile seen
//! so far is given a feature id. A query therefore activates one feature per
//! tiling, every feature with value `1.0`.
//!
//! # Memory
//!
//! Feature ids are allocated on first sight and never evicted. Training on
//! inputs with unbounded range keeps creating tiles, so the id space (and
//! every table keyed by it) grows without limit. Bound the inputs or the
//! training length when this matters.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use tilerl_core::{RLError, Result};

/// Index into the weight vector of an approximator
pub type FeatureId = usize;

/// One active feature and its activation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateFeature {
    /// Feature id
    pub id: FeatureId,
    /// Activation; always `1.0` for tile features
    pub value: f64,
}

impl StateFeature {
    /// Create a new feature
    #[must_use]
    pub fn new(id: FeatureId, value: f64) -> Self {
        Self { id, value }
    }
}

/// One grid cell of a tiling.
///
/// Equality compares the full coordinate vector. The stored hash only
/// speeds up table lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    coords: Vec<i64>,
    hash: i64,
}

impl Tile {
    /// Create a tile from its grid coordinates
    #[must_use]
    pub fn new(coords: Vec<i64>) -> Self {
        let hash = coords
            .iter()
            .fold(0i64, |h, &c| h.wrapping_mul(31).wrapping_add(c));
        Self { coords, hash }
    }

    /// Grid coordinates, one per input dimension
    #[must_use]
    pub fn coords(&self) -> &[i64] {
        &self.coords
    }

    /// Precomputed hash code
    #[must_use]
    pub fn hash_code(&self) -> i64 {
        self.hash
    }
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.coords == other.coords
    }
}

impl Eq for Tile {}

impl Hash for Tile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i64(self.hash);
    }
}

/// A single quantization grid over the input space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tiling {
    widths: Vec<f64>,
    offset: Vec<f64>,
    dimension_mask: Vec<bool>,
}

impl Tiling {
    /// Create a tiling.
    ///
    /// All three vectors must have the same length; widths of active
    /// dimensions must be finite and strictly positive.
    pub fn new(widths: Vec<f64>, offset: Vec<f64>, dimension_mask: Vec<bool>) -> Result<Self> {
        let dims = widths.len();
        for len in [offset.len(), dimension_mask.len()] {
            if len != dims {
                return Err(RLError::DimensionMismatch {
                    expected: dims,
                    actual: len,
                });
            }
        }
        for i in 0..dims {
            if !dimension_mask[i] {
                continue;
            }
            if !(widths[i].is_finite() && widths[i] > 0.0) {
                return Err(RLError::InvalidConfig(format!(
                    "tile width of dimension {i} must be positive, got {}",
                    widths[i]
                )));
            }
            if !offset[i].is_finite() {
                return Err(RLError::InvalidConfig(format!(
                    "tile offset of dimension {i} is not finite"
                )));
            }
        }
        Ok(Self {
            widths,
            offset,
            dimension_mask,
        })
    }

    /// Number of input dimensions this tiling expects
    #[must_use]
    pub fn dims(&self) -> usize {
        self.widths.len()
    }

    /// Tile width per dimension
    #[must_use]
    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    /// Grid offset per dimension
    #[must_use]
    pub fn offset(&self) -> &[f64] {
        &self.offset
    }

    /// Dimensions taking part in this tiling
    #[must_use]
    pub fn dimension_mask(&self) -> &[bool] {
        &self.dimension_mask
    }

    /// Tile containing `input`.
    ///
    /// Active dimensions map to `floor((x - offset) / width)`; inactive ones
    /// collapse to coordinate 0.
    #[allow(clippy::cast_possible_truncation)]
    pub fn get_tile(&self, input: &[f64]) -> Result<Tile> {
        if input.len() != self.dims() {
            return Err(RLError::DimensionMismatch {
                expected: self.dims(),
                actual: input.len(),
            });
        }
        let mut coords = Vec::with_capacity(input.len());
        for (i, &x) in input.iter().enumerate() {
            if !self.dimension_mask[i] {
                coords.push(0);
                continue;
            }
            if !x.is_finite() {
                return Err(RLError::NonFinite(format!("state dimension {i} is {x}")));
            }
            coords.push(((x - self.offset[i]) / self.widths[i]).floor() as i64);
        }
        Ok(Tile::new(coords))
    }
}

/// Tile-coded state features
#[derive(Debug, Clone)]
pub struct TileCoding {
    pub(crate) rng: StdRng,
    pub(crate) next_id: FeatureId,
    pub(crate) tilings: Vec<Tiling>,
    pub(crate) tile_ids: Vec<HashMap<Tile, FeatureId>>,
}

impl Default for TileCoding {
    fn default() -> Self {
        Self::new()
    }
}

impl TileCoding {
    /// Create an empty tile coding with an entropy-seeded offset generator
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create an empty tile coding whose tiling offsets are reproducible
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            next_id: 0,
            tilings: Vec::new(),
            tile_ids: Vec::new(),
        }
    }

    /// Append `count` tilings over the dimensions active in `dimension_mask`.
    ///
    /// Each tiling gets its own offset, drawn uniformly from `[0, width)` for
    /// every active dimension.
    pub fn add_tiling(&mut self, dimension_mask: &[bool], widths: &[f64], count: usize) -> Result<()> {
        if dimension_mask.len() != widths.len() {
            return Err(RLError::DimensionMismatch {
                expected: widths.len(),
                actual: dimension_mask.len(),
            });
        }
        if let Some(first) = self.tilings.first() {
            if first.dims() != widths.len() {
                return Err(RLError::DimensionMismatch {
                    expected: first.dims(),
                    actual: widths.len(),
                });
            }
        }
        if count == 0 {
            return Err(RLError::InvalidConfig("tiling count must be at least 1".into()));
        }
        if !dimension_mask.iter().any(|&m| m) {
            return Err(RLError::InvalidConfig("dimension mask selects no dimension".into()));
        }

        for _ in 0..count {
            let offset = self.rand_offset(dimension_mask, widths);
            let tiling = Tiling::new(widths.to_vec(), offset, dimension_mask.to_vec())?;
            self.tilings.push(tiling);
            self.tile_ids.push(HashMap::new());
        }
        Ok(())
    }

    fn rand_offset(&mut self, dimension_mask: &[bool], widths: &[f64]) -> Vec<f64> {
        dimension_mask
            .iter()
            .zip(widths)
            .map(|(&active, &w)| if active { self.rng.gen::<f64>() * w } else { 0.0 })
            .collect()
    }

    /// Active features for a state vector, one per tiling, in tiling order.
    ///
    /// Tiles never seen before are assigned fresh ids. Nothing is assigned
    /// when any tiling rejects the input.
    pub fn features(&mut self, input: &[f64]) -> Result<Vec<StateFeature>> {
        let tiles = self
            .tilings
            .iter()
            .map(|tiling| tiling.get_tile(input))
            .collect::<Result<Vec<_>>>()?;

        let mut features = Vec::with_capacity(tiles.len());
        for (tile, ids) in tiles.into_iter().zip(self.tile_ids.iter_mut()) {
            let next_id = &mut self.next_id;
            let id = *ids.entry(tile).or_insert_with(|| {
                let id = *next_id;
                *next_id += 1;
                id
            });
            features.push(StateFeature::new(id, 1.0));
        }
        Ok(features)
    }

    /// Number of feature ids allocated so far
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.next_id
    }

    /// Number of tilings
    #[must_use]
    pub fn num_tilings(&self) -> usize {
        self.tilings.len()
    }

    /// Tilings in query order
    #[must_use]
    pub fn tilings(&self) -> &[Tiling] {
        &self.tilings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_tile_quantizes_active_dimensions() {
        let tiling = Tiling::new(vec![2.0, 0.5], vec![0.5, 0.0], vec![true, true]).unwrap();
        let tile = tiling.get_tile(&[3.0, -0.75]).unwrap();
        assert_eq!(tile.coords(), &[1, -2]);

        let masked = Tiling::new(vec![2.0, 0.5], vec![0.5, 0.0], vec![true, false]).unwrap();
        let a = masked.get_tile(&[3.0, -0.75]).unwrap();
        let b = masked.get_tile(&[3.0, 100.0]).unwrap();
        assert_eq!(a.coords(), &[1, 0]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_get_tile_is_deterministic() {
        let tiling = Tiling::new(vec![0.3, 1.7], vec![0.1, 0.9], vec![true, true]).unwrap();
        let a = tiling.get_tile(&[1.234, -5.5]).unwrap();
        let b = tiling.get_tile(&[1.234, -5.5]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash_code(), b.hash_code());
    }

    #[test]
    fn test_tiling_rejects_bad_parameters() {
        assert!(matches!(
            Tiling::new(vec![1.0], vec![0.0, 0.0], vec![true]),
            Err(RLError::DimensionMismatch { expected: 1, actual: 2 })
        ));
        assert!(matches!(
            Tiling::new(vec![0.0], vec![0.0], vec![true]),
            Err(RLError::InvalidConfig(_))
        ));
        // inactive dimensions may carry any width
        assert!(Tiling::new(vec![1.0, 0.0], vec![0.0, 0.0], vec![true, false]).is_ok());
    }

    #[test]
    fn test_get_tile_rejects_wrong_input() {
        let tiling = Tiling::new(vec![1.0, 1.0], vec![0.0, 0.0], vec![true, true]).unwrap();
        assert!(matches!(
            tiling.get_tile(&[1.0]),
            Err(RLError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(tiling.get_tile(&[f64::NAN, 1.0]), Err(RLError::NonFinite(_))));
    }

    #[test]
    fn test_offsets_stay_within_one_width() {
        let mut tc = TileCoding::with_seed(3);
        tc.add_tiling(&[true, false, true], &[0.5, 9.0, 4.0], 20).unwrap();
        assert_eq!(tc.num_tilings(), 20);
        for tiling in tc.tilings() {
            let off = tiling.offset();
            assert!((0.0..0.5).contains(&off[0]));
            assert_eq!(off[1], 0.0);
            assert!((0.0..4.0).contains(&off[2]));
        }
    }

    #[test]
    fn test_one_feature_per_tiling() {
        let mut tc = TileCoding::with_seed(11);
        tc.add_tiling(&[true, true], &[1.0, 1.0], 5).unwrap();
        tc.add_tiling(&[false, true], &[1.0, 1.0], 3).unwrap();

        let features = tc.features(&[0.2, 0.7]).unwrap();
        assert_eq!(features.len(), 8);
        assert!(features.iter().all(|f| f.value == 1.0));
        // ids are shared-counter allocated, so all distinct on first sight
        let mut ids: Vec<_> = features.iter().map(|f| f.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(tc.num_features(), 8);
    }

    #[test]
    fn test_feature_ids_are_stable() {
        let mut tc = TileCoding::with_seed(5);
        tc.add_tiling(&[true], &[1.0], 4).unwrap();

        let first = tc.features(&[0.0]).unwrap();
        let again = tc.features(&[0.0]).unwrap();
        assert_eq!(first, again);
        assert_eq!(tc.num_features(), 4);

        // ten widths away: every tiling sees a brand new tile
        let far = tc.features(&[10.0]).unwrap();
        assert_eq!(tc.num_features(), 8);
        assert!(far.iter().all(|f| f.id >= 4));
    }

    #[test]
    fn test_add_tiling_validates() {
        let mut tc = TileCoding::with_seed(0);
        assert!(tc.add_tiling(&[true], &[1.0, 1.0], 1).is_err());
        assert!(tc.add_tiling(&[true], &[1.0], 0).is_err());
        assert!(tc.add_tiling(&[false], &[1.0], 1).is_err());
        tc.add_tiling(&[true], &[1.0], 1).unwrap();
        assert!(matches!(
            tc.add_tiling(&[true, true], &[1.0, 1.0], 1),
            Err(RLError::DimensionMismatch { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn test_rejected_input_assigns_no_ids() {
        let mut tc = TileCoding::with_seed(6);
        tc.add_tiling(&[true, false], &[1.0, 1.0], 3).unwrap();
        tc.add_tiling(&[false, true], &[1.0, 1.0], 1).unwrap();

        // the first three tilings ignore the NaN, the last one does not
        assert!(matches!(tc.features(&[0.5, f64::NAN]), Err(RLError::NonFinite(_))));
        assert_eq!(tc.num_features(), 0);

        let features = tc.features(&[0.5, 0.5]).unwrap();
        let ids: Vec<_> = features.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }
}
