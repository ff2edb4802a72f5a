//! Model persistence
//!
//! A trained [`LinearFA`] is written as one versioned JSON document holding
//! the tilings with their tile tables, the per-action id maps, the id
//! counters and every materialized weight. Loading rebuilds an approximator
//! that assigns the same ids and returns the same values for every
//! state-action pair seen before saving.
//!
//! The offset generator of the tile coding is not persisted; a loaded model
//! draws offsets for any tilings added later from fresh entropy.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use tilerl_core::{ActionId, RLError, Result};

use crate::cross_product::{CrossProductFeatures, FeaturesMap};
use crate::linear_fa::LinearFA;
use crate::tile_coding::{FeatureId, Tile, TileCoding, Tiling};

/// Version written into every document
pub const FORMAT_VERSION: u32 = 1;

/// One tile and its state feature id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileEntry {
    /// Grid coordinates
    pub coords: Vec<i64>,
    /// Hash code, checked against the coordinates on load
    pub hash: i64,
    /// State feature id
    pub id: FeatureId,
}

/// A tiling with the tiles it has seen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilingSnapshot {
    /// Tile width per dimension
    pub widths: Vec<f64>,
    /// Grid offset per dimension
    pub offset: Vec<f64>,
    /// Dimensions taking part
    pub dimension_mask: Vec<bool>,
    /// Tiles, ordered by id
    pub tiles: Vec<TileEntry>,
}

/// State feature side of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileCodingSnapshot {
    /// Next state feature id to hand out
    pub next_id: FeatureId,
    /// Tilings in query order
    pub tilings: Vec<TilingSnapshot>,
}

/// Id map of one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMapSnapshot {
    /// Action the map belongs to
    pub action: ActionId,
    /// `(state feature id, state-action feature id)` pairs ordered by the first
    pub map: Vec<(FeatureId, FeatureId)>,
}

/// State-action feature side of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturesSnapshot {
    /// Next state-action id to hand out
    pub next_id: FeatureId,
    /// Tile coding
    pub state_features: TileCodingSnapshot,
    /// Per-action maps ordered by action id
    pub action_features: Vec<ActionMapSnapshot>,
}

/// Serializable form of a [`LinearFA`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Document version
    pub format_version: u32,
    /// Weight of ids never read
    pub default_weight: f64,
    /// Feature generator
    pub features: FeaturesSnapshot,
    /// Materialized `(id, weight)` pairs ordered by id
    pub weights: Vec<(FeatureId, f64)>,
}

impl From<&TileCoding> for TileCodingSnapshot {
    fn from(tc: &TileCoding) -> Self {
        let tilings = tc
            .tilings
            .iter()
            .zip(&tc.tile_ids)
            .map(|(tiling, ids)| {
                let mut tiles: Vec<TileEntry> = ids
                    .iter()
                    .map(|(tile, &id)| TileEntry {
                        coords: tile.coords().to_vec(),
                        hash: tile.hash_code(),
                        id,
                    })
                    .collect();
                tiles.sort_by_key(|t| t.id);
                TilingSnapshot {
                    widths: tiling.widths().to_vec(),
                    offset: tiling.offset().to_vec(),
                    dimension_mask: tiling.dimension_mask().to_vec(),
                    tiles,
                }
            })
            .collect();
        Self {
            next_id: tc.next_id,
            tilings,
        }
    }
}

impl From<&CrossProductFeatures> for FeaturesSnapshot {
    fn from(cpf: &CrossProductFeatures) -> Self {
        let action_features = cpf
            .action_features
            .iter()
            .map(|(&action, fm)| {
                let mut map: Vec<_> = fm.map.iter().map(|(&from, &to)| (from, to)).collect();
                map.sort_unstable();
                ActionMapSnapshot { action, map }
            })
            .collect();
        Self {
            next_id: cpf.next_id,
            state_features: TileCodingSnapshot::from(&cpf.state_features),
            action_features,
        }
    }
}

impl From<&LinearFA> for ModelSnapshot {
    fn from(fa: &LinearFA) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            default_weight: fa.default_weight,
            features: FeaturesSnapshot::from(&fa.features),
            weights: fa.weights().collect(),
        }
    }
}

fn corrupt(msg: impl Into<String>) -> RLError {
    RLError::Persistence(msg.into())
}

// Every id must be below `bound` and seen at most once.
fn claim(seen: &mut HashSet<FeatureId>, id: FeatureId, bound: FeatureId, what: &str) -> Result<()> {
    if id >= bound {
        return Err(corrupt(format!("{what} id {id} is not below counter {bound}")));
    }
    if !seen.insert(id) {
        return Err(corrupt(format!("{what} id {id} appears twice")));
    }
    Ok(())
}

impl TileCodingSnapshot {
    fn restore(self) -> Result<TileCoding> {
        // fresh entropy for offsets of tilings added after loading
        let mut tc = TileCoding::new();
        let mut seen = HashSet::new();
        for (i, ts) in self.tilings.into_iter().enumerate() {
            let tiling = Tiling::new(ts.widths, ts.offset, ts.dimension_mask)?;
            if tc.tilings.first().is_some_and(|t| t.dims() != tiling.dims()) {
                return Err(corrupt(format!("tiling {i} has a different dimensionality")));
            }
            let mut ids = HashMap::with_capacity(ts.tiles.len());
            for entry in ts.tiles {
                if entry.coords.len() != tiling.dims() {
                    return Err(corrupt(format!("tile of tiling {i} has wrong dimensionality")));
                }
                let tile = Tile::new(entry.coords);
                if tile.hash_code() != entry.hash {
                    return Err(corrupt(format!("tile {} of tiling {i} has a bad hash", entry.id)));
                }
                claim(&mut seen, entry.id, self.next_id, "state feature")?;
                if ids.insert(tile, entry.id).is_some() {
                    return Err(corrupt(format!("tiling {i} lists a tile twice")));
                }
            }
            tc.tilings.push(tiling);
            tc.tile_ids.push(ids);
        }
        tc.next_id = self.next_id;
        Ok(tc)
    }
}

impl FeaturesSnapshot {
    fn restore(self) -> Result<CrossProductFeatures> {
        let state_bound = self.state_features.next_id;
        let mut cpf = CrossProductFeatures::new(self.state_features.restore()?);
        let mut seen = HashSet::new();
        let mut action_features = BTreeMap::new();
        for am in self.action_features {
            let mut fm = FeaturesMap::new();
            for (from, to) in am.map {
                if from >= state_bound {
                    return Err(corrupt(format!(
                        "action {} maps unknown state feature {from}",
                        am.action
                    )));
                }
                claim(&mut seen, to, self.next_id, "state-action feature")?;
                if fm.map.insert(from, to).is_some() {
                    return Err(corrupt(format!(
                        "action {} maps state feature {from} twice",
                        am.action
                    )));
                }
            }
            if action_features.insert(am.action, fm).is_some() {
                return Err(corrupt(format!("action {} appears twice", am.action)));
            }
        }
        cpf.action_features = action_features;
        cpf.next_id = self.next_id;
        Ok(cpf)
    }
}

impl ModelSnapshot {
    /// Rebuild the approximator, checking the document for consistency
    pub fn into_model(self) -> Result<LinearFA> {
        if self.format_version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                self.format_version
            )));
        }
        if !self.default_weight.is_finite() {
            return Err(corrupt("default weight is not finite"));
        }
        let features = self.features.restore()?;
        let bound = features.num_ids();

        let mut seen = HashSet::new();
        let mut weights = Vec::new();
        for (id, w) in self.weights {
            claim(&mut seen, id, bound, "weight")?;
            if !w.is_finite() {
                return Err(corrupt(format!("weight {id} is not finite")));
            }
            if id >= weights.len() {
                weights.resize(id + 1, None);
            }
            weights[id] = Some(w);
        }
        Ok(LinearFA::from_parts(features, weights, self.default_weight))
    }
}

/// Write `fa` as JSON
pub fn to_writer<W: Write>(fa: &LinearFA, writer: W) -> Result<()> {
    serde_json::to_writer(writer, &ModelSnapshot::from(fa))?;
    Ok(())
}

/// Read an approximator written by [`to_writer`] or [`save`]
pub fn from_reader<R: Read>(reader: R) -> Result<LinearFA> {
    let snapshot: ModelSnapshot = serde_json::from_reader(reader)?;
    snapshot.into_model()
}

/// Save `fa` to `path`
pub async fn save(fa: &LinearFA, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let data = serde_json::to_vec(&ModelSnapshot::from(fa))?;
    fs::write(path, data).await?;
    info!(
        "Saved model to {:?} ({} features, {} weights)",
        path,
        fa.features().num_ids(),
        fa.num_param()
    );
    Ok(())
}

/// Load an approximator from `path`
pub async fn load(path: impl AsRef<Path>) -> Result<LinearFA> {
    let path = path.as_ref();
    let data = fs::read(path).await?;
    let snapshot: ModelSnapshot = serde_json::from_slice(&data)?;
    let fa = snapshot.into_model()?;
    info!(
        "Loaded model from {:?} ({} features, {} weights)",
        path,
        fa.features().num_ids(),
        fa.num_param()
    );
    Ok(fa)
}
