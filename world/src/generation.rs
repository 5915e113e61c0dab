//! Block catalog and the depth-weighted roulette used to fill cells.

use spire_core::{BlockId, BlockMaterial, BlockTemplate, BlockingKind, DepthRange, ResourceKind};
use thiserror::Error;

/// Errors surfaced while constructing or interrogating the grid.
///
/// Everything here is a configuration problem: fatal at generation time and
/// never recoverable mid-run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// The requested cell lies outside the grid.
    #[error("cell ({column}, {row}) lies outside the grid")]
    OutOfBounds {
        /// Column index of the offending request.
        column: u32,
        /// Row index of the offending request.
        row: u32,
    },
    /// The grid was configured with a zero dimension.
    #[error("grid dimensions {columns}x{rows} are degenerate")]
    InvalidDimensions {
        /// Configured column count.
        columns: u32,
        /// Configured row count.
        rows: u32,
    },
    /// No spawnable template covers the provided depth.
    #[error("no block template covers depth {depth}")]
    NoTemplateForDepth {
        /// Depth for which selection failed.
        depth: u32,
    },
}

/// Shared, immutable set of block templates referenced by every cell.
///
/// Cells never own their block; they store a [`BlockId`] into this catalog.
#[derive(Clone, Debug)]
pub struct BlockCatalog {
    templates: Vec<BlockTemplate>,
}

/// Template id of open air.
pub const OPEN_BLOCK: BlockId = BlockId::new(0);
/// Template id of bare stone.
pub const STONE_BLOCK: BlockId = BlockId::new(1);
/// Template id of crystal-bearing stone.
pub const CRYSTAL_BLOCK: BlockId = BlockId::new(2);
/// Template id of gold-bearing stone.
pub const GOLD_BLOCK: BlockId = BlockId::new(3);
/// Template id of slime-infested stone.
pub const SLIME_BLOCK: BlockId = BlockId::new(4);
/// Template id of the indestructible block a summoning table occupies.
pub const TABLE_BLOCK: BlockId = BlockId::new(5);

impl BlockCatalog {
    /// Builds the standard catalog used by the shipped experience.
    ///
    /// Air dominates near the surface; bare stone runs the full depth column
    /// so selection can never come up empty; resource seams open a few rows
    /// down and stay available from there.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            templates: vec![
                // OPEN_BLOCK
                BlockTemplate {
                    material: BlockMaterial::None,
                    resource: None,
                    blocking: BlockingKind::None,
                    destructible: false,
                    depths: DepthRange::new(0, 8),
                    weight_factor: 10.0,
                },
                // STONE_BLOCK
                BlockTemplate {
                    material: BlockMaterial::Stone,
                    resource: None,
                    blocking: BlockingKind::Full,
                    destructible: true,
                    depths: DepthRange::new(0, u32::MAX),
                    weight_factor: 6.0,
                },
                // CRYSTAL_BLOCK
                BlockTemplate {
                    material: BlockMaterial::Stone,
                    resource: Some(ResourceKind::Crystal),
                    blocking: BlockingKind::Full,
                    destructible: true,
                    depths: DepthRange::new(4, u32::MAX),
                    weight_factor: 1.2,
                },
                // GOLD_BLOCK
                BlockTemplate {
                    material: BlockMaterial::Stone,
                    resource: Some(ResourceKind::Gold),
                    blocking: BlockingKind::Full,
                    destructible: true,
                    depths: DepthRange::new(6, u32::MAX),
                    weight_factor: 0.8,
                },
                // SLIME_BLOCK
                BlockTemplate {
                    material: BlockMaterial::Stone,
                    resource: Some(ResourceKind::Slime),
                    blocking: BlockingKind::Full,
                    destructible: true,
                    depths: DepthRange::new(2, u32::MAX),
                    weight_factor: 1.0,
                },
                // TABLE_BLOCK: placed by building, never by generation.
                BlockTemplate {
                    material: BlockMaterial::None,
                    resource: None,
                    blocking: BlockingKind::Full,
                    destructible: false,
                    depths: DepthRange::new(0, 0),
                    weight_factor: 0.0,
                },
            ],
        }
    }

    /// Builds a catalog from explicit templates; used by tests and variants.
    #[must_use]
    pub fn from_templates(templates: Vec<BlockTemplate>) -> Self {
        Self { templates }
    }

    /// Template behind the provided id.
    #[must_use]
    pub fn template(&self, id: BlockId) -> &BlockTemplate {
        &self.templates[usize::from(id.get())]
    }

    /// Checks that every depth from the surface down is covered by at least
    /// one spawnable template, so roulette selection can never come up empty.
    ///
    /// # Errors
    ///
    /// [`GridError::NoTemplateForDepth`] naming the shallowest uncovered
    /// depth.
    pub fn validate(&self) -> Result<(), GridError> {
        let mut bands: Vec<DepthRange> = self
            .templates
            .iter()
            .filter(|template| template.is_spawnable())
            .map(|template| template.depths)
            .collect();
        bands.sort_by_key(|band| band.min());

        let mut covered_to: Option<u32> = None;
        for band in bands {
            let next_uncovered = match covered_to {
                None => 0,
                Some(u32::MAX) => return Ok(()),
                Some(depth) => depth + 1,
            };
            if band.min() > next_uncovered {
                return Err(GridError::NoTemplateForDepth {
                    depth: next_uncovered,
                });
            }
            covered_to = Some(covered_to.map_or(band.max(), |depth| depth.max(band.max())));
        }

        match covered_to {
            Some(u32::MAX) => Ok(()),
            Some(depth) => Err(GridError::NoTemplateForDepth { depth: depth + 1 }),
            None => Err(GridError::NoTemplateForDepth { depth: 0 }),
        }
    }

    /// Selects a template for the provided depth by cumulative-weight
    /// roulette. `roll` must lie in `[0, 1)`.
    #[must_use]
    pub fn select(&self, depth: u32, roll: f32) -> Option<BlockId> {
        let total: f32 = self
            .templates
            .iter()
            .map(|template| template.spawn_weight(depth))
            .sum();
        if total <= 0.0 {
            return None;
        }

        let threshold = roll.clamp(0.0, 1.0) * total;
        let mut cumulative = 0.0;
        let mut last_candidate = None;
        for (index, template) in self.templates.iter().enumerate() {
            let weight = template.spawn_weight(depth);
            if weight <= 0.0 {
                continue;
            }
            let id = BlockId::new(index as u16);
            last_candidate = Some(id);
            cumulative += weight;
            if threshold < cumulative {
                return Some(id);
            }
        }
        // Floating-point shortfall at the top of the range lands on the
        // final candidate.
        last_candidate
    }
}

/// Deterministic linear congruential generator used for block selection.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Lcg {
    state: u64,
}

const LCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const LCG_INCREMENT: u64 = 1;

impl Lcg {
    pub(crate) const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        self.state
    }

    /// Uniform draw in `[0, 1)` from the top 24 bits of the state.
    pub(crate) fn next_unit(&mut self) -> f32 {
        let bits = (self.next_u64() >> 40) as u32;
        bits as f32 / (1u32 << 24) as f32
    }
}
