//! Smoothability and density contribution of single voxels.

use hashbrown::HashSet;
use isomesh_core::{BlockId, Material, VoxelState};

use crate::config::MeshConfig;

/// Materials smoothed when the configuration does not replace the list.
pub const DEFAULT_SMOOTHABLE: [Material; 22] = [
    Material::Grass,
    Material::Ground,
    Material::Wood,
    Material::Rock,
    Material::Iron,
    Material::Anvil,
    Material::Leaves,
    Material::Plants,
    Material::Sponge,
    Material::Cloth,
    Material::Sand,
    Material::Tnt,
    Material::Coral,
    Material::Ice,
    Material::PackedIce,
    Material::Snow,
    Material::CraftedSnow,
    Material::Cactus,
    Material::Clay,
    Material::Gourd,
    Material::DragonEgg,
    Material::Web,
];

/// Contribution of any voxel that is not smoothable.
pub const NON_SMOOTHABLE_DENSITY: f32 = -1.0;

/// Bias added after every bedrock sample so exact zeros resolve to solid.
pub const BEDROCK_TIE_BREAK: f32 = f32::from_bits(1);

/// Decides which voxels take part in the smoothed surface.
///
/// The classifier is immutable once built and is shared by every build
/// thread.
#[derive(Clone, Debug)]
pub struct MaterialClassifier {
    materials: u64,
    blocks: HashSet<BlockId>,
}

impl Default for MaterialClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHABLE, [])
    }
}

impl MaterialClassifier {
    /// Create a classifier from a material allow-list and extra block ids
    pub fn new(
        materials: impl IntoIterator<Item = Material>,
        blocks: impl IntoIterator<Item = BlockId>,
    ) -> Self {
        Self {
            materials: materials
                .into_iter()
                .filter(|material| *material != Material::Air)
                .fold(0, |set, material| set | material.bit()),
            blocks: blocks.into_iter().collect(),
        }
    }

    /// Create a classifier from the smoothable options in `config`
    pub fn from_config(config: &MeshConfig) -> Self {
        let blocks = config.smoothable_blocks.iter().copied();
        match &config.smoothable_materials {
            Some(materials) => Self::new(materials.iter().copied(), blocks),
            None => Self::new(DEFAULT_SMOOTHABLE, blocks),
        }
    }

    /// Returns true if `state` takes part in the smoothed surface
    #[inline]
    pub fn is_smoothable(&self, state: VoxelState) -> bool {
        if state.is_air() {
            return false;
        }
        self.materials & state.material.bit() != 0 || self.blocks.contains(&state.block_id)
    }

    /// How much `state` pushes a grid point towards the inside of the surface.
    ///
    /// Smoothable voxels contribute their occupied height, so a snow layer
    /// counts less than a full block; everything else counts as empty.
    #[inline]
    pub fn density_contribution(&self, state: VoxelState) -> f32 {
        contribution(self.is_smoothable(state), state)
    }
}

/// Density contribution of a voxel whose smoothability is already known.
#[inline]
pub(crate) fn contribution(smoothable: bool, state: VoxelState) -> f32 {
    if smoothable {
        state.height()
    } else {
        NON_SMOOTHABLE_DENSITY
    }
}

/// Tie-breaking bias for voxels that must always read as solid.
#[inline]
pub(crate) fn tie_break(state: VoxelState) -> f32 {
    if state.block_id == BlockId::BEDROCK {
        BEDROCK_TIE_BREAK
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_allow_list() {
        let classifier = MaterialClassifier::default();
        assert!(classifier.is_smoothable(VoxelState::STONE));
        assert!(classifier.is_smoothable(VoxelState::GRASS));
        assert!(classifier.is_smoothable(VoxelState::SAND));
        assert!(classifier.is_smoothable(VoxelState::SNOW_LAYER));
        assert!(!classifier.is_smoothable(VoxelState::AIR));
        assert!(!classifier.is_smoothable(VoxelState::WATER));
        assert!(!classifier.is_smoothable(VoxelState::GLASS));
        assert!(!classifier.is_smoothable(VoxelState::TORCH));
    }

    #[test]
    fn air_is_never_smoothable() {
        let classifier = MaterialClassifier::new(Material::ALL, [BlockId::AIR]);
        assert!(!classifier.is_smoothable(VoxelState::AIR));
    }

    #[test]
    fn contribution_follows_height() {
        let classifier = MaterialClassifier::default();
        assert_relative_eq!(classifier.density_contribution(VoxelState::DIRT), 1.0);
        assert_relative_eq!(classifier.density_contribution(VoxelState::snow_layers(2)), 0.25);
        assert_relative_eq!(classifier.density_contribution(VoxelState::WATER), -1.0);
        assert_relative_eq!(classifier.density_contribution(VoxelState::AIR), -1.0);
    }

    #[test]
    fn config_replaces_materials_and_extends_blocks() {
        let config = MeshConfig {
            smoothable_materials: Some(vec![Material::Sand]),
            smoothable_blocks: vec![BlockId::GLASS],
            ..MeshConfig::default()
        };
        let classifier = MaterialClassifier::from_config(&config);

        assert!(classifier.is_smoothable(VoxelState::SAND));
        assert!(classifier.is_smoothable(VoxelState::GLASS));
        assert!(!classifier.is_smoothable(VoxelState::STONE));
    }

    #[test]
    fn bedrock_tie_break_turns_zero_positive() {
        let density = 0.0 + tie_break(VoxelState::BEDROCK);
        assert!(density > 0.0);
        assert_eq!(tie_break(VoxelState::STONE), 0.0);
    }

    #[test]
    fn classifier_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MaterialClassifier>();
    }
}
