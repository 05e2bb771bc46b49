//! Mesher configuration.

use std::path::Path;

use isomesh_core::{BlockId, Error, Material, Result};
use serde::{Deserialize, Serialize};

/// Smallest cache padding that covers every neighbor the mesher reads.
///
/// The density kernel reaches one voxel below each grid point and the texture
/// search reaches one voxel around each cell.
pub const MIN_PADDING: i32 = 1;

/// Options that change how chunks are meshed.
///
/// Missing fields take their default values, so a partial TOML file only
/// needs the options it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Displace each vertex by a deterministic per-position offset
    pub offset_vertices: bool,
    /// Search nearby voxels for snow and grass textures before the generic choice
    pub better_textures: bool,
    /// Look for snow-like voxels when `better_textures` is on
    pub better_textures_snow: bool,
    /// Look for grass-like voxels when `better_textures` is on
    pub better_textures_grass: bool,
    /// Mipmap level of the target renderer; decides cutout layer coalescing
    pub mipmap_level: u8,
    /// Replaces the default smoothable material list when set
    pub smoothable_materials: Option<Vec<Material>>,
    /// Blocks that are smoothable regardless of their material
    pub smoothable_blocks: Vec<BlockId>,
    /// Voxels cached around each chunk on every side
    pub padding: i32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            offset_vertices: false,
            better_textures: false,
            better_textures_snow: true,
            better_textures_grass: true,
            mipmap_level: 4,
            smoothable_materials: None,
            smoothable_blocks: Vec::new(),
            padding: MIN_PADDING,
        }
    }
}

impl MeshConfig {
    /// Parse a configuration from TOML and validate it.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(|err| Error::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| Error::Config(err.to_string()))
    }

    /// Check that the options are usable for a build.
    pub fn validate(&self) -> Result<()> {
        if self.padding < MIN_PADDING {
            return Err(Error::Config(format!(
                "padding {} is smaller than the neighbor search radius {MIN_PADDING}",
                self.padding
            )));
        }
        Ok(())
    }

    /// Whether snow-like voxels are preferred for textures
    #[inline]
    pub const fn prefers_snow(&self) -> bool {
        self.better_textures && self.better_textures_snow
    }

    /// Whether grass-like voxels are preferred for textures
    #[inline]
    pub const fn prefers_grass(&self) -> bool {
        self.better_textures && self.better_textures_grass
    }
}
