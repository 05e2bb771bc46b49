//! Core voxel types.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_LIGHT;

/// Unique identifier for a block type.
///
/// Block ID 0 is reserved for air (empty space).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct BlockId(pub u16);

impl BlockId {
    /// Air block (empty space)
    pub const AIR: Self = Self(0);
    /// Stone block
    pub const STONE: Self = Self(1);
    /// Dirt block
    pub const DIRT: Self = Self(2);
    /// Grass block
    pub const GRASS: Self = Self(3);
    /// Snow layer (partial height)
    pub const SNOW_LAYER: Self = Self(4);
    /// Full snow block
    pub const SNOW_BLOCK: Self = Self(5);
    /// Sand block
    pub const SAND: Self = Self(6);
    /// Gravel block
    pub const GRAVEL: Self = Self(7);
    /// Clay block
    pub const CLAY: Self = Self(8);
    /// Water
    pub const WATER: Self = Self(9);
    /// Lava
    pub const LAVA: Self = Self(10);
    /// Tree log block
    pub const LOG: Self = Self(11);
    /// Wooden planks
    pub const PLANKS: Self = Self(12);
    /// Tree leaves block
    pub const LEAVES: Self = Self(13);
    /// Tall grass plant
    pub const TALL_GRASS: Self = Self(14);
    /// Ice block
    pub const ICE: Self = Self(15);
    /// Packed ice block
    pub const PACKED_ICE: Self = Self(16);
    /// Bedrock; always tie-broken towards solid, smoothed or not
    pub const BEDROCK: Self = Self(17);
    /// Glass block
    pub const GLASS: Self = Self(18);
    /// Podzol block
    pub const PODZOL: Self = Self(19);
    /// Cactus block
    pub const CACTUS: Self = Self(20);
    /// Pumpkin block
    pub const PUMPKIN: Self = Self(21);
    /// Iron block
    pub const IRON_BLOCK: Self = Self(22);
    /// Torch
    pub const TORCH: Self = Self(23);
    /// Cobweb
    pub const COBWEB: Self = Self(24);
    /// Wool block
    pub const WOOL: Self = Self(25);
    /// Cobblestone block
    pub const COBBLESTONE: Self = Self(26);

    /// Returns true if this block is air (empty)
    #[inline]
    pub const fn is_air(self) -> bool {
        self.0 == 0
    }

    /// Returns true if this block is solid (not air)
    #[inline]
    pub const fn is_solid(self) -> bool {
        self.0 != 0
    }
}

/// Physical material category of a voxel.
///
/// The mesher decides smoothability per material, so every block carries one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Material {
    /// Empty space
    #[default]
    Air,
    /// Grass-covered earth
    Grass,
    /// Dirt, gravel and similar loose earth
    Ground,
    /// Logs and planks
    Wood,
    /// Stone-like solids
    Rock,
    /// Metal blocks
    Iron,
    /// Anvils
    Anvil,
    /// Water
    Water,
    /// Lava
    Lava,
    /// Foliage
    Leaves,
    /// Small plants and bushes
    Plants,
    /// Climbing vines
    Vine,
    /// Sponges
    Sponge,
    /// Wool and cloth
    Cloth,
    /// Fire
    Fire,
    /// Sand
    Sand,
    /// Redstone-like circuitry
    Circuits,
    /// Carpets
    Carpet,
    /// Glass
    Glass,
    /// Explosives
    Tnt,
    /// Coral
    Coral,
    /// Ice
    Ice,
    /// Packed ice
    PackedIce,
    /// Snow layers
    Snow,
    /// Full snow blocks
    CraftedSnow,
    /// Cactus
    Cactus,
    /// Clay
    Clay,
    /// Pumpkins and melons
    Gourd,
    /// Dragon egg
    DragonEgg,
    /// Portals
    Portal,
    /// Cake
    Cake,
    /// Cobwebs
    Web,
}

impl Material {
    /// Every material, in discriminant order.
    pub const ALL: [Self; 32] = [
        Self::Air,
        Self::Grass,
        Self::Ground,
        Self::Wood,
        Self::Rock,
        Self::Iron,
        Self::Anvil,
        Self::Water,
        Self::Lava,
        Self::Leaves,
        Self::Plants,
        Self::Vine,
        Self::Sponge,
        Self::Cloth,
        Self::Fire,
        Self::Sand,
        Self::Circuits,
        Self::Carpet,
        Self::Glass,
        Self::Tnt,
        Self::Coral,
        Self::Ice,
        Self::PackedIce,
        Self::Snow,
        Self::CraftedSnow,
        Self::Cactus,
        Self::Clay,
        Self::Gourd,
        Self::DragonEgg,
        Self::Portal,
        Self::Cake,
        Self::Web,
    ];

    /// Single-bit mask for this material, for compact material sets.
    #[inline]
    pub const fn bit(self) -> u64 {
        1 << self as u8
    }
}

/// A single voxel state: block type, material, and metadata.
///
/// Metadata layout:
/// - Bits 0-4: occupied height in sixteenths of a block (0 means full height)
/// - Bit 5: snowy variant (grass or podzol with snow on top)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelState {
    /// The block type
    pub block_id: BlockId,
    /// Material category
    pub material: Material,
    /// Additional metadata (height, snowy flag)
    pub metadata: u16,
}

impl VoxelState {
    const HEIGHT_MASK: u16 = 0x1F;
    const SNOWY_BIT: u16 = 1 << 5;

    /// Air voxel
    pub const AIR: Self = Self::new(BlockId::AIR, Material::Air);
    /// Stone
    pub const STONE: Self = Self::new(BlockId::STONE, Material::Rock);
    /// Cobblestone
    pub const COBBLESTONE: Self = Self::new(BlockId::COBBLESTONE, Material::Rock);
    /// Dirt
    pub const DIRT: Self = Self::new(BlockId::DIRT, Material::Ground);
    /// Gravel
    pub const GRAVEL: Self = Self::new(BlockId::GRAVEL, Material::Ground);
    /// Grass block
    pub const GRASS: Self = Self::new(BlockId::GRASS, Material::Grass);
    /// Grass block with snow on top
    pub const SNOWY_GRASS: Self = Self::GRASS.with_snowy(true);
    /// Podzol
    pub const PODZOL: Self = Self::new(BlockId::PODZOL, Material::Ground);
    /// Podzol with snow on top
    pub const SNOWY_PODZOL: Self = Self::PODZOL.with_snowy(true);
    /// A single snow layer, the default snow layer state
    pub const SNOW_LAYER: Self = Self::snow_layers(1);
    /// Full snow block
    pub const SNOW_BLOCK: Self = Self::new(BlockId::SNOW_BLOCK, Material::CraftedSnow);
    /// Sand
    pub const SAND: Self = Self::new(BlockId::SAND, Material::Sand);
    /// Clay
    pub const CLAY: Self = Self::new(BlockId::CLAY, Material::Clay);
    /// Water
    pub const WATER: Self = Self::new(BlockId::WATER, Material::Water);
    /// Lava
    pub const LAVA: Self = Self::new(BlockId::LAVA, Material::Lava);
    /// Log
    pub const LOG: Self = Self::new(BlockId::LOG, Material::Wood);
    /// Planks
    pub const PLANKS: Self = Self::new(BlockId::PLANKS, Material::Wood);
    /// Leaves
    pub const LEAVES: Self = Self::new(BlockId::LEAVES, Material::Leaves);
    /// Tall grass
    pub const TALL_GRASS: Self = Self::new(BlockId::TALL_GRASS, Material::Plants);
    /// Ice
    pub const ICE: Self = Self::new(BlockId::ICE, Material::Ice);
    /// Packed ice
    pub const PACKED_ICE: Self = Self::new(BlockId::PACKED_ICE, Material::PackedIce);
    /// Bedrock
    pub const BEDROCK: Self = Self::new(BlockId::BEDROCK, Material::Rock);
    /// Glass
    pub const GLASS: Self = Self::new(BlockId::GLASS, Material::Glass);
    /// Cactus
    pub const CACTUS: Self = Self::new(BlockId::CACTUS, Material::Cactus);
    /// Pumpkin
    pub const PUMPKIN: Self = Self::new(BlockId::PUMPKIN, Material::Gourd);
    /// Iron block
    pub const IRON_BLOCK: Self = Self::new(BlockId::IRON_BLOCK, Material::Iron);
    /// Torch
    pub const TORCH: Self = Self::new(BlockId::TORCH, Material::Circuits);
    /// Cobweb
    pub const COBWEB: Self = Self::new(BlockId::COBWEB, Material::Web);
    /// Wool
    pub const WOOL: Self = Self::new(BlockId::WOOL, Material::Cloth);

    /// Create a full-height voxel state with no metadata.
    #[inline]
    pub const fn new(block_id: BlockId, material: Material) -> Self {
        Self {
            block_id,
            material,
            metadata: 0,
        }
    }

    /// Create a snow layer state with `layers` eighths of a block (clamped to 1..=8).
    #[inline]
    pub const fn snow_layers(layers: u8) -> Self {
        let layers = if layers == 0 {
            1
        } else if layers > 8 {
            8
        } else {
            layers
        };
        Self::new(BlockId::SNOW_LAYER, Material::Snow).with_height_sixteenths(layers * 2)
    }

    /// Return a copy with the occupied height set in sixteenths (16 or 0 = full).
    #[inline]
    pub const fn with_height_sixteenths(self, sixteenths: u8) -> Self {
        let stored = if sixteenths >= 16 { 0 } else { sixteenths as u16 };
        Self {
            metadata: (self.metadata & !Self::HEIGHT_MASK) | stored,
            ..self
        }
    }

    /// Return a copy with the snowy flag set or cleared.
    #[inline]
    pub const fn with_snowy(self, snowy: bool) -> Self {
        let metadata = if snowy {
            self.metadata | Self::SNOWY_BIT
        } else {
            self.metadata & !Self::SNOWY_BIT
        };
        Self { metadata, ..self }
    }

    /// Occupied height as a fraction of a full block, in `(0, 1]`.
    #[inline]
    pub fn height(&self) -> f32 {
        match self.metadata & Self::HEIGHT_MASK {
            0 => 1.0,
            sixteenths => f32::from(sixteenths) / 16.0,
        }
    }

    /// Returns true if the snowy variant flag is set
    #[inline]
    pub const fn is_snowy(&self) -> bool {
        self.metadata & Self::SNOWY_BIT != 0
    }

    /// Returns true if this voxel is air
    #[inline]
    pub const fn is_air(&self) -> bool {
        self.block_id.is_air()
    }

    /// Returns true if this voxel is solid
    #[inline]
    pub const fn is_solid(&self) -> bool {
        self.block_id.is_solid()
    }
}

/// Two light channels (sky and block) packed into one integer.
///
/// The sky channel lives in the upper 16 bits and the block channel in the
/// lower 16 bits.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct PackedLight(pub u32);

impl PackedLight {
    /// Full sky light, no block light.
    pub const FULL_SKY: Self = Self::new(MAX_LIGHT, 0);
    /// Complete darkness.
    pub const DARK: Self = Self(0);

    /// Pack a sky and block light level.
    #[inline]
    pub const fn new(sky: u8, block: u8) -> Self {
        Self(((sky as u32) << 16) | block as u32)
    }

    /// Sky light channel
    #[inline]
    pub const fn sky(self) -> u16 {
        ((self.0 >> 16) & 0xFFFF) as u16
    }

    /// Block light channel
    #[inline]
    pub const fn block(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}
