//! isomesh meshing benchmark
//!
//! Generates noise terrain, meshes a square region of chunks on the rayon
//! pool several times, and logs build timing, mesh statistics, and pool
//! usage.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -p isomesh-benchmark -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `-c, --config <FILE>`: Mesher configuration (TOML)
//! - `-s, --seed <N>`: World generation seed (default: 42)
//! - `-r, --radius <N>`: Horizontal chunk radius around the origin (default: 4)
//! - `--layers <LOW:HIGH>`: Vertical chunk layers, inclusive (default: 0:4)
//! - `-t, --threads <N>`: Worker threads, 0 for one per core (default: 0)
//! - `-p, --passes <N>`: Times the region is meshed (default: 3)
//! - `-h, --help`: Print help message
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod args;

use std::time::Instant;

use anyhow::Context;
use isomesh_core::math::Aabb;
use isomesh_core::ChunkPos;
use isomesh_mesh::{ArenaCounters, MeshBuilder, MeshConfig, MeshStats};
use isomesh_world::{AtlasTextures, MeshStore, TerrainWorld};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::args::{print_help, Options};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = Options::from_args()?;
    if options.help {
        print_help();
        return Ok(());
    }

    let config = match &options.config {
        Some(path) => MeshConfig::load(path)
            .with_context(|| format!("failed to load mesher config {}", path.display()))?,
        None => MeshConfig::default(),
    };
    info!(?config, "mesher configuration");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .thread_name(|i| format!("mesh-worker-{i}"))
        .build()
        .context("failed to build worker pool")?;
    info!(threads = pool.current_num_threads(), "worker pool ready");

    let world = TerrainWorld::with_seed(options.seed);
    let textures = AtlasTextures::default();
    let builder = MeshBuilder::new(config);
    let store = MeshStore::new();
    let counters = ArenaCounters::new();
    let chunks = region(options.radius, options.layers);

    let start = Instant::now();
    let columns = pool.install(|| world.prefetch_columns(&chunks, 1));
    info!(
        columns,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "terrain generated"
    );

    for pass in 1..=options.passes {
        let start = Instant::now();
        let report =
            pool.install(|| store.rebuild(&builder, &world, &textures, &chunks, &counters));
        let elapsed = start.elapsed();
        info!(
            pass,
            chunks = chunks.len(),
            triangles = report.triangles,
            failed = report.failed,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            per_chunk_us = elapsed.as_secs_f64() * 1e6 / chunks.len() as f64,
            "pass finished"
        );
    }

    let mut totals = MeshStats::default();
    let mut bounds = Aabb::EMPTY;
    for chunk in &chunks {
        if let Some(mesh) = store.get(*chunk) {
            totals += *mesh.stats();
            bounds = bounds.merge(mesh.bounds());
        }
    }
    info!(
        cells = totals.cells,
        surface_cells = totals.surface_cells,
        triangles = totals.triangles,
        vertices = totals.vertices,
        unresolved_cells = totals.unresolved_cells,
        better_texture_cells = totals.better_texture_cells,
        mesh_bytes = store.memory_usage(),
        "mesh statistics"
    );
    if !bounds.is_empty() {
        info!(min = %bounds.min, max = %bounds.max, "surface bounds");
    }

    for (kind, stats) in counters.snapshot() {
        info!(
            kind,
            allocations = stats.allocations,
            reuses = stats.reuses,
            live = stats.live,
            peak = stats.peak,
            "pool usage"
        );
    }

    Ok(())
}

/// Chunks within `radius` of the origin column, over the given layers.
fn region(radius: i32, (low, high): (i32, i32)) -> Vec<ChunkPos> {
    let mut chunks = Vec::new();
    for y in low..=high {
        for z in -radius..=radius {
            for x in -radius..=radius {
                chunks.push(ChunkPos::new(x, y, z));
            }
        }
    }
    chunks
}
