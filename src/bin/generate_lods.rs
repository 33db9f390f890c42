//! LOD generator binary: synthesizes a noise world and writes its region files.
//!
//! Usage: cargo run --release --bin generate_lods -- [OPTIONS]
//!
//! Options:
//!   --radius <CHUNKS>  Chunks generated around the origin (default: 32)
//!   --seed <SEED>      Random seed (default: 12345)
//!   --name <NAME>      World name (default: "terrain")
//!   --scale <SCALE>    Terrain noise scale (default: 150.0)
//!   --height <H>       Terrain height scale (default: 80.0)
//!   --jobs <N>         Parallel column builds and generation tasks (default: 4)
//!   --out <DIR>        Save root (default: "lod_saves")
//!   --config <PATH>    LodConfig JSON to start from
//!
//! Output structure:
//!   <out>/<name>/data/
//!     lod.0.0.txt
//!     ...

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rayon::prelude::*;

use terralod::core::{ChunkPos, DimensionId, IVec3, Result};
use terralod::lod::column::{CHUNK_WIDTH, ColorSource, ColumnVolume, HostWorld};
use terralod::streaming::{GenerationPipeline, LodConfig, LodContext, TaskOutcome, wait_all};
use terralod::voxel::{Voxel, flags};

const WORLD_HEIGHT: usize = 128;
const SEA_LEVEL: usize = 24;

const STONE: u16 = 1;
const DIRT: u16 = 2;
const GRASS: u16 = 3;
const SAND: u16 = 4;
const WATER: u16 = 5;

/// Fractal noise heightmap standing in for a live host world
struct NoiseWorld {
    name: String,
    noise: Fbm<Perlin>,
    scale: f32,
    height_scale: f32,
}

impl NoiseWorld {
    fn new(name: String, seed: u32, scale: f32, height_scale: f32) -> Self {
        let noise = Fbm::<Perlin>::new(seed)
            .set_octaves(5)
            .set_persistence(0.5)
            .set_lacunarity(2.0);
        Self { name, noise, scale, height_scale }
    }

    /// Surface height at a world column
    fn height_at(&self, x: i32, z: i32) -> usize {
        let nx = (x as f32 / self.scale) as f64;
        let nz = (z as f32 / self.scale) as f64;
        let normalized = (self.noise.get([nx, nz]) + 1.0) / 2.0;
        let height = (normalized * self.height_scale as f64) as usize;
        height.clamp(1, WORLD_HEIGHT - 1)
    }

    fn column(&self, pos: ChunkPos) -> ColumnVolume {
        let mut column = ColumnVolume::empty(pos, WORLD_HEIGHT / CHUNK_WIDTH);
        for lz in 0..CHUNK_WIDTH {
            for lx in 0..CHUNK_WIDTH {
                let world = column.world_pos(lx, 0, lz);
                let surface = self.height_at(world.x, world.z);
                for y in 0..=surface {
                    let block = if y == surface {
                        if surface <= SEA_LEVEL + 1 { SAND } else { GRASS }
                    } else if y + 4 > surface {
                        DIRT
                    } else {
                        STONE
                    };
                    column.set(lx, y, lz, Voxel::solid(block));
                }
                for y in surface + 1..=SEA_LEVEL {
                    column.set(lx, y, lz, Voxel::solid(WATER).with_flags(flags::TRANSPARENT));
                }
            }
        }
        column
    }
}

impl ColorSource for NoiseWorld {
    fn face_color(&self, voxel: Voxel, _pos: IVec3) -> u32 {
        match voxel.block_id {
            STONE => 0x7d7d7d,
            DIRT => 0x866043,
            GRASS => 0x5b8c32,
            SAND => 0xdbd3a0,
            WATER => 0x3f76e4,
            _ => 0,
        }
    }
}

impl HostWorld for NoiseWorld {
    fn world_id(&self) -> Option<String> {
        Some(self.name.clone())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let args: Vec<String> = std::env::args().collect();
    let radius = parse_i32_arg(&args, "--radius").unwrap_or(32).max(0);
    let seed = parse_u32_arg(&args, "--seed").unwrap_or(12345);
    let name = parse_str_arg(&args, "--name").unwrap_or_else(|| "terrain".to_string());
    let scale = parse_f32_arg(&args, "--scale").unwrap_or(150.0);
    let height_scale = parse_f32_arg(&args, "--height").unwrap_or(80.0);
    let jobs = parse_usize_arg(&args, "--jobs").unwrap_or(4).max(1);
    let out = parse_str_arg(&args, "--out").unwrap_or_else(|| "lod_saves".to_string());

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => LodConfig::load_sync(&PathBuf::from(path))?,
        None => LodConfig::default(),
    };
    config.save_root = Some(PathBuf::from(&out));
    config.generation_workers = jobs;

    // The window has to hold every generated region
    let span = (radius as usize * 2 + 1).div_ceil(config.region_size) + 2;
    config.window_width = config.window_width.max(span);

    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build_global()
        .map_err(|e| terralod::core::Error::Runtime(e.to_string()))?;

    println!("=== Terralod LOD Generator ===");
    println!("World:  {}", name);
    println!("Area:   {} x {} chunks", radius * 2 + 1, radius * 2 + 1);
    println!("Seed:   {}", seed);
    println!("Scale:  {}, Height: {}", scale, height_scale);
    println!("Jobs:   {} parallel", jobs);
    println!("Window: {} regions of {} chunks", config.window_width, config.region_size);
    println!("Output: {}", PathBuf::from(&out).join(&name).display());
    println!();

    let world = Arc::new(NoiseWorld::new(name.clone(), seed, scale, height_scale));
    let context = Arc::new(LodContext::new(config)?);
    context.ensure_world(&name);
    let mut pipeline = GenerationPipeline::from_context(context.clone(), world.clone())?;

    let start = Instant::now();
    let mut inserted = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    // One row of columns at a time keeps voxel memory bounded
    for x in -radius..=radius {
        let columns: Vec<ColumnVolume> = (-radius..=radius)
            .into_par_iter()
            .map(|z| world.column(ChunkPos::new(x, z)))
            .collect();

        for column in columns {
            pipeline.submit(column, DimensionId::OVERWORLD);
        }

        for result in pipeline.wait_all() {
            match result.outcome {
                TaskOutcome::Inserted => inserted += 1,
                TaskOutcome::Failed(reason) => {
                    log::warn!("Chunk ({}, {}) failed: {}", result.pos.x, result.pos.z, reason);
                    failed += 1;
                }
                _ => skipped += 1,
            }
        }

        let done = (x + radius + 1) as usize;
        let rows = (radius * 2 + 1) as usize;
        if done % 8 == 0 || done == rows {
            let elapsed = start.elapsed().as_secs_f64();
            eprintln!("  [{}/{}] rows, {:.0} chunks/sec", done, rows, inserted as f64 / elapsed);
        }
    }

    let report = wait_all(context.save_all())?;
    let elapsed = start.elapsed();

    println!();
    println!("=== Generation Complete ===");
    println!("Records: {} inserted, {} skipped, {} failed", inserted, skipped, failed);
    println!("Regions: {} written, {} failed", report.written, report.failed.len());
    println!("Time:    {:.1}s", elapsed.as_secs_f64());

    Ok(())
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_i32_arg(args: &[String], flag: &str) -> Option<i32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
