//! World generator binary: writes a grid of sample terrain units to disk.
//!
//! Usage: cargo run --release --bin generate_world -- [OPTIONS]
//!
//! Options:
//!   --grid <N>        Units per side (default: 4)
//!   --unit-size <M>   Unit width and length in meters (default: 500)
//!   --height <H>      Unit vertical size in meters (default: 120)
//!   --res <R>         Heightmap resolution, 2^n + 1 (default: 129)
//!   --seed <SEED>     Random seed (default: 12345)
//!   --scale <SCALE>   Terrain noise scale (default: 150.0)
//!   --trees <N>       Trees per unit (default: 32)
//!   --inactive <N>    Mark every Nth unit inactive (default: 0, none)
//!   --name <NAME>     World name / output directory (default: "terrain")
//!   --jobs <N>        Max parallel unit builds (default: 4)
//!
//! Output structure:
//!   assets/worlds/<name>/
//!     manifest.json     # World name + ordered unit list
//!     unit_1.json
//!     ...

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use glam::Vec3;
use rayon::prelude::*;

use terra_batch::core::{logging, BatchConfig};
use terra_batch::provider::StreamingWorld;
use terra_batch::terrain::{TerrainGenerator, TerrainParams, TerrainUnit, UnitId};

fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let grid = parse_arg::<u32>(&args, "--grid").unwrap_or(4);
    let unit_size = parse_arg::<f32>(&args, "--unit-size").unwrap_or(500.0);
    let height = parse_arg::<f32>(&args, "--height").unwrap_or(120.0);
    let res = parse_arg::<usize>(&args, "--res").unwrap_or(129);
    let seed = parse_arg::<u32>(&args, "--seed").unwrap_or(12345);
    let scale = parse_arg::<f32>(&args, "--scale").unwrap_or(150.0);
    let trees = parse_arg::<usize>(&args, "--trees").unwrap_or(32);
    let inactive_every = parse_arg::<u32>(&args, "--inactive").unwrap_or(0);
    let name = parse_arg::<String>(&args, "--name").unwrap_or_else(|| "terrain".to_string());
    let jobs = parse_arg::<usize>(&args, "--jobs").unwrap_or(4);

    // Limit rayon's thread pool to cap peak memory usage
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build_global()
        .expect("Failed to configure thread pool");

    let output_dir = PathBuf::from(format!("assets/worlds/{}", name));

    println!("=== Terrain World Generator ===");
    println!("World:  {}", name);
    println!("Grid:   {} x {} units of {}m (height {}m)", grid, grid, unit_size, height);
    println!("Res:    {}", res);
    println!("Seed:   {}", seed);
    println!("Jobs:   {} parallel", jobs);
    println!("Output: {}", output_dir.display());
    println!();

    let generator = TerrainGenerator::new(TerrainParams {
        seed,
        scale,
        trees_per_unit: trees,
        ..Default::default()
    });

    let total = (grid * grid) as usize;
    let size = Vec3::new(unit_size, height, unit_size);
    let start = Instant::now();
    let built = AtomicUsize::new(0);

    let mut units: Vec<TerrainUnit> = (0..grid * grid)
        .into_par_iter()
        .map(|i| {
            let id = UnitId(i + 1);
            let position = Vec3::new((i % grid) as f32 * unit_size, 0.0, (i / grid) as f32 * unit_size);
            let unit = generator
                .build_unit(id, position, size, res)
                .expect("Failed to build terrain unit")
                .with_active(inactive_every == 0 || (i + 1) % inactive_every != 0);

            let done = built.fetch_add(1, Ordering::Relaxed) + 1;
            if done % 16 == 0 || done == total {
                eprintln!("  [{}/{}] units built", done, total);
            }
            unit
        })
        .collect();
    units.sort_by_key(|u| u.id);

    let tree_count: usize = units.iter().map(|u| u.tree_count()).sum();
    let inactive = units.iter().filter(|u| !u.active).count();

    std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");
    let world = StreamingWorld::create(&output_dir, &name, units, &BatchConfig::default())
        .expect("Failed to write world");

    let elapsed = start.elapsed();
    println!();
    println!("=== Generation Complete ===");
    println!("Units:  {} ({} inactive) in {:.1}s", world.manifest().units.len(), inactive, elapsed.as_secs_f64());
    println!("Trees:  {}", tree_count);
    println!("Output: {}", world.dir().display());
    println!();
    println!("To edit this world:");
    println!("  cargo run --release --bin mass_edit -- --world {} --list", output_dir.display());
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}
