/// Benchmark suite for support-table maintenance: the one-time rebuild
/// against incremental edit costs on a full-size map
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::IVec3;
use noise::{NoiseFn, Perlin};
use voxel_terrain::{GridDims, SupportGraph, VoxelColor, VoxelGrid};

fn generate_map(dims: GridDims) -> VoxelGrid {
    let mut grid = VoxelGrid::new(dims);
    let perlin = Perlin::new(99);
    for x in 0..dims.width {
        for y in 0..dims.height {
            let n = perlin.get([x as f64 * 0.02, y as f64 * 0.02]);
            let surface = ((dims.depth as f64 * 0.5 + n * 8.0) as usize).clamp(4, dims.depth - 2);
            for z in surface..dims.depth {
                grid.set(x, y, z, true, VoxelColor::DEFAULT);
            }
        }
    }
    grid
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("support_rebuild");
    group.sample_size(20);
    for &size in &[64usize, 128, 256] {
        let dims = GridDims::new(size, size, 64);
        let grid = generate_map(dims);
        group.bench_with_input(BenchmarkId::from_parameter(size), &grid, |b, grid| {
            let mut graph = SupportGraph::new(dims);
            b.iter(|| {
                graph.rebuild(black_box(grid));
                black_box(graph.is_supported(0, 0, dims.depth - 1))
            })
        });
    }
    group.finish();
}

/// Steady-state edit cycle: blast a sphere out and place the same blocks
/// back, so every iteration sees the same terrain.
fn bench_edit_cycle(c: &mut Criterion) {
    let dims = GridDims::new(128, 128, 64);
    let grid = generate_map(dims);
    let mut graph = SupportGraph::new(dims);
    graph.rebuild(&grid);

    let mut group = c.benchmark_group("support_edit_cycle");
    for &radius in &[1i32, 2, 4] {
        let center = IVec3::new(64, 64, 40);
        let mut batch = Vec::new();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                for dz in -radius..=radius {
                    if dx * dx + dy * dy + dz * dz <= radius * radius {
                        let c = center + IVec3::new(dx, dy, dz);
                        if grid.is_solid(c.x, c.y, c.z) {
                            batch.push(c);
                        }
                    }
                }
            }
        }

        let mut grid = grid.clone();
        let mut graph = graph.clone();
        group.bench_with_input(BenchmarkId::from_parameter(radius), &batch, |b, batch| {
            b.iter(|| {
                let floating = graph.remove_blocks(&mut grid, batch);
                black_box(&floating);
                for cell in batch {
                    graph.add_block(
                        &mut grid,
                        cell.x as usize,
                        cell.y as usize,
                        cell.z as usize,
                        VoxelColor::DEFAULT,
                    );
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rebuild, bench_edit_cycle);
criterion_main!(benches);
