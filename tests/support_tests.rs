/// Integration tests for incremental support tracking
/// These walk the canonical edit scenarios: anchoring at the ground
/// layer, stacking, stranding a stack by destroying its floor, and
/// re-anchoring a bridge through its surviving column.
use glam::IVec3;
use voxel_terrain::{GridDims, Link, SupportGraph, VoxelColor, VoxelGrid};

const C: VoxelColor = VoxelColor::DEFAULT;

fn pair(w: usize, h: usize, d: usize) -> (VoxelGrid, SupportGraph) {
    let dims = GridDims::new(w, h, d);
    (VoxelGrid::new(dims), SupportGraph::new(dims))
}

/// Follow the directional links from a voxel and return the number of
/// steps taken to reach a Root, or None if the chain dangles or runs
/// past `limit`.
fn chain_length(
    graph: &SupportGraph,
    start: (usize, usize, usize),
    limit: usize,
) -> Option<usize> {
    let (mut x, mut y, mut z) = start;
    for steps in 0..=limit {
        match graph.link(x, y, z) {
            Link::Root => return Some(steps),
            Link::Invalid => return None,
            dir => {
                let (dx, dy, dz) = dir.offset();
                x = (x as i32 + dx) as usize;
                y = (y as i32 + dy) as usize;
                z = (z as i32 + dz) as usize;
            }
        }
    }
    None
}

#[test]
fn test_add_on_ground_layer_is_root() {
    // 4x4x4 empty grid; a block on the bottom layer anchors directly.
    let (mut grid, mut graph) = pair(4, 4, 4);
    graph.add_block(&mut grid, 0, 0, 3, C);
    assert_eq!(graph.link(0, 0, 3), Link::Root);
    assert!(graph.is_supported(0, 0, 3));
}

#[test]
fn test_stacked_block_links_to_the_one_below() {
    let (mut grid, mut graph) = pair(4, 4, 4);
    graph.add_block(&mut grid, 0, 0, 3, C);
    graph.add_block(&mut grid, 0, 0, 2, C);
    assert_eq!(graph.link(0, 0, 2), Link::PosZ);
    assert_eq!(chain_length(&graph, (0, 0, 2), 4), Some(1));
}

#[test]
fn test_removing_floor_strands_the_stack() {
    let (mut grid, mut graph) = pair(4, 4, 4);
    graph.add_block(&mut grid, 0, 0, 3, C);
    graph.add_block(&mut grid, 0, 0, 2, C);

    let floating = graph.remove_blocks(&mut grid, &[IVec3::new(0, 0, 3)]);
    assert_eq!(floating, vec![IVec3::new(0, 0, 2)]);

    // The stranded block is still solid; clearing it is the caller's
    // job, after which the grid is consistent again.
    assert!(grid.solid_at(0, 0, 2));
    assert!(!graph.is_supported(0, 0, 2));
    assert!(!grid.solid_at(0, 0, 3));
}

#[test]
fn test_bridge_relinks_through_surviving_column() {
    // Two pillars on the ground joined by a horizontal bridge. Knocking
    // the floor voxel out from under one pillar must re-anchor the whole
    // span through the other pillar, not report it floating.
    let (mut grid, mut graph) = pair(8, 4, 6);
    for z in (2..6).rev() {
        graph.add_block(&mut grid, 1, 1, z, C);
        graph.add_block(&mut grid, 5, 1, z, C);
    }
    for x in 2..5 {
        graph.add_block(&mut grid, x, 1, 2, C);
    }

    let floating = graph.remove_blocks(&mut grid, &[IVec3::new(1, 1, 5)]);
    assert!(
        floating.is_empty(),
        "bridge should hang from the surviving pillar, got {floating:?}"
    );

    // Everything that was left is still connected, within the grid
    // perimeter bound.
    let bound = 8 + 4 + 6;
    for x in 1..6 {
        assert!(chain_length(&graph, (x, 1, 2), bound).is_some());
    }
    for z in 2..5 {
        assert!(chain_length(&graph, (1, 1, z), bound).is_some());
        assert!(chain_length(&graph, (5, 1, z), bound).is_some());
    }
}

#[test]
fn test_floor_voxel_is_never_reported_floating() {
    let (mut grid, mut graph) = pair(4, 4, 4);
    for z in (0..4).rev() {
        graph.add_block(&mut grid, 0, 0, z, C);
    }

    // Cutting the pillar in the middle strands only the blocks above
    // the cut; the rooted base never appears in the floating set.
    let floating = graph.remove_blocks(&mut grid, &[IVec3::new(0, 0, 2)]);
    let mut floating = floating;
    floating.sort_by_key(|c| (c.x, c.y, c.z));
    assert_eq!(floating, vec![IVec3::new(0, 0, 0), IVec3::new(0, 0, 1)]);
    assert!(graph.is_supported(0, 0, 3));
    assert_eq!(graph.link(0, 0, 3), Link::Root);
}

#[test]
fn test_insert_flood_adopts_cutoff_neighbors() {
    // A block placed mid-air carries no support. Placing a grounded
    // block next to it pulls it in through the adoption flood.
    let (mut grid, mut graph) = pair(4, 4, 4);
    graph.add_block(&mut grid, 2, 2, 2, C);
    assert!(!graph.is_supported(2, 2, 2));

    graph.add_block(&mut grid, 2, 2, 3, C);
    assert_eq!(graph.link(2, 2, 3), Link::Root);
    assert!(graph.is_supported(2, 2, 2));
    assert_eq!(graph.link(2, 2, 2), Link::PosZ);
}

#[test]
fn test_batch_removal_of_connected_run() {
    // Removing several cells of one chain in a single call: the
    // dependents behind every removed cell end up floating exactly once.
    let (mut grid, mut graph) = pair(8, 4, 4);
    graph.add_block(&mut grid, 0, 0, 3, C);
    for x in 0..6 {
        graph.add_block(&mut grid, x, 0, 2, C);
    }

    let floating = graph.remove_blocks(
        &mut grid,
        &[IVec3::new(1, 0, 2), IVec3::new(3, 0, 2)],
    );
    let mut floating = floating;
    floating.sort_by_key(|c| (c.x, c.y, c.z));
    assert_eq!(
        floating,
        vec![
            IVec3::new(2, 0, 2),
            IVec3::new(4, 0, 2),
            IVec3::new(5, 0, 2)
        ]
    );
    assert!(graph.is_supported(0, 0, 2));
}

#[test]
fn test_rebuild_matches_incremental_classification() {
    // The ground-truth check on a small handmade scene: after clearing
    // the reported floating voxels, a from-scratch rebuild agrees with
    // the incrementally maintained table about who is supported.
    let (mut grid, mut graph) = pair(6, 6, 6);
    for x in 0..6 {
        for y in 0..6 {
            graph.add_block(&mut grid, x, y, 5, C);
        }
    }
    for z in (1..5).rev() {
        graph.add_block(&mut grid, 2, 2, z, C);
    }
    for x in 2..5 {
        graph.add_block(&mut grid, x, 2, 1, C);
    }

    let floating = graph.remove_blocks(
        &mut grid,
        &[IVec3::new(2, 2, 3), IVec3::new(2, 2, 2)],
    );
    for cell in &floating {
        grid.set(cell.x as usize, cell.y as usize, cell.z as usize, false, C);
    }

    let mut fresh = SupportGraph::new(grid.dims());
    fresh.rebuild(&grid);
    for x in 0..6 {
        for y in 0..6 {
            for z in 0..6 {
                assert_eq!(
                    graph.is_supported(x, y, z),
                    fresh.is_supported(x, y, z),
                    "support mismatch at ({x}, {y}, {z})"
                );
            }
        }
    }
}

#[test]
fn test_chains_stay_short_on_open_terrain() {
    // On terrain without mazes every chain reaches a Root well within
    // the perimeter bound W+H+D.
    let (mut grid, mut graph) = pair(8, 8, 8);
    for x in 0..8 {
        for y in 0..8 {
            graph.add_block(&mut grid, x, y, 7, C);
        }
    }
    for z in (1..7).rev() {
        graph.add_block(&mut grid, 4, 4, z, C);
    }

    let bound = 8 + 8 + 8;
    for x in 0..8 {
        for y in 0..8 {
            let len = chain_length(&graph, (x, y, 7), bound);
            assert!(len.is_some() && len.unwrap() <= bound);
        }
    }
    for z in 1..7 {
        let len = chain_length(&graph, (4, 4, z), bound);
        assert!(len.is_some() && len.unwrap() <= bound);
    }
}
