/// Incremental structural-support tracking for the voxel grid
///
/// A shadow table holds one `Link` per voxel: the edge direction through
/// which that voxel is connected toward the ground in an implicit
/// spanning forest. The table is built once per map and then maintained
/// purely incrementally on every edit; the whole-grid rebuild never runs
/// on the hot path.
use std::collections::VecDeque;

use glam::IVec3;
use log::{debug, trace};

use crate::voxel::{GridDims, VoxelColor, VoxelGrid};

/// Support state of one voxel.
///
/// `Invalid` marks air or a solid voxel with no path to the ground. A
/// directional value means the support chain continues at the neighbor
/// in that direction; `PosZ` points one layer down toward the ground
/// (z grows downward, z = depth-1 is the ground layer).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Link {
    Invalid = 0,
    Root = 1,
    PosX = 2,
    NegX = 3,
    PosY = 4,
    NegY = 5,
    PosZ = 6,
    NegZ = 7,
}

impl Link {
    /// Cell offset the chain continues through; zero for `Invalid` and
    /// `Root`.
    #[inline]
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Link::PosX => (1, 0, 0),
            Link::NegX => (-1, 0, 0),
            Link::PosY => (0, 1, 0),
            Link::NegY => (0, -1, 0),
            Link::PosZ => (0, 0, 1),
            Link::NegZ => (0, 0, -1),
            Link::Invalid | Link::Root => (0, 0, 0),
        }
    }

    /// The direction pointing back at a voxel from the neighbor its
    /// `offset` reaches. `Invalid` and `Root` map to themselves.
    #[inline]
    pub const fn opposite(self) -> Link {
        match self {
            Link::PosX => Link::NegX,
            Link::NegX => Link::PosX,
            Link::PosY => Link::NegY,
            Link::NegY => Link::PosY,
            Link::PosZ => Link::NegZ,
            Link::NegZ => Link::PosZ,
            other => other,
        }
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        !matches!(self, Link::Invalid)
    }
}

/// The six neighbor directions, paired with the link value a dependent
/// neighbor in that direction would carry.
const DIRECTIONS: [Link; 6] = [
    Link::PosX,
    Link::NegX,
    Link::PosY,
    Link::NegY,
    Link::PosZ,
    Link::NegZ,
];

/// Shadow one-byte-per-voxel table tracking which voxels are connected
/// to the ground.
///
/// The table and the grid it shadows are mutated together through
/// `add_block` / `remove_blocks`; mutating the grid directly through
/// `VoxelGrid::set` leaves the table untouched by design. Exclusive
/// ownership by one logical caller is a documented obligation, not an
/// enforced one.
#[derive(Clone)]
pub struct SupportGraph {
    dims: GridDims,
    links: Vec<Link>,
}

impl SupportGraph {
    /// Create an all-`Invalid` table for a grid of the given dimensions.
    pub fn new(dims: GridDims) -> Self {
        Self {
            dims,
            links: vec![Link::Invalid; dims.voxel_count()],
        }
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.dims.width && y < self.dims.height && z < self.dims.depth);
        (x * self.dims.height + y) * self.dims.depth + z
    }

    /// Link state of one voxel.
    #[inline]
    pub fn link(&self, x: usize, y: usize, z: usize) -> Link {
        self.links[self.index(x, y, z)]
    }

    #[inline]
    fn set_link(&mut self, x: usize, y: usize, z: usize, link: Link) {
        let i = self.index(x, y, z);
        self.links[i] = link;
    }

    #[inline]
    fn is_linked(&self, x: usize, y: usize, z: usize) -> bool {
        self.link(x, y, z).is_valid()
    }

    /// Whether a solid voxel is connected to the ground.
    #[inline]
    pub fn is_supported(&self, x: usize, y: usize, z: usize) -> bool {
        self.is_linked(x, y, z)
    }

    /// Discard the table and recompute it from the grid: solid voxels of
    /// the bottom layer become roots, then a breadth-first flood assigns
    /// every reachable solid voxel the direction back to its discoverer.
    ///
    /// O(solid voxels); used when a grid is adopted. Edits afterwards go
    /// through the incremental paths only.
    pub fn rebuild(&mut self, grid: &VoxelGrid) {
        debug_assert_eq!(self.dims, grid.dims());
        self.links.fill(Link::Invalid);

        let bottom = self.dims.depth - 1;
        let mut queue = VecDeque::new();
        for x in 0..self.dims.width {
            for y in 0..self.dims.height {
                if grid.solid_at(x, y, bottom) {
                    self.set_link(x, y, bottom, Link::Root);
                    queue.push_back((x, y, bottom));
                }
            }
        }

        self.flood_links(grid, &mut queue);
        debug!(
            "support table rebuilt for {}x{}x{} grid ({} solid voxels)",
            self.dims.width,
            self.dims.height,
            self.dims.depth,
            grid.solid_count()
        );
    }

    /// Place one block: mark it solid in the grid, pick its support link
    /// via the insert policy, and if it attached, flood outward to adopt
    /// any neighboring voxels that were cut off until now.
    ///
    /// A block placed with no supported neighbor stays `Invalid`; it is
    /// not reported anywhere, it simply carries no support until an edit
    /// connects it.
    pub fn add_block(&mut self, grid: &mut VoxelGrid, x: usize, y: usize, z: usize, color: VoxelColor) {
        debug_assert_eq!(self.dims, grid.dims());
        grid.set(x, y, z, true, color);

        let link = self.insert_link(x, y, z);
        self.set_link(x, y, z, link);
        if link.is_valid() {
            let mut queue = VecDeque::new();
            queue.push_back((x, y, z));
            self.flood_links(grid, &mut queue);
        }
    }

    /// Destroy a batch of blocks and report which remaining solid voxels
    /// lost their connection to the ground.
    ///
    /// Each cell is cleared in the grid; the dependents whose chain ran
    /// through it are unlinked and become re-anchor candidates. After all
    /// cells are processed the candidates are re-anchored where possible
    /// (each successful re-anchor floods outward, so one recovered voxel
    /// can rescue a whole region). Whatever stays unlinked is returned:
    /// still solid in the grid, structurally disconnected. The caller
    /// clears those and raises its own "blocks fell" notification.
    ///
    /// Out-of-range or already-air cells are skipped.
    pub fn remove_blocks(&mut self, grid: &mut VoxelGrid, cells: &[IVec3]) -> Vec<IVec3> {
        debug_assert_eq!(self.dims, grid.dims());
        let mut candidates: Vec<(usize, usize, usize)> = Vec::new();

        for cell in cells {
            let Some((x, y, z)) = self.to_local(*cell) else {
                continue;
            };
            grid.set(x, y, z, false, VoxelColor::DEFAULT);
            let link = self.link(x, y, z);
            self.set_link(x, y, z, Link::Invalid);
            if link.is_valid() {
                self.unlink_dependents(x, y, z, &mut candidates);
            }
        }

        // Re-anchor pass: candidates that can reach a still-supported
        // neighbor recover, and pull their own dependents back in.
        for &(x, y, z) in &candidates {
            if !grid.solid_at(x, y, z) || self.is_linked(x, y, z) {
                continue;
            }
            let link = self.relink_link(x, y, z);
            if link.is_valid() {
                self.set_link(x, y, z, link);
                let mut queue = VecDeque::new();
                queue.push_back((x, y, z));
                self.flood_links(grid, &mut queue);
            }
        }

        let floating: Vec<IVec3> = candidates
            .iter()
            .filter(|&&(x, y, z)| grid.solid_at(x, y, z) && !self.is_linked(x, y, z))
            .map(|&(x, y, z)| IVec3::new(x as i32, y as i32, z as i32))
            .collect();

        trace!(
            "removed {} cells: {} unlink candidates, {} floating",
            cells.len(),
            candidates.len(),
            floating.len()
        );
        floating
    }

    /// Insert policy: pick the support link for a freshly placed block.
    ///
    /// The ground layer roots unconditionally and a supported voxel one
    /// layer down wins outright. The remaining neighbors are scanned
    /// with sequential overwrite, so the last-checked match wins;
    /// effective priority, highest first: -Z, +Y, -Y, +X, -X. The relink
    /// policy below resolves the same tie differently; the two are kept
    /// separate on purpose because unifying them changes which of
    /// several equally valid support paths wins, and with it the
    /// observable floating sets on symmetric shapes.
    fn insert_link(&self, x: usize, y: usize, z: usize) -> Link {
        if z == self.dims.depth - 1 {
            return Link::Root;
        }
        if self.is_linked(x, y, z + 1) {
            return Link::PosZ;
        }
        let mut link = Link::Invalid;
        if x > 0 && self.is_linked(x - 1, y, z) {
            link = Link::NegX;
        }
        if x + 1 < self.dims.width && self.is_linked(x + 1, y, z) {
            link = Link::PosX;
        }
        if y > 0 && self.is_linked(x, y - 1, z) {
            link = Link::NegY;
        }
        if y + 1 < self.dims.height && self.is_linked(x, y + 1, z) {
            link = Link::PosY;
        }
        if z > 0 && self.is_linked(x, y, z - 1) {
            link = Link::NegZ;
        }
        link
    }

    /// Relink policy: pick the support link for an unlink candidate.
    ///
    /// An else-if chain where the first match wins; priority: ground
    /// layer, then +Z, -X, +X, -Y, +Y, -Z. Deliberately not the same
    /// rule as the insert policy (see `insert_link`).
    fn relink_link(&self, x: usize, y: usize, z: usize) -> Link {
        if z == self.dims.depth - 1 {
            Link::Root
        } else if self.is_linked(x, y, z + 1) {
            Link::PosZ
        } else if x > 0 && self.is_linked(x - 1, y, z) {
            Link::NegX
        } else if x + 1 < self.dims.width && self.is_linked(x + 1, y, z) {
            Link::PosX
        } else if y > 0 && self.is_linked(x, y - 1, z) {
            Link::NegY
        } else if y + 1 < self.dims.height && self.is_linked(x, y + 1, z) {
            Link::PosY
        } else if z > 0 && self.is_linked(x, y, z - 1) {
            Link::NegZ
        } else {
            Link::Invalid
        }
    }

    /// Breadth-first adoption flood: starting from already-linked seed
    /// voxels, pull in every neighboring solid voxel that is `Invalid`,
    /// assigning it the direction back to its discoverer. Voxels whose
    /// link is already valid stop the flood, which bounds the work to
    /// the region whose state actually changes.
    fn flood_links(&mut self, grid: &VoxelGrid, queue: &mut VecDeque<(usize, usize, usize)>) {
        while let Some((x, y, z)) = queue.pop_front() {
            for dir in DIRECTIONS {
                let (dx, dy, dz) = dir.offset();
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                let nz = z as i32 + dz;
                if nx < 0
                    || ny < 0
                    || nz < 0
                    || nx >= self.dims.width as i32
                    || ny >= self.dims.height as i32
                    || nz >= self.dims.depth as i32
                {
                    continue;
                }
                let (nx, ny, nz) = (nx as usize, ny as usize, nz as usize);
                if grid.solid_at(nx, ny, nz) && !self.is_linked(nx, ny, nz) {
                    // The neighbor's chain continues back toward the
                    // voxel that discovered it.
                    self.set_link(nx, ny, nz, dir.opposite());
                    queue.push_back((nx, ny, nz));
                }
            }
        }
    }

    /// Walk the dependent subtree of a removed voxel: every neighbor
    /// whose link points at the current voxel is unlinked, recorded as a
    /// re-anchor candidate and walked in turn.
    fn unlink_dependents(
        &mut self,
        x: usize,
        y: usize,
        z: usize,
        candidates: &mut Vec<(usize, usize, usize)>,
    ) {
        let mut queue = VecDeque::new();
        queue.push_back((x, y, z));
        while let Some((x, y, z)) = queue.pop_front() {
            for dir in DIRECTIONS {
                let (dx, dy, dz) = dir.offset();
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                let nz = z as i32 + dz;
                if nx < 0
                    || ny < 0
                    || nz < 0
                    || nx >= self.dims.width as i32
                    || ny >= self.dims.height as i32
                    || nz >= self.dims.depth as i32
                {
                    continue;
                }
                let (nx, ny, nz) = (nx as usize, ny as usize, nz as usize);
                if self.link(nx, ny, nz) == dir.opposite() {
                    self.set_link(nx, ny, nz, Link::Invalid);
                    candidates.push((nx, ny, nz));
                    queue.push_back((nx, ny, nz));
                }
            }
        }
    }

    #[inline]
    fn to_local(&self, cell: IVec3) -> Option<(usize, usize, usize)> {
        if cell.x < 0
            || cell.y < 0
            || cell.z < 0
            || cell.x >= self.dims.width as i32
            || cell.y >= self.dims.height as i32
            || cell.z >= self.dims.depth as i32
        {
            return None;
        }
        Some((cell.x as usize, cell.y as usize, cell.z as usize))
    }
}
