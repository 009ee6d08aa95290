pub mod support;
/// Voxel terrain core for a destructible-terrain shooter: bounded
/// solid/air grid with per-voxel color, point and ray queries, a legacy
/// column-run map codec, and incrementally maintained ground-support
/// tracking that classifies which voxels float after destruction.
pub mod voxel;
pub mod vxl;

pub use support::{Link, SupportGraph};
pub use voxel::{GridDims, RayHit, VoxelColor, VoxelGrid};
pub use vxl::{load_vxl, read_vxl, write_vxl, VxlError};
