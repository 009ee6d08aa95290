/// Two ray casters over the voxel grid
///
/// `cast_ray` is the integer-stepped walker used for cheap hit tests:
/// endpoints are quantized to 1/1024 voxel and the walk advances through
/// voxel-boundary crossings with integer counters only, so long rays
/// accumulate no floating-point error. `cast_ray_precise` is the float
/// slab-stepping marcher that also reports the sub-voxel hit position
/// and the face normal, for callers that must react to which face was
/// hit.
use glam::{IVec3, Vec3};

use super::VoxelGrid;

/// Sub-voxel resolution of the integer walker.
const SUB_SHIFT: u32 = 10;
const SUB: i64 = 1 << SUB_SHIFT;

/// Result of a precise ray cast.
#[derive(Copy, Clone, Debug)]
pub struct RayHit {
    /// The ray origin was already inside a solid voxel; `position` is the
    /// origin and `normal` is zero.
    pub start_solid: bool,
    /// Sub-voxel position where the ray enters the hit voxel.
    pub position: Vec3,
    /// The solid voxel that was hit.
    pub voxel: IVec3,
    /// Unit normal of the face the ray entered through.
    pub normal: IVec3,
}

#[inline]
fn quantize(v: Vec3) -> [i64; 3] {
    [
        (v.x as f64 * SUB as f64).floor() as i64,
        (v.y as f64 * SUB as f64).floor() as i64,
        (v.z as f64 * SUB as f64).floor() as i64,
    ]
}

#[inline]
fn clamp_cell(c: [i64; 3]) -> (i32, i32, i32) {
    (
        c[0].clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        c[1].clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        c[2].clamp(i32::MIN as i64, i32::MAX as i64) as i32,
    )
}

impl VoxelGrid {
    /// Walk the grid from `origin` along `direction` for at most
    /// `max_length` voxels and return the first voxel that reports solid
    /// under `clip_world` (so the region below the floor counts as
    /// perpetual ground), or `None` for a miss.
    pub fn cast_ray(&self, origin: Vec3, direction: Vec3, max_length: f32) -> Option<IVec3> {
        let dir = direction.normalize_or_zero();
        let end = origin + dir * max_length.max(0.0);

        let p = quantize(origin);
        let q = quantize(end);

        let mut cell = [
            p[0].div_euclid(SUB),
            p[1].div_euclid(SUB),
            p[2].div_euclid(SUB),
        ];
        let end_cell = [
            q[0].div_euclid(SUB),
            q[1].div_euclid(SUB),
            q[2].div_euclid(SUB),
        ];

        let depth = self.depth() as i64;

        // Fast path for the region below the floor: everything down
        // there is ground, no voxel data needs to be touched.
        if cell[2] >= depth && self.in_column_range(cell[0], cell[1]) {
            let (cx, cy, _) = clamp_cell(cell);
            return Some(IVec3::new(cx, cy, cell[2].min(i32::MAX as i64) as i32));
        }

        {
            let (cx, cy, cz) = clamp_cell(cell);
            if self.clip_world(cx, cy, cz) {
                return Some(IVec3::new(cx, cy, cz));
            }
        }

        // Per-axis coordinate deltas in sub-units; an axis with zero
        // delta never steps.
        let delta = [q[0] - p[0], q[1] - p[1], q[2] - p[2]];
        let abs = [delta[0].abs(), delta[1].abs(), delta[2].abs()];
        let step = [delta[0].signum(), delta[1].signum(), delta[2].signum()];

        // Sub-unit distance from the origin to the first boundary
        // crossing on each axis; advancing an axis adds one whole voxel.
        let mut dist = [0i64; 3];
        for a in 0..3 {
            let rem = p[a].rem_euclid(SUB);
            dist[a] = match step[a] {
                1 => SUB - rem,
                -1 => rem,
                _ => 0,
            };
        }

        let total_steps = (end_cell[0] - cell[0]).abs()
            + (end_cell[1] - cell[1]).abs()
            + (end_cell[2] - cell[2]).abs();

        for _ in 0..total_steps {
            // Nearest boundary crossing: smallest dist[a]/abs[a] among
            // the moving axes, compared by cross-multiplication to stay
            // in integers.
            let mut axis = usize::MAX;
            for a in 0..3 {
                if step[a] == 0 {
                    continue;
                }
                if axis == usize::MAX
                    || (dist[a] as i128) * (abs[axis] as i128)
                        < (dist[axis] as i128) * (abs[a] as i128)
                {
                    axis = a;
                }
            }
            if axis == usize::MAX {
                break;
            }

            cell[axis] += step[axis];
            dist[axis] += SUB;

            let (cx, cy, cz) = clamp_cell(cell);
            if self.clip_world(cx, cy, cz) {
                return Some(IVec3::new(cx, cy, cz));
            }
        }

        None
    }

    /// Precise grid traversal: steps the per-axis boundary times and
    /// returns the hit voxel together with the sub-voxel entry position
    /// and face normal. Gives up after `max_steps` empty voxels so a
    /// grazing ray cannot spin forever. Uses plain solidity (no world
    /// boundary conventions): the grid is infinite air outside.
    pub fn cast_ray_precise(&self, origin: Vec3, direction: Vec3, max_steps: u32) -> Option<RayHit> {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }

        let mut cell = IVec3::new(
            origin.x.floor() as i32,
            origin.y.floor() as i32,
            origin.z.floor() as i32,
        );

        if self.is_solid(cell.x, cell.y, cell.z) {
            return Some(RayHit {
                start_solid: true,
                position: origin,
                voxel: cell,
                normal: IVec3::ZERO,
            });
        }

        let step = IVec3::new(
            if dir.x >= 0.0 { 1 } else { -1 },
            if dir.y >= 0.0 { 1 } else { -1 },
            if dir.z >= 0.0 { 1 } else { -1 },
        );

        // Ray-time it takes to cross one voxel on each axis.
        let t_delta = Vec3::new(
            if dir.x.abs() < 1e-10 { f32::MAX } else { (1.0 / dir.x).abs() },
            if dir.y.abs() < 1e-10 { f32::MAX } else { (1.0 / dir.y).abs() },
            if dir.z.abs() < 1e-10 { f32::MAX } else { (1.0 / dir.z).abs() },
        );

        // Ray-time of the first boundary crossing on each axis.
        let mut t_max = Vec3::new(
            if dir.x.abs() < 1e-10 {
                f32::MAX
            } else if dir.x >= 0.0 {
                ((cell.x + 1) as f32 - origin.x) / dir.x
            } else {
                (cell.x as f32 - origin.x) / dir.x
            },
            if dir.y.abs() < 1e-10 {
                f32::MAX
            } else if dir.y >= 0.0 {
                ((cell.y + 1) as f32 - origin.y) / dir.y
            } else {
                (cell.y as f32 - origin.y) / dir.y
            },
            if dir.z.abs() < 1e-10 {
                f32::MAX
            } else if dir.z >= 0.0 {
                ((cell.z + 1) as f32 - origin.z) / dir.z
            } else {
                (cell.z as f32 - origin.z) / dir.z
            },
        );

        for _ in 0..max_steps {
            let t;
            let normal;
            if t_max.x < t_max.y {
                if t_max.x < t_max.z {
                    t = t_max.x;
                    t_max.x += t_delta.x;
                    cell.x += step.x;
                    normal = IVec3::new(-step.x, 0, 0);
                } else {
                    t = t_max.z;
                    t_max.z += t_delta.z;
                    cell.z += step.z;
                    normal = IVec3::new(0, 0, -step.z);
                }
            } else if t_max.y < t_max.z {
                t = t_max.y;
                t_max.y += t_delta.y;
                cell.y += step.y;
                normal = IVec3::new(0, -step.y, 0);
            } else {
                t = t_max.z;
                t_max.z += t_delta.z;
                cell.z += step.z;
                normal = IVec3::new(0, 0, -step.z);
            }

            if self.is_solid(cell.x, cell.y, cell.z) {
                return Some(RayHit {
                    start_solid: false,
                    position: origin + dir * t,
                    voxel: cell,
                    normal,
                });
            }
        }

        None
    }

    #[inline]
    fn in_column_range(&self, x: i64, y: i64) -> bool {
        x >= 0 && x < self.width() as i64 && y >= 0 && y < self.height() as i64
    }
}
