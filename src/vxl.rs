/// Legacy column-run map codec
///
/// The stream carries no header: dimensions are caller-supplied and the
/// columns follow in x-major order. Every column is a run of records
/// `(chunk_count:u8, top_start:u8, top_end:u8, air_start:u8)` followed by
/// the color words of the runs it describes; a zero chunk count marks the
/// last record of a column. Columns start fully solid and records carve
/// the air runs out; only surface voxels carry color words, interior
/// solids keep the default fill.
use std::io::Read;

use log::debug;

use crate::voxel::{GridDims, VoxelColor, VoxelGrid};

/// Parse failure. The grid under construction is discarded; no partially
/// built grid ever reaches the caller.
#[derive(Debug)]
pub enum VxlError {
    Io(std::io::Error),
    /// The stream ended inside a record of the given column.
    UnexpectedEof {
        column: (usize, usize),
        offset: usize,
    },
    /// A record describes spans that cannot exist in this column.
    InconsistentSpan {
        column: (usize, usize),
        offset: usize,
        detail: &'static str,
    },
    /// Bytes remain after the last column was terminated.
    TrailingData {
        consumed: usize,
        len: usize,
    },
}

impl std::fmt::Display for VxlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VxlError::Io(e) => write!(f, "map stream read failed: {e}"),
            VxlError::UnexpectedEof { column, offset } => write!(
                f,
                "map stream truncated at byte {} inside column ({}, {})",
                offset, column.0, column.1
            ),
            VxlError::InconsistentSpan {
                column,
                offset,
                detail,
            } => write!(
                f,
                "inconsistent span record at byte {} in column ({}, {}): {}",
                offset, column.0, column.1, detail
            ),
            VxlError::TrailingData { consumed, len } => write!(
                f,
                "{} trailing bytes after the last column ({} of {} consumed)",
                len - consumed,
                consumed,
                len
            ),
        }
    }
}

impl std::error::Error for VxlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VxlError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for VxlError {
    fn from(e: std::io::Error) -> Self {
        VxlError::Io(e)
    }
}

/// Read a whole map stream and parse it. Convenience wrapper over
/// `load_vxl` for `Read` sources.
pub fn read_vxl<R: Read>(mut reader: R, dims: GridDims) -> Result<VoxelGrid, VxlError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    load_vxl(&bytes, dims)
}

/// Parse a column-run map image into a grid of the given dimensions.
///
/// Fails fast on truncated or inconsistent records; the whole stream
/// must be consumed exactly.
pub fn load_vxl(bytes: &[u8], dims: GridDims) -> Result<VoxelGrid, VxlError> {
    let mut grid = VoxelGrid::new_solid(dims);
    let depth = dims.depth;
    let mut pos = 0usize;

    for x in 0..dims.width {
        for y in 0..dims.height {
            let column = (x, y);
            // Cursor below everything already carved or colored.
            let mut z = 0usize;
            loop {
                if pos + 4 > bytes.len() {
                    return Err(VxlError::UnexpectedEof {
                        column,
                        offset: pos,
                    });
                }
                let chunk_count = bytes[pos] as usize;
                let top_start = bytes[pos + 1] as usize;
                let top_end = bytes[pos + 2] as usize; // inclusive

                if top_start > top_end + 1 {
                    return Err(VxlError::InconsistentSpan {
                        column,
                        offset: pos,
                        detail: "top span inverted",
                    });
                }
                let top_len = top_end + 1 - top_start;
                if top_start < z {
                    return Err(VxlError::InconsistentSpan {
                        column,
                        offset: pos,
                        detail: "top span overlaps a previous span",
                    });
                }
                if top_start > depth || (top_len > 0 && top_end >= depth) {
                    return Err(VxlError::InconsistentSpan {
                        column,
                        offset: pos,
                        detail: "top span outside the column",
                    });
                }

                // The air gap above the colored run.
                for air_z in z..top_start {
                    grid.set(x, y, air_z, false, VoxelColor::DEFAULT);
                }

                if pos + 4 + 4 * top_len > bytes.len() {
                    return Err(VxlError::UnexpectedEof {
                        column,
                        offset: pos,
                    });
                }
                for (i, color_z) in (top_start..top_start + top_len).enumerate() {
                    let at = pos + 4 + 4 * i;
                    let color = VoxelColor::from_stream_bytes([
                        bytes[at],
                        bytes[at + 1],
                        bytes[at + 2],
                        bytes[at + 3],
                    ]);
                    grid.set(x, y, color_z, true, color);
                }
                z = top_start + top_len;

                if chunk_count == 0 {
                    // Last record of the column; whatever remains below
                    // stays solid with the default fill.
                    pos += 4 * (top_len + 1);
                    break;
                }

                if chunk_count - 1 < top_len {
                    return Err(VxlError::InconsistentSpan {
                        column,
                        offset: pos,
                        detail: "record too short for its top span",
                    });
                }
                let bottom_len = chunk_count - 1 - top_len;

                // The bottom run length is declared here but its position
                // is anchored to the next record's air start.
                let next = pos + 4 * chunk_count;
                if next + 4 > bytes.len() {
                    return Err(VxlError::UnexpectedEof {
                        column,
                        offset: next,
                    });
                }
                let bottom_end = bytes[next + 3] as usize;
                if bottom_end > depth || bottom_end < z + bottom_len {
                    return Err(VxlError::InconsistentSpan {
                        column,
                        offset: pos,
                        detail: "bottom span outside the column",
                    });
                }
                let bottom_start = bottom_end - bottom_len;

                for (i, color_z) in (bottom_start..bottom_end).enumerate() {
                    let at = pos + 4 + 4 * (top_len + i);
                    let color = VoxelColor::from_stream_bytes([
                        bytes[at],
                        bytes[at + 1],
                        bytes[at + 2],
                        bytes[at + 3],
                    ]);
                    grid.set(x, y, color_z, true, color);
                }

                pos = next;
                z = bottom_end;
            }
        }
    }

    if pos != bytes.len() {
        return Err(VxlError::TrailingData {
            consumed: pos,
            len: bytes.len(),
        });
    }

    debug!(
        "loaded {}x{}x{} map, {} solid voxels, {} bytes",
        dims.width,
        dims.height,
        dims.depth,
        grid.solid_count(),
        bytes.len()
    );
    Ok(grid)
}

/// Serialize a grid back into the column-run layout. Only surface voxels
/// carry color words; the format never stored hidden interior colors, so
/// they are not preserved.
pub fn write_vxl(grid: &VoxelGrid) -> Vec<u8> {
    let depth = grid.depth();
    let mut out = Vec::new();

    for x in 0..grid.width() {
        for y in 0..grid.height() {
            let mut z = 0usize;
            while z < depth {
                let air_start = z;
                while z < depth && !grid.solid_at(x, y, z) {
                    z += 1;
                }

                let top_start = z;
                while z < depth && grid.is_surface(x as i32, y as i32, z as i32) {
                    z += 1;
                }
                let top_end = z; // exclusive

                // Interior solids are stored without color words.
                while z < depth
                    && grid.solid_at(x, y, z)
                    && !grid.is_surface(x as i32, y as i32, z as i32)
                {
                    z += 1;
                }

                // A surface run that stops short of the column floor is
                // this record's bottom run; one touching the floor is
                // deferred to the next record's top run.
                let bottom_start = z;
                let mut probe = z;
                while probe < depth && grid.is_surface(x as i32, y as i32, probe as i32) {
                    probe += 1;
                }
                if probe != depth {
                    z = probe;
                }
                let bottom_end = z; // exclusive

                let top_len = top_end - top_start;
                let bottom_len = bottom_end - bottom_start;

                let chunk_count = if z == depth {
                    0
                } else {
                    top_len + bottom_len + 1
                };
                out.push(chunk_count as u8);
                out.push(top_start as u8);
                out.push((top_start + top_len).wrapping_sub(1) as u8);
                out.push(air_start as u8);

                for color_z in top_start..top_end {
                    out.extend_from_slice(&grid.color_at(x, y, color_z).to_stream_bytes());
                }
                for color_z in bottom_start..bottom_end {
                    out.extend_from_slice(&grid.color_at(x, y, color_z).to_stream_bytes());
                }
            }
        }
    }

    out
}
