//! Bilinear and trilinear interpolation over non-uniform axes. Used to encode VE(rpm, MAP)
//! and SA(rpm, MAP) tuning tables, loaded from flash-resident storage at boot (see `config`).
//!
//! Construction validates the axes; once a `Table2D`/`Table3D` exists, `lookup` never fails —
//! out-of-range queries clamp to the nearest grid cell instead.

use heapless::Vec as HVec;
use thiserror::Error;

/// Max axis length a table supports. Generous for a 2-cylinder-class tuning table; sized so
/// table storage is fixed-capacity (no allocation) on the embedded target.
pub const MAX_AXIS_LEN: usize = 24;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("table axis must have at least one point")]
    EmptyAxis,
    #[error("table axis values must be strictly increasing")]
    AxisNotIncreasing,
    #[error("grid row length does not match the x-axis length")]
    RowLengthMismatch,
    #[error("grid row count does not match the y-axis length")]
    RowCountMismatch,
    #[error("axis length exceeds the fixed table capacity")]
    AxisTooLong,
}

/// Finds the cell `[i, i+1)` containing `v` in a strictly increasing axis, clamping
/// out-of-range queries to the nearest edge cell. Ties (`v` exactly on a grid point) resolve
/// to the lower index, per the edge-case rule in the table contract.
fn locate(axis: &[f32], v: f32) -> (usize, f32) {
    let last = axis.len() - 1;
    if v <= axis[0] {
        return (0, 0.0);
    }
    if v >= axis[last] {
        return (last.saturating_sub(1), 1.0);
    }
    // Linear scan: these axes are short (RPM/MAP breakpoint tables), so this is cheaper and
    // simpler than a binary search, and its branch behavior is easy to reason about from an ISR.
    let mut i = 0;
    while i < last - 1 && axis[i + 1] <= v {
        i += 1;
    }
    let span = axis[i + 1] - axis[i];
    let frac = if span > 0.0 { (v - axis[i]) / span } else { 0.0 };
    (i, frac)
}

/// A 2-D lookup table over non-uniform axes `xs` (e.g. RPM) and `ys` (e.g. MAP), with grid data
/// `d[y][x]`.
#[derive(Debug)]
pub struct Table2D {
    xs: HVec<f32, MAX_AXIS_LEN>,
    ys: HVec<f32, MAX_AXIS_LEN>,
    data: HVec<HVec<f32, MAX_AXIS_LEN>, MAX_AXIS_LEN>,
}

impl Table2D {
    pub fn new(xs: &[f32], ys: &[f32], data: &[&[f32]]) -> Result<Self, ConfigError> {
        validate_axis(xs)?;
        validate_axis(ys)?;
        if data.len() != ys.len() {
            return Err(ConfigError::RowCountMismatch);
        }
        for row in data {
            if row.len() != xs.len() {
                return Err(ConfigError::RowLengthMismatch);
            }
        }

        let mut xs_v = HVec::new();
        xs_v.extend_from_slice(xs).map_err(|_| ConfigError::AxisTooLong)?;
        let mut ys_v = HVec::new();
        ys_v.extend_from_slice(ys).map_err(|_| ConfigError::AxisTooLong)?;

        let mut data_v = HVec::new();
        for row in data {
            let mut row_v = HVec::new();
            row_v.extend_from_slice(row).map_err(|_| ConfigError::AxisTooLong)?;
            data_v.push(row_v).map_err(|_| ConfigError::AxisTooLong)?;
        }

        Ok(Self { xs: xs_v, ys: ys_v, data: data_v })
    }

    /// Bilinear lookup at `(x, y)`. Clamps to the axis range; exact at grid points.
    pub fn lookup(&self, x: f32, y: f32) -> f32 {
        if self.xs.len() == 1 && self.ys.len() == 1 {
            return self.data[0][0];
        }
        if self.ys.len() == 1 {
            let (i, tx) = locate(&self.xs, x);
            return lerp(self.data[0][i], self.data[0][i + 1], tx);
        }
        if self.xs.len() == 1 {
            let (j, ty) = locate(&self.ys, y);
            return lerp(self.data[j][0], self.data[j + 1][0], ty);
        }

        let (i, tx) = locate(&self.xs, x);
        let (j, ty) = locate(&self.ys, y);

        let top = lerp(self.data[j][i], self.data[j][i + 1], tx);
        let bottom = lerp(self.data[j + 1][i], self.data[j + 1][i + 1], tx);
        lerp(top, bottom, ty)
    }
}

/// A 3-D lookup table, generalizing `Table2D` with a third (z) axis. Grid data is
/// `d[z][y][x]`.
#[derive(Debug)]
pub struct Table3D {
    xs: HVec<f32, MAX_AXIS_LEN>,
    ys: HVec<f32, MAX_AXIS_LEN>,
    zs: HVec<f32, MAX_AXIS_LEN>,
    data: HVec<HVec<HVec<f32, MAX_AXIS_LEN>, MAX_AXIS_LEN>, MAX_AXIS_LEN>,
}

impl Table3D {
    pub fn new(xs: &[f32], ys: &[f32], zs: &[f32], data: &[&[&[f32]]]) -> Result<Self, ConfigError> {
        validate_axis(xs)?;
        validate_axis(ys)?;
        validate_axis(zs)?;
        if data.len() != zs.len() {
            return Err(ConfigError::RowCountMismatch);
        }

        let mut xs_v = HVec::new();
        xs_v.extend_from_slice(xs).map_err(|_| ConfigError::AxisTooLong)?;
        let mut ys_v = HVec::new();
        ys_v.extend_from_slice(ys).map_err(|_| ConfigError::AxisTooLong)?;
        let mut zs_v = HVec::new();
        zs_v.extend_from_slice(zs).map_err(|_| ConfigError::AxisTooLong)?;

        let mut data_v = HVec::new();
        for plane in data {
            if plane.len() != ys.len() {
                return Err(ConfigError::RowCountMismatch);
            }
            let mut plane_v = HVec::new();
            for row in *plane {
                if row.len() != xs.len() {
                    return Err(ConfigError::RowLengthMismatch);
                }
                let mut row_v = HVec::new();
                row_v.extend_from_slice(row).map_err(|_| ConfigError::AxisTooLong)?;
                plane_v.push(row_v).map_err(|_| ConfigError::AxisTooLong)?;
            }
            data_v.push(plane_v).map_err(|_| ConfigError::AxisTooLong)?;
        }

        Ok(Self { xs: xs_v, ys: ys_v, zs: zs_v, data: data_v })
    }

    /// Trilinear lookup at `(x, y, z)`, clamping each axis independently like `Table2D`.
    pub fn lookup(&self, x: f32, y: f32, z: f32) -> f32 {
        let (k, tz) = locate(&self.zs, z);

        let plane_lo = &self.data[k];
        let plane_hi = &self.data[(k + 1).min(self.zs.len() - 1)];

        let lo = bilinear_plane(plane_lo, &self.xs, &self.ys, x, y);
        let hi = bilinear_plane(plane_hi, &self.xs, &self.ys, x, y);
        lerp(lo, hi, tz)
    }
}

fn bilinear_plane(
    plane: &HVec<HVec<f32, MAX_AXIS_LEN>, MAX_AXIS_LEN>,
    xs: &[f32],
    ys: &[f32],
    x: f32,
    y: f32,
) -> f32 {
    if xs.len() == 1 && ys.len() == 1 {
        return plane[0][0];
    }
    if ys.len() == 1 {
        let (i, tx) = locate(xs, x);
        return lerp(plane[0][i], plane[0][i + 1], tx);
    }
    if xs.len() == 1 {
        let (j, ty) = locate(ys, y);
        return lerp(plane[j][0], plane[j + 1][0], ty);
    }
    let (i, tx) = locate(xs, x);
    let (j, ty) = locate(ys, y);
    let top = lerp(plane[j][i], plane[j][i + 1], tx);
    let bottom = lerp(plane[j + 1][i], plane[j + 1][i + 1], tx);
    lerp(top, bottom, ty)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn validate_axis(axis: &[f32]) -> Result<(), ConfigError> {
    if axis.is_empty() {
        return Err(ConfigError::EmptyAxis);
    }
    if axis.len() > MAX_AXIS_LEN {
        return Err(ConfigError::AxisTooLong);
    }
    for w in axis.windows(2) {
        if w[1] <= w[0] {
            return Err(ConfigError::AxisNotIncreasing);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ve_table() -> Table2D {
        // xs = rpm, ys = MAP (kPa)
        let xs = [1000.0, 3000.0, 6000.0];
        let ys = [20.0, 60.0, 100.0];
        let row0 = [0.20, 0.35, 0.50];
        let row1 = [0.40, 0.65, 0.80];
        let row2 = [0.50, 0.75, 0.95];
        Table2D::new(&xs, &ys, &[&row0, &row1, &row2]).unwrap()
    }

    #[test]
    fn exact_at_grid_points() {
        let t = ve_table();
        assert_eq!(t.lookup(3000.0, 60.0), 0.65);
        assert_eq!(t.lookup(1000.0, 20.0), 0.20);
        assert_eq!(t.lookup(6000.0, 100.0), 0.95);
    }

    #[test]
    fn midpoint_is_average_on_this_grid() {
        let t = ve_table();
        // Halfway between (1000,20)->0.20 and (3000,20)->0.35, at y=20 exactly.
        let v = t.lookup(2000.0, 20.0);
        assert!((v - 0.275).abs() < 1e-5);
    }

    #[test]
    fn clamps_out_of_range() {
        let t = ve_table();
        assert_eq!(t.lookup(-500.0, -10.0), t.lookup(1000.0, 20.0));
        assert_eq!(t.lookup(10_000.0, 500.0), t.lookup(6000.0, 100.0));
    }

    #[test]
    fn single_row_degenerates_to_1d() {
        let xs = [1000.0, 3000.0];
        let ys = [50.0];
        let row = [0.3, 0.6];
        let t = Table2D::new(&xs, &ys, &[&row]).unwrap();
        assert_eq!(t.lookup(1000.0, 999.0), 0.3);
        assert_eq!(t.lookup(3000.0, -50.0), 0.6);
    }

    #[test]
    fn rejects_non_increasing_axis() {
        let xs = [1000.0, 900.0];
        let ys = [20.0];
        let row = [0.1, 0.2];
        assert_eq!(Table2D::new(&xs, &ys, &[&row]).unwrap_err(), ConfigError::AxisNotIncreasing);
    }

    #[test]
    fn rejects_row_length_mismatch() {
        let xs = [1000.0, 2000.0, 3000.0];
        let ys = [20.0];
        let row = [0.1, 0.2];
        assert_eq!(Table2D::new(&xs, &ys, &[&row]).unwrap_err(), ConfigError::RowLengthMismatch);
    }

    proptest::proptest! {
        // Invariant 2 (spec.md 8): lookup at any grid point returns that point's value exactly,
        // for any well-formed table, not just the fixed fixtures above.
        #[test]
        fn grid_points_are_exact_for_arbitrary_tables(
            x_offsets in proptest::collection::vec(1.0f32..100.0, 3),
            y_offsets in proptest::collection::vec(1.0f32..100.0, 3),
            values in proptest::collection::vec(-1.0e3f32..1.0e3, 9),
        ) {
            let mut xs = [0.0f32; 3];
            let mut acc = 0.0;
            for (i, d) in x_offsets.iter().enumerate() {
                acc += d;
                xs[i] = acc;
            }
            let mut ys = [0.0f32; 3];
            acc = 0.0;
            for (i, d) in y_offsets.iter().enumerate() {
                acc += d;
                ys[i] = acc;
            }
            let rows: [[f32; 3]; 3] = [
                [values[0], values[1], values[2]],
                [values[3], values[4], values[5]],
                [values[6], values[7], values[8]],
            ];
            let row_refs: [&[f32]; 3] = [&rows[0], &rows[1], &rows[2]];
            let t = Table2D::new(&xs, &ys, &row_refs).unwrap();
            for (j, &y) in ys.iter().enumerate() {
                for (i, &x) in xs.iter().enumerate() {
                    let got = t.lookup(x, y);
                    proptest::prop_assert!((got - rows[j][i]).abs() < 1e-2);
                }
            }
        }
    }

    #[test]
    fn trilinear_exact_at_grid_points() {
        let xs = [1000.0, 3000.0];
        let ys = [20.0, 60.0];
        let zs = [280.0, 320.0];
        let plane0 = [[0.1, 0.2], [0.3, 0.4]];
        let plane1 = [[0.5, 0.6], [0.7, 0.8]];
        let p0: [&[f32]; 2] = [&plane0[0], &plane0[1]];
        let p1: [&[f32]; 2] = [&plane1[0], &plane1[1]];
        let data: [&[&[f32]]; 2] = [&p0, &p1];
        let t = Table3D::new(&xs, &ys, &zs, &data).unwrap();
        assert_eq!(t.lookup(1000.0, 20.0, 280.0), 0.1);
        assert_eq!(t.lookup(3000.0, 60.0, 320.0), 0.8);
    }
}
