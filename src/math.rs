use crate::error::{Result, TbError};
use ndarray::{Array2, ArrayBase, Data, Ix2};
use ndarray_linalg::Inverse;
use std::f64::consts::PI;

/// Below this $|\det|$ a unit cell is treated as singular.
pub const SINGULAR_TOL: f64 = 1e-12;

#[inline(always)]
pub fn det3<S: Data<Elem = f64>>(m: &ArrayBase<S, Ix2>) -> f64 {
    m[[0, 0]] * (m[[1, 1]] * m[[2, 2]] - m[[1, 2]] * m[[2, 1]])
        - m[[0, 1]] * (m[[1, 0]] * m[[2, 2]] - m[[1, 2]] * m[[2, 0]])
        + m[[0, 2]] * (m[[1, 0]] * m[[2, 1]] - m[[1, 1]] * m[[2, 0]])
}

/// Inverse of a $3\times 3$ cell. Cells with $|\det|<10^{-12}$ (or a NaN
/// determinant) are rejected before LAPACK sees them.
pub fn inv3<S: Data<Elem = f64>>(m: &ArrayBase<S, Ix2>) -> Result<Array2<f64>> {
    if m.dim() != (3, 3) {
        return Err(TbError::DimensionMismatch {
            context: "3x3 inverse".to_string(),
            expected: 9,
            found: m.len(),
        });
    }
    let det = det3(m);
    if det.is_nan() || det.abs() < SINGULAR_TOL {
        return Err(TbError::SingularUnitCell { det });
    }
    m.inv().map_err(TbError::Linalg)
}

/// The reciprocal lattice $\bm b_i\cdot\bm a_j=2\pi\delta_{ij}$, i.e. $2\pi(\text{lat}^{-1})^T$.
///
/// Rows of `lat` are the real-space lattice vectors, rows of the result are the
/// reciprocal lattice vectors.
pub fn reciprocal<S: Data<Elem = f64>>(lat: &ArrayBase<S, Ix2>) -> Result<Array2<f64>> {
    let inv = inv3(lat)?;
    Ok(inv.t().mapv(|x| 2.0 * PI * x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use ndarray::arr2;
    use ndarray_linalg::error::LinalgError;

    #[test]
    fn inverse() {
        let m = arr2(&[[2.0, 1.0, 0.0], [0.0, 1.0, 3.0], [1.0, 0.0, 1.0]]);
        let inv = inv3(&m).unwrap();
        let id = m.dot(&inv);
        for i in 0..3 {
            for j in 0..3 {
                let e = if i == j { 1.0 } else { 0.0 };
                assert!((id[[i, j]] - e).abs() < 1e-12);
            }
        }
        assert!((det3(&m) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn singular() {
        let m = arr2(&[[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 0.0, 1.0]]);
        assert!(matches!(inv3(&m), Err(TbError::SingularUnitCell { .. })));
        let m = arr2(&[[f64::NAN, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(matches!(inv3(&m), Err(TbError::SingularUnitCell { .. })));
        let err = TbError::from(LinalgError::NotSquare { rows: 2, cols: 3 });
        assert_eq!(err.class(), ErrorClass::Input);
    }

    #[test]
    fn reciprocal_orthogonal() {
        let lat = arr2(&[[-2.6988, 0.0, 2.6988], [0.0, 2.6988, 2.6988], [-2.6988, 2.6988, 0.0]]);
        let rec = reciprocal(&lat).unwrap();
        let prod = lat.dot(&rec.t());
        for i in 0..3 {
            for j in 0..3 {
                let e = if i == j { 2.0 * PI } else { 0.0 };
                assert!((prod[[i, j]] - e).abs() < 1e-10);
            }
        }
    }
}
