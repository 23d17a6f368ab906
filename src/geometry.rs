//! Unit cell and the reduction of Cartesian orbital positions.
use crate::error::{Result, TbError};
use crate::lattice::LatticeVector;
use crate::math::inv3;
use crate::win::AtomCoords;
use ndarray::prelude::*;
use ndarray::Data;

/// A non-singular unit cell. Rows of `uc` are the lattice vectors in Cartesian coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    uc: Array2<f64>,
    uc_inv: Array2<f64>,
}

impl Geometry {
    pub fn new(uc: Array2<f64>) -> Result<Geometry> {
        if uc.dim() != (3, 3) {
            return Err(TbError::DimensionMismatch {
                context: "unit cell".to_string(),
                expected: 9,
                found: uc.len(),
            });
        }
        let uc_inv = inv3(&uc)?;
        Ok(Geometry { uc, uc_inv })
    }

    pub fn uc(&self) -> &Array2<f64> {
        &self.uc
    }

    pub fn into_uc(self) -> Array2<f64> {
        self.uc
    }

    /// Cartesian rows to reduced rows: $\bm\tau=\bm r\,\text{uc}^{-1}$.
    pub fn reduce<S: Data<Elem = f64>>(&self, cart: &ArrayBase<S, Ix2>) -> Array2<f64> {
        cart.dot(&self.uc_inv)
    }

    /// Atom positions in reduced coordinates, one row per atom.
    pub fn reduce_atoms(&self, atoms: &[AtomCoords]) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros((atoms.len(), 3));
        for (mut row, atom) in out.outer_iter_mut().zip(atoms.iter()) {
            match atom {
                AtomCoords::Cartesian(p) => row.assign(&p.dot(&self.uc_inv)),
                AtomCoords::Fractional(p) => row.assign(p),
            }
        }
        out
    }

    /// Replaces every Wannier centre by the closest atom, searching the periodic
    /// images around the centre.
    ///
    /// The second-closest candidate has to be at least `ratio_threshold` times
    /// farther away than the closest one, otherwise the assignment is ambiguous.
    pub fn nearest_atoms(
        &self,
        centres: &Array2<f64>,
        atoms: &Array2<f64>,
        ratio_threshold: f64,
    ) -> Result<Array2<f64>> {
        if atoms.nrows() == 0 {
            return Err(TbError::MissingAtoms);
        }
        let mut out = Array2::<f64>::zeros(centres.dim());
        for (n, (centre, mut target)) in centres.outer_iter().zip(out.outer_iter_mut()).enumerate() {
            let mut candidates: Vec<(f64, Array1<f64>)> = Vec::with_capacity(27 * atoms.nrows());
            for atom in atoms.outer_iter() {
                let base = (&centre - &atom).mapv(f64::round);
                for a in -1..=1 {
                    for b in -1..=1 {
                        for c in -1..=1 {
                            let image = &atom + &base + &arr1(&[a as f64, b as f64, c as f64]);
                            let d = (&image - &centre).dot(&self.uc);
                            candidates.push((d.dot(&d).sqrt(), image));
                        }
                    }
                }
            }
            candidates.sort_by(|x, y| x.0.total_cmp(&y.0));
            let (d0, d1) = (candidates[0].0, candidates[1].0);
            if d0 > 0.0 && d1 / d0 < ratio_threshold {
                return Err(TbError::AmbiguousInput(format!(
                    "nearest atom of Wannier centre {} is not unique: distances {:.4} and {:.4} differ by less than a factor {}",
                    n + 1,
                    d0,
                    d1,
                    ratio_threshold
                )));
            }
            target.assign(&candidates[0].1);
        }
        Ok(out)
    }
}

/// Largest reduced coordinate accepted for an orbital position.
pub const MAX_REDUCED_COORD: f64 = 1e9;

/// Maps reduced positions into $[0,1)$.
///
/// Returns the mapped positions and, per orbital, the lattice vector
/// $\bm u_i=\lfloor\bm\tau_i\rfloor$ that was removed, so that
/// $\bm\tau_i=\bm\tau_i'+\bm u_i$. Non-finite coordinates and coordinates
/// beyond [`MAX_REDUCED_COORD`] are rejected.
pub fn map_to_home_cell(pos: &Array2<f64>) -> Result<(Array2<f64>, Vec<LatticeVector>)> {
    if let Some(x) = pos.iter().find(|x| !x.is_finite() || x.abs() > MAX_REDUCED_COORD) {
        return Err(TbError::InvalidPositions {
            expected: pos.nrows(),
            found: format!("reduced coordinate {} outside +-{:e}", x, MAX_REDUCED_COORD),
        });
    }
    let mut mapped = pos.clone();
    let mut shifts = Vec::with_capacity(pos.nrows());
    for mut row in mapped.outer_iter_mut() {
        let mut u = [0isize; 3];
        for (c, x) in row.iter_mut().enumerate() {
            let f = x.floor();
            *x -= f;
            // floating rounding may leave exactly 1.0
            if *x >= 1.0 {
                *x -= 1.0;
                u[c] = f as isize + 1;
            } else {
                u[c] = f as isize;
            }
        }
        shifts.push(LatticeVector(u));
    }
    Ok((mapped, shifts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silicon() -> Geometry {
        Geometry::new(arr2(&[
            [-2.6988, 0.0, 2.6988],
            [0.0, 2.6988, 2.6988],
            [-2.6988, 2.6988, 0.0],
        ]))
        .unwrap()
    }

    #[test]
    fn reduce_roundtrip() {
        let g = silicon();
        let red = arr2(&[[0.1, -0.2, 1.3], [0.5, 0.5, 0.5]]);
        let back = g.reduce(&red.dot(g.uc()));
        for (x, y) in back.iter().zip(red.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn singular_cell() {
        let err = Geometry::new(arr2(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]])).unwrap_err();
        assert!(matches!(err, TbError::SingularUnitCell { .. }));
        assert!(matches!(
            Geometry::new(Array2::eye(2)),
            Err(TbError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn home_cell() {
        let pos = arr2(&[[-0.25, 1.006, 0.5], [0.0, 0.999, -1.5]]);
        let (mapped, shifts) = map_to_home_cell(&pos).unwrap();
        assert_eq!(shifts, vec![LatticeVector::new(-1, 1, 0), LatticeVector::new(0, 0, -2)]);
        assert!((mapped[[0, 0]] - 0.75).abs() < 1e-15);
        assert!((mapped[[0, 1]] - 0.006).abs() < 1e-12);
        assert!((mapped[[1, 2]] - 0.5).abs() < 1e-15);
        assert!(mapped.iter().all(|&x| (0.0..1.0).contains(&x)));
    }

    #[test]
    fn home_cell_rejects_far_positions() {
        for x in [1e19, -2e9, f64::NAN, f64::INFINITY] {
            let pos = arr2(&[[0.5, 0.5, 0.5], [0.1, x, 0.2]]);
            assert!(matches!(
                map_to_home_cell(&pos),
                Err(TbError::InvalidPositions { expected: 2, .. })
            ));
        }
        assert!(map_to_home_cell(&arr2(&[[-1e9, 1e9, 0.0]])).is_ok());
    }

    #[test]
    fn nearest_atom() {
        let g = Geometry::new(Array2::<f64>::eye(3) * 4.0).unwrap();
        let atoms = arr2(&[[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]]);
        let centres = arr2(&[[0.98, 0.03, -0.02], [0.45, 0.52, 0.5]]);
        let pos = g.nearest_atoms(&centres, &atoms, 3.0).unwrap();
        assert_eq!(pos, arr2(&[[1.0, 0.0, 0.0], [0.5, 0.5, 0.5]]));
        // halfway between the two atoms
        let centres = arr2(&[[0.25, 0.25, 0.25]]);
        assert!(matches!(
            g.nearest_atoms(&centres, &atoms, 3.0),
            Err(TbError::AmbiguousInput(_))
        ));
        assert!(matches!(
            g.nearest_atoms(&centres, &Array2::zeros((0, 3)), 3.0),
            Err(TbError::MissingAtoms)
        ));
    }
}
