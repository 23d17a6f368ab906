//! Merges the parsed pieces into a [`Model`].
//!
//! The steps, in order:
//!
//! 1. Wigner-Seitz expansion: a hopping $H_{ij}(\bm R)$ with $n$ listed shifts
//!    $\bm\delta$ is replaced by $H_{ij}(\bm R)/n$ at every $\bm R+\bm\delta$.
//!    Pairs without a wsvec record stay at $\bm R$ unchanged.
//! 2. Optional cutoff on $|H_{ij}(\bm R)|$.
//! 3. Unit cell check and position resolution.
//! 4. Positions taken from the geometry files are mapped into $[0,1)$; the
//!    hoppings move to $\bm R+\bm u_j-\bm u_i$ so that $\bm R+\bm\tau_j-\bm\tau_i$,
//!    and with it $H(\bm k)$, is unchanged.
use crate::Model;
use crate::error::{Result, TbError};
use crate::geometry::{Geometry, map_to_home_cell};
use crate::lattice::{HoppingTable, LatticeVector};
use crate::win::AtomCoords;
use crate::wsvec::WsvecTable;
use log::{debug, info, warn};
use ndarray::prelude::*;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Where the orbital positions come from when Wannier centres are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PosKind {
    /// The Wannier centres themselves.
    #[default]
    Wannier,
    /// The atom closest to each Wannier centre.
    NearestAtom,
}

/// Default for [`ModelBuilder::distance_ratio_threshold`].
pub const DEFAULT_DISTANCE_RATIO: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct ModelBuilder {
    hop: HoppingTable,
    wsvec: Option<WsvecTable>,
    uc: Option<Array2<f64>>,
    centres: Option<Array2<f64>>,
    atoms: Vec<AtomCoords>,
    pos: Option<Array2<f64>>,
    occ: Option<usize>,
    pos_kind: PosKind,
    distance_ratio_threshold: f64,
    h_cutoff: f64,
}

impl ModelBuilder {
    pub fn new(hop: HoppingTable) -> Self {
        ModelBuilder {
            hop,
            wsvec: None,
            uc: None,
            centres: None,
            atoms: Vec::new(),
            pos: None,
            occ: None,
            pos_kind: PosKind::Wannier,
            distance_ratio_threshold: DEFAULT_DISTANCE_RATIO,
            h_cutoff: 0.0,
        }
    }

    pub fn wsvec(mut self, wsvec: WsvecTable) -> Self {
        self.wsvec = Some(wsvec);
        self
    }

    /// Lattice vectors as rows, Cartesian.
    pub fn unit_cell(mut self, uc: Array2<f64>) -> Self {
        self.uc = Some(uc);
        self
    }

    /// Cartesian Wannier centres, one row per orbital.
    pub fn centres(mut self, centres: Array2<f64>) -> Self {
        self.centres = Some(centres);
        self
    }

    pub fn atoms(mut self, atoms: Vec<AtomCoords>) -> Self {
        self.atoms = atoms;
        self
    }

    /// Explicit reduced positions, used as given.
    pub fn pos(mut self, pos: Array2<f64>) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn occ(mut self, occ: usize) -> Self {
        self.occ = Some(occ);
        self
    }

    pub fn pos_kind(mut self, pos_kind: PosKind) -> Self {
        self.pos_kind = pos_kind;
        self
    }

    pub fn distance_ratio_threshold(mut self, ratio: f64) -> Self {
        self.distance_ratio_threshold = ratio;
        self
    }

    /// Hoppings with $|H_{ij}(\bm R)|<$ `h_cutoff` are dropped.
    pub fn h_cutoff(mut self, h_cutoff: f64) -> Self {
        self.h_cutoff = h_cutoff;
        self
    }

    pub fn build(self) -> Result<Model> {
        if !(self.h_cutoff >= 0.0 && self.h_cutoff.is_finite()) {
            return Err(TbError::InvalidOption {
                name: "h_cutoff",
                message: format!("must be a finite non-negative number, got {}", self.h_cutoff),
            });
        }
        if !(self.distance_ratio_threshold >= 1.0) {
            return Err(TbError::InvalidOption {
                name: "distance_ratio_threshold",
                message: format!("must be at least 1, got {}", self.distance_ratio_threshold),
            });
        }
        let norb = self.hop.norb();
        let mut hop = match &self.wsvec {
            Some(ws) => apply_wsvec(&self.hop, ws)?,
            None => self.hop,
        };
        if self.h_cutoff > 0.0 {
            apply_cutoff(&mut hop, self.h_cutoff);
        }
        let geometry = self.uc.map(Geometry::new).transpose()?;

        let pos = match (self.pos, self.centres) {
            (Some(_), Some(_)) => {
                return Err(TbError::AmbiguousInput(
                    "explicit orbital positions were given together with Wannier centres; use one or the other"
                        .to_string(),
                ));
            }
            (Some(pos), None) => {
                check_positions(pos.dim(), norb)?;
                Some(pos)
            }
            (None, Some(centres)) => {
                check_positions(centres.dim(), norb)?;
                let geometry = geometry.as_ref().ok_or(TbError::MissingUnitCell)?;
                let reduced = geometry.reduce(&centres);
                let reduced = match self.pos_kind {
                    PosKind::Wannier => reduced,
                    PosKind::NearestAtom => {
                        let atoms = geometry.reduce_atoms(&self.atoms);
                        geometry.nearest_atoms(&reduced, &atoms, self.distance_ratio_threshold)?
                    }
                };
                let (mapped, shifts) = map_to_home_cell(&reduced)?;
                hop = shift_hoppings(hop, &shifts);
                Some(mapped)
            }
            (None, None) => {
                if self.pos_kind == PosKind::NearestAtom {
                    debug!("nearest-atom positions requested without Wannier centres; the model has no positions");
                }
                None
            }
        };

        info!(
            "tight-binding model: {} orbitals, {} R points, unit cell {}, positions {}",
            norb,
            hop.n_R(),
            if geometry.is_some() { "set" } else { "unset" },
            if pos.is_some() { "set" } else { "unset" }
        );
        Ok(Model {
            size: norb,
            hop,
            uc: geometry.map(Geometry::into_uc),
            pos,
            occ: self.occ,
        })
    }
}

fn check_positions(dim: (usize, usize), norb: usize) -> Result<()> {
    if dim != (norb, 3) {
        return Err(TbError::InvalidPositions {
            expected: norb,
            found: format!("{} x {}", dim.0, dim.1),
        });
    }
    Ok(())
}

/// Spreads each listed hopping over its Wigner-Seitz images.
pub fn apply_wsvec(hop: &HoppingTable, ws: &WsvecTable) -> Result<HoppingTable> {
    let norb = hop.norb();
    if let Some(m) = ws.max_orbital() {
        if m >= norb {
            return Err(TbError::inconsistent(
                "wsvec",
                format!("orbital index {} exceeds the {} Wannier functions of the hr file", m + 1, norb),
            ));
        }
    }
    let mut out = HoppingTable::new(norb);
    let mut uncovered = 0usize;
    for (r, block) in hop.iter() {
        for ((i, j), &h) in block.indexed_iter() {
            match ws.get(r, i, j) {
                Some(shifts) => {
                    let n = shifts.len() as f64;
                    for d in shifts {
                        out.add(*r + *d, i, j, h / n);
                    }
                }
                None => {
                    uncovered += 1;
                    out.add(*r, i, j, h);
                }
            }
        }
    }
    if uncovered > 0 {
        warn!(
            "{} hoppings have no wsvec record and are kept at their original R",
            uncovered
        );
    }
    let unused = ws.iter().filter(|((r, _, _), _)| !hop.contains(r)).count();
    if unused > 0 {
        debug!("{} wsvec records refer to R vectors absent from the hr file", unused);
    }
    Ok(out)
}

fn apply_cutoff(hop: &mut HoppingTable, h_cutoff: f64) {
    let mut cut = HoppingTable::new(hop.norb());
    for (r, block) in hop.iter() {
        for ((i, j), &h) in block.indexed_iter() {
            if h.norm() >= h_cutoff {
                cut.add(*r, i, j, h);
            }
        }
    }
    cut.prune_zero_blocks();
    debug!("h_cutoff {}: {} -> {} R points", h_cutoff, hop.n_R(), cut.n_R());
    *hop = cut;
}

/// Moves $H_{ij}(\bm R)$ to $\bm R+\bm u_j-\bm u_i$.
fn shift_hoppings(hop: HoppingTable, shifts: &[LatticeVector]) -> HoppingTable {
    if shifts.iter().all(|u| *u == shifts[0]) {
        return hop;
    }
    let mut out = HoppingTable::new(hop.norb());
    for (r, block) in hop.iter() {
        for ((i, j), &h) in block.indexed_iter() {
            if h != Complex64::new(0.0, 0.0) {
                out.add(*r + shifts[j] - shifts[i], i, j, h);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn two_band() -> HoppingTable {
        let mut hop = HoppingTable::new(2);
        hop.add(LatticeVector::ZERO, 0, 0, c(1.0, 0.0));
        hop.add(LatticeVector::ZERO, 1, 1, c(-1.0, 0.0));
        hop.add(LatticeVector::new(1, 0, 0), 0, 1, c(0.4, 0.2));
        hop.add(LatticeVector::new(-1, 0, 0), 1, 0, c(0.4, -0.2));
        hop
    }

    #[test]
    fn wsvec_splits_and_passes_through() {
        let mut ws = WsvecTable::new();
        ws.insert(
            (LatticeVector::new(1, 0, 0), 0, 1),
            vec![LatticeVector::ZERO, LatticeVector::new(0, 1, 0)],
        )
        .unwrap();
        let out = apply_wsvec(&two_band(), &ws).unwrap();
        assert_eq!(out.get(&LatticeVector::new(1, 0, 0)).unwrap()[[0, 1]], c(0.2, 0.1));
        assert_eq!(out.get(&LatticeVector::new(1, 1, 0)).unwrap()[[0, 1]], c(0.2, 0.1));
        // no record: untouched
        assert_eq!(out.get(&LatticeVector::new(-1, 0, 0)).unwrap()[[1, 0]], c(0.4, -0.2));
        assert_eq!(out.get(&LatticeVector::ZERO).unwrap()[[1, 1]], c(-1.0, 0.0));
    }

    #[test]
    fn wsvec_orbital_range() {
        let mut ws = WsvecTable::new();
        ws.insert((LatticeVector::ZERO, 2, 0), vec![LatticeVector::ZERO]).unwrap();
        let err = apply_wsvec(&two_band(), &ws).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Inconsistent);
    }

    #[test]
    fn cutoff() {
        let model = ModelBuilder::new(two_band()).h_cutoff(0.5).build().unwrap();
        assert_eq!(model.n_R(), 1);
        assert!(ModelBuilder::new(two_band()).h_cutoff(-1.0).build().is_err());
    }

    #[test]
    fn explicit_positions() {
        let pos = arr2(&[[0.0, 0.0, 0.0], [0.5, 0.5, 1.5]]);
        let model = ModelBuilder::new(two_band()).pos(pos.clone()).occ(1).build().unwrap();
        // explicit positions are used as given
        assert_eq!(model.pos().unwrap(), &pos);
        assert_eq!(model.occ(), Some(1));
        assert!(model.uc().is_none());
        let err = ModelBuilder::new(two_band())
            .pos(arr2(&[[1.0, 1.0, 1.0]]))
            .build()
            .unwrap_err();
        assert!(matches!(err, TbError::InvalidPositions { expected: 2, .. }));
    }

    #[test]
    fn positions_and_centres_conflict() {
        let uc = Array2::<f64>::eye(3);
        let err = ModelBuilder::new(two_band())
            .unit_cell(uc)
            .pos(Array2::zeros((2, 3)))
            .centres(Array2::zeros((2, 3)))
            .build()
            .unwrap_err();
        assert!(matches!(err, TbError::AmbiguousInput(_)));
        assert_eq!(err.class(), ErrorClass::Input);
    }

    #[test]
    fn centres_need_unit_cell() {
        let err = ModelBuilder::new(two_band())
            .centres(Array2::zeros((2, 3)))
            .build()
            .unwrap_err();
        assert!(matches!(err, TbError::MissingUnitCell));
    }

    #[test]
    fn singular_cell_rejected() {
        let err = ModelBuilder::new(two_band())
            .unit_cell(Array2::zeros((3, 3)))
            .pos(Array2::zeros((2, 3)))
            .build()
            .unwrap_err();
        assert!(matches!(err, TbError::SingularUnitCell { .. }));
    }

    #[test]
    fn centres_are_mapped_into_the_cell() {
        let uc = Array2::<f64>::eye(3) * 2.0;
        // second centre sits one cell up along a1
        let centres = arr2(&[[0.2, 0.2, 0.2], [2.6, 0.4, 0.4]]);
        let model = ModelBuilder::new(two_band())
            .unit_cell(uc)
            .centres(centres)
            .build()
            .unwrap();
        let pos = model.pos().unwrap();
        assert!((pos[[1, 0]] - 0.3).abs() < 1e-12);
        // H_01(R) moves to R + u_1 - u_0 = R + (1,0,0)
        assert_eq!(model.hop().get(&LatticeVector::new(2, 0, 0)).unwrap()[[0, 1]], c(0.4, 0.2));
        assert_eq!(model.hop().get(&LatticeVector::new(-2, 0, 0)).unwrap()[[1, 0]], c(0.4, -0.2));
        assert!(model.hop().get(&LatticeVector::new(1, 0, 0)).is_none());
    }

    #[test]
    fn far_away_centres_are_rejected() {
        let centres = arr2(&[[0.2, 0.2, 0.2], [1e19, 0.4, 0.4]]);
        let err = ModelBuilder::new(two_band())
            .unit_cell(Array2::<f64>::eye(3) * 2.0)
            .centres(centres)
            .build()
            .unwrap_err();
        assert!(matches!(err, TbError::InvalidPositions { expected: 2, .. }));
        assert_eq!(err.class(), ErrorClass::Input);
    }

    #[test]
    fn nearest_atom_positions() {
        let uc = Array2::<f64>::eye(3) * 4.0;
        let centres = arr2(&[[0.1, -0.1, 0.0], [2.1, 1.9, 2.05]]);
        let atoms = vec![
            AtomCoords::Cartesian(arr1(&[0.0, 0.0, 0.0])),
            AtomCoords::Fractional(arr1(&[0.5, 0.5, 0.5])),
        ];
        let model = ModelBuilder::new(two_band())
            .unit_cell(uc)
            .centres(centres)
            .atoms(atoms)
            .pos_kind(PosKind::NearestAtom)
            .build()
            .unwrap();
        assert_eq!(model.pos().unwrap(), &arr2(&[[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]]));
        let err = ModelBuilder::new(two_band())
            .distance_ratio_threshold(0.5)
            .build()
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Argument);
    }
}
