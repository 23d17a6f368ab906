use crate::Model;
use crate::math::reciprocal;
use crate::lattice::HoppingTable;
use ndarray::*;
use num_complex::Complex64;

impl Model {
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }
    #[inline(always)]
    pub fn norb(&self) -> usize {
        self.size
    }
    #[inline(always)]
    pub fn hop(&self) -> &HoppingTable {
        &self.hop
    }
    /// Reduced orbital positions, `norb`$\times 3$.
    pub fn pos(&self) -> Option<&Array2<f64>> {
        self.pos.as_ref()
    }
    /// Lattice vectors as rows, Cartesian.
    pub fn uc(&self) -> Option<&Array2<f64>> {
        self.uc.as_ref()
    }
    /// $\bm b_i$ as rows, with $\bm a_i\cdot\bm b_j=2\pi\delta_{ij}$.
    pub fn reciprocal_lattice(&self) -> Option<Array2<f64>> {
        // uc was checked to be invertible when the model was built
        self.uc.as_ref().and_then(|uc| reciprocal(uc).ok())
    }
    #[inline(always)]
    pub fn occ(&self) -> Option<usize> {
        self.occ
    }
    #[inline(always)]
    pub fn n_R(&self) -> usize {
        self.hop.n_R()
    }
    pub fn hamR(&self) -> Array2<isize> {
        self.hop.hamR()
    }
    pub fn ham(&self) -> Array3<Complex64> {
        self.hop.ham()
    }
    /// $\max|H_{ij}(\bm R)-H_{ji}(-\bm R)^*|$ over the table. A lattice
    /// vector without its partner counts against its own elements.
    pub fn hermiticity_error(&self) -> f64 {
        let mut err = 0.0f64;
        for (r, block) in self.hop.iter() {
            match self.hop.get(&-*r) {
                Some(partner) => {
                    for ((i, j), h) in block.indexed_iter() {
                        err = err.max((h - partner[[j, i]].conj()).norm());
                    }
                }
                None => {
                    err = err.max(block.iter().map(|h| h.norm()).fold(0.0, f64::max));
                }
            }
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::ModelBuilder;
    use crate::lattice::{HoppingTable, LatticeVector};
    use ndarray::*;
    use num_complex::Complex64;

    #[test]
    fn accessors() {
        let mut hop = HoppingTable::new(1);
        hop.add(LatticeVector::ZERO, 0, 0, Complex64::new(1.0, 0.0));
        hop.add(LatticeVector::new(0, 0, 1), 0, 0, Complex64::new(0.0, 0.5));
        let model = ModelBuilder::new(hop.clone())
            .unit_cell(Array2::<f64>::eye(3) * 2.0)
            .occ(1)
            .build()
            .unwrap();
        assert_eq!(model.size(), 1);
        assert_eq!(model.n_R(), 2);
        assert_eq!(model.occ(), Some(1));
        assert_eq!(model.hamR(), arr2(&[[0, 0, 0], [0, 0, 1]]));
        let rec = model.reciprocal_lattice().unwrap();
        assert!((rec[[2, 2]] - std::f64::consts::PI).abs() < 1e-14);
        // (0,0,1) has no partner at (0,0,-1)
        assert!((model.hermiticity_error() - 0.5).abs() < 1e-15);
        hop.add(LatticeVector::new(0, 0, -1), 0, 0, Complex64::new(0.0, -0.5));
        let model = ModelBuilder::new(hop).build().unwrap();
        assert_eq!(model.hermiticity_error(), 0.0);
        assert!(model.reciprocal_lattice().is_none());
    }

    #[test]
    fn shareable_between_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<crate::Model>();
        assert_send_sync::<HoppingTable>();
    }
}
