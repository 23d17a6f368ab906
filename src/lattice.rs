//! Lattice vectors and the real-space hopping table $\bra{m\bm 0}\hat H\ket{n\bm R}$.
use ndarray::prelude::*;
use num_complex::Complex64;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// A real-space lattice translation $\bm R=n_1\bm a_1+n_2\bm a_2+n_3\bm a_3$, stored as $(n_1,n_2,n_3)$.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct LatticeVector(pub [isize; 3]);

impl LatticeVector {
    pub const ZERO: LatticeVector = LatticeVector([0, 0, 0]);

    pub fn new(n1: isize, n2: isize, n3: isize) -> Self {
        LatticeVector([n1, n2, n3])
    }

    /// $\bm k\cdot\bm R$ in reduced coordinates.
    #[inline(always)]
    pub fn dot(&self, k: &[f64; 3]) -> f64 {
        self.0[0] as f64 * k[0] + self.0[1] as f64 * k[1] + self.0[2] as f64 * k[2]
    }
}

impl Add for LatticeVector {
    type Output = LatticeVector;
    fn add(self, rhs: LatticeVector) -> LatticeVector {
        LatticeVector([self.0[0] + rhs.0[0], self.0[1] + rhs.0[1], self.0[2] + rhs.0[2]])
    }
}

impl Sub for LatticeVector {
    type Output = LatticeVector;
    fn sub(self, rhs: LatticeVector) -> LatticeVector {
        LatticeVector([self.0[0] - rhs.0[0], self.0[1] - rhs.0[1], self.0[2] - rhs.0[2]])
    }
}

impl Neg for LatticeVector {
    type Output = LatticeVector;
    fn neg(self) -> LatticeVector {
        LatticeVector([-self.0[0], -self.0[1], -self.0[2]])
    }
}

impl fmt::Display for LatticeVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0[0], self.0[1], self.0[2])
    }
}

/// The hopping blocks $H_{ij}(\bm R)=\bra{i\bm 0}\hat H\ket{j\bm R}$ of a model.
///
/// Every block is a `norb`$\times$`norb` complex matrix. Adding to an element
/// of a lattice vector that is not yet present creates a zero block first, so
/// repeated contributions to the same $(\bm R,i,j)$ accumulate.
///
/// The blocks are kept ordered by lattice vector, which fixes the order of
/// the Fourier sum and makes two tables built from the same data evaluate to
/// bit-identical Hamiltonians.
#[derive(Debug, Clone, PartialEq)]
pub struct HoppingTable {
    norb: usize,
    blocks: BTreeMap<LatticeVector, Array2<Complex64>>,
}

impl HoppingTable {
    pub fn new(norb: usize) -> Self {
        HoppingTable {
            norb,
            blocks: BTreeMap::new(),
        }
    }

    #[inline(always)]
    pub fn norb(&self) -> usize {
        self.norb
    }

    /// Number of lattice vectors carrying a block.
    #[allow(non_snake_case)]
    #[inline(always)]
    pub fn n_R(&self) -> usize {
        self.blocks.len()
    }

    /// Adds `value` to $H_{ij}(\bm R)$. Indices are 0-based.
    ///
    /// Panics if `i` or `j` is not below `norb`; the parsers check indices
    /// before calling this.
    #[inline(always)]
    pub fn add(&mut self, r: LatticeVector, i: usize, j: usize, value: Complex64) {
        let norb = self.norb;
        let block = self
            .blocks
            .entry(r)
            .or_insert_with(|| Array2::zeros((norb, norb)));
        block[[i, j]] += value;
    }

    pub fn get(&self, r: &LatticeVector) -> Option<&Array2<Complex64>> {
        self.blocks.get(r)
    }

    pub fn contains(&self, r: &LatticeVector) -> bool {
        self.blocks.contains_key(r)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, LatticeVector, Array2<Complex64>> {
        self.blocks.iter()
    }

    /// Removes blocks whose elements are all zero.
    pub(crate) fn prune_zero_blocks(&mut self) {
        self.blocks
            .retain(|_, block| block.iter().any(|x| !x.is_zero()));
    }

    /// The lattice vectors as an `n_R`$\times 3$ integer array, in table order.
    #[allow(non_snake_case)]
    pub fn hamR(&self) -> Array2<isize> {
        let mut hamR = Array2::<isize>::zeros((self.n_R(), 3));
        for (mut row, r) in hamR.outer_iter_mut().zip(self.blocks.keys()) {
            row.assign(&arr1(&r.0));
        }
        hamR
    }

    /// The blocks as an `n_R`$\times$`norb`$\times$`norb` array, in the same order as [`HoppingTable::hamR`].
    pub fn ham(&self) -> Array3<Complex64> {
        let mut ham = Array3::<Complex64>::zeros((self.n_R(), self.norb, self.norb));
        for (mut h, block) in ham.outer_iter_mut().zip(self.blocks.values()) {
            h.assign(block);
        }
        ham
    }
}

impl<'a> IntoIterator for &'a HoppingTable {
    type Item = (&'a LatticeVector, &'a Array2<Complex64>);
    type IntoIter = btree_map::Iter<'a, LatticeVector, Array2<Complex64>>;
    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_arithmetic() {
        let a = LatticeVector::new(1, -2, 3);
        let b = LatticeVector::new(0, 1, -1);
        assert_eq!(a + b, LatticeVector::new(1, -1, 2));
        assert_eq!(a - b, LatticeVector::new(1, -3, 4));
        assert_eq!(-a, LatticeVector::new(-1, 2, -3));
        assert!((a.dot(&[0.5, 0.25, 1.0]) - 3.0).abs() < 1e-15);
        assert_eq!(format!("{}", a), "(1, -2, 3)");
    }

    #[test]
    fn table_accumulates() {
        let mut hop = HoppingTable::new(2);
        let r = LatticeVector::new(1, 0, 0);
        hop.add(r, 0, 1, Complex64::new(1.0, 0.5));
        hop.add(r, 0, 1, Complex64::new(0.5, -0.5));
        hop.add(LatticeVector::ZERO, 1, 1, Complex64::new(-2.0, 0.0));
        assert_eq!(hop.n_R(), 2);
        assert_eq!(hop.get(&r).unwrap()[[0, 1]], Complex64::new(1.5, 0.0));
        assert_eq!(hop.get(&r).unwrap()[[1, 0]], Complex64::new(0.0, 0.0));
        // ordered keys: (0,0,0) comes before (1,0,0)
        let hamR = hop.hamR();
        assert_eq!(hamR, arr2(&[[0, 0, 0], [1, 0, 0]]));
        assert_eq!(hop.ham()[[1, 0, 1]], Complex64::new(1.5, 0.0));
    }

    #[test]
    fn prune() {
        let mut hop = HoppingTable::new(1);
        hop.add(LatticeVector::new(0, 0, 1), 0, 0, Complex64::new(1.0, 0.0));
        hop.add(LatticeVector::new(0, 0, 1), 0, 0, Complex64::new(-1.0, 0.0));
        hop.add(LatticeVector::ZERO, 0, 0, Complex64::new(1.0, 0.0));
        hop.prune_zero_blocks();
        assert_eq!(hop.n_R(), 1);
        assert!(hop.contains(&LatticeVector::ZERO));
    }
}
