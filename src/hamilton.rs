//! Bloch Hamiltonian $H(\bm k)$ of a [`Model`].
use crate::Model;
use crate::error::{Result, TbError};
use ndarray::prelude::*;
use ndarray::{Data, Zip};
use num_complex::Complex64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Phase convention of the Fourier transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Convention {
    /// $H_{mn}(\bm k)=\sum_{\bm R}H_{mn}(\bm R)e^{2\pi i\bm k\cdot(\bm R+\bm\tau_n-\bm\tau_m)}$.
    Positional,
    /// $H_{mn}(\bm k)=\sum_{\bm R}H_{mn}(\bm R)e^{2\pi i\bm k\cdot\bm R}$.
    LatticeOnly,
}

impl Model {
    /// [`Convention::Positional`] when the model has orbital positions.
    pub fn convention(&self) -> Convention {
        if self.pos.is_some() {
            Convention::Positional
        } else {
            Convention::LatticeOnly
        }
    }

    /// The Bloch Hamiltonian at `kvec`, given in reduced coordinates of the
    /// reciprocal lattice.
    ///
    /// For the wannier basis $\ket{i\bm R}$ the Bloch states are
    /// $$\ket{i\bm k}=\sum_{\bm R}e^{2\pi i\bm k\cdot(\bm R+\bm\tau_i)}\ket{i\bm R},$$
    /// which gives
    /// $$H_{mn}(\bm k)=\sum_{\bm R}\bra{m\bm 0}\hat H\ket{n\bm R}e^{2\pi i\bm k\cdot(\bm R-\bm\tau_m+\bm\tau_n)}.$$
    /// Without positions the $\bm\tau$ terms are left out.
    ///
    /// The result is Hermitian if the hopping table is, and only depends on
    /// `kvec` modulo reciprocal lattice vectors when the model has no
    /// positions.
    pub fn hamilton<S: Data<Elem = f64>>(&self, kvec: &ArrayBase<S, Ix1>) -> Result<Array2<Complex64>> {
        self.hamilton_with(kvec, self.convention())
    }

    /// Like [`Model::hamilton`] with an explicit convention. On a model
    /// without positions both conventions give the same result.
    pub fn hamilton_with<S: Data<Elem = f64>>(
        &self,
        kvec: &ArrayBase<S, Ix1>,
        convention: Convention,
    ) -> Result<Array2<Complex64>> {
        if kvec.len() != 3 {
            return Err(TbError::DimensionMismatch {
                context: "k-point".to_string(),
                expected: 3,
                found: kvec.len(),
            });
        }
        Ok(self.gen_ham(kvec.view(), convention))
    }

    /// $H(\bm k)$ for every row of `kvec`, evaluated in parallel. The result
    /// has shape `nk`$\times$`norb`$\times$`norb`.
    pub fn hamilton_batch<S: Data<Elem = f64>>(&self, kvec: &ArrayBase<S, Ix2>) -> Result<Array3<Complex64>> {
        if kvec.ncols() != 3 {
            return Err(TbError::DimensionMismatch {
                context: "k-points".to_string(),
                expected: 3,
                found: kvec.ncols(),
            });
        }
        let convention = self.convention();
        let nk = kvec.nrows();
        let mut hamk = Array3::<Complex64>::zeros((nk, self.size, self.size));
        hamk.axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(kvec.axis_iter(Axis(0)).into_par_iter())
            .for_each(|(mut h, k)| {
                h.assign(&self.gen_ham(k, convention));
            });
        Ok(hamk)
    }

    #[inline(always)]
    fn gen_ham(&self, kvec: ArrayView1<f64>, convention: Convention) -> Array2<Complex64> {
        let k = [kvec[0], kvec[1], kvec[2]];
        let mut hamk = Array2::<Complex64>::zeros((self.size, self.size));
        for (r, block) in self.hop.iter() {
            let phase = Complex64::new(0.0, 2.0 * PI * r.dot(&k)).exp();
            hamk.scaled_add(phase, block);
        }
        match (convention, &self.pos) {
            (Convention::Positional, Some(pos)) => {
                // U^\dagger H U, U=diag(e^{2\pi i k\cdot\tau})
                let U0 = pos.dot(&kvec).mapv(|x| Complex64::new(0.0, 2.0 * PI * x).exp());
                Zip::indexed(&mut hamk).for_each(|(m, n), h| {
                    *h *= U0[m].conj() * U0[n];
                });
                hamk
            }
            _ => hamk,
        }
    }
}
