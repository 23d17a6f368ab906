#![allow(non_snake_case)]
//! Tight-binding models from Wannier90 output.
//!
//! This crate reads the real-space Hamiltonian written by Wannier90
//! (`seedname_hr.dat` or `seedname_tb.dat`), optionally together with the
//! Wigner-Seitz shifts (`seedname_wsvec.dat`), the Wannier centres
//! (`seedname_centres.xyz`) and the unit cell (`seedname.win`), and evaluates
//! the Bloch Hamiltonian
//! $$H_{mn}(\bm k)=\sum_{\bm R}\bra{m\bm 0}\hat H\ket{n\bm R}e^{2\pi i\bm k\cdot(\bm R-\bm\tau_m+\bm\tau_n)}$$
//! at arbitrary k-points given in reduced coordinates.
//!
//! ```no_run
//! use Rustb_wannier::{Model, WannierFiles};
//! use ndarray::arr2;
//! let files = WannierFiles::from_seedname("./silicon", "silicon");
//! let model = Model::from_wannier_files(&files)?;
//! let kvec = arr2(&[[0.0, 0.0, 0.0], [0.5, 0.0, 0.5]]);
//! let hamk = model.hamilton_batch(&kvec)?;
//! # Ok::<(), Rustb_wannier::TbError>(())
//! ```
pub mod builder;
pub mod error;
pub mod geometry;
pub mod hamilton;
pub mod hr;
pub mod lattice;
pub mod math;
pub mod model_struct;
pub mod utils;
pub mod wannier90;
pub mod win;
pub mod wsvec;
pub mod xyz;

pub use builder::{ModelBuilder, PosKind};
pub use error::{ErrorClass, Result, TbError};
pub use hamilton::Convention;
pub use lattice::{HoppingTable, LatticeVector};
pub use wannier90::WannierFiles;

use ndarray::prelude::*;

/// A tight-binding model in the basis of Wannier functions.
///
/// The model is immutable once built, either through
/// [`Model::from_hr_file`], [`Model::from_wannier_files`] or a
/// [`ModelBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// The number of orbitals.
    pub(crate) size: usize,
    /// $\bra{m\bm 0}\hat H\ket{n\bm R}$ for every $\bm R$.
    pub(crate) hop: HoppingTable,
    /// The lattice vectors, a $3\times 3$ matrix, the axis0 direction stores a lattice vector in Cartesian coordinates.
    pub(crate) uc: Option<Array2<f64>>,
    /// The orbital positions in fractional coordinates, `size`$\times 3$.
    pub(crate) pos: Option<Array2<f64>>,
    /// The number of occupied bands. Stored, never used.
    pub(crate) occ: Option<usize>,
}
