//! Building a [`Model`] from Wannier90 output.
//!
//! The files that can be used, all written by Wannier90 for a given `seedname`:
//!
//! * `seedname_hr.dat` (`write_hr = true`) or `seedname_tb.dat` (`write_tb = true`),
//!   the real-space Hamiltonian. Required.
//! * `seedname_wsvec.dat` (`use_ws_distance = true`), the Wigner-Seitz shifts
//!   of every hopping. Using it gives a much better interpolation, especially
//!   for the symmetry of the bands.
//! * `seedname_centres.xyz` (`write_xyz = true`), the Wannier centres and atoms.
//! * `seedname.win`, the input file, for the unit cell.
//!
//! The centres in the xyz file are Cartesian; turning them into orbital
//! positions needs the unit cell, either from the `.win` file or from the
//! header of a `tb.dat` file.
use crate::Model;
use crate::builder::{DEFAULT_DISTANCE_RATIO, ModelBuilder, PosKind};
use crate::error::{Result, TbError};
use crate::hr::parse_hr;
use crate::utils::{file_label, read_to_string};
use crate::win::{AtomCoords, WinData, parse_win};
use crate::wsvec::parse_wsvec;
use crate::xyz::parse_xyz;
use log::debug;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Two unit cells agree when no component differs by more than this (Angstrom).
pub const UNIT_CELL_TOL: f64 = 1e-6;

/// The files and options for [`Model::from_wannier_files`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WannierFiles {
    /// `hr.dat` or `tb.dat`.
    pub hr_file: PathBuf,
    pub wsvec_file: Option<PathBuf>,
    pub xyz_file: Option<PathBuf>,
    pub win_file: Option<PathBuf>,
    pub occ: Option<usize>,
    /// Reduced positions, used as given. Cannot be combined with `xyz_file`.
    pub pos: Option<Array2<f64>>,
    pub pos_kind: PosKind,
    pub distance_ratio_threshold: f64,
    pub h_cutoff: f64,
}

impl Default for WannierFiles {
    fn default() -> Self {
        WannierFiles {
            hr_file: PathBuf::new(),
            wsvec_file: None,
            xyz_file: None,
            win_file: None,
            occ: None,
            pos: None,
            pos_kind: PosKind::Wannier,
            distance_ratio_threshold: DEFAULT_DISTANCE_RATIO,
            h_cutoff: 0.0,
        }
    }
}

impl WannierFiles {
    pub fn new<P: AsRef<Path>>(hr_file: P) -> Self {
        WannierFiles {
            hr_file: hr_file.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Collects `seedname_hr.dat` (or `seedname_tb.dat`), `seedname_wsvec.dat`,
    /// `seedname_centres.xyz` and `seedname.win` from `dir`, taking the
    /// optional ones only if they exist.
    pub fn from_seedname<P: AsRef<Path>>(dir: P, seedname: &str) -> Self {
        let dir = dir.as_ref();
        let existing = |suffix: &str| {
            let p = dir.join(format!("{}{}", seedname, suffix));
            if p.is_file() { Some(p) } else { None }
        };
        let hr_file = existing("_hr.dat")
            .or_else(|| existing("_tb.dat"))
            .unwrap_or_else(|| dir.join(format!("{}_hr.dat", seedname)));
        WannierFiles {
            hr_file,
            wsvec_file: existing("_wsvec.dat"),
            xyz_file: existing("_centres.xyz"),
            win_file: existing(".win"),
            ..Default::default()
        }
    }

    pub fn wsvec<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.wsvec_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn xyz<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.xyz_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn win<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.win_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn occ(mut self, occ: usize) -> Self {
        self.occ = Some(occ);
        self
    }

    pub fn pos(mut self, pos: Array2<f64>) -> Self {
        self.pos = Some(pos);
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

    pub fn h_cutoff(mut self, h_cutoff: f64) -> Self {
        self.h_cutoff = h_cutoff;
        self
    }
}

/// The unit cell from the `.win` file, else the one from the `tb.dat` header.
fn resolve_unit_cell(tb: Option<Array2<f64>>, win: Option<Array2<f64>>) -> Result<Option<Array2<f64>>> {
    match (tb, win) {
        (Some(tb), Some(win)) => {
            let agree = tb
                .iter()
                .zip(win.iter())
                .all(|(a, b)| (a - b).abs() <= UNIT_CELL_TOL);
            if agree {
                Ok(Some(win))
            } else {
                Err(TbError::ConflictingUnitCell)
            }
        }
        (tb, win) => Ok(win.or(tb)),
    }
}

impl Model {
    /// Reads an `hr.dat` or `tb.dat` file.
    ///
    /// `pos` are reduced orbital positions, one row per orbital. They are
    /// used as given. Without them the Hamiltonian carries only the
    /// $e^{2\pi i\bm k\cdot\bm R}$ phases. A `tb.dat` file also provides the
    /// unit cell.
    ///
    /// ```no_run
    /// use Rustb_wannier::Model;
    /// use ndarray::arr1;
    /// let model = Model::from_hr_file("wannier90_hr.dat", Some(4), None)?;
    /// let hamk = model.hamilton(&arr1(&[0.0, 0.0, 0.5]))?;
    /// # Ok::<(), Rustb_wannier::TbError>(())
    /// ```
    pub fn from_hr_file<P: AsRef<Path>>(path: P, occ: Option<usize>, pos: Option<Array2<f64>>) -> Result<Model> {
        let mut files = WannierFiles::new(path);
        files.occ = occ;
        files.pos = pos;
        Model::from_wannier_files(&files)
    }

    /// Reads every file listed in `files` and builds the model.
    pub fn from_wannier_files(files: &WannierFiles) -> Result<Model> {
        let hr_label = file_label(&files.hr_file);
        let hr = parse_hr(&read_to_string(&files.hr_file)?, &hr_label)?;
        let norb = hr.num_wann();

        let win = match &files.win_file {
            Some(path) => parse_win(&read_to_string(path)?, &file_label(path))?,
            None => WinData::default(),
        };
        if let (Some(num_wann), Some(path)) = (win.num_wann, &files.win_file) {
            if num_wann != norb {
                return Err(TbError::inconsistent(
                    &file_label(path),
                    format!("num_wann = {} but {} has {} Wannier functions", num_wann, hr_label, norb),
                ));
            }
        }
        let uc = resolve_unit_cell(hr.lattice, win.unit_cell)?;

        let mut builder = ModelBuilder::new(hr.hop)
            .pos_kind(files.pos_kind)
            .distance_ratio_threshold(files.distance_ratio_threshold)
            .h_cutoff(files.h_cutoff);
        if let Some(path) = &files.wsvec_file {
            builder = builder.wsvec(parse_wsvec(&read_to_string(path)?, &file_label(path))?);
        }
        if let Some(uc) = uc {
            builder = builder.unit_cell(uc);
        }
        let mut atoms = win.atoms.into_iter().map(|a| a.coords).collect::<Vec<_>>();
        if let Some(path) = &files.xyz_file {
            let xyz = parse_xyz(&read_to_string(path)?, &file_label(path))?;
            if !xyz.atoms.is_empty() {
                atoms = xyz
                    .atoms
                    .into_iter()
                    .map(|a| AtomCoords::Cartesian(a.position))
                    .collect();
            }
            builder = builder.centres(xyz.centres);
        }
        builder = builder.atoms(atoms);
        if let Some(pos) = &files.pos {
            builder = builder.pos(pos.clone());
        }
        if let Some(occ) = files.occ {
            builder = builder.occ(occ);
        }
        debug!(
            "{}: wsvec {}, xyz {}, win {}",
            hr_label,
            files.wsvec_file.is_some(),
            files.xyz_file.is_some(),
            files.win_file.is_some()
        );
        builder.build()
    }
}
