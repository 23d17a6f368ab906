//! src/error.rs
//! This module defines the error types for reading Wannier90 files and building
//! tight-binding models from them. Every fallible operation in the crate returns
//! [`Result`], so malformed input never panics and never yields a partial model.

use thiserror::Error;

/// The primary error type for all fallible operations in this library.
#[derive(Error, Debug)]
pub enum TbError {
    // --- I/O ---
    #[error("Failed to read file '{path}'")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // --- Format errors: bad tokens, wrong token counts ---
    #[error("Failed to parse data from file '{file}': {message}")]
    FileParse { file: String, message: String },

    // --- Structural inconsistency: the numbers parse but do not fit together ---
    #[error("Inconsistent data in file '{file}': {message}")]
    Inconsistent { file: String, message: String },

    // --- Input ambiguity / missing geometry ---
    #[error("Ambiguous input: {0}")]
    AmbiguousInput(String),

    #[error("Orbital positions given without a unit cell: reduced coordinates cannot be determined, a .win file (or a tb file) is required")]
    MissingUnitCell,

    #[error("Nearest-atom positions requested but no atom positions were found in the xyz or win file")]
    MissingAtoms,

    #[error("Invalid orbital positions: expected {expected} positions with 3 coordinates, got {found}")]
    InvalidPositions { expected: usize, found: String },

    #[error("The unit cell from the tb file does not agree with the unit cell from the win file")]
    ConflictingUnitCell,

    #[error("The unit cell is singular (determinant {det:e}), positions cannot be reduced")]
    SingularUnitCell { det: f64 },

    // --- Linear algebra ---
    #[error("Linear algebra operation failed")]
    Linalg(#[from] ndarray_linalg::error::LinalgError),

    // --- Invalid arguments ---
    #[error("Dimension mismatch for '{context}': expected {expected}, got {found}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid option '{name}': {message}")]
    InvalidOption { name: &'static str, message: String },
}

/// Coarse classification of [`TbError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Io,
    /// Malformed numbers, wrong token counts.
    Format,
    /// Counts, indices or weights that contradict the file's own header.
    Inconsistent,
    /// Missing, conflicting or ambiguous geometry input.
    Input,
    /// A caller-supplied argument has the wrong shape or value.
    Argument,
}

impl TbError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TbError::FileRead { .. } => ErrorClass::Io,
            TbError::FileParse { .. } => ErrorClass::Format,
            TbError::Inconsistent { .. } => ErrorClass::Inconsistent,
            TbError::AmbiguousInput(_)
            | TbError::MissingUnitCell
            | TbError::MissingAtoms
            | TbError::InvalidPositions { .. }
            | TbError::ConflictingUnitCell
            | TbError::SingularUnitCell { .. }
            | TbError::Linalg(_) => ErrorClass::Input,
            TbError::DimensionMismatch { .. } | TbError::InvalidOption { .. } => {
                ErrorClass::Argument
            }
        }
    }

    pub(crate) fn parse(file: &str, message: impl Into<String>) -> TbError {
        TbError::FileParse {
            file: file.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn inconsistent(file: &str, message: impl Into<String>) -> TbError {
        TbError::Inconsistent {
            file: file.to_string(),
            message: message.into(),
        }
    }
}

/// A specialized `Result` type for this library's operations.
pub type Result<T> = std::result::Result<T, TbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        assert_eq!(TbError::parse("a", "x").class(), ErrorClass::Format);
        assert_eq!(
            TbError::inconsistent("a", "x").class(),
            ErrorClass::Inconsistent
        );
        assert_eq!(TbError::MissingUnitCell.class(), ErrorClass::Input);
        assert_eq!(
            TbError::SingularUnitCell { det: 0.0 }.class(),
            ErrorClass::Input
        );
        let err = TbError::inconsistent("wannier90_hr.dat", "zero weight");
        assert_eq!(
            err.to_string(),
            "Inconsistent data in file 'wannier90_hr.dat': zero weight"
        );
    }
}
