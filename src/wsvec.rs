//! Reader for `seedname_wsvec.dat` (`use_ws_distance = true`).
//!
//! For every hopping $(\bm R,m,n)$ Wannier90 lists the lattice shifts $\bm\delta$
//! that bring the image of orbital $n$ into the Wigner-Seitz supercell centred on
//! orbital $m$:
//! ```text
//!  ## written on ... with use_ws_distance=.true.
//!     0    0    1    1    2     <- n1 n2 n3 m n
//!     2                        <- number of equivalent shifts
//!     0    0    0
//!     1   -1    0
//! ```
use crate::error::{Result, TbError};
use crate::lattice::LatticeVector;
use crate::utils::{content_lines, expect_tokens, parse_token, parse_triple};
use log::{debug, warn};
use std::collections::HashMap;

/// $(\bm R, m, n)$ with 0-based orbital indices.
pub type WsvecKey = (LatticeVector, usize, usize);

/// The Wigner-Seitz shifts of every listed hopping. Each list is non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WsvecTable {
    shifts: HashMap<WsvecKey, Vec<LatticeVector>>,
}

impl WsvecTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, r: &LatticeVector, i: usize, j: usize) -> Option<&[LatticeVector]> {
        self.shifts.get(&(*r, i, j)).map(|v| v.as_slice())
    }

    /// Inserts a record, returning the one it replaces. Empty shift lists are rejected.
    pub fn insert(&mut self, key: WsvecKey, shifts: Vec<LatticeVector>) -> Result<Option<Vec<LatticeVector>>> {
        if shifts.is_empty() {
            return Err(TbError::inconsistent(
                "wsvec",
                format!("no shifts for R={}, orbitals ({}, {})", key.0, key.1 + 1, key.2 + 1),
            ));
        }
        Ok(self.shifts.insert(key, shifts))
    }

    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WsvecKey, &Vec<LatticeVector>)> {
        self.shifts.iter()
    }

    /// Largest orbital index (0-based) appearing in a key.
    pub(crate) fn max_orbital(&self) -> Option<usize> {
        self.shifts.keys().map(|&(_, i, j)| i.max(j)).max()
    }
}

/// Parses wsvec text. The first line is a comment; blank lines are ignored.
pub fn parse_wsvec(text: &str, file: &str) -> Result<WsvecTable> {
    let mut table = WsvecTable::new();
    let mut lines = content_lines(text, 1).peekable();
    while let Some(line) = lines.next() {
        let t = expect_tokens(&line, 5, file, "a wsvec header 'n1 n2 n3 m n'")?;
        let r = LatticeVector(parse_triple(&t[0..3], file, line.number)?);
        let i = parse_token::<usize>(t[3], file, line.number, "orbital index")?;
        let j = parse_token::<usize>(t[4], file, line.number, "orbital index")?;
        if i == 0 || j == 0 {
            return Err(TbError::inconsistent(
                file,
                format!("line {}: orbital indices are 1-based, found ({}, {})", line.number, i, j),
            ));
        }
        let count_line = lines.next().ok_or_else(|| {
            TbError::inconsistent(file, format!("file ends before the shift count of R={}", r))
        })?;
        let c = expect_tokens(&count_line, 1, file, "the number of shifts")?;
        let count = parse_token::<usize>(c[0], file, count_line.number, "number of shifts")?;
        if count == 0 {
            return Err(TbError::inconsistent(
                file,
                format!("line {}: zero shifts for R={}, orbitals ({}, {})", count_line.number, r, i, j),
            ));
        }
        let mut shifts = Vec::with_capacity(count.min(64));
        while shifts.len() < count {
            // 下一行如果不是三个整数, 说明这一组的平移矢量数目不对
            let is_shift = lines
                .peek()
                .map(|l| l.tokens().len() == 3)
                .unwrap_or(false);
            if !is_shift {
                return Err(TbError::inconsistent(
                    file,
                    format!(
                        "R={}, orbitals ({}, {}): {} shifts announced at line {}, found {}",
                        r,
                        i,
                        j,
                        count,
                        count_line.number,
                        shifts.len()
                    ),
                ));
            }
            if let Some(l) = lines.next() {
                let t = l.tokens();
                shifts.push(LatticeVector(parse_triple(&t, file, l.number)?));
            }
        }
        if table.insert((r, i - 1, j - 1), shifts)?.is_some() {
            warn!("{}: repeated record for R={}, orbitals ({}, {}); the later one is used", file, r, i, j);
        }
    }
    debug!("{}: {} wsvec records", file, table.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    const WSVEC: &str = " ## written on  5May2015 at 13:59:00 with use_ws_distance=.true.
    0    0    0    1    1
    1
    0    0    0

    1    0    0    1    2
    2
    0    0    0
   -1    1    0
";

    #[test]
    fn records() {
        let ws = parse_wsvec(WSVEC, "ws").unwrap();
        assert_eq!(ws.len(), 2);
        assert_eq!(ws.get(&LatticeVector::ZERO, 0, 0).unwrap(), &[LatticeVector::ZERO]);
        let s = ws.get(&LatticeVector::new(1, 0, 0), 0, 1).unwrap();
        assert_eq!(s, &[LatticeVector::ZERO, LatticeVector::new(-1, 1, 0)]);
        assert!(ws.get(&LatticeVector::new(1, 0, 0), 1, 0).is_none());
        assert_eq!(ws.max_orbital(), Some(1));
    }

    #[test]
    fn count_mismatch() {
        // three announced, two given before the next header
        let text = WSVEC.replace("    2\n", "    3\n");
        let err = parse_wsvec(&text, "ws").unwrap_err();
        assert_eq!(err.class(), ErrorClass::Inconsistent);
        let text = format!("{}    0    0    0    2    2\n    2\n    0    0    0\n", WSVEC);
        let err = parse_wsvec(&text, "ws").unwrap_err();
        assert_eq!(err.class(), ErrorClass::Inconsistent);
    }

    #[test]
    fn huge_count() {
        let err = parse_wsvec(" ## c\n 0 0 0 1 1\n 18446744073709551615\n 0 0 0\n", "ws").unwrap_err();
        assert_eq!(err.class(), ErrorClass::Inconsistent);
    }

    #[test]
    fn zero_count() {
        let text = WSVEC.replace("    1\n    0    0    0\n", "    0\n");
        let err = parse_wsvec(&text, "ws").unwrap_err();
        assert_eq!(err.class(), ErrorClass::Inconsistent);
    }

    #[test]
    fn malformed() {
        let text = WSVEC.replace("   -1    1    0", "   -1    x    0");
        assert_eq!(parse_wsvec(&text, "ws").unwrap_err().class(), ErrorClass::Format);
    }

    #[test]
    fn silicon_sample() {
        let path = format!("{}/tests/samples/silicon_wsvec.dat", env!("CARGO_MANIFEST_DIR"));
        let text = crate::utils::read_to_string(&path).unwrap();
        let ws = parse_wsvec(&text, &path).unwrap();
        // 9 R points, 8x8 orbital pairs
        assert_eq!(ws.len(), 9 * 64);
        assert!(ws.iter().all(|(_, s)| !s.is_empty()));
    }
}
