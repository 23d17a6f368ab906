//! Reader for `seedname_centres.xyz` (`write_xyz = true`).
//!
//! The first line is the number of entries, the second a comment. Wannier
//! centres are written first with the symbol `X`, followed by the atoms.
//! All coordinates are Cartesian, in Angstrom.
use crate::error::{Result, TbError};
use crate::utils::{expect_tokens, parse_real, parse_token, Line};
use log::debug;
use ndarray::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct XyzAtom {
    pub symbol: String,
    pub position: Array1<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XyzData {
    /// Wannier centres, one row per orbital in file order.
    pub centres: Array2<f64>,
    pub atoms: Vec<XyzAtom>,
}

pub fn parse_xyz(text: &str, file: &str) -> Result<XyzData> {
    let mut raw = text.lines().enumerate();
    let (n0, first) = raw
        .next()
        .ok_or_else(|| TbError::parse(file, "empty xyz file"))?;
    let first = Line {
        number: n0 + 1,
        text: first,
    };
    let t = expect_tokens(&first, 1, file, "the number of entries")?;
    let n_entries = parse_token::<usize>(t[0], file, first.number, "number of entries")?;
    // 第二行是注释
    raw.next();

    let mut centres = Array2::<f64>::zeros((0, 3));
    let mut atoms = Vec::new();
    let mut found = 0;
    for (n, text) in raw {
        if text.trim().is_empty() {
            continue;
        }
        let line = Line { number: n + 1, text };
        let t = expect_tokens(&line, 4, file, "an entry 'symbol x y z'")?;
        let mut p = Array1::<f64>::zeros(3);
        for (c, tok) in t[1..].iter().enumerate() {
            p[c] = parse_real(tok, file, line.number, "coordinate")?;
        }
        if t[0] == "X" || t[0] == "x" {
            centres
                .push_row(p.view())
                .map_err(|e| TbError::parse(file, e.to_string()))?;
        } else {
            atoms.push(XyzAtom {
                symbol: t[0].to_string(),
                position: p,
            });
        }
        found += 1;
    }
    if found != n_entries {
        return Err(TbError::parse(
            file,
            format!("{} entries announced, found {}", n_entries, found),
        ));
    }
    debug!("{}: {} centres, {} atoms", file, centres.nrows(), atoms.len());
    Ok(XyzData { centres, atoms })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    const XYZ: &str = "     3
 Wannier centres, written by Wannier90
X        0.1000000000    0.2000000000    0.3000000000
X       -1.0000000000    0.0000000000    2.5000000000
Si       0.0000000000    0.0000000000    0.0000000000
";

    #[test]
    fn centres_and_atoms() {
        let data = parse_xyz(XYZ, "xyz").unwrap();
        assert_eq!(data.centres, arr2(&[[0.1, 0.2, 0.3], [-1.0, 0.0, 2.5]]));
        assert_eq!(data.atoms.len(), 1);
        assert_eq!(data.atoms[0].symbol, "Si");
    }

    #[test]
    fn entry_count() {
        let text = XYZ.replacen("     3", "     4", 1);
        assert_eq!(parse_xyz(&text, "xyz").unwrap_err().class(), ErrorClass::Format);
    }

    #[test]
    fn bad_coordinate() {
        let text = XYZ.replace("2.5000000000", "2.5.0");
        assert_eq!(parse_xyz(&text, "xyz").unwrap_err().class(), ErrorClass::Format);
    }

    #[test]
    fn silicon_sample() {
        let path = format!("{}/tests/samples/silicon_centres.xyz", env!("CARGO_MANIFEST_DIR"));
        let data = parse_xyz(&crate::utils::read_to_string(&path).unwrap(), &path).unwrap();
        assert_eq!(data.centres.dim(), (8, 3));
        assert_eq!(data.atoms.len(), 2);
    }
}
