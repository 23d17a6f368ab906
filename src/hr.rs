//! Reader for the real-space Hamiltonian written by Wannier90.
//!
//! Two layouts carry the same data:
//!
//! `seedname_hr.dat` (`write_hr = true`)
//! ```text
//!  written on 05May2015 at 13:59:00
//!            3                      <- num_wann
//!            7                      <- nrpts
//!     2    1    1    1    1    1    2   <- degeneracy weights, 15 per line
//!    -1   -1    0    1    1    0.341100   -0.439304
//!    ...                            <- n1 n2 n3 m n Re Im
//! ```
//!
//! `seedname_tb.dat` (`write_tb = true`)
//! ```text
//!  written on 05May2015 at 13:59:00
//!  a1x a1y a1z                      <- lattice vectors
//!  a2x a2y a2z
//!  a3x a3y a3z
//!            3
//!            7
//!     2    1    1    1    1    1    2
//!
//!    -1   -1    0                   <- R
//!     1    1    0.341100   -0.439304   <- m n Re Im
//!    ...
//! ```
//! followed by the position matrix, which is not part of the Hamiltonian.
//!
//! Each layout has its own tokenizer producing [`HrRecord`]s; both feed the
//! same [`normalize`] stage, which applies the degeneracy weights and does all
//! consistency checks. Blank lines after the comment line are ignored.
use crate::error::{Result, TbError};
use crate::lattice::{HoppingTable, LatticeVector};
use crate::utils::{content_lines, expect_tokens, parse_real, parse_token, parse_triple, Line};
use log::debug;
use ndarray::prelude::*;
use num_complex::Complex64;

/// The two textual layouts of the real-space Hamiltonian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HrFormat {
    /// `seedname_hr.dat`: one `n1 n2 n3 m n Re Im` record per line.
    Hr,
    /// `seedname_tb.dat`: lattice vectors in the header, records grouped under `n1 n2 n3` lines.
    Tb,
}

impl HrFormat {
    /// Looks at the first non-blank line after the comment: `num_wann` alone
    /// means [`HrFormat::Hr`], a lattice vector means [`HrFormat::Tb`].
    pub fn detect(text: &str, file: &str) -> Result<HrFormat> {
        let line = content_lines(text, 1)
            .next()
            .ok_or_else(|| TbError::parse(file, "file ends before the number of Wannier functions"))?;
        match line.tokens().len() {
            1 => Ok(HrFormat::Hr),
            3 => Ok(HrFormat::Tb),
            n => Err(TbError::parse(
                file,
                format!(
                    "line {}: expected num_wann (hr layout) or a lattice vector (tb layout), found {} tokens",
                    line.number, n
                ),
            )),
        }
    }
}

/// One hopping element as written in the file, before weighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HrRecord {
    pub r: LatticeVector,
    /// 1-based orbital indices as in the file.
    pub i: usize,
    pub j: usize,
    pub value: Complex64,
    /// Line number, for error messages.
    pub line: usize,
}

/// `num_wann`, `nrpts` and the degeneracy weights.
#[derive(Debug, Clone, PartialEq)]
pub struct HrHeader {
    pub num_wann: usize,
    pub nrpts: usize,
    pub weights: Vec<usize>,
}

/// The parsed real-space Hamiltonian.
#[derive(Debug, Clone)]
pub struct HrData {
    pub hop: HoppingTable,
    /// Lattice vectors (rows, Cartesian) when the tb layout was read.
    pub lattice: Option<Array2<f64>>,
    pub format: HrFormat,
}

impl HrData {
    pub fn num_wann(&self) -> usize {
        self.hop.norb()
    }
}

/// Parses hr or tb text, detecting the layout.
pub fn parse_hr(text: &str, file: &str) -> Result<HrData> {
    let format = HrFormat::detect(text, file)?;
    parse_hr_as(text, file, format)
}

/// Parses hr or tb text in the given layout.
pub fn parse_hr_as(text: &str, file: &str, format: HrFormat) -> Result<HrData> {
    let mut lines = content_lines(text, 1).peekable();
    let (header, records, lattice) = match format {
        HrFormat::Hr => {
            let header = read_header(&mut lines, file)?;
            let records = tokenize_hr(lines, file)?;
            (header, records, None)
        }
        HrFormat::Tb => {
            let lattice = read_lattice(&mut lines, file)?;
            let header = read_header(&mut lines, file)?;
            let records = tokenize_tb(lines, header.nrpts, file)?;
            (header, records, Some(lattice))
        }
    };
    debug!(
        "{}: {:?} layout, num_wann={}, nrpts={}, {} records",
        file,
        format,
        header.num_wann,
        header.nrpts,
        records.len()
    );
    let hop = normalize(&header, &records, file)?;
    Ok(HrData {
        hop,
        lattice,
        format,
    })
}

fn read_lattice<'a, I>(lines: &mut I, file: &str) -> Result<Array2<f64>>
where
    I: Iterator<Item = Line<'a>>,
{
    let mut lat = Array2::<f64>::zeros((3, 3));
    for i in 0..3 {
        let line = lines
            .next()
            .ok_or_else(|| TbError::parse(file, "file ends inside the lattice vectors"))?;
        let tokens = expect_tokens(&line, 3, file, "a lattice vector")?;
        for (c, t) in tokens.iter().enumerate() {
            lat[[i, c]] = parse_real(t, file, line.number, "lattice vector component")?;
        }
    }
    Ok(lat)
}

fn read_header<'a, I>(lines: &mut std::iter::Peekable<I>, file: &str) -> Result<HrHeader>
where
    I: Iterator<Item = Line<'a>>,
{
    let mut single = |what: &str| -> Result<usize> {
        let line = lines
            .next()
            .ok_or_else(|| TbError::parse(file, format!("file ends before {}", what)))?;
        let tokens = expect_tokens(&line, 1, file, what)?;
        parse_token::<usize>(tokens[0], file, line.number, what)
    };
    let num_wann = single("num_wann")?;
    let nrpts = single("nrpts")?;
    if num_wann == 0 || nrpts == 0 {
        return Err(TbError::inconsistent(
            file,
            format!("num_wann={} and nrpts={} must both be positive", num_wann, nrpts),
        ));
    }
    // 权重可能分成多行, 直到读够 nrpts 个
    let mut weights: Vec<usize> = Vec::with_capacity(nrpts.min(1024));
    while weights.len() < nrpts {
        let line = match lines.peek() {
            Some(line) => *line,
            None => break,
        };
        if line.text.contains(['.', 'e', 'E']) {
            break;
        }
        lines.next();
        for t in line.tokens() {
            weights.push(parse_token::<usize>(t, file, line.number, "degeneracy weight")?);
        }
    }
    if weights.len() != nrpts {
        return Err(TbError::inconsistent(
            file,
            format!("expected {} degeneracy weights, found {}", nrpts, weights.len()),
        ));
    }
    Ok(HrHeader {
        num_wann,
        nrpts,
        weights,
    })
}

fn parse_value(re: &str, im: &str, file: &str, line: usize) -> Result<Complex64> {
    Ok(Complex64::new(
        parse_real(re, file, line, "real part of the hopping")?,
        parse_real(im, file, line, "imaginary part of the hopping")?,
    ))
}

/// hr layout: every remaining line is `n1 n2 n3 m n Re Im`.
fn tokenize_hr<'a, I>(lines: I, file: &str) -> Result<Vec<HrRecord>>
where
    I: Iterator<Item = Line<'a>>,
{
    lines
        .map(|line| {
            let t = expect_tokens(&line, 7, file, "a hopping record")?;
            let r = parse_triple(&t[0..3], file, line.number)?;
            Ok(HrRecord {
                r: LatticeVector(r),
                i: parse_token::<usize>(t[3], file, line.number, "orbital index")?,
                j: parse_token::<usize>(t[4], file, line.number, "orbital index")?,
                value: parse_value(t[5], t[6], file, line.number)?,
                line: line.number,
            })
        })
        .collect()
}

/// tb layout: `n1 n2 n3` lines open a block of `m n Re Im` lines. Reading
/// stops at the first lattice-vector line after `nrpts` blocks, where the
/// position matrix starts.
fn tokenize_tb<'a, I>(lines: I, nrpts: usize, file: &str) -> Result<Vec<HrRecord>>
where
    I: Iterator<Item = Line<'a>>,
{
    let mut records = Vec::new();
    let mut current: Option<LatticeVector> = None;
    let mut n_blocks = 0;
    for line in lines {
        let t = line.tokens();
        match t.len() {
            3 => {
                if n_blocks == nrpts {
                    break;
                }
                current = Some(LatticeVector(parse_triple(&t, file, line.number)?));
                n_blocks += 1;
            }
            4 => {
                let r = current.ok_or_else(|| {
                    TbError::parse(
                        file,
                        format!("line {}: hopping record before the first R vector", line.number),
                    )
                })?;
                records.push(HrRecord {
                    r,
                    i: parse_token::<usize>(t[0], file, line.number, "orbital index")?,
                    j: parse_token::<usize>(t[1], file, line.number, "orbital index")?,
                    value: parse_value(t[2], t[3], file, line.number)?,
                    line: line.number,
                });
            }
            n => {
                return Err(TbError::parse(
                    file,
                    format!(
                        "line {}: expected an R vector (3 tokens) or a hopping record (4 tokens), found {} tokens",
                        line.number, n
                    ),
                ));
            }
        }
    }
    Ok(records)
}

/// Shared by both layouts: checks the records against the header and builds the table.
///
/// Record `n` belongs to block `n / num_wann^2` and is divided by that block's
/// degeneracy weight. A block must carry a single $\bm R$ and every orbital
/// pair exactly once; the order of the pairs inside a block is free.
pub fn normalize(header: &HrHeader, records: &[HrRecord], file: &str) -> Result<HoppingTable> {
    let nw = header.num_wann;
    let (block, expected) = match nw
        .checked_mul(nw)
        .and_then(|b| b.checked_mul(header.nrpts).map(|e| (b, e)))
    {
        Some(counts) => counts,
        None => {
            return Err(TbError::inconsistent(
                file,
                format!(
                    "nrpts * num_wann^2 with num_wann={} and nrpts={} does not fit in memory",
                    nw, header.nrpts
                ),
            ));
        }
    };
    if records.len() != expected {
        return Err(TbError::inconsistent(
            file,
            format!(
                "expected nrpts * num_wann^2 = {} * {} = {} hopping records, found {}",
                header.nrpts,
                block,
                expected,
                records.len()
            ),
        ));
    }
    if let Some(n) = header.weights.iter().position(|&w| w == 0) {
        return Err(TbError::inconsistent(
            file,
            format!("degeneracy weight of R point {} is zero", n + 1),
        ));
    }
    let mut hop = HoppingTable::new(nw);
    for (n, chunk) in records.chunks(block).enumerate() {
        let r = chunk[0].r;
        let weight = header.weights[n] as f64;
        let mut seen = vec![false; block];
        for rec in chunk {
            if rec.r != r {
                return Err(TbError::inconsistent(
                    file,
                    format!(
                        "line {}: R={} inside the block of R={} (R point {})",
                        rec.line,
                        rec.r,
                        r,
                        n + 1
                    ),
                ));
            }
            if rec.i == 0 || rec.i > nw || rec.j == 0 || rec.j > nw {
                return Err(TbError::inconsistent(
                    file,
                    format!(
                        "line {}: orbital indices ({}, {}) out of range 1..={}",
                        rec.line, rec.i, rec.j, nw
                    ),
                ));
            }
            let idx = (rec.i - 1) * nw + rec.j - 1;
            if seen[idx] {
                return Err(TbError::inconsistent(
                    file,
                    format!(
                        "line {}: orbital pair ({}, {}) repeated in the block of R={}",
                        rec.line, rec.i, rec.j, r
                    ),
                ));
            }
            seen[idx] = true;
            hop.add(r, rec.i - 1, rec.j - 1, rec.value / weight);
        }
        if let Some(idx) = seen.iter().position(|s| !s) {
            return Err(TbError::inconsistent(
                file,
                format!(
                    "missing entry for R={}, orbitals ({}, {})",
                    r,
                    idx / nw + 1,
                    idx % nw + 1
                ),
            ));
        }
    }
    Ok(hop)
}
