//! Reader for the parts of `seedname.win` that describe the structure.
//!
//! Only `num_wann`, the `unit_cell_cart` block and the `atoms_cart` /
//! `atoms_frac` blocks are read. Keywords are case-insensitive, `!` and `#`
//! start comments, and `=`, `:` or blanks separate a keyword from its value.
use crate::error::{Result, TbError};
use crate::utils::{parse_real, parse_token};
use log::debug;
use ndarray::prelude::*;

/// Bohr radius in Angstrom.
pub const BOHR: f64 = 0.52917721092;

#[derive(Debug, Clone, PartialEq)]
pub enum AtomCoords {
    /// Angstrom.
    Cartesian(Array1<f64>),
    /// Units of the lattice vectors.
    Fractional(Array1<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WinAtom {
    pub symbol: String,
    pub coords: AtomCoords,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WinData {
    /// Rows are the lattice vectors in Angstrom.
    pub unit_cell: Option<Array2<f64>>,
    pub atoms: Vec<WinAtom>,
    pub num_wann: Option<usize>,
}

struct WinLine<'a> {
    number: usize,
    text: &'a str,
}

fn strip_comment(line: &str) -> &str {
    match line.find(['!', '#']) {
        Some(p) => &line[..p],
        None => line,
    }
}

fn block_lines<'a>(
    lines: &mut impl Iterator<Item = WinLine<'a>>,
    name: &str,
    start: usize,
    file: &str,
) -> Result<Vec<WinLine<'a>>> {
    let mut out = Vec::new();
    for line in lines {
        let lower = line.text.to_lowercase();
        let mut t = lower.split_whitespace();
        if t.next() == Some("end") {
            return match t.next() {
                Some(n) if n == name => Ok(out),
                other => Err(TbError::parse(
                    file,
                    format!(
                        "line {}: 'end {}' closes block '{}' opened at line {}",
                        line.number,
                        other.unwrap_or(""),
                        name,
                        start
                    ),
                )),
            };
        }
        out.push(line);
    }
    Err(TbError::parse(
        file,
        format!("block '{}' opened at line {} is never closed", name, start),
    ))
}

/// Splits off an optional `bohr`/`ang` line and returns the length scale in Angstrom.
fn unit_scale<'a>(lines: &'a [WinLine<'a>], file: &str) -> Result<(f64, &'a [WinLine<'a>])> {
    match lines.first() {
        Some(first) if first.text.split_whitespace().count() == 1 => {
            match first.text.trim().to_lowercase().as_str() {
                "bohr" => Ok((BOHR, &lines[1..])),
                "ang" | "angstrom" => Ok((1.0, &lines[1..])),
                other => Err(TbError::parse(
                    file,
                    format!("line {}: unknown length unit '{}'", first.number, other),
                )),
            }
        }
        _ => Ok((1.0, lines)),
    }
}

fn parse_vector(tokens: &[&str], file: &str, line: usize, what: &str) -> Result<Array1<f64>> {
    let mut v = Array1::<f64>::zeros(3);
    for (c, t) in tokens.iter().enumerate() {
        v[c] = parse_real(t, file, line, what)?;
    }
    Ok(v)
}

pub fn parse_win(text: &str, file: &str) -> Result<WinData> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(n, l)| WinLine {
            number: n + 1,
            text: strip_comment(l).trim(),
        })
        .filter(|l| !l.text.is_empty());
    let mut win = WinData::default();
    while let Some(line) = lines.next() {
        let lower = line.text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| c.is_whitespace() || c == '=' || c == ':')
            .filter(|t| !t.is_empty())
            .collect();
        match tokens.as_slice() {
            ["begin", name, ..] => {
                let name = name.to_string();
                let body = block_lines(&mut lines, &name, line.number, file)?;
                match name.as_str() {
                    "unit_cell_cart" => {
                        let (scale, rows) = unit_scale(&body, file)?;
                        if rows.len() != 3 {
                            return Err(TbError::parse(
                                file,
                                format!("unit_cell_cart needs 3 lattice vectors, found {}", rows.len()),
                            ));
                        }
                        let mut uc = Array2::<f64>::zeros((3, 3));
                        for (i, row) in rows.iter().enumerate() {
                            let t: Vec<&str> = row.text.split_whitespace().collect();
                            if t.len() != 3 {
                                return Err(TbError::parse(
                                    file,
                                    format!("line {}: a lattice vector needs 3 components", row.number),
                                ));
                            }
                            let v = parse_vector(&t, file, row.number, "lattice vector component")?;
                            uc.row_mut(i).assign(&(v * scale));
                        }
                        win.unit_cell = Some(uc);
                    }
                    "atoms_cart" | "atoms_frac" => {
                        let cart = name == "atoms_cart";
                        let (scale, rows) = if cart {
                            unit_scale(&body, file)?
                        } else {
                            (1.0, &body[..])
                        };
                        for row in rows {
                            let t: Vec<&str> = row.text.split_whitespace().collect();
                            if t.len() != 4 {
                                return Err(TbError::parse(
                                    file,
                                    format!("line {}: expected 'symbol x y z'", row.number),
                                ));
                            }
                            let v = parse_vector(&t[1..], file, row.number, "atom coordinate")?;
                            let coords = if cart {
                                AtomCoords::Cartesian(v * scale)
                            } else {
                                AtomCoords::Fractional(v)
                            };
                            win.atoms.push(WinAtom {
                                symbol: t[0].to_string(),
                                coords,
                            });
                        }
                    }
                    _ => {}
                }
            }
            ["num_wann", value, ..] => {
                win.num_wann = Some(parse_token::<usize>(value, file, line.number, "num_wann")?);
            }
            _ => {}
        }
    }
    debug!(
        "{}: unit cell {}, {} atoms, num_wann {:?}",
        file,
        if win.unit_cell.is_some() { "found" } else { "missing" },
        win.atoms.len(),
        win.num_wann
    );
    Ok(win)
}
