//! Utility functions for reading the Wannier90 text formats

use crate::error::{Result, TbError};
use std::path::Path;
use std::str::FromStr;

/// Reads a whole file into memory. All parsers work on fully buffered text.
pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|e| TbError::FileRead {
        path: path.display().to_string(),
        source: e,
    })
}

/// Name used in error messages for a file given by path.
pub fn file_label<P: AsRef<Path>>(path: P) -> String {
    path.as_ref().display().to_string()
}

/// A line of text together with its 1-based line number.
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    pub number: usize,
    pub text: &'a str,
}

impl<'a> Line<'a> {
    pub fn tokens(&self) -> Vec<&'a str> {
        self.text.split_whitespace().collect()
    }
}

/// Iterator over the non-blank lines of `text`, skipping the first `skip` raw lines.
pub fn content_lines(text: &str, skip: usize) -> impl Iterator<Item = Line<'_>> {
    text.lines()
        .enumerate()
        .skip(skip)
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(n, l)| Line {
            number: n + 1,
            text: l,
        })
}

/// Parses one token, reporting the file, line and what was expected on failure.
pub fn parse_token<T: FromStr>(token: &str, file: &str, line: usize, what: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    token.parse::<T>().map_err(|e| {
        TbError::parse(
            file,
            format!("line {}: failed to parse {} from '{}': {}", line, what, token, e),
        )
    })
}

/// Parses a Fortran-style real, accepting `d`/`D` exponents (`1.0d-3`).
pub fn parse_real(token: &str, file: &str, line: usize, what: &str) -> Result<f64> {
    if token.contains(['d', 'D']) {
        let t = token.replace(['d', 'D'], "e");
        parse_token::<f64>(&t, file, line, what)
    } else {
        parse_token::<f64>(token, file, line, what)
    }
}

/// Checks that a line has exactly `n` tokens.
pub fn expect_tokens<'a>(line: &Line<'a>, n: usize, file: &str, what: &str) -> Result<Vec<&'a str>> {
    let tokens = line.tokens();
    if tokens.len() != n {
        return Err(TbError::parse(
            file,
            format!(
                "line {}: expected {} tokens for {}, found {}",
                line.number,
                n,
                what,
                tokens.len()
            ),
        ));
    }
    Ok(tokens)
}

/// Parses three integer tokens into a lattice vector triple.
pub fn parse_triple(tokens: &[&str], file: &str, line: usize) -> Result<[isize; 3]> {
    let mut r = [0isize; 3];
    for (x, t) in r.iter_mut().zip(tokens.iter()) {
        *x = parse_token::<isize>(t, file, line, "R vector component")?;
    }
    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_skip_blank() {
        let text = "header\n\n 3 \n   \n4 5\n";
        let lines: Vec<_> = content_lines(text, 1).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 3);
        assert_eq!(lines[1].tokens(), vec!["4", "5"]);
    }

    #[test]
    fn fortran_reals() {
        assert_eq!(parse_real("1.5d-1", "f", 1, "x").unwrap(), 0.15);
        assert_eq!(parse_real("-2.0E+2", "f", 1, "x").unwrap(), -200.0);
        let err = parse_real("abc", "f", 7, "hopping").unwrap_err();
        assert!(err.to_string().contains("line 7"));
    }

    #[test]
    fn missing_file() {
        let err = read_to_string("/nonexistent/seedname_hr.dat").unwrap_err();
        assert_eq!(err.class(), crate::error::ErrorClass::Io);
    }
}
