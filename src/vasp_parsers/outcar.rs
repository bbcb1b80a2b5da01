use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use regex::Regex;

use crate::types::Result;

/// The little OUTCAR needs: the version line and the Fermi level.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcar {
    pub vasp_info: String,
    pub efermi: f64,
}

impl Outcar {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .context(format!("Failed to open OUTCAR {:?}", path.as_ref()))?;
        Self::from_str(&content)
    }

    /// The first non-blank line must start with "vasp" (case-insensitively)
    /// and is kept as the version string. The Fermi level comes from the
    /// first "E-fermi :  x.xxxx" line; an unparsable value yields NaN, a
    /// missing line too.
    pub fn from_str(content: &str) -> Result<Self> {
        let mut lines = content.lines().skip_while(|l| l.trim().is_empty());

        let vasp_info = match lines.next() {
            Some(l) => l.trim().to_string(),
            None => bail!("Bad OUTCAR file: empty file"),
        };
        if !vasp_info.to_lowercase().starts_with("vasp") {
            bail!("Bad OUTCAR file: header {:?} does not start with 'vasp'", vasp_info);
        }

        let re = Regex::new(r"(?i)^\s*e-fermi[^:]*:(.*)$").unwrap();
        let mut efermi = f64::NAN;
        for line in lines {
            if let Some(cap) = re.captures(line) {
                efermi = cap[1]
                    .split_whitespace()
                    .next()
                    .and_then(|tok| tok.parse::<f64>().ok())
                    .unwrap_or(f64::NAN);
                break;
            }
        }

        Ok(Self { vasp_info, efermi })
    }
}

impl fmt::Display for Outcar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OUTCAR file:")?;
        writeln!(f, "  VASP info: {}", self.vasp_info)?;
        write!(f, "  Fermi energy: {} eV", self.efermi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
 vasp.5.4.4.18Apr17-6-g9f103f2a35 (build Aug 01 2017) complex

 POTCAR:    PAW_PBE Si 05Jan2001
 ...
 E-fermi :   2.9331     XC(G=0): -10.1234     alpha+bet : -5.5555
";

    #[test]
    fn test_parse() {
        let outcar = Outcar::from_str(SAMPLE).unwrap();
        assert!(outcar.vasp_info.starts_with("vasp.5.4.4"));
        assert_eq!(outcar.efermi, 2.9331);
    }

    #[test]
    fn test_bad_header_is_rejected() {
        assert!(Outcar::from_str("not an outcar\n E-fermi :  1.0\n").is_err());
        assert!(Outcar::from_str("").is_err());
    }

    #[test]
    fn test_missing_efermi_is_nan() {
        let outcar = Outcar::from_str("vasp.6.3.0\n nothing else\n").unwrap();
        assert!(outcar.efermi.is_nan());
    }

    #[test]
    fn test_unparsable_efermi_is_nan() {
        let outcar = Outcar::from_str("vasp.6.3.0\n E-fermi : garbage\n").unwrap();
        assert!(outcar.efermi.is_nan());
    }
}
