use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::matrix::Matrix;
use crate::types::{Result, Vec3};
use crate::vasp_parsers::binary_io::{ReadValuesExt, WriteValuesExt};

pub const LDOS_FORMAT_VERSION: u32 = 103;

/// Width of the free-text header block, space padded.
pub const HEADER_TEXT_LEN: usize = 500;

/// The fixed-width part of the LDOS file, shared between the writer and
/// `LdosHeader::from_file` so the layout stays symmetric.
///
/// On-disk order (little endian): text block, format version (u32), four
/// u32 counts (spins, k-points, bands, layers), supercell height and Fermi
/// energy (f64), then the reserved min/max block (f64, f64, f32) that the
/// writer patches after the last record.
#[derive(Debug, Clone, PartialEq)]
pub struct LdosHeader {
    pub text: String,
    pub version: u32,
    pub n_spins: u32,
    pub n_kpoints: u32,
    pub n_bands: u32,
    pub n_layers: u32,
    pub supercell_height: f64,
    pub efermi: f64,
    pub energy_min: f64,
    pub energy_max: f64,
    pub cs_sq_max: f32,
}

impl LdosHeader {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let file = File::open(path.as_ref())
            .context(format!("Failed to open LDOS file {:?}", path.as_ref()))?;
        let mut file = BufReader::new(file);

        let mut text = vec![0u8; HEADER_TEXT_LEN];
        std::io::Read::read_exact(&mut file, &mut text)?;
        let text = String::from_utf8_lossy(&text).trim_end().to_string();

        Ok(Self {
            text,
            version: file.read_u32::<LittleEndian>()?,
            n_spins: file.read_u32::<LittleEndian>()?,
            n_kpoints: file.read_u32::<LittleEndian>()?,
            n_bands: file.read_u32::<LittleEndian>()?,
            n_layers: file.read_u32::<LittleEndian>()?,
            supercell_height: file.read_f64::<LittleEndian>()?,
            efermi: file.read_f64::<LittleEndian>()?,
            energy_min: file.read_f64::<LittleEndian>()?,
            energy_max: file.read_f64::<LittleEndian>()?,
            cs_sq_max: file.read_f32::<LittleEndian>()?,
        })
    }
}

/// Streaming LDOS writer.
///
/// Writes the header up front with zeroed min/max slots, then one record per
/// (spin, kpoint) in iteration order, and finally patches the reserved slots
/// via `write_minmax_values`. Every write is checked; any I/O error aborts
/// the run.
pub struct LdosWriter {
    file: BufWriter<File>,
    minmax_pos: u64,
    n_bands: usize,
    n_layers: usize,
}

impl LdosWriter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        path: &(impl AsRef<Path> + ?Sized),
        n_spins: usize,
        n_kpoints: usize,
        n_bands: usize,
        n_layers: usize,
        supercell_height: f64,
        efermi: f64,
        comment: &str,
    ) -> Result<Self> {
        assert!(n_spins > 0 && n_kpoints > 0 && n_bands > 0 && n_layers > 0);

        let file = File::create(path.as_ref())
            .context(format!("Failed to create LDOS file {:?}", path.as_ref()))?;
        let mut file = BufWriter::new(file);

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mut text = format!(
            "Depth-resolved DOS data file, created at unix time {}; \
             {} k points, {} bands, {} layers",
            timestamp, n_kpoints, n_bands, n_layers,
        );
        if !comment.is_empty() {
            text += &format!("; Comment: {}", comment);
        }
        file.write_padded_str(&text, HEADER_TEXT_LEN)?;

        file.write_u32::<LittleEndian>(LDOS_FORMAT_VERSION)?;
        file.write_u32::<LittleEndian>(n_spins as u32)?;
        file.write_u32::<LittleEndian>(n_kpoints as u32)?;
        file.write_u32::<LittleEndian>(n_bands as u32)?;
        file.write_u32::<LittleEndian>(n_layers as u32)?;
        file.write_f64::<LittleEndian>(supercell_height)?;
        file.write_f64::<LittleEndian>(efermi)?;

        let minmax_pos = file.stream_position()?;
        file.write_f64::<LittleEndian>(0.0)?; // reserved for energy_min
        file.write_f64::<LittleEndian>(0.0)?; // reserved for energy_max
        file.write_f32::<LittleEndian>(0.0)?; // reserved for cs_sq_max

        Ok(Self {
            file,
            minmax_pos,
            n_bands,
            n_layers,
        })
    }

    /// Appends one (spin, kpoint) record: wavevector, band energies, band
    /// occupations, then the accumulated `|c|^2` slab, column major.
    pub fn write_ldos(
        &mut self,
        k: &Vec3,
        energies: &[f64],
        occupations: &[f64],
        cs_sq: &Matrix<f32>,
    ) -> Result<()> {
        debug_assert_eq!(energies.len(), self.n_bands);
        debug_assert_eq!(occupations.len(), self.n_bands);
        debug_assert_eq!(cs_sq.nrow(), self.n_layers);
        debug_assert_eq!(cs_sq.ncol(), self.n_bands);

        self.file.write_vec3(k)?;
        self.file.write_f64_slice(energies)?;
        self.file.write_f64_slice(occupations)?;
        self.file.write_f32_slice(cs_sq.as_slice())?;
        Ok(())
    }

    /// Patches the reserved header slots with the global statistics.
    pub fn write_minmax_values(
        &mut self,
        energy_min: f64,
        energy_max: f64,
        cs_sq_max: f32,
    ) -> Result<()> {
        debug_assert!(energy_min <= energy_max);

        self.file.seek(SeekFrom::Start(self.minmax_pos))?;
        self.file.write_f64::<LittleEndian>(energy_min)?;
        self.file.write_f64::<LittleEndian>(energy_max)?;
        self.file.write_f32::<LittleEndian>(cs_sq_max)?;
        self.file.flush()?;
        Ok(())
    }
}

/// One decoded (spin, kpoint) record; the read-side counterpart of
/// `LdosWriter::write_ldos`, mainly for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct LdosRecord {
    pub k: Vec3,
    pub energies: Vec<f64>,
    pub occupations: Vec<f64>,
    pub cs_sq: Vec<f32>,
}

impl LdosRecord {
    pub fn read_nth(path: &(impl AsRef<Path> + ?Sized), header: &LdosHeader, n: usize) -> Result<Self> {
        let nb = header.n_bands as usize;
        let nl = header.n_layers as usize;
        let record_len = (3 + 2 * nb) * 8 + nl * nb * 4;
        let records_start = HEADER_TEXT_LEN as u64 + 4 * 5 + 8 * 4 + 4;

        let mut file = BufReader::new(File::open(path.as_ref())?);
        file.seek(SeekFrom::Start(records_start + (n * record_len) as u64))?;

        Ok(Self {
            k: file.read_vec3()?,
            energies: file.read_f64_vec(nb)?,
            occupations: file.read_f64_vec(nb)?,
            cs_sq: file.read_f32_vec(nl * nb)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn write_sample(path: &std::path::Path) -> LdosWriter {
        LdosWriter::new(path, 1, 2, 2, 3, 24.0, 1.25, "test comment").unwrap()
    }

    #[test]
    fn test_header_roundtrip() {
        let dir = TempDir::new("rsldos").unwrap();
        let path = dir.path().join("LDOS");

        let mut writer = write_sample(&path);
        let mut slab = Matrix::<f32>::new(3, 2);
        slab[(0, 0)] = 1.0;
        for _ in 0 .. 2 {
            writer
                .write_ldos(&[0.0, 0.25, 0.5], &[1.0, 2.0], &[2.0, 0.0], &slab)
                .unwrap();
        }
        writer.write_minmax_values(1.0, 2.0, 4.5).unwrap();
        drop(writer);

        let header = LdosHeader::from_file(&path).unwrap();
        assert_eq!(header.version, LDOS_FORMAT_VERSION);
        assert_eq!(header.n_spins, 1);
        assert_eq!(header.n_kpoints, 2);
        assert_eq!(header.n_bands, 2);
        assert_eq!(header.n_layers, 3);
        assert_eq!(header.supercell_height, 24.0);
        assert_eq!(header.efermi, 1.25);
        assert_eq!(header.energy_min, 1.0);
        assert_eq!(header.energy_max, 2.0);
        assert_eq!(header.cs_sq_max, 4.5);
        assert!(header.text.contains("2 k points, 2 bands, 3 layers"));
        assert!(header.text.contains("Comment: test comment"));
    }

    #[test]
    fn test_record_roundtrip() {
        let dir = TempDir::new("rsldos").unwrap();
        let path = dir.path().join("LDOS");

        let mut writer = write_sample(&path);
        let mut slab = Matrix::<f32>::new(3, 2);
        slab[(2, 1)] = 7.0;
        writer
            .write_ldos(&[0.0, 0.0, 0.0], &[-1.0, 3.0], &[2.0, 0.0], &slab)
            .unwrap();
        slab[(0, 0)] = 1.5;
        writer
            .write_ldos(&[0.0, 0.0, 0.5], &[-2.0, 4.0], &[2.0, 1.0], &slab)
            .unwrap();
        writer.write_minmax_values(-2.0, 4.0, 7.0).unwrap();
        drop(writer);

        let header = LdosHeader::from_file(&path).unwrap();
        let rec = LdosRecord::read_nth(&path, &header, 1).unwrap();
        assert_eq!(rec.k, [0.0, 0.0, 0.5]);
        assert_eq!(rec.energies, vec![-2.0, 4.0]);
        assert_eq!(rec.occupations, vec![2.0, 1.0]);
        // column major: (layer, band) = (0, 0) first, (2, 1) last
        assert_eq!(rec.cs_sq[0], 1.5);
        assert_eq!(rec.cs_sq[5], 7.0);
    }

    #[test]
    fn test_minmax_patch_is_idempotent() {
        let dir = TempDir::new("rsldos").unwrap();
        let path = dir.path().join("LDOS");

        let mut writer = write_sample(&path);
        let slab = Matrix::<f32>::new(3, 2);
        for _ in 0 .. 2 {
            writer
                .write_ldos(&[0.0; 3], &[0.5, 1.5], &[2.0, 0.0], &slab)
                .unwrap();
        }
        writer.write_minmax_values(0.5, 1.5, 2.5).unwrap();
        let first = std::fs::read(&path).unwrap();

        writer.write_minmax_values(0.5, 1.5, 2.5).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        drop(writer);
    }
}
