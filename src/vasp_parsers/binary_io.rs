//! byteorder-backed helpers shared by the WAVECAR reader and the LDOS writer.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::types::Vec3;

pub trait ReadValuesExt: Read {
    fn read_vec3(&mut self) -> io::Result<Vec3> {
        let mut v = [0.0f64; 3];
        self.read_f64_into::<LittleEndian>(&mut v)?;
        Ok(v)
    }

    fn read_f64_vec(&mut self, len: usize) -> io::Result<Vec<f64>> {
        let mut v = vec![0.0f64; len];
        self.read_f64_into::<LittleEndian>(&mut v)?;
        Ok(v)
    }

    fn read_f32_vec(&mut self, len: usize) -> io::Result<Vec<f32>> {
        let mut v = vec![0.0f32; len];
        self.read_f32_into::<LittleEndian>(&mut v)?;
        Ok(v)
    }
}

impl<R: Read + ?Sized> ReadValuesExt for R {}

pub trait WriteValuesExt: Write {
    fn write_vec3(&mut self, v: &Vec3) -> io::Result<()> {
        self.write_f64_slice(v)
    }

    fn write_f64_slice(&mut self, values: &[f64]) -> io::Result<()> {
        for &v in values {
            self.write_f64::<LittleEndian>(v)?;
        }
        Ok(())
    }

    fn write_f32_slice(&mut self, values: &[f32]) -> io::Result<()> {
        for &v in values {
            self.write_f32::<LittleEndian>(v)?;
        }
        Ok(())
    }

    /// Writes `s` truncated or space-padded to exactly `width` bytes.
    fn write_padded_str(&mut self, s: &str, width: usize) -> io::Result<()> {
        let mut buf = s.as_bytes().to_vec();
        buf.resize(width, b' ');
        self.write_all(&buf)
    }
}

impl<W: Write + ?Sized> WriteValuesExt for W {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_vec3_roundtrip() {
        let mut buf = Vec::new();
        buf.write_vec3(&[1.0, -2.5, 3.25]).unwrap();
        assert_eq!(buf.len(), 24);

        let v = Cursor::new(buf).read_vec3().unwrap();
        assert_eq!(v, [1.0, -2.5, 3.25]);
    }

    #[test]
    fn test_padded_str() {
        let mut buf = Vec::new();
        buf.write_padded_str("abc", 8).unwrap();
        assert_eq!(&buf, b"abc     ");

        let mut buf = Vec::new();
        buf.write_padded_str("abcdefghij", 4).unwrap();
        assert_eq!(&buf, b"abcd");
    }
}
