//! Sound data image access

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

/// Largest image the drivers can address
pub const MAX_IMAGE_SIZE: usize = 0x10000;

/// Read-only view over a loaded sound data image
///
/// All offsets are absolute indices into the view. A view may be relocated
/// to a sub-image with [`SoundData::relocate`], after which offsets are
/// relative to the new origin.
#[derive(Debug, Clone, Copy)]
pub struct SoundData<'a> {
    data: &'a [u8],
}

impl<'a> SoundData<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() > MAX_IMAGE_SIZE {
            return Err(Error::ImageTooLarge(data.len()));
        }
        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read a byte at `offset`
    pub fn byte(&self, offset: usize) -> Result<u8> {
        self.data
            .get(offset)
            .copied()
            .ok_or_else(|| self.out_of_bounds(offset))
    }

    /// Read a 16-bit little-endian value at `offset`
    pub fn word(&self, offset: usize) -> Result<u16> {
        let lo = self.byte(offset)? as u16;
        let hi = self.byte(offset + 1)? as u16;
        Ok(lo | (hi << 8))
    }

    /// Read `len` bytes starting at `offset`
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        self.data
            .get(offset..offset + len)
            .ok_or_else(|| self.out_of_bounds(offset + len))
    }

    /// Start offset of a logical channel from the pointer table at the origin
    pub fn channel_start(&self, ch: usize) -> Result<usize> {
        Ok(self.word(ch * 2)? as usize)
    }

    /// New view whose origin is `base`
    pub fn relocate(&self, base: usize) -> Result<SoundData<'a>> {
        match self.data.get(base..) {
            Some(data) => Ok(SoundData { data }),
            None => Err(self.out_of_bounds(base)),
        }
    }

    /// `offset - distance`, the target of a backward reference
    pub fn back_reference(&self, offset: usize, distance: u16) -> Result<usize> {
        offset
            .checked_sub(distance as usize)
            .ok_or_else(|| self.out_of_bounds(offset.wrapping_sub(distance as usize)))
    }

    fn out_of_bounds(&self, offset: usize) -> Error {
        Error::OutOfBounds {
            offset,
            size: self.data.len(),
        }
    }
}

/// Load a sound data image, decompressing gzip input if necessary
pub fn load_image(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Can't open '{}': {}", path.display(), e),
        ))
    })?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    decode_image(data)
}

/// Accept raw or gzip-compressed image bytes
pub fn decode_image(data: Vec<u8>) -> Result<Vec<u8>> {
    let data = if data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b {
        let mut decoder = GzDecoder::new(Cursor::new(data));
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        decompressed
    } else {
        data
    };

    if data.len() > MAX_IMAGE_SIZE {
        return Err(Error::ImageTooLarge(data.len()));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_word_little_endian() {
        let bytes = [0x34, 0x12, 0xff];
        let data = SoundData::new(&bytes).unwrap();
        assert_eq!(data.word(0).unwrap(), 0x1234);
        assert_eq!(data.word(1).unwrap(), 0xff12);
    }

    #[test]
    fn test_out_of_bounds() {
        let bytes = [0x00, 0x01];
        let data = SoundData::new(&bytes).unwrap();
        assert!(matches!(
            data.word(1),
            Err(Error::OutOfBounds { offset: 2, size: 2 })
        ));
        assert!(data.back_reference(1, 2).is_err());
        assert_eq!(data.back_reference(5, 2).unwrap(), 3);
    }

    #[test]
    fn test_relocate() {
        let bytes = [0x00, 0x00, 0x78, 0x56];
        let data = SoundData::new(&bytes).unwrap();
        let sub = data.relocate(2).unwrap();
        assert_eq!(sub.channel_start(0).unwrap(), 0x5678);
        assert!(data.relocate(5).is_err());
    }

    #[test]
    fn test_too_large() {
        let bytes = vec![0u8; MAX_IMAGE_SIZE + 1];
        assert!(matches!(
            SoundData::new(&bytes),
            Err(Error::ImageTooLarge(_))
        ));
    }

    #[test]
    fn test_decode_gzip_image() {
        let raw = vec![0x12, 0x00, 0xff, 0x00, 0x00];
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(decode_image(compressed).unwrap(), raw);
        assert_eq!(decode_image(raw.clone()).unwrap(), raw);
    }
}
