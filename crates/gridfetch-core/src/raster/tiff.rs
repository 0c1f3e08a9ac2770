//! Minimal TIFF IFD plumbing for `TiffCodec`.
//!
//! Handles both byte orders. Reads `SamplesPerPixel` (tag 277) from the
//! first IFD; rewrites `ImageDescription` (tag 270) by appending the new
//! string and a rebuilt IFD at the end of the file and repointing the
//! header's IFD offset. Image data is never touched.

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use super::RasterError;

const TAG_IMAGE_DESCRIPTION: u16 = 270;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Le,
    Be,
}

impl ByteOrder {
    fn u16(self, b: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Le => u16::from_le_bytes(b),
            ByteOrder::Be => u16::from_be_bytes(b),
        }
    }

    fn u32(self, b: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Le => u32::from_le_bytes(b),
            ByteOrder::Be => u32::from_be_bytes(b),
        }
    }

    fn put_u16(self, v: u16) -> [u8; 2] {
        match self {
            ByteOrder::Le => v.to_le_bytes(),
            ByteOrder::Be => v.to_be_bytes(),
        }
    }

    fn put_u32(self, v: u32) -> [u8; 4] {
        match self {
            ByteOrder::Le => v.to_le_bytes(),
            ByteOrder::Be => v.to_be_bytes(),
        }
    }
}

struct Tiff {
    order: ByteOrder,
    buf: Vec<u8>,
}

impl Tiff {
    fn parse(buf: Vec<u8>) -> Result<Self, RasterError> {
        if buf.len() < 8 {
            return Err(RasterError::Format("file shorter than TIFF header".into()));
        }
        let order = match &buf[0..2] {
            b"II" => ByteOrder::Le,
            b"MM" => ByteOrder::Be,
            _ => return Err(RasterError::Format("not a TIFF (bad byte-order mark)".into())),
        };
        let tiff = Tiff { order, buf };
        if tiff.u16_at(2)? != 42 {
            return Err(RasterError::Format("not a TIFF (bad magic)".into()));
        }
        Ok(tiff)
    }

    fn slice(&self, off: usize, len: usize) -> Result<&[u8], RasterError> {
        self.buf
            .get(off..off + len)
            .ok_or_else(|| RasterError::Format(format!("truncated TIFF at offset {}", off)))
    }

    fn u16_at(&self, off: usize) -> Result<u16, RasterError> {
        let b = self.slice(off, 2)?;
        Ok(self.order.u16([b[0], b[1]]))
    }

    fn u32_at(&self, off: usize) -> Result<u32, RasterError> {
        let b = self.slice(off, 4)?;
        Ok(self.order.u32([b[0], b[1], b[2], b[3]]))
    }

    /// Offset, entry count, and raw 12-byte entries of the first IFD,
    /// plus the next-IFD pointer that follows them.
    fn first_ifd(&self) -> Result<(usize, Vec<[u8; 12]>, u32), RasterError> {
        let ifd_off = self.u32_at(4)? as usize;
        let count = self.u16_at(ifd_off)? as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let raw = self.slice(ifd_off + 2 + i * 12, 12)?;
            let mut e = [0u8; 12];
            e.copy_from_slice(raw);
            entries.push(e);
        }
        let next = self.u32_at(ifd_off + 2 + count * 12)?;
        Ok((ifd_off, entries, next))
    }

    fn entry_tag(&self, e: &[u8; 12]) -> u16 {
        self.order.u16([e[0], e[1]])
    }

    fn entry_type(&self, e: &[u8; 12]) -> u16 {
        self.order.u16([e[2], e[3]])
    }

    fn entry_count(&self, e: &[u8; 12]) -> u32 {
        self.order.u32([e[4], e[5], e[6], e[7]])
    }

    fn entry_value_u32(&self, e: &[u8; 12]) -> Result<u32, RasterError> {
        match self.entry_type(e) {
            TYPE_SHORT => Ok(u32::from(self.order.u16([e[8], e[9]]))),
            TYPE_LONG => Ok(self.order.u32([e[8], e[9], e[10], e[11]])),
            t => Err(RasterError::Format(format!("unexpected type {} for scalar tag", t))),
        }
    }
}

/// Reads the band count (`SamplesPerPixel`) from the first IFD.
/// The tag is optional in TIFF; its default is 1.
pub fn read_band_count(path: &Path) -> Result<u32, RasterError> {
    let tiff = Tiff::parse(fs::read(path)?)?;
    let (_, entries, _) = tiff.first_ifd()?;
    for e in &entries {
        if tiff.entry_tag(e) == TAG_SAMPLES_PER_PIXEL {
            return tiff.entry_value_u32(e);
        }
    }
    Ok(1)
}

/// Reads the `ImageDescription` string, if any.
pub fn read_description(path: &Path) -> Result<Option<String>, RasterError> {
    let tiff = Tiff::parse(fs::read(path)?)?;
    let (_, entries, _) = tiff.first_ifd()?;
    for e in &entries {
        if tiff.entry_tag(e) != TAG_IMAGE_DESCRIPTION {
            continue;
        }
        let count = tiff.entry_count(e) as usize;
        let data = if count <= 4 {
            &e[8..8 + count]
        } else {
            let off = tiff.order.u32([e[8], e[9], e[10], e[11]]) as usize;
            tiff.slice(off, count)?
        };
        let text = data.strip_suffix(&[0]).unwrap_or(data);
        return Ok(Some(String::from_utf8_lossy(text).into_owned()));
    }
    Ok(None)
}

/// Replaces (or adds) the `ImageDescription` tag.
///
/// Appends the string and a rebuilt IFD at the end of the file and patches
/// the header's first-IFD offset; the original IFD and image data become
/// dead bytes, which TIFF permits.
pub fn write_description(path: &Path, text: &str) -> Result<(), RasterError> {
    let tiff = Tiff::parse(fs::read(path)?)?;
    let (_, entries, next_ifd) = tiff.first_ifd()?;
    let order = tiff.order;

    let mut kept: Vec<[u8; 12]> = entries
        .into_iter()
        .filter(|e| tiff.entry_tag(e) != TAG_IMAGE_DESCRIPTION)
        .collect();

    let mut desc = text.as_bytes().to_vec();
    desc.push(0); // ASCII values are NUL-terminated
    let desc_len = desc.len() as u32;

    let file_len = tiff.buf.len() as u64;
    // Word-align everything we append.
    let desc_offset = file_len + (file_len & 1);
    let ifd_offset = {
        let end = desc_offset + u64::from(desc_len);
        end + (end & 1)
    };
    if ifd_offset > u64::from(u32::MAX) {
        return Err(RasterError::Format("file too large for 32-bit IFD offset".into()));
    }

    let mut entry = [0u8; 12];
    entry[0..2].copy_from_slice(&order.put_u16(TAG_IMAGE_DESCRIPTION));
    entry[2..4].copy_from_slice(&order.put_u16(TYPE_ASCII));
    entry[4..8].copy_from_slice(&order.put_u32(desc_len));
    if desc_len <= 4 {
        entry[8..8 + desc.len()].copy_from_slice(&desc);
    } else {
        entry[8..12].copy_from_slice(&order.put_u32(desc_offset as u32));
    }

    // IFD entries must stay sorted by tag.
    let pos = kept
        .iter()
        .position(|e| tiff.entry_tag(e) > TAG_IMAGE_DESCRIPTION)
        .unwrap_or(kept.len());
    kept.insert(pos, entry);

    let mut blob = Vec::with_capacity(desc.len() + kept.len() * 12 + 16);
    if file_len & 1 == 1 {
        blob.push(0);
    }
    if desc_len > 4 {
        blob.extend_from_slice(&desc);
        if (desc_offset + u64::from(desc_len)) & 1 == 1 {
            blob.push(0);
        }
    }
    let ifd_offset = if desc_len > 4 { ifd_offset } else { desc_offset };
    blob.extend_from_slice(&order.put_u16(kept.len() as u16));
    for e in &kept {
        blob.extend_from_slice(e);
    }
    blob.extend_from_slice(&order.put_u32(next_ifd));

    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    file.seek(SeekFrom::Start(file_len))?;
    file.write_all(&blob)?;
    file.seek(SeekFrom::Start(4))?;
    file.write_all(&order.put_u32(ifd_offset as u32))?;
    file.sync_all()?;
    Ok(())
}

/// Builds a minimal little-endian TIFF with the given band count, enough
/// for codec tests. No image data.
#[cfg(test)]
pub(crate) fn build_test_tiff(bands: u16) -> Vec<u8> {
    let order = ByteOrder::Le;
    let mut buf = Vec::new();
    buf.extend_from_slice(b"II");
    buf.extend_from_slice(&order.put_u16(42));
    buf.extend_from_slice(&order.put_u32(8)); // first IFD right after header

    let entries: [(u16, u16, u32, u32); 3] = [
        (256, TYPE_LONG, 1, 1),               // ImageWidth
        (257, TYPE_LONG, 1, 1),               // ImageLength
        (TAG_SAMPLES_PER_PIXEL, TYPE_SHORT, 1, u32::from(bands)),
    ];
    buf.extend_from_slice(&order.put_u16(entries.len() as u16));
    for (tag, ty, count, value) in entries {
        buf.extend_from_slice(&order.put_u16(tag));
        buf.extend_from_slice(&order.put_u16(ty));
        buf.extend_from_slice(&order.put_u32(count));
        if ty == TYPE_SHORT {
            buf.extend_from_slice(&order.put_u16(value as u16));
            buf.extend_from_slice(&[0, 0]);
        } else {
            buf.extend_from_slice(&order.put_u32(value));
        }
    }
    buf.extend_from_slice(&order.put_u32(0)); // no further IFDs
    buf
}
