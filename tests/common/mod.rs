//! Shared helpers for the integration tests.
//!
//! Files are written into in-memory buffers so the tests can inspect the
//! exact bytes as well as read them back through the public API.
#![allow(dead_code)]

use monotony::TdmsFile;
use std::io::Cursor;

pub fn load_data(data: Vec<u8>) -> TdmsFile<Cursor<Vec<u8>>> {
    TdmsFile::new(Cursor::new(data)).unwrap()
}

pub fn load_with_index(data: Vec<u8>, index: Vec<u8>) -> TdmsFile<Cursor<Vec<u8>>> {
    TdmsFile::new_with_index(Cursor::new(data), Cursor::new(index)).unwrap()
}

pub fn le_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

pub fn le_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

/// Walk the little endian lead-ins of a data file and return each
/// segment's start offset.
pub fn segment_offsets(bytes: &[u8]) -> Vec<usize> {
    let mut offsets = vec![];
    let mut position = 0usize;
    while position + 28 <= bytes.len() {
        offsets.push(position);
        let next_segment_offset = le_u64(bytes, position + 12);
        if next_segment_offset == u64::MAX {
            break;
        }
        position += 28 + next_segment_offset as usize;
    }
    offsets
}

/// Walk the lead-ins of an index twin, which advance by the metadata size.
pub fn index_segment_offsets(bytes: &[u8]) -> Vec<usize> {
    let mut offsets = vec![];
    let mut position = 0usize;
    while position + 28 <= bytes.len() {
        offsets.push(position);
        let raw_data_offset = le_u64(bytes, position + 20);
        position += 28 + raw_data_offset as usize;
    }
    offsets
}

/// The ToC mask of the segment starting at `offset`.
pub fn toc_at(bytes: &[u8], offset: usize) -> u32 {
    le_u32(bytes, offset + 4)
}

pub const TOC_META_DATA: u32 = 1 << 1;
pub const TOC_NEW_OBJECT_LIST: u32 = 1 << 2;
pub const TOC_RAW_DATA: u32 = 1 << 3;
pub const TOC_INTERLEAVED: u32 = 1 << 5;
pub const TOC_BIG_ENDIAN: u32 = 1 << 6;
pub const TOC_DAQMX: u32 = 1 << 7;
