//! Decoding of string channel data blocks.
//!
//! A string block is a table of u32 cumulative end offsets, one per value,
//! followed by the concatenated UTF-8 payloads.

use crate::error::TdmsError;
use crate::io::data_types::bytes_to_string;
use crate::io::reader::TdmsReader;
use std::io::{Read, Seek};

pub fn read_string_block<R: Read + Seek>(
    mut reader: impl TdmsReader<R>,
    block_start: u64,
    number_of_values: u64,
) -> Result<Vec<String>, TdmsError> {
    reader.to_file_position(block_start)?;

    let mut offsets = Vec::new();
    offsets
        .try_reserve(number_of_values as usize)
        .map_err(|_| TdmsError::VecAllocationFailed)?;
    let mut previous = 0u32;
    for _ in 0..number_of_values {
        let offset: u32 = reader.read_value()?;
        if offset < previous {
            return Err(TdmsError::StringOffsetsNotMonotonic(block_start));
        }
        offsets.push(offset);
        previous = offset;
    }

    let mut values = Vec::with_capacity(offsets.len());
    let mut start = 0u32;
    for end in offsets {
        let mut bytes = vec![0u8; (end - start) as usize];
        reader.buffered_reader().read_exact(&mut bytes)?;
        values.push(bytes_to_string(bytes));
        start = end;
    }
    Ok(values)
}
