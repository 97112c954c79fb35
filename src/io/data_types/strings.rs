//! Handling of string data.
//!
//! Strings are a u32 byte length followed by that many bytes of UTF-8.
//! Decoding is lossy - ill-formed sequences become U+FFFD rather than
//! failing the surrounding read.

use std::io::{Read, Write};

use super::*;

fn read_string_with_length(reader: &mut impl Read, length: u32) -> Result<String, TdmsError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(length as usize)
        .map_err(|_| TdmsError::VecAllocationFailed)?;
    buffer.resize(length as usize, 0);
    reader.read_exact(&mut buffer[..])?;
    Ok(bytes_to_string(buffer))
}

/// Decode the bytes, replacing invalid sequences instead of erroring.
pub(crate) fn bytes_to_string(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(value) => value,
        Err(error) => String::from_utf8_lossy(error.as_bytes()).into_owned(),
    }
}

impl TdmsStorageType for String {
    const SUPPORTED_TYPES: &'static [DataType] = &[DataType::TdmsString];

    const NATURAL_TYPE: DataType = DataType::TdmsString;

    fn read_le(reader: &mut impl Read) -> Result<Self, TdmsError> {
        let length = u32::read_le(reader)?;
        read_string_with_length(reader, length)
    }

    fn read_be(reader: &mut impl Read) -> Result<Self, TdmsError> {
        let length = u32::read_be(reader)?;
        read_string_with_length(reader, length)
    }

    fn write_le(&self, writer: &mut impl Write) -> StorageResult<()> {
        writer.write_all(&(self.len() as u32).to_le_bytes())?;
        writer.write_all(self.as_bytes())?;
        Ok(())
    }

    fn write_be(&self, writer: &mut impl Write) -> StorageResult<()> {
        writer.write_all(&(self.len() as u32).to_be_bytes())?;
        writer.write_all(self.as_bytes())?;
        Ok(())
    }

    fn size(&self) -> usize {
        self.len() + std::mem::size_of::<u32>()
    }
}
