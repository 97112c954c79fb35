//! The extended float type is not representable in Rust.
//!
//! It is carried as its raw 16 byte image so that files containing
//! extended data can still round trip through this library.

use std::io::{Read, Write};

use super::*;

/// A wrapper around the raw bytes that make up an extended float.
///
/// No arithmetic is provided, this just persists existing values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtendedRaw(u128);

impl ExtendedRaw {
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub const fn raw_value(&self) -> u128 {
        self.0
    }
}

impl TdmsStorageType for ExtendedRaw {
    const SUPPORTED_TYPES: &'static [DataType] =
        &[DataType::ExtendedFloat, DataType::ExtendedFloatWithUnit];

    const NATURAL_TYPE: DataType = DataType::ExtendedFloat;

    fn read_le(reader: &mut impl Read) -> StorageResult<Self> {
        Ok(ExtendedRaw(u128::from_le_bytes(read_image(reader)?)))
    }

    fn read_be(reader: &mut impl Read) -> StorageResult<Self> {
        Ok(ExtendedRaw(u128::from_be_bytes(read_image(reader)?)))
    }

    fn write_le(&self, writer: &mut impl Write) -> StorageResult<()> {
        writer.write_all(&self.0.to_le_bytes())?;
        Ok(())
    }

    fn write_be(&self, writer: &mut impl Write) -> StorageResult<()> {
        writer.write_all(&self.0.to_be_bytes())?;
        Ok(())
    }

    fn size(&self) -> usize {
        std::mem::size_of::<u128>()
    }
}

fn read_image(reader: &mut impl Read) -> StorageResult<[u8; 16]> {
    let mut buffer = [0u8; 16];
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}
