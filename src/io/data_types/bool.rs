//! Booleans are a single byte on disk where any non-zero value is true.

use std::io::{Read, Write};

use super::*;

impl TdmsStorageType for bool {
    const SUPPORTED_TYPES: &'static [DataType] = &[DataType::Boolean];

    const NATURAL_TYPE: DataType = DataType::Boolean;

    fn read_le(reader: &mut impl Read) -> StorageResult<Self> {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf)?;
        Ok(buf[0] != 0)
    }

    fn read_be(reader: &mut impl Read) -> StorageResult<Self> {
        // no endianess for bool.
        Self::read_le(reader)
    }

    fn write_le(&self, writer: &mut impl Write) -> StorageResult<()> {
        writer.write_all(&[*self as u8])?;
        Ok(())
    }

    fn write_be(&self, writer: &mut impl Write) -> StorageResult<()> {
        // no endianess for bool.
        Self::write_le(self, writer)
    }

    fn size(&self) -> usize {
        1
    }
}
