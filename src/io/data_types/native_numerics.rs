//! Codecs for the numeric types that map directly onto Rust natives.

use std::io::{Read, Write};

use super::*;

/// Macro for scripting the wrapping of the different read methods.
///
/// Should provide the type which has a from_le_bytes and from_be_bytes
/// Then the natural type for the storage type.
/// and then a slice of supported [`DataType`] values.
macro_rules! numeric_type {
    ($type:ty, $natural:expr, $supported:expr) => {
        impl TdmsStorageType for $type {
            const NATURAL_TYPE: DataType = $natural;
            const SUPPORTED_TYPES: &'static [DataType] = $supported;
            fn read_le(reader: &mut impl Read) -> StorageResult<$type> {
                let mut buf = [0u8; std::mem::size_of::<$type>()];
                reader.read_exact(&mut buf)?;
                Ok(<$type>::from_le_bytes(buf))
            }
            fn read_be(reader: &mut impl Read) -> StorageResult<$type> {
                let mut buf = [0u8; std::mem::size_of::<$type>()];
                reader.read_exact(&mut buf)?;
                Ok(<$type>::from_be_bytes(buf))
            }
            fn write_le(&self, writer: &mut impl Write) -> StorageResult<()> {
                writer.write_all(&self.to_le_bytes())?;
                Ok(())
            }
            fn write_be(&self, writer: &mut impl Write) -> StorageResult<()> {
                writer.write_all(&self.to_be_bytes())?;
                Ok(())
            }
            fn size(&self) -> usize {
                Self::SIZE_BYTES
            }
        }
    };
}

numeric_type!(i8, DataType::I8, &[DataType::I8]);
numeric_type!(u8, DataType::U8, &[DataType::U8]);
numeric_type!(i16, DataType::I16, &[DataType::I16]);
numeric_type!(u16, DataType::U16, &[DataType::U16]);
numeric_type!(i32, DataType::I32, &[DataType::I32]);
numeric_type!(u32, DataType::U32, &[DataType::U32]);
numeric_type!(i64, DataType::I64, &[DataType::I64]);
numeric_type!(u64, DataType::U64, &[DataType::U64]);
numeric_type!(
    f64,
    DataType::DoubleFloat,
    &[DataType::DoubleFloat, DataType::DoubleFloatWithUnit]
);
numeric_type!(
    f32,
    DataType::SingleFloat,
    &[DataType::SingleFloat, DataType::SingleFloatWithUnit]
);
