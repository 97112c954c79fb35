//! Handle the properties of a file, group or channel.
//!
//! This is based around an enum that can represent all the possible types of property values.

use crate::error::TdmsError;
use crate::io::data_types::{Complex, DataType, ExtendedRaw, TdmsStorageType, Timestamp};
use crate::io::reader::TdmsReader;
use crate::io::writer::TdmsWriter;
use crate::meta_data::TdmsMetaData;
use std::io::{Read, Seek, Write};

/// A wrapper type for data types found in tdms files
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Void,
    Boolean(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    SingleFloat(f32),
    DoubleFloat(f64),
    Extended(ExtendedRaw),
    String(String),
    ComplexSingleFloat(Complex<f32>),
    ComplexDoubleFloat(Complex<f64>),
    Timestamp(Timestamp),
}

impl PropertyValue {
    pub const fn datatype(&self) -> DataType {
        match self {
            PropertyValue::Void => DataType::Void,
            PropertyValue::Boolean(_) => DataType::Boolean,
            PropertyValue::I8(_) => DataType::I8,
            PropertyValue::I16(_) => DataType::I16,
            PropertyValue::I32(_) => DataType::I32,
            PropertyValue::I64(_) => DataType::I64,
            PropertyValue::U8(_) => DataType::U8,
            PropertyValue::U16(_) => DataType::U16,
            PropertyValue::U32(_) => DataType::U32,
            PropertyValue::U64(_) => DataType::U64,
            PropertyValue::SingleFloat(_) => DataType::SingleFloat,
            PropertyValue::DoubleFloat(_) => DataType::DoubleFloat,
            PropertyValue::Extended(_) => DataType::ExtendedFloat,
            PropertyValue::String(_) => DataType::TdmsString,
            PropertyValue::ComplexSingleFloat(_) => DataType::ComplexSingleFloat,
            PropertyValue::ComplexDoubleFloat(_) => DataType::ComplexDoubleFloat,
            PropertyValue::Timestamp(_) => DataType::Timestamp,
        }
    }
}

fn write_property_components<W: Write, T: TdmsStorageType>(
    writer: &mut impl TdmsWriter<W>,
    data_type: DataType,
    value: &T,
) -> Result<(), TdmsError> {
    writer.write_meta(&data_type)?;
    writer.write_value(value)?;
    Ok(())
}

impl TdmsMetaData for PropertyValue {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<Self, TdmsError> {
        let raw_type: DataType = reader.read_meta()?;

        match raw_type {
            DataType::Void => Ok(PropertyValue::Void),
            DataType::Boolean => Ok(PropertyValue::Boolean(reader.read_value()?)),
            DataType::I8 => Ok(PropertyValue::I8(reader.read_value()?)),
            DataType::I16 => Ok(PropertyValue::I16(reader.read_value()?)),
            DataType::I32 => Ok(PropertyValue::I32(reader.read_value()?)),
            DataType::I64 => Ok(PropertyValue::I64(reader.read_value()?)),
            DataType::U8 => Ok(PropertyValue::U8(reader.read_value()?)),
            DataType::U16 => Ok(PropertyValue::U16(reader.read_value()?)),
            DataType::U32 => Ok(PropertyValue::U32(reader.read_value()?)),
            DataType::U64 => Ok(PropertyValue::U64(reader.read_value()?)),
            DataType::SingleFloat | DataType::SingleFloatWithUnit => {
                Ok(PropertyValue::SingleFloat(reader.read_value()?))
            }
            DataType::DoubleFloat | DataType::DoubleFloatWithUnit => {
                Ok(PropertyValue::DoubleFloat(reader.read_value()?))
            }
            DataType::ExtendedFloat | DataType::ExtendedFloatWithUnit => {
                Ok(PropertyValue::Extended(reader.read_value()?))
            }
            DataType::ComplexSingleFloat => {
                Ok(PropertyValue::ComplexSingleFloat(reader.read_value()?))
            }
            DataType::ComplexDoubleFloat => {
                Ok(PropertyValue::ComplexDoubleFloat(reader.read_value()?))
            }
            DataType::TdmsString => Ok(PropertyValue::String(reader.read_value()?)),
            DataType::Timestamp => Ok(PropertyValue::Timestamp(reader.read_value()?)),
            _ => Err(TdmsError::UnsupportedType(raw_type)),
        }
    }

    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError> {
        match self {
            PropertyValue::Void => writer.write_meta(&self.datatype()),
            PropertyValue::Boolean(value) => {
                write_property_components(writer, self.datatype(), value)
            }
            PropertyValue::I8(value) => write_property_components(writer, self.datatype(), value),
            PropertyValue::I16(value) => write_property_components(writer, self.datatype(), value),
            PropertyValue::I32(value) => write_property_components(writer, self.datatype(), value),
            PropertyValue::I64(value) => write_property_components(writer, self.datatype(), value),
            PropertyValue::U8(value) => write_property_components(writer, self.datatype(), value),
            PropertyValue::U16(value) => write_property_components(writer, self.datatype(), value),
            PropertyValue::U32(value) => write_property_components(writer, self.datatype(), value),
            PropertyValue::U64(value) => write_property_components(writer, self.datatype(), value),
            PropertyValue::SingleFloat(value) => {
                write_property_components(writer, self.datatype(), value)
            }
            PropertyValue::DoubleFloat(value) => {
                write_property_components(writer, self.datatype(), value)
            }
            PropertyValue::Extended(value) => {
                write_property_components(writer, self.datatype(), value)
            }
            PropertyValue::String(value) => {
                write_property_components(writer, self.datatype(), value)
            }
            PropertyValue::ComplexSingleFloat(value) => {
                write_property_components(writer, self.datatype(), value)
            }
            PropertyValue::ComplexDoubleFloat(value) => {
                write_property_components(writer, self.datatype(), value)
            }
            PropertyValue::Timestamp(value) => {
                write_property_components(writer, self.datatype(), value)
            }
        }
    }

    fn size(&self) -> usize {
        let internal_size = match self {
            PropertyValue::Void => 0,
            PropertyValue::Boolean(value) => value.size(),
            PropertyValue::I8(value) => value.size(),
            PropertyValue::I16(value) => value.size(),
            PropertyValue::I32(value) => value.size(),
            PropertyValue::I64(value) => value.size(),
            PropertyValue::U8(value) => value.size(),
            PropertyValue::U16(value) => value.size(),
            PropertyValue::U32(value) => value.size(),
            PropertyValue::U64(value) => value.size(),
            PropertyValue::SingleFloat(value) => value.size(),
            PropertyValue::DoubleFloat(value) => value.size(),
            PropertyValue::Extended(value) => value.size(),
            PropertyValue::String(value) => value.size(),
            PropertyValue::ComplexSingleFloat(value) => value.size(),
            PropertyValue::ComplexDoubleFloat(value) => value.size(),
            PropertyValue::Timestamp(value) => value.size(),
        };
        internal_size + std::mem::size_of::<u32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::reader::LittleEndianReader;
    use crate::io::writer::LittleEndianWriter;
    use std::io::Cursor;

    fn round_trip(value: PropertyValue) {
        let mut bytes = vec![];
        {
            let mut writer = LittleEndianWriter::from_writer(Cursor::new(&mut bytes));
            writer.write_meta(&value).unwrap();
        }
        assert_eq!(bytes.len(), value.size());
        let mut reader = LittleEndianReader::from_reader(Cursor::new(bytes));
        let read: PropertyValue = reader.read_meta().unwrap();
        assert_eq!(read, value);
    }

    #[test]
    fn test_property_round_trips() {
        round_trip(PropertyValue::Void);
        round_trip(PropertyValue::Boolean(true));
        round_trip(PropertyValue::I32(-42));
        round_trip(PropertyValue::U64(u64::MAX));
        round_trip(PropertyValue::DoubleFloat(1.25));
        round_trip(PropertyValue::String("a property".to_string()));
        round_trip(PropertyValue::ComplexDoubleFloat(Complex::new(1.0, -1.0)));
        round_trip(PropertyValue::Timestamp(Timestamp::new(12345, 678)));
    }

    #[test]
    fn test_unknown_property_type() {
        //example from NI site
        let test_buffer = [
            0x23, 00, 00, 00, 0x2Fu8, 0x27, 0x4D, 0x65, 0x61, 0x73, 0x75, 0x72, 0x65, 0x64, 0x20,
            0x54, 0x68, 0x72, 0x6F, 0x75, 0x67, 0x68, 0x70, 0x75, 0x74, 0x20, 0x44, 0x61, 0x74,
            0x61, 0x20, 0x28, 0x56, 0x6F, 0x6C, 0x74, 0x73, 0x29, 0x27,
        ];
        let mut cursor = Cursor::new(test_buffer);
        let mut reader = LittleEndianReader::from_reader(&mut cursor);
        let result: Result<PropertyValue, TdmsError> = reader.read_meta();
        assert!(matches!(result, Err(TdmsError::UnknownPropertyType(0x23))));
    }
}
