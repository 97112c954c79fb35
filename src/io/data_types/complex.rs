//! Complex numbers are stored as a real then imaginary pair.

use std::io::{Read, Write};

use super::*;

/// A complex number.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Complex<T> {
    pub real: T,
    pub imaginary: T,
}

impl<T> Complex<T> {
    pub const fn new(real: T, imaginary: T) -> Self {
        Self { real, imaginary }
    }
}

impl<T> From<(T, T)> for Complex<T> {
    fn from(value: (T, T)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// Macro for scripting the complex type support.
macro_rules! complex_type {
    ($type: ty, $tdms_type:expr) => {
        impl TdmsStorageType for Complex<$type> {
            const NATURAL_TYPE: DataType = $tdms_type;
            const SUPPORTED_TYPES: &'static [DataType] = &[$tdms_type];
            fn read_le(reader: &mut impl Read) -> StorageResult<Self> {
                let real = <$type>::read_le(reader)?;
                let imaginary = <$type>::read_le(reader)?;
                Ok(Self::new(real, imaginary))
            }
            fn read_be(reader: &mut impl Read) -> StorageResult<Self> {
                let real = <$type>::read_be(reader)?;
                let imaginary = <$type>::read_be(reader)?;
                Ok(Self::new(real, imaginary))
            }
            fn write_le(&self, writer: &mut impl Write) -> StorageResult<()> {
                self.real.write_le(writer)?;
                self.imaginary.write_le(writer)?;
                Ok(())
            }
            fn write_be(&self, writer: &mut impl Write) -> StorageResult<()> {
                self.real.write_be(writer)?;
                self.imaginary.write_be(writer)?;
                Ok(())
            }
            fn size(&self) -> usize {
                std::mem::size_of::<$type>() * 2
            }
        }
    };
}

complex_type!(f32, DataType::ComplexSingleFloat);
complex_type!(f64, DataType::ComplexDoubleFloat);

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_complex_double_round_trip() {
        let value = Complex::new(-1.25f64, 3.5f64);
        let mut bytes = vec![];
        value.write_le(&mut bytes).unwrap();
        assert_eq!(bytes.len(), 16);
        let read = Complex::<f64>::read_le(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read, value);
    }

    #[test]
    fn test_complex_single_be_round_trip() {
        let value = Complex::new(0.5f32, -2.0f32);
        let mut bytes = vec![];
        value.write_be(&mut bytes).unwrap();
        assert_eq!(bytes.len(), 8);
        let read = Complex::<f32>::read_be(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read, value);
    }
}
