//! Contains wrappers around readers to encode TDMS specific formatting e.g. endianess.

use std::io::{BufReader, Read, Seek};

use crate::error::TdmsError;
use crate::meta_data::TdmsMetaData;

use super::data_types::TdmsStorageType;

pub trait TdmsReader<R: Read + Seek>: Sized {
    fn from_reader(reader: R) -> Self;
    fn read_value<T: TdmsStorageType>(&mut self) -> Result<T, TdmsError>;
    fn read_meta<T: TdmsMetaData>(&mut self) -> Result<T, TdmsError> {
        T::read(self)
    }
    fn read_vec<T: TdmsMetaData>(&mut self, length: usize) -> Result<Vec<T>, TdmsError> {
        // try_reserve so a corrupt length field fails the read
        // rather than aborting on allocation.
        let mut vec = Vec::new();
        vec.try_reserve(length)
            .map_err(|_| TdmsError::VecAllocationFailed)?;
        for _ in 0..length {
            vec.push(self.read_meta()?);
        }
        Ok(vec)
    }
    fn buffered_reader(&mut self) -> &mut BufReader<R>;

    /// Move to an absolute position in the file.
    fn to_file_position(&mut self, position: u64) -> Result<(), TdmsError> {
        self.buffered_reader()
            .seek(std::io::SeekFrom::Start(position))?;
        Ok(())
    }

    /// Move relative to the current file position.
    fn move_position(&mut self, offset: i64) -> Result<(), TdmsError> {
        self.buffered_reader().seek_relative(offset)?;
        Ok(())
    }
}

pub struct LittleEndianReader<R: Read>(BufReader<R>);

impl<R: Read + Seek> TdmsReader<R> for LittleEndianReader<R> {
    fn read_value<T: TdmsStorageType>(&mut self) -> Result<T, TdmsError> {
        T::read_le(&mut self.0)
    }

    fn from_reader(reader: R) -> Self {
        Self(BufReader::new(reader))
    }

    fn buffered_reader(&mut self) -> &mut BufReader<R> {
        &mut self.0
    }
}

pub struct BigEndianReader<R: Read>(BufReader<R>);

impl<R: Read + Seek> TdmsReader<R> for BigEndianReader<R> {
    fn read_value<T: TdmsStorageType>(&mut self) -> Result<T, TdmsError> {
        T::read_be(&mut self.0)
    }

    fn from_reader(reader: R) -> Self {
        Self(BufReader::new(reader))
    }

    fn buffered_reader(&mut self) -> &mut BufReader<R> {
        &mut self.0
    }
}
