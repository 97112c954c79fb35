//! Extraction of channel values from DAQmx raw data blocks.
//!
//! DAQmx blocks are a sequence of fixed size strides shared by every
//! channel in the segment. A channel's values sit at its primary scaler's
//! byte offset within each stride.

use log::warn;

use crate::error::TdmsError;
use crate::io::data_types::TdmsStorageType;
use crate::io::reader::TdmsReader;
use crate::meta_data::DaqMxIndex;
use std::{
    io::{Read, Seek},
    marker::PhantomData,
};

pub struct DaqMxChannelReader<R: Read + Seek, T: TdmsReader<R>> {
    reader: T,
    _marker: PhantomData<R>,
    block_start: u64,
    block_length: u64,
}

impl<R: Read + Seek, T: TdmsReader<R>> DaqMxChannelReader<R, T> {
    pub fn new(reader: T, block_start: u64, block_length: u64) -> Self {
        Self {
            reader,
            _marker: PhantomData,
            block_start,
            block_length,
        }
    }

    /// Read the channel's primary scaler values starting at `start_sample`.
    ///
    /// Returns the number of samples read.
    pub fn read<D: TdmsStorageType>(
        &mut self,
        index: &DaqMxIndex,
        start_sample: u64,
        output: &mut [D],
    ) -> Result<usize, TdmsError> {
        let scaler = index.primary_scaler()?;
        if !D::supports_data_type(&scaler.data_type) {
            return Err(TdmsError::DataTypeMismatch(
                scaler.data_type,
                D::NATURAL_TYPE,
            ));
        }

        let stride = index.stride();
        if stride == 0 {
            return Err(TdmsError::DaqMxNotInterpretable("zero width stride"));
        }
        if scaler.raw_byte_offset as u64 + D::SIZE_BYTES as u64 > stride {
            return Err(TdmsError::DaqMxNotInterpretable(
                "scaler value extends past the stride",
            ));
        }
        if self.block_length % stride != 0 {
            warn!(
                "DAQmx block at {} is not a whole number of {stride} byte strides",
                self.block_start
            );
        }

        // Chunks repeat the stride pattern so all strides can be walked
        // as one run.
        let total_strides = self.block_length / stride;
        let mut samples_read = 0usize;
        for sample in start_sample..total_strides {
            if samples_read >= output.len() {
                break;
            }
            self.reader
                .to_file_position(self.block_start + sample * stride + scaler.raw_byte_offset as u64)?;
            output[samples_read] = self.reader.read_value()?;
            samples_read += 1;
        }
        Ok(samples_read)
    }
}
