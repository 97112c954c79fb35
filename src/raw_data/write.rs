//! The write side of the raw data handling.
//!
//! Each channel accumulates its pending samples in a [`ChannelBuffer`]
//! between segment writes. Numeric values are stored as their final byte
//! image so a flush is a straight copy. Strings keep the offset table and
//! payload separately and are laid out on write.

use crate::error::TdmsError;
use crate::io::data_types::{DataType, TdmsStorageType};
use crate::io::writer::TdmsWriter;
use crate::meta_data::RawDataMeta;
use std::io::Write;

#[derive(Debug, Clone)]
enum BufferStore {
    Fixed { bytes: Vec<u8>, values: u64 },
    Strings { offsets: Vec<u32>, payload: Vec<u8> },
}

/// The pending samples of one channel.
#[derive(Debug, Clone)]
pub struct ChannelBuffer {
    data_type: DataType,
    big_endian: bool,
    store: BufferStore,
}

impl ChannelBuffer {
    pub fn new(data_type: DataType, big_endian: bool) -> Self {
        Self::with_capacity(data_type, big_endian, 0)
    }

    /// Build with `capacity` bytes preallocated for the sample image.
    pub fn with_capacity(data_type: DataType, big_endian: bool, capacity: usize) -> Self {
        let store = if data_type == DataType::TdmsString {
            BufferStore::Strings {
                offsets: Vec::new(),
                payload: Vec::with_capacity(capacity),
            }
        } else {
            BufferStore::Fixed {
                bytes: Vec::with_capacity(capacity),
                values: 0,
            }
        };
        Self {
            data_type,
            big_endian,
            store,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Append the byte image of the values in the session's endianess.
    pub fn append_values<T: TdmsStorageType>(&mut self, values: &[T]) -> Result<(), TdmsError> {
        if !T::supports_data_type(&self.data_type) {
            return Err(TdmsError::DataTypeMismatch(self.data_type, T::NATURAL_TYPE));
        }
        let BufferStore::Fixed { bytes, values: count } = &mut self.store else {
            return Err(TdmsError::DataTypeMismatch(self.data_type, T::NATURAL_TYPE));
        };
        bytes.reserve(values.len() * T::SIZE_BYTES);
        for value in values {
            if self.big_endian {
                value.write_be(bytes)?;
            } else {
                value.write_le(bytes)?;
            }
        }
        *count += values.len() as u64;
        Ok(())
    }

    /// Append strings, extending the offset table and payload.
    pub fn append_strings(&mut self, values: &[impl AsRef<str>]) -> Result<(), TdmsError> {
        let BufferStore::Strings { offsets, payload } = &mut self.store else {
            return Err(TdmsError::DataTypeMismatch(
                self.data_type,
                DataType::TdmsString,
            ));
        };
        for value in values {
            payload.extend_from_slice(value.as_ref().as_bytes());
            let end = u32::try_from(payload.len()).map_err(|_| TdmsError::ChunkSizeOverflow)?;
            offsets.push(end);
        }
        Ok(())
    }

    pub fn value_count(&self) -> u64 {
        match &self.store {
            BufferStore::Fixed { values, .. } => *values,
            BufferStore::Strings { offsets, .. } => offsets.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value_count() == 0
    }

    /// The total bytes this buffer adds to a raw data block.
    pub fn byte_len(&self) -> u64 {
        match &self.store {
            BufferStore::Fixed { bytes, .. } => bytes.len() as u64,
            BufferStore::Strings { offsets, payload } => {
                (offsets.len() * std::mem::size_of::<u32>() + payload.len()) as u64
            }
        }
    }

    /// The index entry describing the current buffer contents.
    pub fn raw_data_meta(&self) -> RawDataMeta {
        RawDataMeta {
            data_type: self.data_type,
            number_of_values: self.value_count(),
            total_size_bytes: match &self.store {
                BufferStore::Fixed { .. } => None,
                BufferStore::Strings { .. } => Some(self.byte_len()),
            },
        }
    }

    /// The preformatted byte image for fixed width channels.
    ///
    /// Strings have no single image until written, so return None.
    pub fn fixed_bytes(&self) -> Option<&[u8]> {
        match &self.store {
            BufferStore::Fixed { bytes, .. } => Some(bytes),
            BufferStore::Strings { .. } => None,
        }
    }

    /// Write the buffer to the output in block layout.
    pub fn write_to<W: Write, T: TdmsWriter<W>>(&self, writer: &mut T) -> Result<(), TdmsError> {
        match &self.store {
            BufferStore::Fixed { bytes, .. } => writer.write_bytes(bytes),
            BufferStore::Strings { offsets, payload } => {
                for offset in offsets {
                    writer.write_value(offset)?;
                }
                writer.write_bytes(payload)
            }
        }
    }

    pub fn clear(&mut self) {
        match &mut self.store {
            BufferStore::Fixed { bytes, values } => {
                bytes.clear();
                *values = 0;
            }
            BufferStore::Strings { offsets, payload } => {
                offsets.clear();
                payload.clear();
            }
        }
    }
}

/// Assemble the interleaved image of the given channel buffers.
///
/// Rows are striped for the smallest common sample count with the
/// remaining samples of longer channels appended per channel afterwards.
pub(crate) fn interleave_buffers(buffers: &[&ChannelBuffer]) -> Result<Vec<u8>, TdmsError> {
    let mut widths = Vec::with_capacity(buffers.len());
    let mut images = Vec::with_capacity(buffers.len());
    for buffer in buffers {
        if buffer.data_type().is_variable_width() {
            return Err(TdmsError::InterleavedVariableWidth);
        }
        widths.push(buffer.data_type().size() as usize);
        images.push(
            buffer
                .fixed_bytes()
                .expect("fixed width buffers always have a byte image"),
        );
    }

    let min_samples = buffers
        .iter()
        .map(|buffer| buffer.value_count())
        .min()
        .unwrap_or(0) as usize;

    let total: usize = images.iter().map(|image| image.len()).sum();
    let mut output = Vec::with_capacity(total);
    for row in 0..min_samples {
        for (image, width) in images.iter().zip(widths.iter()) {
            output.extend_from_slice(&image[row * width..(row + 1) * width]);
        }
    }
    // tails of channels with extra samples.
    for (image, width) in images.iter().zip(widths.iter()) {
        output.extend_from_slice(&image[min_samples * width..]);
    }
    Ok(output)
}
