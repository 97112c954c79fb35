//! Holds the capabilites for accessing the raw data blocks.
//!
//! Data blocks come in different formats so in here are the modules for
//! different formats as well as common elements like query planners.
mod contigious_multi_channel_read;
mod daqmx;
mod interleaved_multi_channel_read;
mod records;
mod strings;
mod write;

pub use write::ChannelBuffer;
pub(crate) use write::interleave_buffers;

use log::warn;
use records::RecordPlan;

use self::{
    contigious_multi_channel_read::MultiChannelContiguousReader,
    daqmx::DaqMxChannelReader,
    interleaved_multi_channel_read::MultiChannelInterleavedReader,
};
use crate::{
    error::TdmsError,
    index::DataFormat,
    io::{
        data_types::{DataType, TdmsStorageType},
        reader::{BigEndianReader, LittleEndianReader, TdmsReader},
    },
    meta_data::{RawDataMeta, Segment, LEAD_IN_BYTES},
};
use std::io::{Read, Seek};
use std::num::NonZeroU64;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DataLayout {
    Interleaved,
    Contigious,
}

impl std::fmt::Display for DataLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataLayout::Interleaved => write!(f, "Interleaved"),
            DataLayout::Contigious => write!(f, "Contigious"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Endianess {
    Big,
    Little,
}

/// Defines the size of the chunk and whether it is fixed or variable.
///
/// String data would make it variable for example.
#[derive(Clone, PartialEq, Debug)]
pub enum ChunkSize {
    Fixed(u64),
    Variable(u64),
}

/// Implement an addition for chunk size.
///
/// The sizes always add together, but a variable input always produces a variable output.
///
/// The result indicates an overflow condition.
impl ChunkSize {
    fn combine(&mut self, rhs: Self) -> Result<(), TdmsError> {
        match rhs {
            ChunkSize::Fixed(size) => match self {
                ChunkSize::Fixed(existing) | ChunkSize::Variable(existing) => {
                    *existing = existing
                        .checked_add(size)
                        .ok_or(TdmsError::ChunkSizeOverflow)?
                }
            },
            ChunkSize::Variable(size) => match self {
                ChunkSize::Fixed(existing) => {
                    *self = ChunkSize::Variable(
                        existing
                            .checked_add(size)
                            .ok_or(TdmsError::ChunkSizeOverflow)?,
                    )
                }
                ChunkSize::Variable(existing) => {
                    *existing = existing
                        .checked_add(size)
                        .ok_or(TdmsError::ChunkSizeOverflow)?
                }
            },
        }
        Ok(())
    }
}

/// Represents a block of data inside the file for fast random access.
#[derive(Clone, PartialEq, Debug)]
pub struct DataBlock {
    pub start: u64,
    ///Length allows detection where an existing segment is just extended.
    pub length: NonZeroU64,
    pub layout: DataLayout,
    pub channels: Vec<DataFormat>,
    pub byte_order: Endianess,
}

impl DataBlock {
    /// Build a data block from the segment.
    ///
    /// The full channel list is provided seperately as it may be resolved
    /// from previous segments. `segment_start` addresses the segment in the
    /// data file even when the metadata was walked from the index twin.
    pub fn from_segment(
        segment: &Segment,
        segment_start: u64,
        active_channels: Vec<DataFormat>,
    ) -> Result<Self, TdmsError> {
        let byte_order = if segment.toc.big_endian {
            Endianess::Big
        } else {
            Endianess::Little
        };

        let layout = if segment.toc.data_is_interleaved {
            DataLayout::Interleaved
        } else {
            DataLayout::Contigious
        };
        if segment.raw_data_offset > segment.next_segment_offset {
            return Err(TdmsError::InvalidRawOffset);
        }
        let length = NonZeroU64::new(segment.next_segment_offset - segment.raw_data_offset)
            .ok_or(TdmsError::ZeroLengthDataBlock)?;
        if active_channels.is_empty() {
            return Err(TdmsError::SegmentTocDataBlockWithoutDataChannels);
        }

        Ok(DataBlock {
            start: segment.raw_data_offset + LEAD_IN_BYTES + segment_start,
            length,
            layout,
            channels: active_channels,
            byte_order,
        })
    }

    fn is_daqmx(&self) -> bool {
        self.channels
            .iter()
            .any(|channel| matches!(channel, DataFormat::DaqMx(_)))
    }

    /// The plain channel layouts of the block.
    ///
    /// Errors if the block holds DAQmx data which does not describe
    /// channels independently.
    fn fixed_channel_metas(&self) -> Result<Vec<RawDataMeta>, TdmsError> {
        self.channels
            .iter()
            .map(|channel| match channel {
                DataFormat::RawData(meta) => Ok(meta.clone()),
                DataFormat::DaqMx(_) => Err(TdmsError::DaqMxNotInterpretable(
                    "DAQmx channels mixed into a plain data read",
                )),
            })
            .collect()
    }

    /// Calculate the expected size of a single data chunk.
    ///
    /// A data chunk is the raw data written in a single pass over the active
    /// channels and described in the metadata. DAQmx channels share one
    /// strided buffer so contribute a single size rather than summing.
    pub fn chunk_size(&self) -> Result<ChunkSize, TdmsError> {
        if self.is_daqmx() {
            return self.daqmx_chunk_size();
        }

        let mut size = ChunkSize::Fixed(0);
        for channel in &self.channels {
            let meta = match channel {
                DataFormat::RawData(meta) => meta,
                DataFormat::DaqMx(_) => unreachable!("handled by the daqmx path"),
            };
            match meta.total_size_bytes {
                Some(total_size) => {
                    size.combine(ChunkSize::Variable(total_size))?;
                }
                None => {
                    let values = meta
                        .number_of_values
                        .checked_mul(meta.data_type.size() as u64)
                        .ok_or(TdmsError::ChunkSizeOverflow)?;
                    size.combine(ChunkSize::Fixed(values))?;
                }
            }
        }
        Ok(size)
    }

    fn daqmx_chunk_size(&self) -> Result<ChunkSize, TdmsError> {
        let mut chunk = None;
        for channel in &self.channels {
            let index = match channel {
                DataFormat::DaqMx(index) => index,
                DataFormat::RawData(_) => {
                    return Err(TdmsError::DaqMxNotInterpretable(
                        "plain channels mixed into a DAQmx block",
                    ))
                }
            };
            let bytes = index
                .stride()
                .checked_mul(index.number_of_values)
                .ok_or(TdmsError::ChunkSizeOverflow)?;
            match chunk {
                None => chunk = Some(bytes),
                // All channels describe the same shared buffer.
                Some(existing) if existing == bytes => {}
                Some(_) => {
                    return Err(TdmsError::DaqMxNotInterpretable(
                        "channels disagree on the shared buffer size",
                    ))
                }
            }
        }
        Ok(ChunkSize::Fixed(chunk.unwrap_or(0)))
    }

    ///Calculate the number of data chunks written to this data block.
    /// This is the number of repeated writes that have occurred without new metadata.
    pub fn number_of_chunks(&self) -> Result<usize, TdmsError> {
        let size = self.chunk_size()?;

        let chunk_count = match size {
            ChunkSize::Fixed(0) => 0,
            ChunkSize::Fixed(size) => {
                if self.length.get() % size != 0 {
                    warn!(
                        "data block at {} is not a whole number of {size} byte chunks",
                        self.start
                    );
                }
                (self.length.get() / size) as usize
            }
            ChunkSize::Variable(_) => 1,
        };
        Ok(chunk_count)
    }

    /// Read a single channel from the block.
    pub fn read_single<D: TdmsStorageType>(
        &self,
        channel_index: usize,
        reader: &mut (impl Read + Seek),
        output: &mut [D],
    ) -> Result<usize, TdmsError> {
        self.read_single_from(channel_index, 0, reader, output)
    }

    /// Read a single channel from the block starting at a specific sample offset.
    ///
    /// The start_sample parameter indicates how many samples to skip in this block.
    ///
    /// Returns the number of samples actually read.
    pub fn read_single_from<D: TdmsStorageType>(
        &self,
        channel_index: usize,
        start_sample: u64,
        reader: &mut (impl Read + Seek),
        output: &mut [D],
    ) -> Result<usize, TdmsError> {
        let channel = self
            .channels
            .get(channel_index)
            .expect("channel index comes from this block's own data locations");

        if let DataFormat::DaqMx(index) = channel {
            return match self.byte_order {
                Endianess::Big => DaqMxChannelReader::new(
                    BigEndianReader::from_reader(reader),
                    self.start,
                    self.length.get(),
                )
                .read(index, start_sample, output),
                Endianess::Little => DaqMxChannelReader::new(
                    LittleEndianReader::from_reader(reader),
                    self.start,
                    self.length.get(),
                )
                .read(index, start_sample, output),
            };
        }

        let channels = self.fixed_channel_metas()?;
        let mut plan = RecordPlan::build(&channels, vec![(channel_index, start_sample, output)])?;

        match (self.layout, self.byte_order) {
            (DataLayout::Contigious, Endianess::Big) => MultiChannelContiguousReader::new(
                BigEndianReader::from_reader(reader),
                self.start,
                self.length.get(),
            )
            .read(&mut plan),
            (DataLayout::Contigious, Endianess::Little) => MultiChannelContiguousReader::new(
                LittleEndianReader::from_reader(reader),
                self.start,
                self.length.get(),
            )
            .read(&mut plan),
            (DataLayout::Interleaved, Endianess::Big) => MultiChannelInterleavedReader::new(
                BigEndianReader::from_reader(reader),
                self.start,
                self.length.get(),
            )
            .read(&mut plan),
            (DataLayout::Interleaved, Endianess::Little) => MultiChannelInterleavedReader::new(
                LittleEndianReader::from_reader(reader),
                self.start,
                self.length.get(),
            )
            .read(&mut plan),
        }
    }

    /// Read the string channel in this block.
    ///
    /// String blocks hold the channel alone: an offset table then the
    /// concatenated payloads. Strings sharing a block with other channels
    /// are not supported.
    pub fn read_strings(
        &self,
        channel_index: usize,
        reader: &mut (impl Read + Seek),
    ) -> Result<Vec<String>, TdmsError> {
        let channel = self
            .channels
            .get(channel_index)
            .expect("channel index comes from this block's own data locations");

        let meta = match channel {
            DataFormat::RawData(meta) if meta.data_type == DataType::TdmsString => meta,
            DataFormat::RawData(meta) => {
                return Err(TdmsError::DataTypeMismatch(
                    meta.data_type,
                    DataType::TdmsString,
                ))
            }
            DataFormat::DaqMx(_) => {
                return Err(TdmsError::DataTypeMismatch(
                    DataType::DAQmxRawData,
                    DataType::TdmsString,
                ))
            }
        };

        if self.channels.len() != 1 {
            return Err(TdmsError::UnsupportedType(DataType::TdmsString));
        }

        match self.byte_order {
            Endianess::Big => strings::read_string_block(
                BigEndianReader::from_reader(reader),
                self.start,
                meta.number_of_values,
            ),
            Endianess::Little => strings::read_string_block(
                LittleEndianReader::from_reader(reader),
                self.start,
                meta.number_of_values,
            ),
        }
    }
}
