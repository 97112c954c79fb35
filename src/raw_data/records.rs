//! The record module defines functions and capabilities to plan
//! for the structure of records/entries in a data segment.
//!
//! This is used to define a read pattern for a data segment and
//! is used by the data readers to efficiently read the data.

use crate::{error::TdmsError, io::data_types::TdmsStorageType, meta_data::RawDataMeta};

/// The output destination for a channel that is being read.
#[derive(Debug)]
pub struct ChannelOutput<'a, D> {
    pub slice: &'a mut [D],
    /// Samples of this channel still to pass over before reading starts.
    pub samples_to_skip: u64,
    /// Samples delivered into the slice so far.
    pub samples_read: usize,
}

impl<D> ChannelOutput<'_, D> {
    /// The capacity left in the output slice.
    pub fn remaining(&self) -> u64 {
        (self.slice.len() - self.samples_read) as u64
    }
}

/// One channel's portion of a chunk: its shape plus the output to fill
/// if the channel is being read rather than passed over.
#[derive(Debug)]
pub struct RecordEntry<'a, D> {
    /// Values of this channel per chunk.
    pub samples: u64,
    /// Element width in bytes.
    pub width: u64,
    pub output: Option<ChannelOutput<'a, D>>,
}

/// The record plan encodes the structure of the block
/// ready for reading. Marking sizes and positions of readable
/// records and their outputs.
#[derive(Debug)]
pub struct RecordPlan<'a, D>(Vec<RecordEntry<'a, D>>);

impl<'a, D: TdmsStorageType> RecordPlan<'a, D> {
    /// Build a record plan for the channels specified.
    ///
    /// `channels` - This is the structure of the data segment.
    /// `outputs` - The channel indexes to read with the samples to skip
    /// first and the buffer to read into.
    pub fn build(
        channels: &[RawDataMeta],
        outputs: Vec<(usize, u64, &'a mut [D])>,
    ) -> Result<RecordPlan<'a, D>, TdmsError> {
        validate_types_match(&outputs, channels)?;

        let mut entries: Vec<RecordEntry<'a, D>> = channels
            .iter()
            .map(|channel| {
                if channel.data_type.is_variable_width() {
                    // Cannot pass over a channel of unknown byte size.
                    Err(TdmsError::UnsupportedType(channel.data_type))
                } else {
                    Ok(RecordEntry {
                        samples: channel.number_of_values,
                        width: channel.data_type.size() as u64,
                        output: None,
                    })
                }
            })
            .collect::<Result<_, TdmsError>>()?;

        for (channel_index, samples_to_skip, slice) in outputs {
            entries[channel_index].output = Some(ChannelOutput {
                slice,
                samples_to_skip,
                samples_read: 0,
            });
        }

        Ok(Self(entries))
    }

    pub fn entries_mut(&mut self) -> &mut [RecordEntry<'a, D>] {
        &mut self.0[..]
    }

    pub fn entries(&self) -> &[RecordEntry<'a, D>] {
        &self.0[..]
    }

    /// Get the size of a full chunk over all channels in bytes.
    pub fn chunk_bytes(&self) -> u64 {
        self.0.iter().map(|entry| entry.samples * entry.width).sum()
    }

    /// Get the size of one interleaved row in bytes.
    pub fn row_bytes(&self) -> u64 {
        self.0.iter().map(|entry| entry.width).sum()
    }

    /// The smallest per channel sample count, which bounds the strided
    /// portion of an interleaved chunk.
    pub fn min_samples(&self) -> u64 {
        self.0
            .iter()
            .map(|entry| entry.samples)
            .min()
            .unwrap_or(0)
    }

    /// The most samples read into any output.
    pub fn max_samples_read(&self) -> usize {
        self.0
            .iter()
            .filter_map(|entry| entry.output.as_ref())
            .map(|output| output.samples_read)
            .max()
            .unwrap_or(0)
    }
}

fn validate_types_match<D: TdmsStorageType>(
    outputs: &[(usize, u64, &mut [D])],
    channels: &[RawDataMeta],
) -> Result<(), TdmsError> {
    for (output_idx, _, _) in outputs.iter() {
        if !D::supports_data_type(&channels[*output_idx].data_type) {
            return Err(TdmsError::DataTypeMismatch(
                channels[*output_idx].data_type,
                D::NATURAL_TYPE,
            ));
        }
    }
    Ok(())
}
