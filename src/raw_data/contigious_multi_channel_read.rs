//! Reader for blocks where each channel's samples are laid out back to back.

use crate::error::TdmsError;
use crate::io::data_types::TdmsStorageType;
use crate::io::reader::TdmsReader;
use crate::raw_data::records::RecordPlan;
use std::{
    io::{Read, Seek},
    marker::PhantomData,
};

pub struct MultiChannelContiguousReader<R: Read + Seek, T: TdmsReader<R>> {
    reader: T,
    _marker: PhantomData<R>,
    block_start: u64,
    block_length: u64,
}

impl<R: Read + Seek, T: TdmsReader<R>> MultiChannelContiguousReader<R, T> {
    pub fn new(reader: T, block_start: u64, block_length: u64) -> Self {
        Self {
            reader,
            _marker: PhantomData,
            block_start,
            block_length,
        }
    }

    /// Read the planned channels from the block.
    ///
    /// The block repeats the chunk structure back to back so each chunk
    /// contributes `samples` values per channel. Returns the maximum
    /// samples read into any output.
    pub fn read<D: TdmsStorageType>(
        &mut self,
        plan: &mut RecordPlan<'_, D>,
    ) -> Result<usize, TdmsError> {
        let chunk_bytes = plan.chunk_bytes();
        if chunk_bytes == 0 {
            return Ok(0);
        }
        let chunk_count = self.block_length / chunk_bytes;

        for chunk in 0..chunk_count {
            let chunk_start = self.block_start + chunk * chunk_bytes;
            let mut channel_offset = 0u64;
            for entry in plan.entries_mut() {
                let entry_bytes = entry.samples * entry.width;
                if let Some(output) = entry.output.as_mut() {
                    let skipped = output.samples_to_skip.min(entry.samples);
                    output.samples_to_skip -= skipped;
                    let to_read = (entry.samples - skipped).min(output.remaining());
                    if to_read > 0 {
                        self.reader.to_file_position(
                            chunk_start + channel_offset + skipped * entry.width,
                        )?;
                        for _ in 0..to_read {
                            output.slice[output.samples_read] = self.reader.read_value()?;
                            output.samples_read += 1;
                        }
                    }
                }
                channel_offset += entry_bytes;
            }
        }
        Ok(plan.max_samples_read())
    }
}
