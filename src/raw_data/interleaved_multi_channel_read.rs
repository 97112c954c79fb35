//! Reader of an interleaved multi-channel data block.
//!
//! Samples share a fixed row: sample n of every channel sits in row n.
//! Channels with more samples than the shortest channel have their extra
//! samples appended contiguously after the strided rows.

use crate::error::TdmsError;
use crate::io::data_types::TdmsStorageType;
use crate::io::reader::TdmsReader;
use crate::raw_data::records::RecordPlan;
use std::{
    io::{Read, Seek},
    marker::PhantomData,
};

pub struct MultiChannelInterleavedReader<R: Read + Seek, T: TdmsReader<R>> {
    reader: T,
    _marker: PhantomData<R>,
    block_start: u64,
    block_length: u64,
}

impl<R: Read + Seek, T: TdmsReader<R>> MultiChannelInterleavedReader<R, T> {
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
    /// Returns the maximum samples read into any output.
    pub fn read<D: TdmsStorageType>(
        &mut self,
        plan: &mut RecordPlan<'_, D>,
    ) -> Result<usize, TdmsError> {
        let chunk_bytes = plan.chunk_bytes();
        if chunk_bytes == 0 {
            return Ok(0);
        }
        let row_bytes = plan.row_bytes();
        let min_samples = plan.min_samples();
        let chunk_count = self.block_length / chunk_bytes;

        // Byte offsets of each channel within a row and within the tail
        // section that follows the strided rows.
        let shapes: Vec<(u64, u64)> = plan
            .entries()
            .iter()
            .map(|entry| (entry.samples, entry.width))
            .collect();
        let mut column_offsets = Vec::with_capacity(shapes.len());
        let mut tail_offsets = Vec::with_capacity(shapes.len());
        let mut column = 0u64;
        let mut tail = 0u64;
        for (samples, width) in &shapes {
            column_offsets.push(column);
            tail_offsets.push(tail);
            column += width;
            tail += (samples - min_samples) * width;
        }

        for chunk in 0..chunk_count {
            let chunk_start = self.block_start + chunk * chunk_bytes;
            let tail_start = chunk_start + min_samples * row_bytes;
            for (entry_index, entry) in plan.entries_mut().iter_mut().enumerate() {
                let Some(output) = entry.output.as_mut() else {
                    continue;
                };
                let skipped = output.samples_to_skip.min(entry.samples);
                output.samples_to_skip -= skipped;
                let to_read = (entry.samples - skipped).min(output.remaining());
                for sample in skipped..(skipped + to_read) {
                    let position = if sample < min_samples {
                        chunk_start + sample * row_bytes + column_offsets[entry_index]
                    } else {
                        tail_start + tail_offsets[entry_index] + (sample - min_samples) * entry.width
                    };
                    self.reader.to_file_position(position)?;
                    output.slice[output.samples_read] = self.reader.read_value()?;
                    output.samples_read += 1;
                }
            }
        }
        Ok(plan.max_samples_read())
    }
}
