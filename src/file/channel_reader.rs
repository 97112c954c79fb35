//! Reading channel data out of a loaded file.
//!
//! All reads resolve the channel's data locations through the index and
//! then decode from the data stream, so they work identically whether the
//! index came from the data file itself or its `.tdms_index` twin.

use std::io::{Read, Seek};

use crate::error::TdmsError;
use crate::index::DataFormat;
use crate::io::data_types::{DataType, TdmsStorageType};
use crate::paths::ChannelPath;

use super::TdmsFile;

impl<F: Read + Seek> TdmsFile<F> {
    /// Read the channel from the beginning, filling as much of the output
    /// slice as there is data for.
    ///
    /// Returns the number of samples read.
    pub fn read_channel<D: TdmsStorageType>(
        &mut self,
        channel: &ChannelPath,
        output: &mut [D],
    ) -> Result<usize, TdmsError> {
        self.read_channel_from(channel, 0, output)
    }

    /// Read the channel starting `start_sample` samples in.
    ///
    /// Returns the number of samples read.
    pub fn read_channel_from<D: TdmsStorageType>(
        &mut self,
        channel: &ChannelPath,
        start_sample: u64,
        output: &mut [D],
    ) -> Result<usize, TdmsError> {
        let TdmsFile {
            ref index,
            ref mut file,
        } = *self;
        let locations = index
            .get_channel_data_positions(channel)
            .ok_or_else(|| TdmsError::MissingObject(channel.path().to_string()))?;

        let mut samples_to_skip = start_sample;
        let mut samples_read = 0;
        for location in locations {
            if samples_read >= output.len() {
                break;
            }
            if samples_to_skip >= location.number_of_samples {
                samples_to_skip -= location.number_of_samples;
                continue;
            }
            let block = index
                .get_data_block(location.data_block)
                .expect("data locations always point at registered blocks");
            samples_read += block.read_single_from(
                location.channel_index,
                samples_to_skip,
                file,
                &mut output[samples_read..],
            )?;
            samples_to_skip = 0;
        }
        Ok(samples_read)
    }

    /// Read every value of a string channel.
    pub fn read_channel_strings(
        &mut self,
        channel: &ChannelPath,
    ) -> Result<Vec<String>, TdmsError> {
        let TdmsFile {
            ref index,
            ref mut file,
        } = *self;

        match index.channel_format(channel) {
            Some(DataFormat::RawData(meta)) if meta.data_type == DataType::TdmsString => {}
            Some(format) => {
                return Err(TdmsError::DataTypeMismatch(
                    format.surfaced_data_type(),
                    DataType::TdmsString,
                ))
            }
            None => return Err(TdmsError::MissingObject(channel.path().to_string())),
        }

        let locations = index
            .get_channel_data_positions(channel)
            .ok_or_else(|| TdmsError::MissingObject(channel.path().to_string()))?;

        let mut values = Vec::new();
        for location in locations {
            let block = index
                .get_data_block(location.data_block)
                .expect("data locations always point at registered blocks");
            values.extend(block.read_strings(location.channel_index, file)?);
        }
        Ok(values)
    }

    /// Iterate the channel in chunks of up to `chunk_size` samples.
    ///
    /// Each item is one decoded chunk, so large channels can stream
    /// through a bounded buffer.
    pub fn channel_iter<D: TdmsStorageType + Default + Clone>(
        &mut self,
        channel: ChannelPath,
        chunk_size: usize,
    ) -> Result<ChannelChunks<'_, F, D>, TdmsError> {
        let remaining = self
            .channel_length(&channel)
            .ok_or_else(|| TdmsError::MissingObject(channel.path().to_string()))?;
        Ok(ChannelChunks {
            file: self,
            channel,
            position: 0,
            remaining,
            chunk_size,
            _marker: std::marker::PhantomData,
        })
    }
}

/// Streaming iterator over a channel's samples. See
/// [`TdmsFile::channel_iter`].
pub struct ChannelChunks<'a, F: Read + Seek, D> {
    file: &'a mut TdmsFile<F>,
    channel: ChannelPath,
    position: u64,
    remaining: u64,
    chunk_size: usize,
    _marker: std::marker::PhantomData<D>,
}

impl<F: Read + Seek, D: TdmsStorageType + Default + Clone> Iterator for ChannelChunks<'_, F, D> {
    type Item = Result<Vec<D>, TdmsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.chunk_size == 0 {
            return None;
        }
        let count = (self.remaining as usize).min(self.chunk_size);
        let mut buffer = vec![D::default(); count];
        match self
            .file
            .read_channel_from(&self.channel, self.position, &mut buffer)
        {
            Ok(0) => {
                self.remaining = 0;
                None
            }
            Ok(samples_read) => {
                buffer.truncate(samples_read);
                self.position += samples_read as u64;
                self.remaining -= samples_read as u64;
                Some(Ok(buffer))
            }
            Err(error) => {
                self.remaining = 0;
                Some(Err(error))
            }
        }
    }
}
