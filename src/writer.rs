//! The writer session which frames pending channel data into segments.
//!
//! The session owns the data file and its index twin and keeps the object
//! tree with its pending channel buffers. Each [`TdmsFileWriter::write_segment`]
//! call classifies the pending state and either does nothing, extends the
//! previous segment with raw data alone, or writes a full segment with
//! incremental metadata.
//!
//! Every lead-in first lands with the incomplete marker and only gains its
//! real offsets once the blocks behind it are on disk, so a crash mid-flush
//! never corrupts the earlier segments.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use indexmap::IndexMap;
use log::debug;

use crate::error::TdmsError;
use crate::io::data_types::{DataType, TdmsStorageType};
use crate::io::writer::{BigEndianWriter, LittleEndianWriter, TdmsWriter};
use crate::meta_data::{
    FileTag, MetaData, ObjectMetaData, RawDataIndex, RawDataMeta, TdmsMetaData, ToC, LEAD_IN_BYTES,
    SUPPORTED_VERSIONS,
};
use crate::paths::{parse_object_path, ChannelPath, ParsedPath, PropertyPath};
use crate::properties::PropertyValue;
use crate::raw_data::{interleave_buffers, ChannelBuffer};

/// The extension of the twin file holding lead-ins and metadata only.
pub const INDEX_FILE_EXTENSION: &str = "tdms_index";

/// Options for a writer session. There is no global state, every session
/// gets its own copy.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Format version to stamp into each lead-in. 4713 unless you need to
    /// match a legacy toolchain.
    pub version: u32,
    /// Write the `.tdms_index` twin alongside the data file.
    pub create_index_file: bool,
    /// Stripe samples across channels rather than one channel after another.
    pub interleaved: bool,
    /// Write every numeric field of the file in big endian.
    pub big_endian: bool,
    /// Bytes to preallocate for each channel's pending buffer.
    pub buffer_size: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            version: 4713,
            create_index_file: true,
            interleaved: false,
            big_endian: false,
            buffer_size: 0,
        }
    }
}

/// Writer wrapper so the endianess option can be picked at runtime.
enum EndianWriter<W: Write + Seek> {
    Little(LittleEndianWriter<W>),
    Big(BigEndianWriter<W>),
}

impl<W: Write + Seek> EndianWriter<W> {
    fn new(writer: W, big_endian: bool) -> Self {
        if big_endian {
            Self::Big(BigEndianWriter::from_writer(writer))
        } else {
            Self::Little(LittleEndianWriter::from_writer(writer))
        }
    }

    fn write_meta<T: TdmsMetaData>(&mut self, value: &T) -> Result<(), TdmsError> {
        match self {
            Self::Little(writer) => writer.write_meta(value),
            Self::Big(writer) => writer.write_meta(value),
        }
    }

    fn write_buffer(&mut self, buffer: &ChannelBuffer) -> Result<(), TdmsError> {
        match self {
            Self::Little(writer) => buffer.write_to(writer),
            Self::Big(writer) => buffer.write_to(writer),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TdmsError> {
        match self {
            Self::Little(writer) => writer.write_bytes(bytes),
            Self::Big(writer) => writer.write_bytes(bytes),
        }
    }

    fn write_lead_in(&mut self, tag: FileTag, toc: ToC, version: u32) -> Result<(), TdmsError> {
        match self {
            Self::Little(writer) => writer.write_lead_in(tag, toc, version),
            Self::Big(writer) => writer.write_lead_in(tag, toc, version),
        }
    }

    fn finalise_lead_in(
        &mut self,
        segment_start: u64,
        next_segment_offset: u64,
        raw_data_offset: u64,
    ) -> Result<(), TdmsError> {
        match self {
            Self::Little(writer) => {
                writer.finalise_lead_in(segment_start, next_segment_offset, raw_data_offset)
            }
            Self::Big(writer) => {
                writer.finalise_lead_in(segment_start, next_segment_offset, raw_data_offset)
            }
        }
    }

    fn stream_position(&mut self) -> Result<u64, TdmsError> {
        match self {
            Self::Little(writer) => writer.stream_position(),
            Self::Big(writer) => writer.stream_position(),
        }
    }

    fn sync(&mut self) -> Result<(), TdmsError> {
        match self {
            Self::Little(writer) => writer.sync(),
            Self::Big(writer) => writer.sync(),
        }
    }
}

/// The property map and change tracking shared by every object.
#[derive(Debug, Default)]
struct ObjectState {
    /// Properties in insertion order.
    properties: Vec<(String, PropertyValue)>,
    properties_modified: bool,
    /// Whether the object has appeared in a committed segment yet.
    written: bool,
}

impl ObjectState {
    fn set_property(&mut self, name: &str, value: PropertyValue) {
        match self.properties.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.properties.push((name.to_string(), value)),
        }
        self.properties_modified = true;
    }

    fn mark_committed(&mut self) {
        self.properties_modified = false;
        self.written = true;
    }
}

/// Everything the writer tracks per channel.
#[derive(Debug)]
struct ChannelState {
    buffer: ChannelBuffer,
    object: ObjectState,
    /// The layout declared in the last committed segment. Drives the
    /// matches-previous sentinel and the raw-only append mode.
    last_committed: Option<RawDataMeta>,
    committed_samples: u64,
}

impl ChannelState {
    fn new(data_type: DataType, big_endian: bool, buffer_size: usize) -> Self {
        Self {
            buffer: ChannelBuffer::with_capacity(data_type, big_endian, buffer_size),
            object: ObjectState::default(),
            last_committed: None,
            committed_samples: 0,
        }
    }

    fn pending_index(&self) -> RawDataIndex {
        if self.buffer.is_empty() {
            RawDataIndex::None
        } else {
            let meta = self.buffer.raw_data_meta();
            if self.last_committed.as_ref() == Some(&meta) {
                RawDataIndex::MatchPrevious
            } else {
                RawDataIndex::RawData(meta)
            }
        }
    }

    fn index_changed(&self) -> bool {
        self.last_committed.as_ref() != Some(&self.buffer.raw_data_meta())
    }
}

/// A writer session over a data file and its optional index twin.
///
/// ```rust
/// use monotony::{DataType, TdmsFileWriter, WriterOptions};
/// use std::io::Cursor;
///
/// let mut data = Vec::new();
/// let mut writer = TdmsFileWriter::from_streams(
///     Cursor::new(&mut data),
///     None,
///     WriterOptions::default(),
/// ).unwrap();
/// let channel = writer.ensure_channel("group", "channel", DataType::I32).unwrap();
/// writer.append_values(&channel, &[1i32, 2, 3]).unwrap();
/// writer.write_segment().unwrap();
/// ```
pub struct TdmsFileWriter<W: Write + Seek> {
    data: EndianWriter<W>,
    index: Option<EndianWriter<W>>,
    options: WriterOptions,
    file_object: ObjectState,
    groups: IndexMap<String, ObjectState>,
    channels: IndexMap<String, ChannelState>,
    /// Channel paths that had data in the last committed segment, in the
    /// order their raw data was laid out.
    previous_active: Vec<String>,
    has_previous_segment: bool,
    current_segment_has_data: bool,
    segment_start: u64,
    index_segment_start: u64,
    segment_next_offset: u64,
    segment_raw_offset: u64,
}

impl TdmsFileWriter<File> {
    /// Create the data file at the path, plus the `.tdms_index` twin next to
    /// it unless the options say otherwise. Existing files are replaced.
    pub fn create(path: impl AsRef<Path>, options: WriterOptions) -> Result<Self, TdmsError> {
        let path = path.as_ref();
        let data = File::create(path)?;
        let index = if options.create_index_file {
            Some(File::create(path.with_extension(INDEX_FILE_EXTENSION))?)
        } else {
            None
        };
        Self::from_streams(data, index, options)
    }

    pub fn create_with_defaults(path: impl AsRef<Path>) -> Result<Self, TdmsError> {
        Self::create(path, WriterOptions::default())
    }
}

impl<W: Write + Seek> TdmsFileWriter<W> {
    /// Start a session over arbitrary sinks, e.g. in memory buffers.
    pub fn from_streams(
        data: W,
        index: Option<W>,
        options: WriterOptions,
    ) -> Result<Self, TdmsError> {
        if !SUPPORTED_VERSIONS.contains(&options.version) {
            return Err(TdmsError::UnsupportedVersion(options.version));
        }
        let big_endian = options.big_endian;
        Ok(Self {
            data: EndianWriter::new(data, big_endian),
            index: index.map(|index| EndianWriter::new(index, big_endian)),
            options,
            file_object: ObjectState {
                // The root always exists, its presence alone never forces
                // a segment.
                written: true,
                ..ObjectState::default()
            },
            groups: IndexMap::new(),
            channels: IndexMap::new(),
            previous_active: Vec::new(),
            has_previous_segment: false,
            current_segment_has_data: false,
            segment_start: 0,
            index_segment_start: 0,
            segment_next_offset: 0,
            segment_raw_offset: 0,
        })
    }

    /// Set a property on the file, a group or a channel.
    ///
    /// Groups spring into existence, channels must have been declared with
    /// [`Self::ensure_channel`] first as their type is not known here.
    pub fn set_property(
        &mut self,
        path: &PropertyPath,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), TdmsError> {
        match parse_object_path(path.path())? {
            ParsedPath::Root => self.file_object.set_property(name, value),
            ParsedPath::Group(group) => {
                self.ensure_group(&group);
                self.groups
                    .get_mut(&group)
                    .expect("just ensured the group exists")
                    .set_property(name, value);
            }
            ParsedPath::Channel { .. } => {
                let state = self
                    .channels
                    .get_mut(path.path())
                    .ok_or_else(|| TdmsError::MissingObject(path.path().to_string()))?;
                state.object.set_property(name, value);
            }
        }
        Ok(())
    }

    /// Create the group if it is new. Returns its path for property access.
    pub fn ensure_group(&mut self, group: &str) -> PropertyPath {
        self.groups
            .entry(group.to_string())
            .or_insert_with(ObjectState::default);
        PropertyPath::group(group)
    }

    /// Create the channel if it is new.
    ///
    /// A channel's type is fixed on creation, asking again with another
    /// type is an error.
    pub fn ensure_channel(
        &mut self,
        group: &str,
        channel: &str,
        data_type: DataType,
    ) -> Result<ChannelPath, TdmsError> {
        self.ensure_group(group);
        let path = ChannelPath::new(group, channel);
        if let Some(existing) = self.channels.get(path.path()) {
            if existing.buffer.data_type() != data_type {
                return Err(TdmsError::ChannelTypeConflict(
                    path.path().to_string(),
                    existing.buffer.data_type(),
                    data_type,
                ));
            }
            return Ok(path);
        }
        self.channels.insert(
            path.path().to_string(),
            ChannelState::new(data_type, self.options.big_endian, self.options.buffer_size),
        );
        Ok(path)
    }

    /// Queue values onto the channel's pending buffer.
    pub fn append_values<T: TdmsStorageType>(
        &mut self,
        channel: &ChannelPath,
        values: &[T],
    ) -> Result<(), TdmsError> {
        self.channel_mut(channel)?.buffer.append_values(values)
    }

    /// Queue strings onto the channel's pending buffer.
    pub fn append_strings(
        &mut self,
        channel: &ChannelPath,
        values: &[impl AsRef<str>],
    ) -> Result<(), TdmsError> {
        self.channel_mut(channel)?.buffer.append_strings(values)
    }

    /// Total samples appended to the channel so far, committed or pending.
    pub fn channel_samples_written(&self, channel: &ChannelPath) -> Option<u64> {
        self.channels
            .get(channel.path())
            .map(|state| state.committed_samples + state.buffer.value_count())
    }

    fn channel_mut(&mut self, channel: &ChannelPath) -> Result<&mut ChannelState, TdmsError> {
        self.channels
            .get_mut(channel.path())
            .ok_or_else(|| TdmsError::MissingObject(channel.path().to_string()))
    }

    /// Flush the pending state into the file.
    ///
    /// The first matching rule wins:
    /// 1. Nothing pending - no bytes are written.
    /// 2. Raw data only, matching the previous segment's layout exactly -
    ///    the previous segment is extended in place and the bytes appended.
    /// 3. Anything else - a full segment with incremental metadata.
    pub fn write_segment(&mut self) -> Result<(), TdmsError> {
        let active: Vec<String> = self
            .channels
            .iter()
            .filter(|(_, state)| !state.buffer.is_empty())
            .map(|(path, _)| path.clone())
            .collect();
        let has_data = !active.is_empty();

        let any_props_modified = self.file_object.properties_modified
            || self.groups.values().any(|group| group.properties_modified)
            || self
                .channels
                .values()
                .any(|channel| channel.object.properties_modified);
        let any_new_objects = self.groups.values().any(|group| !group.written)
            || self.channels.values().any(|channel| !channel.object.written);

        if !has_data && !any_props_modified && !any_new_objects {
            return Ok(());
        }

        let any_index_changed = active
            .iter()
            .any(|path| self.channels[path.as_str()].index_changed());
        let any_string_data = active
            .iter()
            .any(|path| self.channels[path.as_str()].buffer.data_type() == DataType::TdmsString);
        let same_active = active == self.previous_active;

        if has_data
            && self.current_segment_has_data
            && same_active
            && !any_props_modified
            && !any_new_objects
            && !any_index_changed
            && !any_string_data
        {
            self.append_to_current_segment(&active)?;
        } else {
            self.write_full_segment(active, has_data)?;
        }

        self.data.sync()?;
        if let Some(index) = self.index.as_mut() {
            index.sync()?;
        }
        Ok(())
    }

    /// Flush pending data and the io buffers.
    pub fn flush(&mut self) -> Result<(), TdmsError> {
        self.write_segment()
    }

    /// Flush and end the session.
    pub fn close(mut self) -> Result<(), TdmsError> {
        self.flush()
    }

    /// Extend the previous segment in place with raw data alone.
    ///
    /// Both lead-ins gain the enlarged size before any data lands so the
    /// twin never claims less than the data file holds.
    fn append_to_current_segment(&mut self, active: &[String]) -> Result<(), TdmsError> {
        let appended: u64 = active
            .iter()
            .map(|path| self.channels[path.as_str()].buffer.byte_len())
            .sum();
        let new_next_offset = self
            .segment_next_offset
            .checked_add(appended)
            .ok_or(TdmsError::SegmentAddressOverflow)?;

        debug!(
            "extending segment at {} by {appended} bytes",
            self.segment_start
        );

        self.data
            .finalise_lead_in(self.segment_start, new_next_offset, self.segment_raw_offset)?;
        if let Some(index) = self.index.as_mut() {
            index.finalise_lead_in(
                self.index_segment_start,
                new_next_offset,
                self.segment_raw_offset,
            )?;
        }

        self.write_raw_block(active)?;

        self.segment_next_offset = new_next_offset;
        self.commit_channels(active);
        Ok(())
    }

    fn write_full_segment(&mut self, active: Vec<String>, has_data: bool) -> Result<(), TdmsError> {
        // The object list is fresh on the first segment and whenever the
        // channel layout of the raw data changes.
        let new_object_list =
            !self.has_previous_segment || (has_data && active != self.previous_active);

        let objects = self.build_object_list(new_object_list, &active);
        let deactivated: Vec<String> = objects
            .iter()
            .filter(|object| {
                object.raw_data_index == RawDataIndex::None
                    && self.channels.contains_key(object.path.as_str())
            })
            .map(|object| object.path.clone())
            .collect();
        let meta = if objects.is_empty() {
            None
        } else {
            Some(MetaData { objects })
        };

        let toc = ToC {
            contains_meta_data: meta.is_some(),
            contains_raw_data: has_data,
            contains_new_object_list: new_object_list,
            data_is_interleaved: self.options.interleaved && has_data,
            big_endian: self.options.big_endian,
            contains_daqmx_raw_data: false,
        };

        let segment_start = self.data.stream_position()?;
        self.data
            .write_lead_in(FileTag::Data, toc, self.options.version)?;

        let index_segment_start = match self.index.as_mut() {
            Some(index) => {
                let start = index.stream_position()?;
                index.write_lead_in(FileTag::Index, toc, self.options.version)?;
                start
            }
            None => 0,
        };

        let meta_size = match &meta {
            Some(meta) => {
                self.data.write_meta(meta)?;
                let data_meta_size = self.data.stream_position()? - segment_start - LEAD_IN_BYTES;
                if let Some(index) = self.index.as_mut() {
                    index.write_meta(meta)?;
                    let index_meta_size =
                        index.stream_position()? - index_segment_start - LEAD_IN_BYTES;
                    if data_meta_size != index_meta_size {
                        return Err(TdmsError::MetadataSizeMismatch {
                            data: data_meta_size,
                            index: index_meta_size,
                        });
                    }
                }
                data_meta_size
            }
            None => 0,
        };

        let raw_size = if has_data {
            self.write_raw_block(&active)?
        } else {
            0
        };

        // Blocks are safely on disk, the lead-ins can lose their
        // incomplete markers. The twin mirrors the data file's values.
        let next_offset = meta_size + raw_size;
        self.data
            .finalise_lead_in(segment_start, next_offset, meta_size)?;
        if let Some(index) = self.index.as_mut() {
            index.finalise_lead_in(index_segment_start, next_offset, meta_size)?;
        }

        self.segment_start = segment_start;
        self.index_segment_start = index_segment_start;
        self.segment_next_offset = next_offset;
        self.segment_raw_offset = meta_size;
        self.has_previous_segment = true;
        self.current_segment_has_data = has_data;

        self.file_object.mark_committed();
        for group in self.groups.values_mut() {
            group.mark_committed();
        }
        for channel in self.channels.values_mut() {
            channel.object.mark_committed();
        }
        self.commit_channels(&active);

        if has_data {
            self.previous_active = active;
        } else {
            // Channels declared with no raw data drop out of the reader's
            // active list, track the same thing here.
            self.previous_active
                .retain(|path| !deactivated.contains(path));
        }
        Ok(())
    }

    fn build_object_list(&self, new_object_list: bool, active: &[String]) -> Vec<ObjectMetaData> {
        let mut objects = Vec::new();

        if new_object_list {
            objects.push(self.object_entry(
                PropertyPath::file().path().to_string(),
                &self.file_object,
                RawDataIndex::None,
            ));
            for (name, group) in &self.groups {
                objects.push(self.object_entry(
                    PropertyPath::group(name).path().to_string(),
                    group,
                    RawDataIndex::None,
                ));
            }
            for (path, channel) in &self.channels {
                objects.push(self.object_entry(
                    path.clone(),
                    &channel.object,
                    channel.pending_index(),
                ));
            }
        } else {
            if self.file_object.properties_modified {
                objects.push(self.object_entry(
                    PropertyPath::file().path().to_string(),
                    &self.file_object,
                    RawDataIndex::None,
                ));
            }
            for (name, group) in &self.groups {
                if group.properties_modified || !group.written {
                    objects.push(self.object_entry(
                        PropertyPath::group(name).path().to_string(),
                        group,
                        RawDataIndex::None,
                    ));
                }
            }
            for (path, channel) in &self.channels {
                let data_changed =
                    active.iter().any(|active_path| active_path == path) && channel.index_changed();
                if channel.object.properties_modified || !channel.object.written || data_changed {
                    objects.push(self.object_entry(
                        path.clone(),
                        &channel.object,
                        channel.pending_index(),
                    ));
                }
            }
        }

        objects
    }

    fn object_entry(
        &self,
        path: String,
        object: &ObjectState,
        raw_data_index: RawDataIndex,
    ) -> ObjectMetaData {
        // Unchanged properties on a known object are elided, readers keep
        // what they already have for the path.
        let properties = if object.properties_modified || !object.written
            || !self.has_previous_segment
        {
            object.properties.clone()
        } else {
            Vec::new()
        };
        ObjectMetaData {
            path,
            properties,
            raw_data_index,
        }
    }

    /// Write the pending buffers of the active channels, contiguous or
    /// interleaved per the session options. Returns the bytes written.
    fn write_raw_block(&mut self, active: &[String]) -> Result<u64, TdmsError> {
        let start = self.data.stream_position()?;
        if self.options.interleaved {
            let buffers: Vec<&ChannelBuffer> = active
                .iter()
                .map(|path| &self.channels[path.as_str()].buffer)
                .collect();
            let image = interleave_buffers(&buffers)?;
            self.data.write_bytes(&image)?;
        } else {
            let Self { data, channels, .. } = self;
            for path in active {
                let channel = channels
                    .get(path.as_str())
                    .expect("active paths come from the channel map");
                data.write_buffer(&channel.buffer)?;
            }
        }
        Ok(self.data.stream_position()? - start)
    }

    fn commit_channels(&mut self, active: &[String]) {
        for path in active {
            let channel = self
                .channels
                .get_mut(path.as_str())
                .expect("active paths come from the channel map");
            channel.last_committed = Some(channel.buffer.raw_data_meta());
            channel.committed_samples += channel.buffer.value_count();
            channel.buffer.clear();
        }
    }

    /// Flush the underlying io buffers.
    pub fn sync(&mut self) -> Result<(), TdmsError> {
        self.data.sync()?;
        if let Some(index) = self.index.as_mut() {
            index.sync()?;
        }
        Ok(())
    }
}

impl<W: Write + Seek> Drop for TdmsFileWriter<W> {
    fn drop(&mut self) {
        let _ = self.write_segment();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn count_tags(bytes: &[u8], tag: &[u8; 4]) -> usize {
        bytes.windows(4).filter(|window| window == tag).count()
    }

    fn le_u64(bytes: &[u8], offset: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[offset..offset + 8]);
        u64::from_le_bytes(buf)
    }

    #[test]
    fn test_no_pending_state_writes_nothing() {
        let mut data = Vec::new();
        {
            let mut writer = TdmsFileWriter::from_streams(
                Cursor::new(&mut data),
                None,
                WriterOptions::default(),
            )
            .unwrap();
            writer.write_segment().unwrap();
        }
        assert!(data.is_empty());
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let mut data = Vec::new();
        let result = TdmsFileWriter::from_streams(
            Cursor::new(&mut data),
            None,
            WriterOptions {
                version: 4711,
                ..WriterOptions::default()
            },
        );
        assert!(matches!(result, Err(TdmsError::UnsupportedVersion(4711))));
    }

    #[test]
    fn test_first_segment_layout() {
        let mut data = Vec::new();
        {
            let mut writer = TdmsFileWriter::from_streams(
                Cursor::new(&mut data),
                None,
                WriterOptions::default(),
            )
            .unwrap();
            let channel = writer
                .ensure_channel("group", "channel", DataType::I32)
                .unwrap();
            writer.append_values(&channel, &[1i32, 2, 3, 4, 5]).unwrap();
            writer.write_segment().unwrap();
        }

        assert_eq!(&data[0..4], b"TDSm");
        // MetaData | NewObjectList | RawData
        assert_eq!(&data[4..8], &0x0Eu32.to_le_bytes());
        assert_eq!(&data[8..12], &4713u32.to_le_bytes());

        let next_segment_offset = le_u64(&data, 12);
        let raw_data_offset = le_u64(&data, 20);
        assert_eq!(next_segment_offset, raw_data_offset + 20);
        assert_eq!(data.len() as u64, 28 + next_segment_offset);

        // Raw block is the five values little endian.
        let raw_start = (28 + raw_data_offset) as usize;
        let mut expected = vec![];
        for value in [1i32, 2, 3, 4, 5] {
            expected.extend(value.to_le_bytes());
        }
        assert_eq!(&data[raw_start..], &expected[..]);

        // Three objects: root, group, channel.
        let object_count_offset = 28;
        assert_eq!(
            &data[object_count_offset..object_count_offset + 4],
            &3u32.to_le_bytes()
        );
    }

    #[test]
    fn test_same_shape_append_extends_segment() {
        let mut data = Vec::new();
        {
            let mut writer = TdmsFileWriter::from_streams(
                Cursor::new(&mut data),
                None,
                WriterOptions::default(),
            )
            .unwrap();
            let channel = writer
                .ensure_channel("group", "channel", DataType::I32)
                .unwrap();
            writer.append_values(&channel, &[1i32, 2, 3]).unwrap();
            writer.write_segment().unwrap();
            writer.append_values(&channel, &[4i32, 5, 6]).unwrap();
            writer.write_segment().unwrap();
        }

        // Still a single segment, enlarged in place.
        assert_eq!(count_tags(&data, b"TDSm"), 1);
        let next_segment_offset = le_u64(&data, 12);
        assert_eq!(data.len() as u64, 28 + next_segment_offset);
        let raw_data_offset = le_u64(&data, 20);
        // 24 bytes of raw data over the two writes.
        assert_eq!(next_segment_offset - raw_data_offset, 24);
    }

    #[test]
    fn test_append_updates_index_twin() {
        let mut data = Vec::new();
        let mut index = Vec::new();
        {
            let mut writer = TdmsFileWriter::from_streams(
                Cursor::new(&mut data),
                Some(Cursor::new(&mut index)),
                WriterOptions::default(),
            )
            .unwrap();
            let channel = writer
                .ensure_channel("group", "channel", DataType::I32)
                .unwrap();
            writer.append_values(&channel, &[1i32, 2, 3]).unwrap();
            writer.write_segment().unwrap();
            writer.append_values(&channel, &[4i32, 5, 6]).unwrap();
            writer.write_segment().unwrap();
        }

        assert_eq!(&index[0..4], b"TDSh");
        // Lead-ins agree apart from the tag.
        assert_eq!(&data[4..28], &index[4..28]);
        // The twin carries metadata only.
        let raw_data_offset = le_u64(&index, 20);
        assert_eq!(index.len() as u64, 28 + raw_data_offset);
    }

    #[test]
    fn test_changed_count_starts_new_segment() {
        let mut data = Vec::new();
        {
            let mut writer = TdmsFileWriter::from_streams(
                Cursor::new(&mut data),
                None,
                WriterOptions::default(),
            )
            .unwrap();
            let channel = writer
                .ensure_channel("group", "channel", DataType::I32)
                .unwrap();
            writer.append_values(&channel, &[1i32, 2, 3]).unwrap();
            writer.write_segment().unwrap();
            writer.append_values(&channel, &[4i32, 5]).unwrap();
            writer.write_segment().unwrap();
        }

        assert_eq!(count_tags(&data, b"TDSm"), 2);
    }

    #[test]
    fn test_string_channels_never_extend_in_place() {
        let mut data = Vec::new();
        {
            let mut writer = TdmsFileWriter::from_streams(
                Cursor::new(&mut data),
                None,
                WriterOptions::default(),
            )
            .unwrap();
            let channel = writer
                .ensure_channel("group", "strings", DataType::TdmsString)
                .unwrap();
            writer.append_strings(&channel, &["ab", "cd"]).unwrap();
            writer.write_segment().unwrap();
            writer.append_strings(&channel, &["ef", "gh"]).unwrap();
            writer.write_segment().unwrap();
        }

        assert_eq!(count_tags(&data, b"TDSm"), 2);
    }

    #[test]
    fn test_channel_type_conflict() {
        let mut data = Vec::new();
        let mut writer =
            TdmsFileWriter::from_streams(Cursor::new(&mut data), None, WriterOptions::default())
                .unwrap();
        writer
            .ensure_channel("group", "channel", DataType::I32)
            .unwrap();
        let result = writer.ensure_channel("group", "channel", DataType::DoubleFloat);
        assert!(matches!(
            result,
            Err(TdmsError::ChannelTypeConflict(_, DataType::I32, DataType::DoubleFloat))
        ));
    }

    #[test]
    fn test_append_to_unknown_channel_errors() {
        let mut data = Vec::new();
        let mut writer =
            TdmsFileWriter::from_streams(Cursor::new(&mut data), None, WriterOptions::default())
                .unwrap();
        let result = writer.append_values(&ChannelPath::new("group", "missing"), &[1i32]);
        assert!(matches!(result, Err(TdmsError::MissingObject(_))));
    }

    #[test]
    fn test_interleaved_string_flush_errors() {
        let mut data = Vec::new();
        let mut writer = TdmsFileWriter::from_streams(
            Cursor::new(&mut data),
            None,
            WriterOptions {
                interleaved: true,
                ..WriterOptions::default()
            },
        )
        .unwrap();
        let channel = writer
            .ensure_channel("group", "strings", DataType::TdmsString)
            .unwrap();
        writer.append_strings(&channel, &["oops"]).unwrap();
        let result = writer.write_segment();
        assert!(matches!(
            result,
            Err(TdmsError::InterleavedVariableWidth)
        ));
    }

    #[test]
    fn test_samples_written_tracks_pending_and_committed() {
        let mut data = Vec::new();
        {
            let mut writer = TdmsFileWriter::from_streams(
                Cursor::new(&mut data),
                None,
                WriterOptions::default(),
            )
            .unwrap();
            let channel = writer
                .ensure_channel("group", "channel", DataType::U16)
                .unwrap();
            writer.append_values(&channel, &[1u16, 2]).unwrap();
            assert_eq!(writer.channel_samples_written(&channel), Some(2));
            writer.write_segment().unwrap();
            writer.append_values(&channel, &[3u16]).unwrap();
            assert_eq!(writer.channel_samples_written(&channel), Some(3));
        }
    }
}
