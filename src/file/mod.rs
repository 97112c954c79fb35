//! The file module provides the public API for reading a TDMS file.

mod channel_reader;

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

use log::{debug, warn};

use crate::error::TdmsError;
use crate::index::Index;
use crate::meta_data::{FileTag, Segment};
use crate::paths::{parse_object_path, ChannelPath, ParsedPath, PropertyPath};
use crate::properties::PropertyValue;
use crate::writer::INDEX_FILE_EXTENSION;

pub use channel_reader::ChannelChunks;

/// A loaded TDMS file.
///
/// This is the entry point for reading. [`Self::load`] walks the data file
/// itself while [`Self::load_indexed`] builds the same view from the
/// `.tdms_index` twin without touching the bulk data, which then loads on
/// demand through the channel read calls.
#[derive(Debug)]
pub struct TdmsFile<F: Read + Seek> {
    index: Index,
    file: F,
}

impl TdmsFile<File> {
    /// Load the file from the path. This step will load and index the
    /// metadata ready for access.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TdmsError> {
        let file = File::open(path)?;
        Self::new(file)
    }

    /// Load the file using the metadata in its `.tdms_index` twin.
    ///
    /// The data file is only opened, not scanned. Channel reads seek
    /// straight to the offsets the twin recorded.
    pub fn load_indexed(path: impl AsRef<Path>) -> Result<Self, TdmsError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let index_file = File::open(path.with_extension(INDEX_FILE_EXTENSION))?;
        Self::new_with_index(file, index_file)
    }
}

fn walk_segments(
    file: &mut (impl Read + Seek),
    tag: FileTag,
    mut add: impl FnMut(Segment) -> Result<u64, TdmsError>,
) -> Result<(), TdmsError> {
    let file_length = file.seek(SeekFrom::End(0))?;
    file.seek(SeekFrom::Start(0))?;

    let mut position = 0;
    while position < file_length {
        match Segment::read(file, tag) {
            Ok(segment) => {
                position = add(segment)?;
                file.seek(SeekFrom::Start(position))?;
            }
            Err(TdmsError::EndOfFile) => break,
            Err(TdmsError::IncompleteSegment(offset)) => {
                // Everything from an unfinalised lead-in onwards was
                // mid-write when the writer stopped.
                debug!("stopping walk at incomplete segment at offset {offset}");
                break;
            }
            // A bad tag on the first segment means this is not a TDMS
            // file at all. After valid segments it is trailing garbage
            // and the walk ends there.
            Err(TdmsError::HeaderPatternNotMatched(found)) if position > 0 => {
                warn!("unrecognised tag {found:X?} at offset {position}, stopping walk");
                break;
            }
            Err(error) => return Err(error),
        }
    }
    Ok(())
}

fn build_index(file: &mut (impl Read + Seek)) -> Result<Index, TdmsError> {
    let mut index = Index::new();
    walk_segments(file, FileTag::Data, |segment| index.add_segment(segment))?;
    Ok(index)
}

fn build_index_from_twin(index_file: &mut (impl Read + Seek)) -> Result<Index, TdmsError> {
    let mut index = Index::new();
    walk_segments(index_file, FileTag::Index, |segment| {
        index.add_index_segment(segment)
    })?;
    Ok(index)
}

impl<F: Read + Seek> TdmsFile<F> {
    /// Read the file structure from the given stream.
    ///
    /// # Example
    /// ```rust
    /// use monotony::TdmsFile;
    /// let fake_file = std::io::Cursor::new(vec![]);
    /// let file = TdmsFile::new(fake_file);
    /// ```
    pub fn new(mut file: F) -> Result<Self, TdmsError> {
        let index = build_index(&mut file)?;
        Ok(Self { index, file })
    }

    /// Read the file structure from the separate index stream, deferring
    /// all data access to `file`.
    pub fn new_with_index(file: F, mut index_stream: impl Read + Seek) -> Result<Self, TdmsError> {
        let index = build_index_from_twin(&mut index_stream)?;
        Ok(Self { index, file })
    }

    /// Read the property by name from the full object path.
    /// This will return `None` if the property does not exist.
    ///
    /// # Example
    ///
    /// ```rust
    /// use monotony::{TdmsFile, PropertyPath};
    ///
    /// let fake_file = std::io::Cursor::new(vec![]);
    /// let file = TdmsFile::new(fake_file).unwrap();
    ///
    /// let property = file.read_property(&PropertyPath::file(), "name");
    /// ```
    pub fn read_property(
        &self,
        object_path: &PropertyPath,
        property: &str,
    ) -> Result<Option<&PropertyValue>, TdmsError> {
        self.index.get_object_property(object_path, property)
    }

    /// Read all properties for the given object path.
    ///
    /// This returns a vector of tuples of the property name and value.
    pub fn read_all_properties(
        &self,
        object_path: &PropertyPath,
    ) -> Option<Vec<(&String, &PropertyValue)>> {
        self.index.get_object_properties(object_path)
    }

    /// The group names in the file, in path order.
    ///
    /// Groups that only ever appear as part of a channel path are included.
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        for path in self.index.all_paths() {
            let name = match parse_object_path(path) {
                Ok(ParsedPath::Group(name)) => name,
                Ok(ParsedPath::Channel { group, .. }) => group,
                Ok(ParsedPath::Root) => continue,
                Err(_) => {
                    debug!("ignoring unparseable object path {path}");
                    continue;
                }
            };
            if !groups.contains(&name) {
                groups.push(name);
            }
        }
        groups
    }

    /// The channel names of the group, in path order.
    pub fn group_channels(&self, group: &str) -> Vec<String> {
        self.index
            .paths_starting_with(PropertyPath::group(group).path())
            .filter_map(|path| match parse_object_path(path) {
                Ok(ParsedPath::Channel {
                    group: channel_group,
                    channel,
                }) if channel_group == group => Some(channel),
                _ => None,
            })
            .collect()
    }

    /// The total number of samples stored for the channel.
    ///
    /// Returns `None` if the channel does not exist.
    pub fn channel_length(&self, channel: &ChannelPath) -> Option<u64> {
        self.index.channel_length(channel)
    }
}
