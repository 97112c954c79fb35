//! Index methods for adding segments to the index.
//!
//! Both the data file and its index twin feed segments through here. The
//! twin describes the data file's layout so the two walks only differ in
//! how the next segment address advances.

use log::debug;

use crate::{
    error::TdmsError,
    meta_data::{ObjectMetaData, RawDataIndex, Segment, LEAD_IN_BYTES},
    paths::ObjectPath,
    raw_data::DataBlock,
};

use super::{DataFormat, DataLocation, ObjectData, ObjectIndex};

/// Data cached for the current "active" objects which are the objects
/// that we are expecting data in the next data block.
#[derive(Debug, Clone)]
pub struct ActiveObject {
    pub path: String,
    pub number_of_samples: u64,
}

impl ActiveObject {
    fn new(path: &str, format: &DataFormat) -> Self {
        Self {
            path: path.to_string(),
            number_of_samples: format.number_of_values(),
        }
    }

    fn update(&mut self, meta: &ObjectMetaData) {
        if let Some(format) = DataFormat::from_index(&meta.raw_data_index) {
            self.number_of_samples = format.number_of_values();
        }
    }

    /// Fetch the corresponding [`ObjectData`] for the active object.
    fn get_object_data<'c>(&self, index: &'c ObjectIndex) -> &'c ObjectData {
        index
            .get(&self.path)
            .expect("Should always have a registered version of active object")
    }

    /// Fetch the corresponding [`ObjectData`] for the active object in a mutable form.
    fn get_object_data_mut<'c>(&self, index: &'c mut ObjectIndex) -> &'c mut ObjectData {
        index
            .get_mut(&self.path)
            .expect("Should always have a registered version of active object")
    }
}

impl super::Index {
    /// Add the data for the next segment read from the data file.
    ///
    /// Returns the start position of the next segment.
    ///
    /// Errors if:
    /// * The next segment address overflows.
    /// * A matches-previous index has no previous declaration.
    pub fn add_segment(&mut self, segment: Segment) -> Result<u64, TdmsError> {
        let data_segment_start = self.next_segment_start;
        self.register_segment(&segment, data_segment_start)?;

        let segment_size = segment.total_size_bytes()?;
        match self.next_segment_start.checked_add(segment_size) {
            Some(next_segment_start) => {
                self.next_segment_start = next_segment_start;
                self.data_segment_start = next_segment_start;
            }
            None => return Err(TdmsError::SegmentAddressOverflow),
        }
        Ok(self.next_segment_start)
    }

    /// Add the next segment read from an index file.
    ///
    /// The metadata is identical to the data file's but the index file holds
    /// no raw data, so the walk advances by the metadata size alone while
    /// the recorded data locations advance by the full segment size. This
    /// parses both twin conventions in the wild: lead-ins mirrored from the
    /// data file and self consistent metadata-only sizes.
    ///
    /// Returns the start position of the next segment in the index file.
    pub fn add_index_segment(&mut self, mut segment: Segment) -> Result<u64, TdmsError> {
        if segment.toc.contains_raw_data
            && segment.next_segment_offset == segment.raw_data_offset
        {
            // A twin recording its own metadata-only size carries no raw
            // sizes, so only the structure can be indexed from it.
            debug!("index segment holds no data sizes, registering structure only");
            segment.toc.contains_raw_data = false;
        }

        let data_segment_start = self.data_segment_start;
        self.register_segment(&segment, data_segment_start)?;

        let data_size = segment.total_size_bytes()?;
        self.data_segment_start = data_segment_start
            .checked_add(data_size)
            .ok_or(TdmsError::SegmentAddressOverflow)?;

        let index_size = LEAD_IN_BYTES
            .checked_add(segment.raw_data_offset)
            .ok_or(TdmsError::SegmentAddressOverflow)?;
        self.next_segment_start = self
            .next_segment_start
            .checked_add(index_size)
            .ok_or(TdmsError::SegmentAddressOverflow)?;
        Ok(self.next_segment_start)
    }

    /// Apply the segment's metadata and data block, with the raw data
    /// addressed relative to `data_segment_start` in the data file.
    fn register_segment(
        &mut self,
        segment: &Segment,
        data_segment_start: u64,
    ) -> Result<(), TdmsError> {
        //Basic procedure.
        //1. If new object list is set, clear active objects.
        //2. Update the active object list - adding new objects or updating properties and data locations for existing objects.

        if segment.toc.contains_new_object_list {
            self.deactivate_all_objects();
        }

        if let Some(meta_data) = &segment.meta_data {
            for obj in meta_data.objects.iter() {
                match obj.raw_data_index {
                    RawDataIndex::None => {
                        self.update_meta_object(obj)?;
                        // An explicit no-data declaration takes the channel
                        // out of the raw data for this segment.
                        self.deactivate_object(&obj.path);
                    }
                    _ => self.update_or_activate_data_object(obj)?,
                }
            }
        }

        if segment.toc.contains_raw_data {
            let active_data_channels = self.get_active_data_formats();

            if active_data_channels.is_empty() {
                return Err(TdmsError::SegmentTocDataBlockWithoutDataChannels);
            }

            debug!(
                "data block at {} with {} active channels",
                data_segment_start,
                active_data_channels.len()
            );
            let data_block =
                DataBlock::from_segment(segment, data_segment_start, active_data_channels)?;

            self.insert_data_block(data_block)?;
        }

        Ok(())
    }

    /// Get all of the [`DataFormat`] for the active channels.
    fn get_active_data_formats(&self) -> Vec<DataFormat> {
        self.active_objects
            .iter()
            .map(|ao| {
                ao.get_object_data(&self.objects)
                    .latest_data_format
                    .clone()
                    .expect("Getting data format from object that never had one")
            })
            .collect()
    }

    fn insert_data_block(&mut self, block: DataBlock) -> Result<(), TdmsError> {
        let data_index = self.data_blocks.len();

        // get counts from block.
        let chunks = block.number_of_chunks()?;

        self.data_blocks.push(block);

        for (channel_index, active_object) in self.active_objects.iter_mut().enumerate() {
            let number_of_samples = active_object
                .number_of_samples
                .checked_mul(chunks as u64)
                .ok_or(TdmsError::ChunkSizeOverflow)?;
            let location = DataLocation {
                data_block: data_index,
                channel_index,
                number_of_samples,
            };
            active_object
                .get_object_data_mut(&mut self.objects)
                .add_data_location(location);
        }
        Ok(())
    }

    fn deactivate_all_objects(&mut self) {
        self.active_objects.clear();
    }

    fn deactivate_object(&mut self, path: &str) {
        self.active_objects.retain(|active| active.path != path);
    }

    /// Activate Data Object
    ///
    /// Adds the object by path to the active objects. Creates it if it doesn't exist.
    fn update_or_activate_data_object(&mut self, object: &ObjectMetaData) -> Result<(), TdmsError> {
        let matching_active = self
            .active_objects
            .iter_mut()
            .find(|active_object| active_object.path == object.path);

        match matching_active {
            Some(active_object) => {
                active_object.update(object);
                active_object
                    .get_object_data_mut(&mut self.objects)
                    .update(object)
            }
            None => {
                self.update_meta_object(object)?;
                // Must fetch the latest format in case this is same as previous.
                let format = self
                    .object_format(&object.path)
                    .expect("Should not reach this if there is no data with the object.");

                self.active_objects
                    .push(ActiveObject::new(&object.path, format));
                Ok(())
            }
        }
    }

    /// Update Meta Only Object
    ///
    /// Update an object which contains no data.
    fn update_meta_object(&mut self, object: &ObjectMetaData) -> Result<(), TdmsError> {
        match self.objects.get_mut(&object.path) {
            Some(found_object) => found_object.update(object),
            None => {
                let object_data = ObjectData::from_metadata(object)?;
                let old = self.objects.insert(object_data.path.clone(), object_data);
                assert!(
                    old.is_none(),
                    "Should not be possible to be replacing an existing object."
                );
                Ok(())
            }
        }
    }

    /// Get the current format for the channel.
    ///
    /// Returns none if we have no channel.
    fn object_format(&self, path: ObjectPath) -> Option<&DataFormat> {
        self.objects
            .get(path)
            .and_then(|object| object.latest_data_format.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use crate::io::data_types::DataType;
    use crate::meta_data::{MetaData, ObjectMetaData, RawDataIndex, RawDataMeta, ToC};
    use crate::paths::{ChannelPath, PropertyPath};
    use crate::properties::PropertyValue;

    use super::super::Index;
    use super::*;

    fn double_meta(number_of_values: u64) -> RawDataIndex {
        RawDataIndex::RawData(RawDataMeta {
            data_type: DataType::DoubleFloat,
            number_of_values,
            total_size_bytes: None,
        })
    }

    fn two_channel_segment() -> Segment {
        Segment {
            toc: ToC::from_u32(0xE),
            next_segment_offset: 20 + 16000,
            raw_data_offset: 20,
            meta_data: Some(MetaData {
                objects: vec![
                    ObjectMetaData {
                        path: "/'group'".to_string(),
                        properties: vec![("Prop".to_string(), PropertyValue::I32(-51))],
                        raw_data_index: RawDataIndex::None,
                    },
                    ObjectMetaData {
                        path: "/'group'/'ch1'".to_string(),
                        properties: vec![("Prop1".to_string(), PropertyValue::I32(-1))],
                        raw_data_index: double_meta(1000),
                    },
                    ObjectMetaData {
                        path: "/'group'/'ch2'".to_string(),
                        properties: vec![("Prop2".to_string(), PropertyValue::I32(-2))],
                        raw_data_index: double_meta(1000),
                    },
                ],
            }),
        }
    }

    #[test]
    fn test_single_segment() {
        let mut index = Index::new();
        index.add_segment(two_channel_segment()).unwrap();

        let group_properties = index
            .get_object_properties(&PropertyPath::group("group"))
            .unwrap();
        assert_eq!(
            group_properties,
            &[(&"Prop".to_string(), &PropertyValue::I32(-51))]
        );
        let ch1_properties = index
            .get_object_properties(ChannelPath::new("group", "ch1").as_ref())
            .unwrap();
        assert_eq!(
            ch1_properties,
            &[(&String::from("Prop1"), &PropertyValue::I32(-1))]
        );

        let ch1_data = index
            .get_channel_data_positions(&ChannelPath::new("group", "ch1"))
            .unwrap();
        assert_eq!(
            ch1_data,
            &[DataLocation {
                data_block: 0,
                channel_index: 0,
                number_of_samples: 1000
            }]
        );
        let ch2_data = index
            .get_channel_data_positions(&ChannelPath::new("group", "ch2"))
            .unwrap();
        assert_eq!(
            ch2_data,
            &[DataLocation {
                data_block: 0,
                channel_index: 1,
                number_of_samples: 1000
            }]
        );

        assert_eq!(
            index.channel_length(&ChannelPath::new("group", "ch1")),
            Some(1000)
        );
    }

    #[test]
    fn test_multiple_chunks_multiply_sample_counts() {
        let mut segment = two_channel_segment();
        // Three chunks of the 16000 byte pass.
        segment.next_segment_offset = 20 + 3 * 16000;

        let mut index = Index::new();
        index.add_segment(segment).unwrap();

        assert_eq!(
            index.channel_length(&ChannelPath::new("group", "ch1")),
            Some(3000)
        );
    }

    #[test]
    fn test_matches_previous_reuses_declared_format() {
        let segment2 = Segment {
            toc: ToC::from_u32(0xA),
            next_segment_offset: 16000,
            raw_data_offset: 0,
            meta_data: Some(MetaData {
                objects: vec![
                    ObjectMetaData {
                        path: "/'group'/'ch1'".to_string(),
                        properties: vec![],
                        raw_data_index: RawDataIndex::MatchPrevious,
                    },
                    ObjectMetaData {
                        path: "/'group'/'ch2'".to_string(),
                        properties: vec![],
                        raw_data_index: RawDataIndex::MatchPrevious,
                    },
                ],
            }),
        };

        let mut index = Index::new();
        index.add_segment(two_channel_segment()).unwrap();
        index.add_segment(segment2).unwrap();

        assert_eq!(
            index.channel_length(&ChannelPath::new("group", "ch1")),
            Some(2000)
        );
        let positions = index
            .get_channel_data_positions(&ChannelPath::new("group", "ch1"))
            .unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[1].data_block, 1);
    }

    #[test]
    fn test_matches_previous_without_declaration_errors() {
        let segment = Segment {
            toc: ToC::from_u32(0xA),
            next_segment_offset: 8000,
            raw_data_offset: 0,
            meta_data: Some(MetaData {
                objects: vec![ObjectMetaData {
                    path: "/'group'/'ch1'".to_string(),
                    properties: vec![],
                    raw_data_index: RawDataIndex::MatchPrevious,
                }],
            }),
        };

        let mut index = Index::new();
        let result = index.add_segment(segment);
        assert!(matches!(result, Err(TdmsError::NoPreviousFormat(path)) if path == "/'group'/'ch1'"));
    }

    #[test]
    fn test_no_metadata_segment_inherits_active_channels() {
        // A segment with raw data and no metadata reuses the active list.
        let segment2 = Segment {
            toc: ToC::from_u32(0x8),
            next_segment_offset: 16000,
            raw_data_offset: 0,
            meta_data: None,
        };

        let mut index = Index::new();
        index.add_segment(two_channel_segment()).unwrap();
        index.add_segment(segment2).unwrap();

        assert_eq!(
            index.channel_length(&ChannelPath::new("group", "ch1")),
            Some(2000)
        );
        assert_eq!(
            index.channel_length(&ChannelPath::new("group", "ch2")),
            Some(2000)
        );
    }

    #[test]
    fn test_new_object_list_replaces_active_channels() {
        let segment2 = Segment {
            toc: ToC::from_u32(0xE),
            next_segment_offset: 20 + 8000,
            raw_data_offset: 20,
            meta_data: Some(MetaData {
                objects: vec![ObjectMetaData {
                    path: "/'group'/'ch1'".to_string(),
                    properties: vec![],
                    raw_data_index: RawDataIndex::MatchPrevious,
                }],
            }),
        };

        let mut index = Index::new();
        index.add_segment(two_channel_segment()).unwrap();
        index.add_segment(segment2).unwrap();

        // ch1 gained a block, ch2 did not.
        assert_eq!(
            index.channel_length(&ChannelPath::new("group", "ch1")),
            Some(2000)
        );
        assert_eq!(
            index.channel_length(&ChannelPath::new("group", "ch2")),
            Some(1000)
        );
    }

    #[test]
    fn test_data_without_active_channels_errors() {
        let segment = Segment {
            toc: ToC::from_u32(0x8),
            next_segment_offset: 100,
            raw_data_offset: 0,
            meta_data: None,
        };
        let mut index = Index::new();
        let result = index.add_segment(segment);
        assert!(matches!(
            result,
            Err(TdmsError::SegmentTocDataBlockWithoutDataChannels)
        ));
    }

    #[test]
    fn test_segment_addresses_accumulate() {
        let mut index = Index::new();
        let next = index.add_segment(two_channel_segment()).unwrap();
        assert_eq!(next, 28 + 20 + 16000);
        let next = index.add_segment(two_channel_segment()).unwrap();
        assert_eq!(next, 2 * (28 + 20 + 16000));
    }

    #[test]
    fn test_index_segments_advance_by_metadata_size() {
        // Lead-ins mirrored from the data file: next offset includes the
        // raw data that is only present in the data file.
        let mut index = Index::new();
        let next = index.add_index_segment(two_channel_segment()).unwrap();
        assert_eq!(next, 28 + 20);
        let next = index.add_index_segment(two_channel_segment()).unwrap();
        assert_eq!(next, 2 * (28 + 20));

        // Data locations are addressed in the data file.
        let positions = index
            .get_channel_data_positions(&ChannelPath::new("group", "ch1"))
            .unwrap();
        assert_eq!(positions.len(), 2);
        let block0 = index.get_data_block(positions[0].data_block).unwrap();
        let block1 = index.get_data_block(positions[1].data_block).unwrap();
        assert_eq!(block0.start, 28 + 20);
        assert_eq!(block1.start, (28 + 20 + 16000) + 28 + 20);
    }
}
