//! This module encodes the meta data types that we will encounter in the files.
//!
//! A segment starts with a 28 byte lead-in of tag, ToC bits, version and the
//! two offsets that delimit the metadata and raw data blocks. The metadata
//! block then lists objects with their raw data indexes and properties.

use std::io::{Read, Seek, Write};

use log::warn;
use num_traits::FromPrimitive;

use crate::error::TdmsError;
use crate::io::data_types::DataType;
use crate::io::reader::{BigEndianReader, LittleEndianReader, TdmsReader};
use crate::io::writer::TdmsWriter;
use crate::properties::PropertyValue;

///The fixed byte size of the lead in section.
pub const LEAD_IN_BYTES: u64 = 28;

/// Marker in the next segment offset of a lead-in whose segment was never
/// finalised. Everything from that lead-in onwards is unreadable.
pub const INCOMPLETE_SEGMENT: u64 = u64::MAX;

/// File format versions this library will read. New files are written as 4713.
pub const SUPPORTED_VERSIONS: [u32; 2] = [4712, 4713];

/// Raw data index headers announcing a DAQmx layout.
const DAQMX_FORMAT_CHANGING_SCALER: u32 = 0x0000_1269;
const DAQMX_DIGITAL_LINE_SCALER: u32 = 0x0000_1369;

/// The 4 byte tag at the start of every lead-in.
///
/// Data files use `TDSm`, the twin index files use `TDSh`. Everything
/// after the tag is identical between the two.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileTag {
    Data,
    Index,
}

impl FileTag {
    pub const fn bytes(&self) -> [u8; 4] {
        match self {
            FileTag::Data => *b"TDSm",
            FileTag::Index => *b"TDSh",
        }
    }
}

/// Represents data that is endian agnostic.
pub trait TdmsMetaData: Sized {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<Self, TdmsError>;
    // Write the piece of meta-data.
    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError>;
    /// Report the size on disk so we can plan the write.
    fn size(&self) -> usize;
}

impl TdmsMetaData for DataType {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<Self, TdmsError> {
        let prop_type: u32 = reader.read_value()?;
        let prop_type = <DataType as FromPrimitive>::from_u32(prop_type)
            .ok_or(TdmsError::UnknownPropertyType(prop_type))?;
        Ok(prop_type)
    }

    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError> {
        writer.write_value(&(*self as u32))?;
        Ok(())
    }

    fn size(&self) -> usize {
        std::mem::size_of::<u32>()
    }
}

/// An extracted form of a segment table of contents.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct ToC {
    pub contains_meta_data: bool,
    pub contains_raw_data: bool,
    pub contains_daqmx_raw_data: bool,
    pub data_is_interleaved: bool,
    pub big_endian: bool,
    pub contains_new_object_list: bool,
}

fn mask_bit_set(value: u32, bit: u8) -> bool {
    let mask = 1u32 << bit;
    let masked = value & mask;
    masked != 0
}

fn set_bits(input: &mut u32, value: bool, bit: u8) {
    if value {
        *input |= 1u32 << bit
    }
}

impl ToC {
    pub fn from_u32(value: u32) -> Self {
        ToC {
            contains_meta_data: mask_bit_set(value, 1),
            contains_new_object_list: mask_bit_set(value, 2),
            contains_raw_data: mask_bit_set(value, 3),
            data_is_interleaved: mask_bit_set(value, 5),
            big_endian: mask_bit_set(value, 6),
            contains_daqmx_raw_data: mask_bit_set(value, 7),
        }
    }

    /// The ToC mask is always little endian whatever the endianess bit says.
    pub fn as_bytes(&self) -> [u8; 4] {
        let mut toc: u32 = 0;
        set_bits(&mut toc, self.contains_meta_data, 1);
        set_bits(&mut toc, self.contains_new_object_list, 2);
        set_bits(&mut toc, self.contains_raw_data, 3);
        set_bits(&mut toc, self.data_is_interleaved, 5);
        set_bits(&mut toc, self.big_endian, 6);
        set_bits(&mut toc, self.contains_daqmx_raw_data, 7);
        toc.to_le_bytes()
    }
}

/// The metadata section of a segment.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct MetaData {
    pub objects: Vec<ObjectMetaData>,
}

impl TdmsMetaData for MetaData {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<Self, TdmsError> {
        let object_length: u32 = reader.read_value()?;
        let objects = reader.read_vec(object_length as usize)?;
        Ok(MetaData { objects })
    }

    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError> {
        let objects_length: u32 = self.objects.len() as u32;
        writer.write_value(&objects_length)?;

        for object in &self.objects {
            writer.write_meta(object)?;
        }
        Ok(())
    }

    fn size(&self) -> usize {
        let mut size = std::mem::size_of::<u32>();
        for object in &self.objects {
            size += object.size();
        }
        size
    }
}

/// Contains all data from an object entry in a segment header.
#[derive(Debug, PartialEq, Clone)]
pub struct ObjectMetaData {
    pub path: String,
    pub properties: Vec<(String, PropertyValue)>,
    pub raw_data_index: RawDataIndex,
}

impl TdmsMetaData for ObjectMetaData {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<ObjectMetaData, TdmsError> {
        let path: String = reader.read_value()?;

        let raw_data: RawDataIndex = reader.read_meta()?;

        let property_count: u32 = reader.read_value()?;

        let mut properties = Vec::with_capacity(property_count as usize);

        for _prop in 0..property_count {
            let name: String = reader.read_value()?;
            let value: PropertyValue = reader.read_meta()?;
            properties.push((name, value));
        }

        Ok(ObjectMetaData {
            path,
            properties,
            raw_data_index: raw_data,
        })
    }

    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError> {
        writer.write_value(&self.path)?;
        writer.write_meta(&self.raw_data_index)?;
        writer.write_value(&(self.properties.len() as u32))?;

        for (prop_name, prop_value) in &self.properties {
            writer.write_value(prop_name)?;
            writer.write_meta(prop_value)?;
        }
        Ok(())
    }

    fn size(&self) -> usize {
        let mut size = self.path.len() + std::mem::size_of::<u32>();
        size += self.raw_data_index.size();
        size += std::mem::size_of::<u32>();
        for (prop_name, prop_value) in &self.properties {
            size += prop_name.len() + std::mem::size_of::<u32>();
            size += prop_value.size();
        }
        size
    }
}

/// The per channel raw data declaration inside an object entry.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum RawDataIndex {
    /// The object has no data in this segment.
    None,
    /// The layout is unchanged from the last segment that declared one.
    MatchPrevious,
    RawData(RawDataMeta),
    DaqMx(DaqMxIndex),
}

impl TdmsMetaData for RawDataIndex {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<RawDataIndex, TdmsError> {
        let raw_index: u32 = reader.read_value()?;

        let raw_data = match raw_index {
            0x0000_0000 => RawDataIndex::MatchPrevious,
            0xFFFF_FFFF => RawDataIndex::None,
            DAQMX_FORMAT_CHANGING_SCALER => {
                RawDataIndex::DaqMx(DaqMxIndex::read_body(reader, DaqMxKind::FormatChanging)?)
            }
            DAQMX_DIGITAL_LINE_SCALER => {
                RawDataIndex::DaqMx(DaqMxIndex::read_body(reader, DaqMxKind::DigitalLine)?)
            }
            _length => {
                let data_type: DataType = reader.read_meta()?;
                let array_dims: u32 = reader.read_value()?;
                if array_dims != 1 {
                    warn!("raw data index has array dimension {array_dims}, expected 1");
                }
                let number_of_values: u64 = reader.read_value()?;
                let total_size_bytes = if data_type == DataType::TdmsString {
                    Some(reader.read_value()?)
                } else {
                    None
                };
                let meta = RawDataMeta {
                    data_type,
                    number_of_values,
                    total_size_bytes,
                };
                RawDataIndex::RawData(meta)
            }
        };

        Ok(raw_data)
    }

    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError> {
        match self {
            RawDataIndex::None => writer.write_value(&0xFFFF_FFFFu32)?,
            RawDataIndex::MatchPrevious => writer.write_value(&0u32)?,
            RawDataIndex::RawData(raw_meta) => {
                // The length value counts itself: 20 bytes fixed width, 28 with
                // the string byte total.
                let length: u32 = if raw_meta.total_size_bytes.is_some() {
                    28
                } else {
                    20
                };
                writer.write_value(&length)?;
                writer.write_meta(&raw_meta.data_type)?;
                //array dim is alway 1 in TDMS v2.0.
                writer.write_value(&1u32)?;
                writer.write_value(&raw_meta.number_of_values)?;
                if let Some(total_size) = raw_meta.total_size_bytes {
                    writer.write_value(&total_size)?;
                }
            }
            RawDataIndex::DaqMx(index) => {
                writer.write_value(&index.kind.header())?;
                index.write_body(writer)?;
            }
        }
        Ok(())
    }

    fn size(&self) -> usize {
        match self {
            RawDataIndex::None => std::mem::size_of::<u32>(),
            RawDataIndex::MatchPrevious => std::mem::size_of::<u32>(),
            RawDataIndex::RawData(raw_meta) => match raw_meta.total_size_bytes {
                Some(_) => 28,
                None => 20,
            },
            RawDataIndex::DaqMx(index) => index.size(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RawDataMeta {
    pub data_type: DataType,
    pub number_of_values: u64,
    /// Only if strings
    pub total_size_bytes: Option<u64>,
}

impl RawDataMeta {
    /// The total byte size of this channel's contribution to one chunk.
    ///
    /// Returns `None` on overflow.
    pub fn raw_bytes(&self) -> Option<u64> {
        match self.total_size_bytes {
            Some(total) => Some(total),
            None => self
                .number_of_values
                .checked_mul(self.data_type.size() as u64),
        }
    }
}

/// The flavour of DAQmx scaler vector a channel declares.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DaqMxKind {
    FormatChanging,
    DigitalLine,
}

impl DaqMxKind {
    pub const fn header(&self) -> u32 {
        match self {
            DaqMxKind::FormatChanging => DAQMX_FORMAT_CHANGING_SCALER,
            DaqMxKind::DigitalLine => DAQMX_DIGITAL_LINE_SCALER,
        }
    }
}

/// One scaler in a DAQmx raw data index.
///
/// The scaler locates a typed value inside each stride of the raw buffer.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Scaler {
    pub data_type: DataType,
    pub raw_buffer_index: u32,
    pub raw_byte_offset: u32,
    pub sample_format_bitmap: u32,
    pub scale_id: u32,
}

impl TdmsMetaData for Scaler {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<Self, TdmsError> {
        let type_code: u32 = reader.read_value()?;
        let data_type = <DataType as FromPrimitive>::from_u32(type_code)
            .ok_or(TdmsError::UnknownDataType(type_code))?;
        Ok(Scaler {
            data_type,
            raw_buffer_index: reader.read_value()?,
            raw_byte_offset: reader.read_value()?,
            sample_format_bitmap: reader.read_value()?,
            scale_id: reader.read_value()?,
        })
    }

    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError> {
        writer.write_value(&(self.data_type as u32))?;
        writer.write_value(&self.raw_buffer_index)?;
        writer.write_value(&self.raw_byte_offset)?;
        writer.write_value(&self.sample_format_bitmap)?;
        writer.write_value(&self.scale_id)?;
        Ok(())
    }

    fn size(&self) -> usize {
        5 * std::mem::size_of::<u32>()
    }
}

/// A DAQmx raw data index: a vector of scalers sharing a strided buffer
/// plus the widths of the raw buffers that make up the stride.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DaqMxIndex {
    pub kind: DaqMxKind,
    pub number_of_values: u64,
    pub scalers: Vec<Scaler>,
    pub raw_data_widths: Vec<u32>,
}

impl DaqMxIndex {
    fn read_body<R: Read + Seek>(
        reader: &mut impl TdmsReader<R>,
        kind: DaqMxKind,
    ) -> Result<Self, TdmsError> {
        let array_dims: u32 = reader.read_value()?;
        if array_dims != 1 {
            return Err(TdmsError::DaqMxNotInterpretable(
                "array dimension is not 1",
            ));
        }
        let number_of_values: u64 = reader.read_value()?;
        let scaler_count: u32 = reader.read_value()?;
        let scalers = reader.read_vec(scaler_count as usize)?;
        let width_count: u32 = reader.read_value()?;
        let mut raw_data_widths = Vec::with_capacity(width_count as usize);
        for _ in 0..width_count {
            raw_data_widths.push(reader.read_value()?);
        }
        Ok(DaqMxIndex {
            kind,
            number_of_values,
            scalers,
            raw_data_widths,
        })
    }

    fn write_body<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError> {
        writer.write_value(&1u32)?;
        writer.write_value(&self.number_of_values)?;
        writer.write_value(&(self.scalers.len() as u32))?;
        for scaler in &self.scalers {
            writer.write_meta(scaler)?;
        }
        writer.write_value(&(self.raw_data_widths.len() as u32))?;
        for width in &self.raw_data_widths {
            writer.write_value(width)?;
        }
        Ok(())
    }

    /// The byte distance between consecutive samples of the shared buffer.
    pub fn stride(&self) -> u64 {
        self.raw_data_widths.iter().map(|w| *w as u64).sum()
    }

    /// The scaler that gives the channel its surfaced type and values.
    pub fn primary_scaler(&self) -> Result<&Scaler, TdmsError> {
        self.scalers
            .first()
            .ok_or(TdmsError::DaqMxNotInterpretable("no scalers declared"))
    }

    fn size(&self) -> usize {
        let scalers: usize = self.scalers.iter().map(|s| s.size()).sum();
        // header + dims + count + both vector length prefixes.
        4 + 4 + 8 + 4 + scalers + 4 + self.raw_data_widths.len() * 4
    }
}

/// Contains the data from the TDMS segment header.
///
/// The offsets can be used to jump around the three elements that could be in the segment.
///
/// |----------------------------------------------------
/// | lead in: 28 bytes
/// |----------------------------------------------------
/// | metadata: size = raw_data_offset |
/// |--------------------------------- | next segment offset
/// | raw data                         |
/// |--------------------------------- |-----------------
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Segment {
    pub toc: ToC,
    /// The total length of the segment including data but minus the lead in.
    /// Can be used to jump to the next segment in the file.
    /// Can be all 0xFF for last segment of file if it crashes during a write.
    pub next_segment_offset: u64,
    /// The full length of the meta data (excluding lead in).
    pub raw_data_offset: u64,
    pub meta_data: Option<MetaData>,
}

impl Segment {
    pub fn total_size_bytes(&self) -> Result<u64, TdmsError> {
        LEAD_IN_BYTES
            .checked_add(self.next_segment_offset)
            .ok_or(TdmsError::SegmentAddressOverflow)
    }

    /// Read the lead-in and metadata block at the current position.
    ///
    /// Errors with [`TdmsError::EndOfFile`] when there are no further
    /// segments and [`TdmsError::IncompleteSegment`] when the lead-in was
    /// never finalised. Both terminate a file walk cleanly.
    pub fn read(reader: &mut (impl Read + Seek), tag: FileTag) -> Result<Segment, TdmsError> {
        let segment_start = reader.stream_position()?;

        let mut lead_in = [0u8; LEAD_IN_BYTES as usize];
        let filled = read_up_to(reader, &mut lead_in)?;
        if filled == 0 {
            return Err(TdmsError::EndOfFile);
        }
        if filled < lead_in.len() {
            // A torn lead-in is an aborted write at the end of the file.
            warn!("partial lead-in of {filled} bytes at offset {segment_start}");
            return Err(TdmsError::EndOfFile);
        }

        let mut tag_bytes = [0u8; 4];
        tag_bytes.copy_from_slice(&lead_in[0..4]);
        if tag_bytes != tag.bytes() {
            return Err(TdmsError::HeaderPatternNotMatched(tag_bytes));
        }

        let mut toc_bytes = [0u8; 4];
        toc_bytes.copy_from_slice(&lead_in[4..8]);
        //ToC is always little endian.
        let toc = ToC::from_u32(u32::from_le_bytes(toc_bytes));

        let mut version_bytes = [0u8; 4];
        version_bytes.copy_from_slice(&lead_in[8..12]);
        let mut next_bytes = [0u8; 8];
        next_bytes.copy_from_slice(&lead_in[12..20]);
        let mut raw_offset_bytes = [0u8; 8];
        raw_offset_bytes.copy_from_slice(&lead_in[20..28]);

        let (version, next_segment_offset, raw_data_offset) = if toc.big_endian {
            (
                u32::from_be_bytes(version_bytes),
                u64::from_be_bytes(next_bytes),
                u64::from_be_bytes(raw_offset_bytes),
            )
        } else {
            (
                u32::from_le_bytes(version_bytes),
                u64::from_le_bytes(next_bytes),
                u64::from_le_bytes(raw_offset_bytes),
            )
        };

        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(TdmsError::UnsupportedVersion(version));
        }

        if next_segment_offset == INCOMPLETE_SEGMENT {
            return Err(TdmsError::IncompleteSegment(segment_start));
        }

        let meta_data = if toc.contains_meta_data {
            Some(match toc.big_endian {
                true => BigEndianReader::from_reader(reader).read_meta()?,
                false => LittleEndianReader::from_reader(reader).read_meta()?,
            })
        } else {
            None
        };

        Ok(Segment {
            toc,
            next_segment_offset,
            raw_data_offset,
            meta_data,
        })
    }
}

/// Fill as much of the buffer as the stream will provide.
fn read_up_to(reader: &mut impl Read, buffer: &mut [u8]) -> Result<usize, TdmsError> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(count) => filled += count,
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error.into()),
        }
    }
    Ok(filled)
}
