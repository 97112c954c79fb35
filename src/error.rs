//! The error type for all fallible operations on TDMS files.

use thiserror::Error;

use crate::io::data_types::DataType;

#[derive(Error, Debug)]
pub enum TdmsError {
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("End of file reached")]
    EndOfFile,
    #[error("Segment tag is not a TDMS tag: {0:X?}")]
    HeaderPatternNotMatched([u8; 4]),
    #[error("Segment at offset {0} carries the incomplete marker")]
    IncompleteSegment(u64),
    #[error("File version {0} is not supported (expected 4712 or 4713)")]
    UnsupportedVersion(u32),
    #[error("Matching data type not found for code {0:X}")]
    UnknownDataType(u32),
    #[error("Matching property type not found for code {0:X}")]
    UnknownPropertyType(u32),
    #[error("Data type {0} has no codec for this operation")]
    UnsupportedType(DataType),
    #[error("Attempted to use a {0} channel as {1}")]
    DataTypeMismatch(DataType, DataType),
    #[error("Channel {0} already exists as {1}, cannot redeclare as {2}")]
    ChannelTypeConflict(String, DataType, DataType),
    #[error("Group or channel not found in index: {0}")]
    MissingObject(String),
    #[error("Object path does not follow the /'group'/'channel' form: {0}")]
    InvalidObjectPath(String),
    #[error("Channel {0} matches a previous layout but none was ever declared")]
    NoPreviousFormat(String),
    #[error("Segment declares raw data but no channels are active")]
    SegmentTocDataBlockWithoutDataChannels,
    #[error("Next segment address would overflow the file offset")]
    SegmentAddressOverflow,
    #[error("Chunk size calculation overflowed")]
    ChunkSizeOverflow,
    #[error("Raw data offset extends past the end of the segment")]
    InvalidRawOffset,
    #[error("Segment declares a zero length data block")]
    ZeroLengthDataBlock,
    #[error("Failed to allocate space for the read")]
    VecAllocationFailed,
    #[error("String offsets in the data block at {0} are not monotonic")]
    StringOffsetsNotMonotonic(u64),
    #[error("Interleaved layout cannot contain variable width channels")]
    InterleavedVariableWidth,
    #[error("DAQmx data cannot be interpreted: {0}")]
    DaqMxNotInterpretable(&'static str),
    #[error("Data and index file metadata sizes diverged ({data} vs {index})")]
    MetadataSizeMismatch { data: u64, index: u64 },
}
