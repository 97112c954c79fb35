//! Contains wrappers for the standard writers to support
//! the TDMS use case of variable bitness.
//!

use std::io::{BufWriter, Seek, SeekFrom, Write};

use crate::error::TdmsError;
use crate::meta_data::{FileTag, TdmsMetaData, ToC, INCOMPLETE_SEGMENT};

type Result<T> = std::result::Result<T, TdmsError>;

pub trait TdmsWriter<W: Write>: Sized {
    /// Marker to place in the big_endian part of the ToC.
    const BIG_ENDIAN_FLAG: bool;
    fn from_writer(writer: W) -> Self;
    fn write_value<T: crate::io::data_types::TdmsStorageType>(&mut self, value: &T) -> Result<()>;
    fn write_meta<T: TdmsMetaData>(&mut self, value: &T) -> Result<()> {
        value.write(self)
    }
    fn buffered_writer(&mut self) -> &mut BufWriter<W>;

    /// Write pre-formatted bytes straight to the output.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffered_writer().write_all(bytes)?;
        Ok(())
    }

    /// The current absolute position in the output.
    fn stream_position(&mut self) -> Result<u64>
    where
        W: Seek,
    {
        Ok(self.buffered_writer().stream_position()?)
    }

    /// Move to an absolute position in the output.
    fn to_file_position(&mut self, position: u64) -> Result<()>
    where
        W: Seek,
    {
        self.buffered_writer().seek(SeekFrom::Start(position))?;
        Ok(())
    }

    /// Write a segment lead-in with the incomplete marker in place of the offsets.
    ///
    /// The tag and ToC bytes are endian independent, the remaining fields follow
    /// the endianess of this writer. The offsets are filled by
    /// [`TdmsWriter::finalise_lead_in`] once the block sizes are known so a crash
    /// mid-segment leaves the marker behind for readers to stop at.
    fn write_lead_in(&mut self, tag: FileTag, toc: ToC, version: u32) -> Result<()> {
        self.write_bytes(&tag.bytes())?;
        self.write_bytes(&toc.as_bytes())?;
        self.write_value(&version)?;
        self.write_value(&INCOMPLETE_SEGMENT)?;
        self.write_value(&0u64)?;
        Ok(())
    }

    /// Overwrite the two offset fields of the lead-in at `segment_start`,
    /// restoring the output position afterwards.
    fn finalise_lead_in(
        &mut self,
        segment_start: u64,
        next_segment_offset: u64,
        raw_data_offset: u64,
    ) -> Result<()>
    where
        W: Seek,
    {
        let resume = self.stream_position()?;
        self.to_file_position(segment_start + 12)?;
        self.write_value(&next_segment_offset)?;
        self.write_value(&raw_data_offset)?;
        self.to_file_position(resume)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()>;
}

pub struct LittleEndianWriter<W: Write>(BufWriter<W>);

impl<W: Write> TdmsWriter<W> for LittleEndianWriter<W> {
    fn from_writer(writer: W) -> Self {
        Self(BufWriter::new(writer))
    }
    fn write_value<T: crate::io::data_types::TdmsStorageType>(&mut self, value: &T) -> Result<()> {
        value.write_le(&mut self.0)
    }

    fn buffered_writer(&mut self) -> &mut BufWriter<W> {
        &mut self.0
    }

    const BIG_ENDIAN_FLAG: bool = false;

    fn sync(&mut self) -> Result<()> {
        self.0.flush()?;
        Ok(())
    }
}

pub struct BigEndianWriter<W: Write>(BufWriter<W>);

impl<W: Write> TdmsWriter<W> for BigEndianWriter<W> {
    fn from_writer(writer: W) -> Self {
        Self(BufWriter::new(writer))
    }
    fn write_value<T: crate::io::data_types::TdmsStorageType>(&mut self, value: &T) -> Result<()> {
        value.write_be(&mut self.0)
    }

    fn buffered_writer(&mut self) -> &mut BufWriter<W> {
        &mut self.0
    }

    const BIG_ENDIAN_FLAG: bool = true;

    fn sync(&mut self) -> Result<()> {
        self.0.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::io::data_types::TdmsStorageType;
    use std::io::Cursor;

    #[test]
    fn test_string() {
        //example from NI site
        let expected_buffer = [
            0x23, 00, 00, 00, 0x2Fu8, 0x27, 0x4D, 0x65, 0x61, 0x73, 0x75, 0x72, 0x65, 0x64, 0x20,
            0x54, 0x68, 0x72, 0x6F, 0x75, 0x67, 0x68, 0x70, 0x75, 0x74, 0x20, 0x44, 0x61, 0x74,
            0x61, 0x20, 0x28, 0x56, 0x6F, 0x6C, 0x74, 0x73, 0x29, 0x27,
        ];

        let mut output_buffer = vec![0u8; 39];

        {
            let mut cursor = Cursor::new(&mut output_buffer);
            let mut writer = LittleEndianWriter::from_writer(&mut cursor);
            let value = String::from("/'Measured Throughput Data (Volts)'");
            writer.write_value(&value).unwrap();
            assert_eq!(value.size(), expected_buffer.len());
        }

        assert_eq!(output_buffer, expected_buffer);
    }

    #[test]
    fn test_write_lead_in_holds_incomplete_marker() {
        let mut buffer = vec![0u8; 28];
        {
            let mut writer = LittleEndianWriter::from_writer(Cursor::new(&mut buffer));
            writer
                .write_lead_in(FileTag::Data, ToC::from_u32(0xE), 4713)
                .unwrap();
            writer.sync().unwrap();
        }

        assert_eq!(&buffer[0..4], b"TDSm");
        assert_eq!(&buffer[4..8], &0x0Eu32.to_le_bytes());
        assert_eq!(&buffer[8..12], &4713u32.to_le_bytes());
        assert_eq!(&buffer[12..20], &[0xFF; 8]);
        assert_eq!(&buffer[20..28], &[0x00; 8]);
    }

    #[test]
    fn test_finalise_lead_in_patches_offsets() {
        let mut buffer = vec![0u8; 64];
        {
            let mut writer = LittleEndianWriter::from_writer(Cursor::new(&mut buffer));
            writer
                .write_lead_in(FileTag::Index, ToC::from_u32(0x2), 4713)
                .unwrap();
            writer.write_value(&0xAAu8).unwrap();
            writer.finalise_lead_in(0, 500, 20).unwrap();
            // writing resumes where it left off.
            writer.write_value(&0xBBu8).unwrap();
            writer.sync().unwrap();
        }

        assert_eq!(&buffer[0..4], b"TDSh");
        assert_eq!(&buffer[12..20], &500u64.to_le_bytes());
        assert_eq!(&buffer[20..28], &20u64.to_le_bytes());
        assert_eq!(buffer[28], 0xAA);
        assert_eq!(buffer[29], 0xBB);
    }

    #[test]
    fn test_finalise_lead_in_big_endian() {
        let mut buffer = vec![0u8; 28];
        {
            let mut writer = BigEndianWriter::from_writer(Cursor::new(&mut buffer));
            writer
                .write_lead_in(FileTag::Data, ToC::from_u32(0x4E), 4713)
                .unwrap();
            writer.finalise_lead_in(0, 500, 20).unwrap();
            writer.sync().unwrap();
        }

        // tag and ToC stay little endian, numeric fields are big endian.
        assert_eq!(&buffer[0..4], b"TDSm");
        assert_eq!(&buffer[4..8], &0x4Eu32.to_le_bytes());
        assert_eq!(&buffer[8..12], &4713u32.to_be_bytes());
        assert_eq!(&buffer[12..20], &500u64.to_be_bytes());
        assert_eq!(&buffer[20..28], &20u64.to_be_bytes());
    }
}
