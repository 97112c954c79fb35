//! Validate the write API and the segment structure it produces.
//!
mod common;

use common::*;
use monotony::{ChannelPath, DataType, TdmsFileWriter, WriterOptions};
use std::io::Cursor;

#[test]
fn test_single_int32_channel_layout() {
    let mut data = Vec::new();
    {
        let mut writer =
            TdmsFileWriter::from_streams(Cursor::new(&mut data), None, WriterOptions::default())
                .unwrap();
        let channel = writer.ensure_channel("G", "C", DataType::I32).unwrap();
        writer.append_values(&channel, &[1i32, 2, 3, 4, 5]).unwrap();
        writer.write_segment().unwrap();
    }

    let offsets = segment_offsets(&data);
    assert_eq!(offsets.len(), 1);
    let toc = toc_at(&data, 0);
    assert_ne!(toc & TOC_META_DATA, 0);
    assert_ne!(toc & TOC_NEW_OBJECT_LIST, 0);
    assert_ne!(toc & TOC_RAW_DATA, 0);
    assert_eq!(toc & TOC_INTERLEAVED, 0);
    assert_eq!(toc & TOC_BIG_ENDIAN, 0);

    // Three objects: root, group and channel.
    assert_eq!(le_u32(&data, 28), 3);

    // 20 bytes of little endian raw data at the end of the segment.
    let raw_start = 28 + le_u64(&data, 20) as usize;
    let mut expected = vec![];
    for value in [1i32, 2, 3, 4, 5] {
        expected.extend(value.to_le_bytes());
    }
    assert_eq!(&data[raw_start..], &expected[..]);

    let mut file = load_data(data);
    assert_eq!(file.groups(), vec!["G".to_string()]);
    assert_eq!(file.group_channels("G"), vec!["C".to_string()]);
    let channel = ChannelPath::new("G", "C");
    assert_eq!(file.channel_length(&channel), Some(5));
    let mut samples = vec![0i32; 5];
    file.read_channel(&channel, &mut samples).unwrap();
    assert_eq!(samples, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_same_shape_reuses_segment() {
    let mut data = Vec::new();
    {
        let mut writer =
            TdmsFileWriter::from_streams(Cursor::new(&mut data), None, WriterOptions::default())
                .unwrap();
        let channel = writer.ensure_channel("G", "C", DataType::I32).unwrap();
        writer.append_values(&channel, &[1i32, 2, 3]).unwrap();
        writer.write_segment().unwrap();
        writer.append_values(&channel, &[4i32, 5, 6]).unwrap();
        writer.write_segment().unwrap();
    }

    // The matching second flush extended the first segment rather than
    // emitting fresh metadata.
    assert_eq!(segment_offsets(&data).len(), 1);

    let mut file = load_data(data);
    let channel = ChannelPath::new("G", "C");
    assert_eq!(file.channel_length(&channel), Some(6));
    let mut samples = vec![0i32; 6];
    file.read_channel(&channel, &mut samples).unwrap();
    assert_eq!(samples, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_active_channel_change_forces_new_object_list() {
    let mut data = Vec::new();
    {
        let mut writer =
            TdmsFileWriter::from_streams(Cursor::new(&mut data), None, WriterOptions::default())
                .unwrap();
        let ch1 = writer.ensure_channel("G", "C1", DataType::DoubleFloat).unwrap();
        let ch2 = writer.ensure_channel("G", "C2", DataType::DoubleFloat).unwrap();
        writer.append_values(&ch1, &[1.0, 2.0, 3.0]).unwrap();
        writer.append_values(&ch2, &[10.0, 20.0, 30.0]).unwrap();
        writer.write_segment().unwrap();
        writer.append_values(&ch1, &[4.0, 5.0]).unwrap();
        writer.write_segment().unwrap();
    }

    let offsets = segment_offsets(&data);
    assert_eq!(offsets.len(), 2);
    assert_ne!(toc_at(&data, offsets[1]) & TOC_NEW_OBJECT_LIST, 0);

    let mut file = load_data(data);
    let ch1 = ChannelPath::new("G", "C1");
    let ch2 = ChannelPath::new("G", "C2");
    let mut c1 = vec![0.0f64; 5];
    file.read_channel(&ch1, &mut c1).unwrap();
    assert_eq!(c1, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    let mut c2 = vec![0.0f64; 3];
    file.read_channel(&ch2, &mut c2).unwrap();
    assert_eq!(c2, vec![10.0, 20.0, 30.0]);
    assert_eq!(file.channel_length(&ch2), Some(3));
}

#[test]
fn test_fragmented_write() {
    let mut data = Vec::new();
    {
        let mut writer =
            TdmsFileWriter::from_streams(Cursor::new(&mut data), None, WriterOptions::default())
                .unwrap();
        let ch1 = writer.ensure_channel("structure", "ch1", DataType::DoubleFloat).unwrap();
        let ch2 = writer.ensure_channel("structure", "ch2", DataType::DoubleFloat).unwrap();

        writer.append_values(&ch1, &[1.0, 2.0, 3.0]).unwrap();
        writer.write_segment().unwrap();
        writer.append_values(&ch2, &[6.0, 7.0, 8.0, 9.0, 10.0]).unwrap();
        writer.write_segment().unwrap();
        writer.append_values(&ch1, &[4.0, 5.0]).unwrap();
        writer.write_segment().unwrap();
    }

    let mut file = load_data(data);
    let mut buffer = vec![0.0f64; 5];
    file.read_channel(&ChannelPath::new("structure", "ch1"), &mut buffer)
        .unwrap();
    assert_eq!(buffer, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    file.read_channel(&ChannelPath::new("structure", "ch2"), &mut buffer)
        .unwrap();
    assert_eq!(buffer, vec![6.0, 7.0, 8.0, 9.0, 10.0]);
}

/// However the appends are split over flushes, the read back content is
/// the same.
#[test]
fn test_append_split_invariance() {
    let splits: [&[usize]; 3] = [&[10], &[3, 7], &[5, 4, 1]];
    let source: Vec<i64> = (0..10).collect();

    for split in splits {
        let mut data = Vec::new();
        {
            let mut writer = TdmsFileWriter::from_streams(
                Cursor::new(&mut data),
                None,
                WriterOptions::default(),
            )
            .unwrap();
            let channel = writer.ensure_channel("G", "C", DataType::I64).unwrap();
            let mut written = 0;
            for count in split {
                writer
                    .append_values(&channel, &source[written..written + count])
                    .unwrap();
                writer.write_segment().unwrap();
                written += count;
            }
        }

        let mut file = load_data(data);
        let channel = ChannelPath::new("G", "C");
        assert_eq!(file.channel_length(&channel), Some(10));
        let mut samples = vec![0i64; 10];
        file.read_channel(&channel, &mut samples).unwrap();
        assert_eq!(samples, source, "split {split:?} changed the content");
    }
}

#[test]
fn test_interleaved_write_round_trip() {
    let mut data = Vec::new();
    {
        let mut writer = TdmsFileWriter::from_streams(
            Cursor::new(&mut data),
            None,
            WriterOptions {
                interleaved: true,
                ..WriterOptions::default()
            },
        )
        .unwrap();
        let ch1 = writer.ensure_channel("G", "C1", DataType::U32).unwrap();
        let ch2 = writer.ensure_channel("G", "C2", DataType::U32).unwrap();
        writer.append_values(&ch1, &[1u32, 3, 5]).unwrap();
        writer.append_values(&ch2, &[2u32, 4, 6]).unwrap();
        writer.write_segment().unwrap();
    }

    let offsets = segment_offsets(&data);
    assert_ne!(toc_at(&data, offsets[0]) & TOC_INTERLEAVED, 0);

    // Samples strided across the channels.
    let raw_start = 28 + le_u64(&data, 20) as usize;
    let mut expected = vec![];
    for value in [1u32, 2, 3, 4, 5, 6] {
        expected.extend(value.to_le_bytes());
    }
    assert_eq!(&data[raw_start..], &expected[..]);

    let mut file = load_data(data);
    let mut samples = vec![0u32; 3];
    file.read_channel(&ChannelPath::new("G", "C1"), &mut samples)
        .unwrap();
    assert_eq!(samples, vec![1, 3, 5]);
    file.read_channel(&ChannelPath::new("G", "C2"), &mut samples)
        .unwrap();
    assert_eq!(samples, vec![2, 4, 6]);
}

macro_rules! write_datatype_test {
    ($writer: ident, $type: ty) => {
        let channel_name = stringify!($type);
        let channel_path = $writer
            .ensure_channel("datatypes", channel_name, <$type as monotony::TdmsStorageType>::NATURAL_TYPE)
            .unwrap();
        let expected = (0..100).map(|value| value as $type).collect::<Vec<$type>>();
        $writer.append_values(&channel_path, &expected[..]).unwrap();
        $writer.write_segment().unwrap();
    };
}

macro_rules! read_datatype_test {
    ($file: ident, $type: ty) => {
        let channel_name = stringify!($type);
        let expected = (0..100).map(|value| value as $type).collect::<Vec<$type>>();
        let mut buffer = vec![0 as $type; 100];
        $file
            .read_channel(&ChannelPath::new("datatypes", channel_name), &mut buffer[..])
            .unwrap();
        assert_eq!(buffer, expected);
    };
}

#[test]
fn test_write_basic_numeric_types() {
    let mut data = Vec::new();
    {
        let mut writer =
            TdmsFileWriter::from_streams(Cursor::new(&mut data), None, WriterOptions::default())
                .unwrap();
        write_datatype_test!(writer, i8);
        write_datatype_test!(writer, u8);
        write_datatype_test!(writer, i16);
        write_datatype_test!(writer, u16);
        write_datatype_test!(writer, i32);
        write_datatype_test!(writer, u32);
        write_datatype_test!(writer, i64);
        write_datatype_test!(writer, u64);
        write_datatype_test!(writer, f32);
        write_datatype_test!(writer, f64);
    }

    let mut file = load_data(data);
    read_datatype_test!(file, i8);
    read_datatype_test!(file, u8);
    read_datatype_test!(file, i16);
    read_datatype_test!(file, u16);
    read_datatype_test!(file, i32);
    read_datatype_test!(file, u32);
    read_datatype_test!(file, i64);
    read_datatype_test!(file, u64);
    read_datatype_test!(file, f32);
    read_datatype_test!(file, f64);
}

#[test]
fn test_channel_iter_streams_in_chunks() {
    let mut data = Vec::new();
    {
        let mut writer =
            TdmsFileWriter::from_streams(Cursor::new(&mut data), None, WriterOptions::default())
                .unwrap();
        let channel = writer.ensure_channel("G", "C", DataType::U16).unwrap();
        let samples: Vec<u16> = (0..25).collect();
        writer.append_values(&channel, &samples).unwrap();
        writer.write_segment().unwrap();
    }

    let mut file = load_data(data);
    let chunks: Vec<Vec<u16>> = file
        .channel_iter(ChannelPath::new("G", "C"), 10)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0], (0..10).collect::<Vec<u16>>());
    assert_eq!(chunks[1], (10..20).collect::<Vec<u16>>());
    assert_eq!(chunks[2], (20..25).collect::<Vec<u16>>());
}
