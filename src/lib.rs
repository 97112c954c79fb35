//! A segment level codec for the TDMS file format.
//!
//! TDMS files are a sequence of segments, each carrying incremental
//! metadata for a two level tree of groups and channels plus the raw
//! channel samples. This crate implements the reader and writer for that
//! layout: the matches-previous index sentinels, the raw-only segment
//! extension used for repeated appends, the crash protection marker in
//! unfinalised lead-ins and the `.tdms_index` twin file written in
//! lockstep with the data.
//!
//! # Writing and reading back
//!
//! ```rust
//! use monotony::{ChannelPath, DataType, TdmsFile, TdmsFileWriter, WriterOptions};
//! use std::io::Cursor;
//!
//! let mut data = Vec::new();
//! {
//!     let mut writer = TdmsFileWriter::from_streams(
//!         Cursor::new(&mut data),
//!         None,
//!         WriterOptions::default(),
//!     ).unwrap();
//!     let channel = writer
//!         .ensure_channel("measurements", "voltage", DataType::DoubleFloat)
//!         .unwrap();
//!     writer.append_values(&channel, &[1.0, 2.0, 3.0]).unwrap();
//!     writer.write_segment().unwrap();
//! }
//!
//! let mut file = TdmsFile::new(Cursor::new(data)).unwrap();
//! let mut samples = vec![0.0f64; 3];
//! file.read_channel(&ChannelPath::new("measurements", "voltage"), &mut samples)
//!     .unwrap();
//! assert_eq!(samples, vec![1.0, 2.0, 3.0]);
//! ```
//!
//! File backed sessions use [`TdmsFileWriter::create`] and
//! [`TdmsFile::load`], or [`TdmsFile::load_indexed`] to defer bulk reads
//! by walking the `.tdms_index` twin instead of the data file.

mod error;
mod file;
mod index;
mod io;
mod meta_data;
mod paths;
mod properties;
mod raw_data;
mod writer;

pub use error::TdmsError;
pub use file::{ChannelChunks, TdmsFile};
pub use io::data_types::{Complex, DataType, ExtendedRaw, TdmsStorageType, Timestamp};
pub use paths::{ChannelPath, PropertyPath};
pub use properties::PropertyValue;
pub use writer::{TdmsFileWriter, WriterOptions};
