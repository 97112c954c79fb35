//! Module to specify object paths in user friendly manners.
//!
//! Paths have three forms: the file root `/`, a group `/'name'` and a
//! channel `/'group'/'channel'`. Names are wrapped in single quotes with
//! any embedded single quote doubled.

use std::fmt::{Debug, Display};

use crate::error::TdmsError;

/// The internal type of paths into the TDMS file.
pub type ObjectPath<'a> = &'a str;

/// Names in the path must be escaped.
///
/// A single quote in a name is doubled on disk.
fn escape_name(name: &str) -> String {
    name.replace('\'', "''")
}

/// A path to a location in a tdms file.
///
/// These will format the path correctly and turn it into a owned string
/// (i.e. it does allocation)
///
/// ```rust
/// use monotony::PropertyPath;
///
/// let path = PropertyPath::channel("group", "channel");
/// assert_eq!(path.path(), "/'group'/'channel'");
/// ```
///
/// The [`PropertyPath::file`] path is a special case and is used to specify the root of the file.
///
/// ```rust
/// use monotony::PropertyPath;
///
/// let path = PropertyPath::file();
/// assert_eq!(path.path(), "/");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct PropertyPath(String);

impl PropertyPath {
    /// Path to the root of the file.
    pub fn file() -> Self {
        Self(String::from("/"))
    }

    /// Generate a path to a group.
    pub fn group(group: &str) -> Self {
        Self(format!("/'{}'", escape_name(group)))
    }

    /// Generate a path to a channel.
    pub fn channel(group: &str, channel: &str) -> Self {
        Self(format!(
            "/'{}'/'{}'",
            escape_name(group),
            escape_name(channel)
        ))
    }

    /// Get the path in the internal format.
    pub fn path(&self) -> ObjectPath {
        self.0.as_ref()
    }
}

impl Debug for PropertyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for PropertyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Path for a channel in the TDMS file.
///
/// This is a wrapper around the [`PropertyPath`] to indicate that it is a channel.
///
/// ```rust
/// use monotony::ChannelPath;
///
/// let path = ChannelPath::new("group", "channel");
/// assert_eq!(path.path(), "/'group'/'channel'");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelPath(PropertyPath);

impl ChannelPath {
    /// Get the path in the internal format.
    pub fn path(&self) -> ObjectPath {
        self.0.path()
    }

    /// Create a new channel path for the specified group and channel.
    ///
    /// NOTE: This allocates internally.
    pub fn new(group: &str, channel: &str) -> Self {
        Self(PropertyPath::channel(group, channel))
    }
}

// Needed to take slice of ChannelPath or &ChannelPath.
impl AsRef<ChannelPath> for ChannelPath {
    fn as_ref(&self) -> &ChannelPath {
        self
    }
}

// Needed to support input into the property path functions.
impl AsRef<PropertyPath> for ChannelPath {
    fn as_ref(&self) -> &PropertyPath {
        &self.0
    }
}

impl std::fmt::Display for ChannelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", PropertyPath::path(&self.0))
    }
}

/// The decoded form of an object path found in a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedPath {
    Root,
    Group(String),
    Channel { group: String, channel: String },
}

impl ParsedPath {
    /// Re-encode the path back into the on disk form.
    pub fn to_property_path(&self) -> PropertyPath {
        match self {
            ParsedPath::Root => PropertyPath::file(),
            ParsedPath::Group(group) => PropertyPath::group(group),
            ParsedPath::Channel { group, channel } => PropertyPath::channel(group, channel),
        }
    }
}

/// Parse an object path into its unescaped name parts.
///
/// Round trips with the [`PropertyPath`] constructors so that
/// `parse(p).to_property_path() == p` for any well formed path.
pub fn parse_object_path(path: ObjectPath) -> Result<ParsedPath, TdmsError> {
    if path == "/" {
        return Ok(ParsedPath::Root);
    }

    let malformed = || TdmsError::InvalidObjectPath(path.to_string());

    let mut names: Vec<String> = Vec::new();
    let mut chars = path.chars().peekable();
    while chars.peek().is_some() {
        if chars.next() != Some('/') {
            return Err(malformed());
        }
        if chars.next() != Some('\'') {
            return Err(malformed());
        }
        let mut name = String::new();
        loop {
            match chars.next() {
                // A doubled quote is an escaped quote within the name,
                // a lone quote terminates it.
                Some('\'') if chars.peek() == Some(&'\'') => {
                    chars.next();
                    name.push('\'');
                }
                Some('\'') => break,
                Some(other) => name.push(other),
                None => return Err(malformed()),
            }
        }
        names.push(name);
    }

    let mut names = names.into_iter();
    match (names.next(), names.next(), names.next()) {
        (Some(group), None, _) => Ok(ParsedPath::Group(group)),
        (Some(group), Some(channel), None) => Ok(ParsedPath::Channel { group, channel }),
        _ => Err(malformed()),
    }
}
