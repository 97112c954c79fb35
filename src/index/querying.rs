//! Module for more complex queries into the index.
//!
//! The base module will handle basic recall but this enables more complex queries of the index
//! such as getting all groups or channels.
//!

use std::ops::Bound;

use super::Index;
use crate::paths::ObjectPath;

/// Implement methods for getting the various objects from the index.
///
/// Note: This is designed only with paths and it is for the file level to convert/work with groups and channels
/// as that isn't a concept in the index.
impl Index {
    /// Get all of the objects stored in the index.
    pub fn all_paths(&self) -> impl Iterator<Item = ObjectPath<'_>> {
        self.objects.keys().map(|path| path.as_str())
    }

    /// Get all of the objects that start with the given path.
    ///
    /// This is seperated as we may be able to use techniques in the index to speed this up.
    pub fn paths_starting_with<'a>(
        &'a self,
        path: ObjectPath<'a>,
    ) -> impl Iterator<Item = ObjectPath<'a>> + 'a {
        // Since we use a BTree we can use ranges of strings to filter the interesting paths.
        // Lower range is our prefix.
        // An upper range is the prefix but with the last character incremented. This isn't trivial so we have
        // stuck with take_while as the performance benefit is likely to be low.
        self.objects
            .range::<String, _>((Bound::Included(path.to_string()), Bound::Unbounded))
            .map(|(path, _)| path.as_str())
            .take_while(move |p| p.starts_with(path))
    }
}
