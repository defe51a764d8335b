use sea_orm::Value;
use std::fmt::Debug;
use std::fmt::Display;
use std::hash::Hash;

/// Capability set of a cached value.
///
/// A record names itself through its identifying key and reports the grouping
/// attribute that external reporting aggregates by. The cache stores records
/// under keys and passes `group()` through untouched; it never interprets the
/// attribute itself.
pub trait Record: Clone + Debug + Send + Sync + 'static {
    /// The key type to be used with methods like
    /// [`TableCache::from_key()`](crate::TableCache::from_key).
    ///
    /// Keys bind as positional SQL parameters, hence the [`Into<Value>`]
    /// bound. To implement multi-key access you can use an enum as the key
    /// type.
    type Key: Debug + Display + Hash + Clone + Eq + Into<Value> + Send + Sync + 'static;

    /// The record's own identifying key.
    ///
    /// A caller may look a record up under an identifier that differs from
    /// this key; see [`TableCache::from_key()`](crate::TableCache::from_key)
    /// for how the two interact.
    fn key(&self) -> Self::Key;

    /// The auxiliary grouping attribute of the record.
    fn group(&self) -> String;
}
