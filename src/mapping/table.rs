//! The rename/override rule table.

use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Category
// =============================================================================

/// The four fixed rule categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Channel `Name` → new name
    ChannelName,

    /// Channel `Fluor` → new fluorophore (also becomes the channel name)
    FluorName,

    /// `Pixels` size attribute (e.g. `SizeC`) → value
    Size,

    /// `Pixels` physical size attribute (e.g. `PhysicalSizeX`) → value
    PhysicalSize,
}

impl Category {
    /// All categories, in the order the mutation engine consults them.
    pub const ALL: [Category; 4] = [
        Category::ChannelName,
        Category::FluorName,
        Category::Size,
        Category::PhysicalSize,
    ];

    /// The label used in mapping files.
    pub const fn key(&self) -> &'static str {
        match self {
            Category::ChannelName => "channel_name",
            Category::FluorName => "fluor_name",
            Category::Size => "size",
            Category::PhysicalSize => "physical_size",
        }
    }

    /// Parse a mapping file label.
    pub fn from_key(key: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// =============================================================================
// MappingTable
// =============================================================================

/// Immutable rule table with one sorted map per category.
///
/// Absent categories are empty maps. Keys are sorted so rules that write the
/// same document always apply in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    channel_name: BTreeMap<String, String>,
    fluor_name: BTreeMap<String, String>,
    size: BTreeMap<String, String>,
    physical_size: BTreeMap<String, String>,
}

impl MappingTable {
    /// An empty table. Applying it only prunes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from category-labelled rules.
    ///
    /// A later rule for the same key replaces an earlier one.
    pub fn from_rules<I, K, V>(rules: I) -> Self
    where
        I: IntoIterator<Item = (Category, K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = Self::default();
        for (category, key, value) in rules {
            table.map_mut(category).insert(key.into(), value.into());
        }
        table
    }

    /// Replacement for `key` in `category`, if any.
    pub fn lookup(&self, category: Category, key: &str) -> Option<&str> {
        self.map(category).get(key).map(String::as_str)
    }

    /// Rules of a category in key order.
    pub fn rules(&self, category: Category) -> impl Iterator<Item = (&str, &str)> {
        self.map(category)
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of rules in a category.
    pub fn len(&self, category: Category) -> usize {
        self.map(category).len()
    }

    /// True when no category holds a rule.
    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.map(*c).is_empty())
    }

    fn map(&self, category: Category) -> &BTreeMap<String, String> {
        match category {
            Category::ChannelName => &self.channel_name,
            Category::FluorName => &self.fluor_name,
            Category::Size => &self.size,
            Category::PhysicalSize => &self.physical_size,
        }
    }

    fn map_mut(&mut self, category: Category) -> &mut BTreeMap<String, String> {
        match category {
            Category::ChannelName => &mut self.channel_name,
            Category::FluorName => &mut self.fluor_name,
            Category::Size => &mut self.size,
            Category::PhysicalSize => &mut self.physical_size,
        }
    }
}
