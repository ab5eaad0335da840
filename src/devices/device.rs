//! # Device records.
//!
//! A device is plain data: a stable [`DeviceId`], a human-readable name and a [`Category`].
//! Its concurrent lifecycle is driven elsewhere (see `core::worker`), which only holds
//! an `Arc<Device>` next to handles of the shared gate and slot table.
//!
//! Names are **not** identities: two devices may share a name, the coordinator
//! hands out distinct ids in configuration order.

use std::fmt;
use std::sync::Arc;

/// Stable identity of a simulated device within one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Closed set of device kinds.
///
/// Unknown selections fall back to [`Category::Mobile`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Category {
    #[default]
    Mobile,
    Tablet,
    PC,
}

impl Category {
    /// All categories in menu order.
    pub const ALL: [Category; 3] = [Category::Mobile, Category::Tablet, Category::PC];

    /// Maps a 1-based menu choice to a category.
    ///
    /// Out-of-range choices default to `Mobile`.
    ///
    /// # Example
    /// ```
    /// use routergate::Category;
    ///
    /// assert_eq!(Category::from_choice(3), Category::PC);
    /// assert_eq!(Category::from_choice(0), Category::Mobile);
    /// assert_eq!(Category::from_choice(9), Category::Mobile);
    /// ```
    pub fn from_choice(choice: usize) -> Self {
        Self::menu(choice).unwrap_or_default()
    }

    fn menu(choice: usize) -> Option<Self> {
        choice.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    /// Parses a category label (case-insensitive) or a menu number.
    ///
    /// Accepts the labels themselves plus the aliases `phone` and `laptop`.
    /// Returns `None` for anything else, including out-of-range menu numbers.
    ///
    /// # Example
    /// ```
    /// use routergate::Category;
    ///
    /// assert_eq!(Category::parse("Laptop"), Some(Category::Tablet));
    /// assert_eq!(Category::parse("3"), Some(Category::PC));
    /// assert_eq!(Category::parse("toaster"), None);
    /// ```
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if let Ok(choice) = label.parse::<usize>() {
            return Self::menu(choice);
        }
        match label.to_ascii_lowercase().as_str() {
            "mobile" | "phone" => Some(Category::Mobile),
            "tablet" | "laptop" => Some(Category::Tablet),
            "pc" => Some(Category::PC),
            _ => None,
        }
    }

    /// Like [`Category::parse`], defaulting to `Mobile`.
    pub fn from_label(label: &str) -> Self {
        Self::parse(label).unwrap_or_default()
    }

    /// Returns the label used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Mobile => "Mobile",
            Category::Tablet => "Tablet",
            Category::PC => "PC",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration entry for one device, before an id is assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceSpec {
    /// Display name.
    pub name: String,
    /// Device kind.
    pub category: Category,
}

impl DeviceSpec {
    /// Creates a new device specification.
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
        }
    }
}

/// A simulated client competing for a router slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    id: DeviceId,
    name: Arc<str>,
    category: Category,
}

impl Device {
    /// Creates a device with an explicit id.
    pub fn new(id: DeviceId, name: impl Into<Arc<str>>, category: Category) -> Self {
        Self {
            id,
            name: name.into(),
            category,
        }
    }

    /// Materializes a spec under the given id.
    pub fn from_spec(id: DeviceId, spec: DeviceSpec) -> Self {
        Self::new(id, spec.name, spec.category)
    }

    #[inline]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the name (cheap to attach to events).
    #[inline]
    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    #[inline]
    pub fn category(&self) -> Category {
        self.category
    }
}
