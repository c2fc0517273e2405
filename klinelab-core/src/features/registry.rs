//! Explicit registry of indicator categories.
//!
//! Availability is decided here, up front: a category that cannot supply an
//! indicator registers it absent, and consumers iterate what is actually
//! present instead of discovering gaps at compute time.

use std::collections::BTreeMap;
use std::fmt;

use super::indicator::Indicator;
use super::{
    cycle, math_transform, momentum, overlap, pattern, price_transform, statistics,
    volatility, volume,
};

/// The nine indicator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Overlap,
    Momentum,
    Volume,
    Volatility,
    PriceTransform,
    Cycle,
    Pattern,
    MathTransform,
    Statistics,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Overlap,
        Category::Momentum,
        Category::Volume,
        Category::Volatility,
        Category::PriceTransform,
        Category::Cycle,
        Category::Pattern,
        Category::MathTransform,
        Category::Statistics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Overlap => "overlap",
            Category::Momentum => "momentum",
            Category::Volume => "volume",
            Category::Volatility => "volatility",
            Category::PriceTransform => "price_transform",
            Category::Cycle => "cycle",
            Category::Pattern => "pattern",
            Category::MathTransform => "math_transform",
            Category::Statistics => "statistics",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All registered indicators, grouped by category.
pub struct FeatureRegistry {
    categories: BTreeMap<Category, Vec<Box<dyn Indicator>>>,
}

impl FeatureRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            categories: BTreeMap::new(),
        }
    }

    /// Every category's default parameter table.
    pub fn default_set() -> Self {
        let mut registry = Self::new();
        registry.register(Category::Overlap, overlap::default_indicators());
        registry.register(Category::Momentum, momentum::default_indicators());
        registry.register(Category::Volume, volume::default_indicators());
        registry.register(Category::Volatility, volatility::default_indicators());
        registry.register(Category::PriceTransform, price_transform::default_indicators());
        registry.register(Category::Cycle, cycle::default_indicators());
        registry.register(Category::Pattern, pattern::default_indicators());
        registry.register(Category::MathTransform, math_transform::default_indicators());
        registry.register(Category::Statistics, statistics::default_indicators());
        registry
    }

    /// Add indicators to a category, appending if it already has some.
    pub fn register(&mut self, category: Category, indicators: Vec<Box<dyn Indicator>>) {
        self.categories.entry(category).or_default().extend(indicators);
    }

    /// Indicators of one category, empty slice if the category is absent.
    pub fn category(&self, category: Category) -> &[Box<dyn Indicator>] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True if the category has at least one indicator.
    pub fn has_category(&self, category: Category) -> bool {
        !self.category(category).is_empty()
    }

    /// Iterate every indicator with its category, in category order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &dyn Indicator)> {
        self.categories
            .iter()
            .flat_map(|(cat, inds)| inds.iter().map(|i| (*cat, i.as_ref())))
    }

    /// Every output column name, in registration order per category.
    pub fn column_names(&self) -> Vec<&str> {
        self.iter().map(|(_, i)| i.name()).collect()
    }

    /// Total indicator count across all categories.
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The longest warm-up any registered indicator needs.
    pub fn max_lookback(&self) -> usize {
        self.iter().map(|(_, i)| i.lookback()).max().unwrap_or(0)
    }
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::default_set()
    }
}
