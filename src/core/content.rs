//! Compiled-in content catalog
//!
//! Two categories of exactly four items each. Indices handed to the store
//! always come from cycle draws, so lookups never fail.

/// Number of items in every category
pub const ITEMS_PER_CATEGORY: usize = 4;

/// Content partition a draw is made from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Category {
    Proverb = 0,
    Joke = 1,
}

impl Category {
    /// The other category
    #[inline]
    pub const fn toggled(self) -> Self {
        match self {
            Category::Proverb => Category::Joke,
            Category::Joke => Category::Proverb,
        }
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Proverb => "proverb",
            Category::Joke => "joke",
        }
    }

    #[inline(always)]
    pub(crate) const fn slot(self) -> usize {
        self as usize
    }

    #[inline]
    pub(crate) const fn from_raw(raw: u8) -> Self {
        if raw == Category::Proverb as u8 {
            Category::Proverb
        } else {
            Category::Joke
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Joke
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single joke or proverb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentItem {
    pub label: &'static str,
    pub text: &'static str,
}

impl ContentItem {
    const fn new(label: &'static str, text: &'static str) -> Self {
        Self { label, text }
    }
}

const PROVERBS: [ContentItem; ITEMS_PER_CATEGORY] = [
    ContentItem::new("PA", "The pen is mightier than the sword."),
    ContentItem::new("PB", "Hope for the best, but prepare for the worst."),
    ContentItem::new("PC", "The early bird catches the worm."),
    ContentItem::new("PD", "You can't judge a book by its cover."),
];

const JOKES: [ContentItem; ITEMS_PER_CATEGORY] = [
    ContentItem::new(
        "JA",
        "Apparently I snore so loudly that it scares everyone in the car I'm driving.",
    ),
    ContentItem::new(
        "JB",
        "Relationships are a lot like algebra. Have you ever looked at your X and wondered Y?",
    ),
    ContentItem::new("JC", "I started out with nothing, and I still have most of it."),
    ContentItem::new("JD", "Artificial intelligence is no match for natural stupidity."),
];

/// Immutable catalog, one row per category
#[derive(Debug, Clone, Copy)]
pub struct ContentStore {
    items: [&'static [ContentItem; ITEMS_PER_CATEGORY]; 2],
}

impl ContentStore {
    pub fn new() -> Self {
        Self {
            items: [&PROVERBS, &JOKES],
        }
    }

    /// Item at `index` within `category`
    ///
    /// # Panics
    /// If `index >= ITEMS_PER_CATEGORY`. Indices come from cycle draws only.
    #[inline]
    pub fn item(&self, category: Category, index: usize) -> &'static ContentItem {
        &self.items[category.slot()][index]
    }

    #[inline]
    pub fn category_count(&self, category: Category) -> usize {
        self.items[category.slot()].len()
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_counts() {
        let store = ContentStore::new();
        assert_eq!(store.category_count(Category::Joke), 4);
        assert_eq!(store.category_count(Category::Proverb), 4);
    }

    #[test]
    fn test_labels_by_category() {
        let store = ContentStore::new();
        let jokes: Vec<_> = (0..4).map(|i| store.item(Category::Joke, i).label).collect();
        let proverbs: Vec<_> = (0..4).map(|i| store.item(Category::Proverb, i).label).collect();
        assert_eq!(jokes, ["JA", "JB", "JC", "JD"]);
        assert_eq!(proverbs, ["PA", "PB", "PC", "PD"]);
    }

    #[test]
    fn test_category_toggle() {
        assert_eq!(Category::default(), Category::Joke);
        assert_eq!(Category::Joke.toggled(), Category::Proverb);
        assert_eq!(Category::Proverb.toggled().toggled(), Category::Proverb);
        assert_eq!(Category::from_raw(Category::Proverb as u8), Category::Proverb);
        assert_eq!(Category::from_raw(Category::Joke as u8), Category::Joke);
    }
}
