//! Abstractions for page-based pagination.

/// Default number of items on a [`Page`].
pub const DEFAULT_LIMIT: u32 = 10;

/// Maximum number of items on a [`Page`].
pub const MAX_LIMIT: u32 = 100;

/// Pagination arguments.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Arguments {
    /// 1-indexed number of the requested page.
    page: u32,

    /// Number of items on the requested page.
    limit: u32,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Arguments {
    /// Creates new [`Arguments`] out of the requested `page` and `limit`.
    ///
    /// Missing or zero values fall back to defaults, and `limit` is capped
    /// by [`MAX_LIMIT`].
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            limit: limit
                .filter(|l| *l > 0)
                .map_or(DEFAULT_LIMIT, |l| l.min(MAX_LIMIT)),
        }
    }

    /// Returns the 1-indexed number of the requested page.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Returns the number of items on the requested page.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns the number of items to skip before the requested page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Returns the number of pages required to fit `total` items with `limit`
/// items per page.
#[must_use]
pub fn pages(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(u64::from(limit))
}

/// A page of items.
#[derive(Clone, Debug)]
pub struct Page<T> {
    /// Items on this [`Page`].
    pub items: Vec<T>,

    /// Total number of items matching the request across all pages.
    pub total: u64,

    /// [`Arguments`] this [`Page`] was selected with.
    pub arguments: Arguments,
}

impl<T> Page<T> {
    /// Returns the total number of pages.
    #[must_use]
    pub fn pages(&self) -> u64 {
        pages(self.total, self.arguments.limit)
    }

    /// Maps items of this [`Page`] with the provided function.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            arguments: self.arguments,
        }
    }
}

/// Pagination selector.
#[derive(Clone, Debug, Default)]
pub struct Selector<F> {
    /// Pagination [`Arguments`].
    pub arguments: Arguments,

    /// Additional filter being applied to the result.
    pub filter: F,
}

/// Defines pagination types.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($node:ty, $filter:ty) => {
        #[doc = "A [`Page`] of items."]
        pub type Page = $crate::pagination::Page<$node>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$filter>;
    };
}

#[cfg(test)]
mod spec {
    use super::{pages, Arguments, Page, DEFAULT_LIMIT, MAX_LIMIT};

    #[test]
    fn arguments_defaults_and_caps() {
        let args = Arguments::new(None, None);
        assert_eq!((args.page(), args.limit()), (1, DEFAULT_LIMIT));

        let args = Arguments::new(Some(0), Some(0));
        assert_eq!((args.page(), args.limit()), (1, DEFAULT_LIMIT));

        let args = Arguments::new(Some(3), Some(500));
        assert_eq!((args.page(), args.limit()), (3, MAX_LIMIT));
    }

    #[test]
    fn offset() {
        assert_eq!(Arguments::new(Some(1), Some(10)).offset(), 0);
        assert_eq!(Arguments::new(Some(3), Some(10)).offset(), 20);
        assert_eq!(Arguments::new(Some(2), Some(25)).offset(), 25);
    }

    #[test]
    fn pages_is_ceiling() {
        assert_eq!(pages(0, 10), 0);
        assert_eq!(pages(1, 10), 1);
        assert_eq!(pages(10, 10), 1);
        assert_eq!(pages(11, 10), 2);
        assert_eq!(pages(25, 10), 3);
        assert_eq!(pages(100, 100), 1);
    }

    #[test]
    fn page_of_first_ten_out_of_25() {
        let page = Page {
            items: (1..=25).take(10).collect::<Vec<u32>>(),
            total: 25,
            arguments: Arguments::new(Some(1), Some(10)),
        };

        assert_eq!(page.items.len(), 10);
        assert_eq!(page.pages(), 3);

        let mapped = page.map(|n| n * 2);
        assert_eq!(mapped.items.first(), Some(&2));
        assert_eq!(mapped.total, 25);
    }
}
