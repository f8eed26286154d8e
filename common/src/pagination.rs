//! Abstractions for offset-based pagination.

use std::num::NonZeroU32;

/// A page of nodes along with the total count of nodes matching the filter.
#[derive(Clone, Debug)]
pub struct Page<I> {
    /// Nodes on this [`Page`].
    pub nodes: Vec<I>,

    /// Total number of nodes across all the pages.
    pub total_count: u64,
}

impl<I> Page<I> {
    /// Creates a new [`Page`] out of the provided nodes.
    #[must_use]
    pub fn new(nodes: impl IntoIterator<Item = I>, total_count: u64) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            total_count,
        }
    }

    /// Maps nodes of this [`Page`] with the provided function.
    #[must_use]
    pub fn map<T>(self, f: impl FnMut(I) -> T) -> Page<T> {
        Page {
            nodes: self.nodes.into_iter().map(f).collect(),
            total_count: self.total_count,
        }
    }
}

/// Pagination arguments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Arguments {
    /// Number of the requested page, starting from `1`.
    page: NonZeroU32,

    /// Maximum number of nodes on a page.
    limit: NonZeroU32,
}

impl Arguments {
    /// Default number of nodes on a page.
    pub const DEFAULT_LIMIT: u32 = 10;

    /// Maximum allowed number of nodes on a page.
    pub const MAX_LIMIT: u32 = 100;

    /// Creates new [`Arguments`] out of the optional `page` and `limit`.
    ///
    /// Missing `page` means the first one, missing `limit` means
    /// [`Arguments::DEFAULT_LIMIT`].
    ///
    /// [`None`] is returned if `page` or `limit` is zero, or `limit` exceeds
    /// [`Arguments::MAX_LIMIT`].
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Option<Self> {
        let page = NonZeroU32::new(page.unwrap_or(1))?;
        let limit = NonZeroU32::new(limit.unwrap_or(Self::DEFAULT_LIMIT))?;
        (limit.get() <= Self::MAX_LIMIT).then_some(Self { page, limit })
    }

    /// Returns the requested page number, starting from `1`.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.get()
    }

    /// Returns the maximum number of nodes on the requested page.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit.get()
    }

    /// Returns the number of nodes to skip before the requested page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.get() - 1) * u64::from(self.limit.get())
    }
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            page: NonZeroU32::MIN,
            limit: NonZeroU32::new(Self::DEFAULT_LIMIT).unwrap_or(NonZeroU32::MIN),
        }
    }
}

/// Pagination selector.
#[derive(Clone, Copy, Debug)]
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
        #[doc = "A [`Page`] of nodes."]
        pub type Page = $crate::pagination::Page<$node>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$filter>;
    };
}

#[cfg(test)]
mod spec {
    use super::{Arguments, Page};

    #[test]
    fn defaults() {
        let args = Arguments::new(None, None).unwrap();

        assert_eq!(args.page(), 1);
        assert_eq!(args.limit(), Arguments::DEFAULT_LIMIT);
        assert_eq!(args.offset(), 0);
        assert_eq!(args, Arguments::default());
    }

    #[test]
    fn offset() {
        assert_eq!(Arguments::new(Some(3), Some(10)).unwrap().offset(), 20);
        assert_eq!(Arguments::new(Some(2), Some(25)).unwrap().offset(), 25);
        assert_eq!(Arguments::new(Some(1), Some(1)).unwrap().offset(), 0);
    }

    #[test]
    fn rejects_invalid() {
        assert!(Arguments::new(Some(0), None).is_none());
        assert!(Arguments::new(None, Some(0)).is_none());
        assert!(Arguments::new(None, Some(Arguments::MAX_LIMIT + 1)).is_none());
        assert!(Arguments::new(None, Some(Arguments::MAX_LIMIT)).is_some());
    }

    #[test]
    fn page_map() {
        let page = Page::new([1, 2, 3], 7).map(|n| n * 2);

        assert_eq!(page.nodes, vec![2, 4, 6]);
        assert_eq!(page.total_count, 7);
    }
}
