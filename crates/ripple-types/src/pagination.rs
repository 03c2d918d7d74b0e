use serde::{Deserialize, Serialize};

/// Page selector. `Last` is resolved against the collection size before the
/// page itself is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Number(u32),
    Last,
}

impl Page {
    /// Maps the `page` query parameter: `-1` selects the last page, anything
    /// below 1 (or absent) selects the first.
    pub fn from_query(raw: Option<i64>) -> Self {
        match raw {
            Some(-1) => Self::Last,
            Some(n) if n >= 1 => Self::Number(u32::try_from(n).unwrap_or(u32::MAX)),
            _ => Self::Number(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: Page,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Page, per_page: u32) -> Self {
        Self {
            page,
            per_page: per_page.max(1),
        }
    }

    pub fn first(per_page: u32) -> Self {
        Self::new(Page::Number(1), per_page)
    }

    /// Concrete 1-based page number for a collection of `total` items.
    pub fn resolve(&self, total: u64) -> u32 {
        match self.page {
            Page::Number(n) => n.max(1),
            Page::Last => page_count(total, self.per_page).max(1),
        }
    }
}

pub fn page_count(total: u64, per_page: u32) -> u32 {
    let per_page = u64::from(per_page.max(1));
    u32::try_from(total.div_ceil(per_page)).unwrap_or(u32::MAX)
}

/// Query parameters accepted by every paginated endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// A `page` value that is not an integer reads as the first page.
    pub fn page(&self) -> Page {
        Page::from_query(self.page.as_deref().and_then(|raw| raw.trim().parse().ok()))
    }
}

/// One page of a collection. `prev` and `next` name the neighbouring page
/// numbers when they exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u32,
    pub prev: Option<u32>,
    pub next: Option<u32>,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let pages = page_count(total, per_page);
        Self {
            items,
            page,
            per_page,
            total,
            pages,
            prev: (page > 1).then(|| page - 1),
            next: (page < pages).then(|| page + 1),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            pages: self.pages,
            prev: self.prev,
            next: self.next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_sentinel_selects_last_page() {
        assert_eq!(Page::from_query(Some(-1)), Page::Last);
        assert_eq!(Page::from_query(Some(3)), Page::Number(3));
        assert_eq!(Page::from_query(Some(0)), Page::Number(1));
        assert_eq!(Page::from_query(Some(-7)), Page::Number(1));
        assert_eq!(Page::from_query(None), Page::Number(1));
    }

    #[test]
    fn last_page_resolves_from_total() {
        let req = PageRequest::new(Page::Last, 10);
        assert_eq!(req.resolve(0), 1);
        assert_eq!(req.resolve(10), 1);
        assert_eq!(req.resolve(11), 2);
        assert_eq!(req.resolve(35), 4);
    }

    #[test]
    fn zero_page_size_is_clamped() {
        let req = PageRequest::new(Page::Number(1), 0);
        assert_eq!(req.per_page, 1);
        assert_eq!(page_count(5, 0), 5);
    }

    #[test]
    fn neighbouring_pages() {
        let middle = Paginated::<u8>::new(vec![], 2, 10, 25);
        assert_eq!(middle.pages, 3);
        assert_eq!((middle.prev, middle.next), (Some(1), Some(3)));

        let last = Paginated::<u8>::new(vec![], 3, 10, 25);
        assert_eq!((last.prev, last.next), (Some(2), None));

        let empty = Paginated::<u8>::new(vec![], 1, 10, 0);
        assert_eq!((empty.prev, empty.next), (None, None));
    }

    #[test]
    fn unparseable_page_values_read_as_first_page() {
        let query = |raw: &str| PageQuery {
            page: Some(raw.to_string()),
        };
        assert_eq!(query("abc").page(), Page::Number(1));
        assert_eq!(query("").page(), Page::Number(1));
        assert_eq!(query("2.5").page(), Page::Number(1));
        assert_eq!(query(" 4 ").page(), Page::Number(4));
        assert_eq!(query("-1").page(), Page::Last);
        assert_eq!(PageQuery::default().page(), Page::Number(1));
    }
}
