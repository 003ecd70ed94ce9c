use std::num::IntErrorKind;

use serde::Serialize;

/// Recipes shown per page of the index.
pub const PAGE_SIZE: usize = 10;

/// Where one page sits in a list of `count` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<usize>,
    pub next_page_number: Option<usize>,
    /// 1-based index of the first item on the page, 0 when the list is empty
    pub start_index: usize,
    pub end_index: usize,
    #[serde(skip)]
    pub offset: usize,
    #[serde(skip)]
    pub limit: usize,
}

impl Page {
    /// Resolve a raw `page` parameter. Anything unparseable means page 1, and
    /// numbers outside the list are pulled back to the first or last page.
    pub fn resolve(requested: Option<&str>, count: usize, per_page: usize) -> Self {
        let num_pages = count.div_ceil(per_page).max(1);
        let number = match requested.map(str::trim).map(str::parse::<i64>) {
            Some(Ok(n)) if n < 1 => 1,
            Some(Ok(n)) => usize::try_from(n).map_or(num_pages, |n| n.min(num_pages)),
            Some(Err(e)) if *e.kind() == IntErrorKind::PosOverflow => num_pages,
            _ => 1,
        };
        let offset = (number - 1) * per_page;
        let on_page = count.saturating_sub(offset).min(per_page);
        Self {
            number,
            num_pages,
            count,
            has_previous: number > 1,
            has_next: number < num_pages,
            previous_page_number: (number > 1).then(|| number - 1),
            next_page_number: (number < num_pages).then(|| number + 1),
            start_index: if on_page == 0 { 0 } else { offset + 1 },
            end_index: offset + on_page,
            offset,
            limit: per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seventeen_items_make_two_pages() {
        let first = Page::resolve(None, 17, PAGE_SIZE);
        assert_eq!((first.number, first.num_pages), (1, 2));
        assert_eq!((first.start_index, first.end_index), (1, 10));
        assert!(first.has_next && !first.has_previous);
        assert_eq!(first.next_page_number, Some(2));

        let second = Page::resolve(Some("2"), 17, PAGE_SIZE);
        assert_eq!((second.offset, second.limit), (10, 10));
        assert_eq!((second.start_index, second.end_index), (11, 17));
        assert!(!second.has_next && second.has_previous);
    }

    #[test]
    fn bad_page_numbers_are_clamped() {
        assert_eq!(Page::resolve(Some("abc"), 17, PAGE_SIZE).number, 1);
        assert_eq!(Page::resolve(Some(""), 17, PAGE_SIZE).number, 1);
        assert_eq!(Page::resolve(Some("0"), 17, PAGE_SIZE).number, 1);
        assert_eq!(Page::resolve(Some("-4"), 17, PAGE_SIZE).number, 1);
        assert_eq!(Page::resolve(Some("99"), 17, PAGE_SIZE).number, 2);
        assert_eq!(Page::resolve(Some("2.5"), 17, PAGE_SIZE).number, 1);
        assert_eq!(Page::resolve(Some("99999999999999999999"), 17, PAGE_SIZE).number, 2);
        assert_eq!(Page::resolve(Some("-99999999999999999999"), 17, PAGE_SIZE).number, 1);
    }

    #[test]
    fn empty_list_has_one_empty_page() {
        let page = Page::resolve(Some("3"), 0, PAGE_SIZE);
        assert_eq!((page.number, page.num_pages), (1, 1));
        assert_eq!((page.start_index, page.end_index), (0, 0));
        assert!(!page.has_next && !page.has_previous);
    }
}
