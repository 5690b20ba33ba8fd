use serde::Deserialize;

use yatube_types::models::Page;

pub const PAGE_SIZE: u32 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Kept as text so junk values fall back to the first page instead of
    /// failing extraction.
    pub page: Option<String>,
}

/// A page number resolved against the size of the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u32,
    pub num_pages: u32,
    pub count: u64,
    pub per_page: u32,
}

impl PageWindow {
    /// Clamp the requested 1-indexed page into `1..=num_pages`. Missing or
    /// unparsable input means the first page. An empty listing still has
    /// one (empty) page.
    pub fn resolve(requested: Option<&str>, count: u64, per_page: u32) -> Self {
        let num_pages = count.div_ceil(u64::from(per_page)).max(1);
        let num_pages = u32::try_from(num_pages).unwrap_or(u32::MAX);

        let number = requested
            .and_then(parse_page_number)
            .map_or(1, |n| n.clamp(1, i64::from(num_pages)) as u32);

        Self {
            number,
            num_pages,
            count,
            per_page,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u32 {
        self.per_page
    }

    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.number < self.num_pages,
            has_previous: self.number > 1,
            items,
        }
    }
}

/// Integer page numbers beyond `i64` saturate, so they still clamp to the
/// nearest end of the listing.
fn parse_page_number(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_or_junk_is_first_page() {
        assert_eq!(PageWindow::resolve(None, 35, PAGE_SIZE).number, 1);
        assert_eq!(PageWindow::resolve(Some("abc"), 35, PAGE_SIZE).number, 1);
        assert_eq!(PageWindow::resolve(Some(""), 35, PAGE_SIZE).number, 1);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let last = PageWindow::resolve(Some("99"), 35, PAGE_SIZE);
        assert_eq!(last.number, 4);
        assert_eq!(last.offset(), 30);

        assert_eq!(PageWindow::resolve(Some("0"), 35, PAGE_SIZE).number, 1);
        assert_eq!(PageWindow::resolve(Some("-3"), 35, PAGE_SIZE).number, 1);

        let huge = PageWindow::resolve(Some("99999999999999999999"), 35, PAGE_SIZE);
        assert_eq!(huge.number, 4);
        assert_eq!(
            PageWindow::resolve(Some("-99999999999999999999"), 35, PAGE_SIZE).number,
            1
        );
        assert_eq!(PageWindow::resolve(Some("9999999999999999999x"), 35, PAGE_SIZE).number, 1);
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        let window = PageWindow::resolve(Some("5"), 0, PAGE_SIZE);
        assert_eq!(window.num_pages, 1);
        assert_eq!(window.number, 1);

        let page = window.into_page(Vec::<u8>::new());
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn test_exact_multiple() {
        let window = PageWindow::resolve(Some("2"), 20, PAGE_SIZE);
        assert_eq!(window.num_pages, 2);
        let page = window.into_page(vec![0; 10]);
        assert!(page.has_previous);
        assert!(!page.has_next);
    }
}
