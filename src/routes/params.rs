use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::Category;

/// Page selector for fixed-page-size listings.
#[derive(Debug, Deserialize, ToSchema)]
pub struct Page {
    pub page: Option<i64>,
}

impl Page {
    pub fn normalize(&self, page_size: i64) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let offset = (page - 1) * page_size;
        (page, offset)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub keyword: Option<String>,
    pub category: Option<Category>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Page {
        Page { page: self.page }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_has_zero_offset() {
        let (page, offset) = Page { page: None }.normalize(12);
        assert_eq!((page, offset), (1, 0));
    }

    #[test]
    fn third_page_offset_skips_two_pages() {
        let (page, offset) = Page { page: Some(3) }.normalize(10);
        assert_eq!((page, offset), (3, 20));
    }

    #[test]
    fn non_positive_page_clamps_to_first() {
        let (page, offset) = Page { page: Some(-2) }.normalize(12);
        assert_eq!((page, offset), (1, 0));
    }
}
