use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total_pages: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn paginated(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total_pages: Some(total_pages),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total_pages: None,
            total: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginated_meta_rounds_page_count_up() {
        let meta = Meta::paginated(1, 12, 25);
        assert_eq!(meta.total_pages, Some(3));
        assert_eq!(meta.total, Some(25));
    }

    #[test]
    fn paginated_meta_exact_multiple() {
        let meta = Meta::paginated(2, 10, 30);
        assert_eq!(meta.total_pages, Some(3));
    }

    #[test]
    fn paginated_meta_empty_result() {
        let meta = Meta::paginated(1, 12, 0);
        assert_eq!(meta.total_pages, Some(0));
    }
}
