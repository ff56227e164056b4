use crate::{
    error::{AppError, AppResult},
    models::{MoviePage, MovieView},
};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// A validated 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Absent or non-numeric values fall back to the default; zero and
/// negative values are rejected.
fn parse_positive(name: &str, raw: Option<&str>, default: u64) -> AppResult<u64> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };
    match raw.parse::<i64>() {
        Ok(value) if value >= 1 => Ok(value as u64),
        Ok(_) => Err(AppError::InvalidInput(format!(
            "{} must be a positive integer",
            name
        ))),
        Err(_) => Ok(default),
    }
}

impl Pagination {
    /// Builds a pagination from raw query-string values
    pub fn from_params(page: Option<&str>, limit: Option<&str>) -> AppResult<Self> {
        let page = parse_positive("page", page, DEFAULT_PAGE)?;
        let limit = parse_positive("limit", limit, DEFAULT_LIMIT)?.min(MAX_LIMIT);

        // Store skips are signed 64-bit
        let offset = (page - 1).checked_mul(limit);
        if offset.map_or(true, |offset| i64::try_from(offset).is_err()) {
            return Err(AppError::InvalidInput("page is out of range".to_string()));
        }
        Ok(Self { page, limit })
    }

    /// Number of items before this page
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }

    /// This page's window of an in-memory list
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = usize::try_from(self.offset())
            .unwrap_or(usize::MAX)
            .min(items.len());
        let end = start.saturating_add(self.limit as usize).min(items.len());
        &items[start..end]
    }

    pub fn into_page(self, total: u64, movies: Vec<MovieView>) -> MoviePage {
        MoviePage {
            page: self.page,
            total_pages: self.total_pages(total),
            total_movies: total,
            movies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent_or_non_numeric() {
        assert_eq!(Pagination::from_params(None, None).unwrap(), Pagination::default());
        assert_eq!(
            Pagination::from_params(Some("abc"), Some("")).unwrap(),
            Pagination { page: 1, limit: 10 }
        );
    }

    #[test]
    fn test_rejects_zero_and_negative() {
        assert!(matches!(
            Pagination::from_params(Some("0"), None),
            Err(AppError::InvalidInput(msg)) if msg == "page must be a positive integer"
        ));
        assert!(matches!(
            Pagination::from_params(None, Some("-5")),
            Err(AppError::InvalidInput(msg)) if msg == "limit must be a positive integer"
        ));
    }

    #[test]
    fn test_rejects_page_beyond_signed_offset() {
        assert!(matches!(
            Pagination::from_params(Some("9223372036854775807"), Some("10")),
            Err(AppError::InvalidInput(msg)) if msg == "page is out of range"
        ));
        let last = (i64::MAX as u64 / 10 + 1).to_string();
        let pagination = Pagination::from_params(Some(&last), Some("10")).unwrap();
        assert!(i64::try_from(pagination.offset()).is_ok());
    }

    #[test]
    fn test_limit_is_capped() {
        let pagination = Pagination::from_params(Some("2"), Some("5000")).unwrap();
        assert_eq!(pagination.limit, MAX_LIMIT);
        assert_eq!(pagination.offset(), MAX_LIMIT);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let pagination = Pagination { page: 1, limit: 10 };
        assert_eq!(pagination.total_pages(0), 0);
        assert_eq!(pagination.total_pages(10), 1);
        assert_eq!(pagination.total_pages(11), 2);
    }

    #[test]
    fn test_slice_never_exceeds_limit() {
        let items: Vec<u32> = (0..23).collect();
        for limit in 1..=12u64 {
            for page in 1..=6u64 {
                let pagination = Pagination { page, limit };
                let window = pagination.slice(&items);
                assert!(window.len() as u64 <= limit);
                if let Some(first) = window.first() {
                    assert_eq!(*first as u64, pagination.offset());
                }
                assert_eq!(
                    pagination.total_pages(items.len() as u64),
                    (items.len() as u64 + limit - 1) / limit
                );
            }
        }
    }

    #[test]
    fn test_slice_past_end_is_empty() {
        let items = [1, 2, 3];
        let pagination = Pagination { page: 4, limit: 2 };
        assert!(pagination.slice(&items).is_empty());
    }
}
