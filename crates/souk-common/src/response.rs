//! Success envelope and pagination helpers shared by every route.

use serde::{Deserialize, Serialize};

/// `{ "status": "success", "message": ..., "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data,
        }
    }
}

/// Query parameters accepted by every list endpoint.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageParams {
    pub const DEFAULT_SIZE: u32 = 20;

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=max`.
    pub fn size(&self, max: u32) -> u32 {
        self.size.unwrap_or(Self::DEFAULT_SIZE).clamp(1, max.max(1))
    }

    /// `(limit, offset)` ready to bind into SQL.
    pub fn limit_offset(&self, max: u32) -> (i64, i64) {
        let size = self.size(max) as i64;
        (size, (self.page() as i64 - 1) * size)
    }
}

/// A page of results plus the total row count.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, params: PageParams, max: u32) -> Self {
        Self {
            items,
            total,
            page: params.page(),
            size: params.size(max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_clamp() {
        let p = PageParams {
            page: Some(0),
            size: Some(500),
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.size(100), 100);
        assert_eq!(p.limit_offset(100), (100, 0));

        let p = PageParams {
            page: Some(3),
            size: Some(10),
        };
        assert_eq!(p.limit_offset(100), (10, 20));
    }

    #[test]
    fn defaults_apply() {
        let p = PageParams::default();
        assert_eq!(p.limit_offset(100), (20, 0));
    }
}
