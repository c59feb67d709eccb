//! Extractors whose rejections use the JSON error body

use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;
use staybook_core::{PageRequest, User, DEFAULT_PAGE_SIZE};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `?page=0&size=20`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Paging {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl Paging {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(0), self.size.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}

/// `?hotel_id=`, defaulting to the caller's own hotel
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct HotelParam {
    pub hotel_id: Option<Uuid>,
}

impl HotelParam {
    pub fn resolve(&self, user: &User) -> ApiResult<Uuid> {
        self.hotel_id
            .or(user.hotel_id)
            .ok_or_else(|| ApiError::BadRequest("hotel_id is required".into()))
    }
}
