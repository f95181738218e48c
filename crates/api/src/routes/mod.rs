//! HTTP handlers and the state they share.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;

use axum::Json;
use domain::Page;
use serde::{Deserialize, Serialize};

use crate::Workflow;
use crate::validation::RequestValidator;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub workflow: Workflow,
    pub validator: RequestValidator,
}

/// Success envelope wrapped around every response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data,
        })
    }
}

/// `?page=&limit=` query parameters. Pages are 1-based.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    pub fn to_page(&self) -> Page {
        Page::numbered(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(Page::DEFAULT_LIMIT),
        )
    }
}
