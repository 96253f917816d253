use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::products::ProductService;
use crate::application::repos::ProductsRepo;

pub const PRODUCT_NOT_FOUND: &str = "Product not found";

/// Response extension marking an answer for an absent product, whatever
/// status the policy chose.
#[derive(Debug, Clone, Copy)]
pub struct ProductMiss {
    pub policy: NotFoundPolicy,
}

/// How a lookup of an absent product is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotFoundPolicy {
    /// `200 OK` with the not-found text, for existing clients.
    #[default]
    Legacy,
    /// `404 Not Found` with the same text.
    Strict,
}

impl NotFoundPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Legacy }
    }

    pub fn respond(self) -> Response {
        let status = match self {
            Self::Legacy => StatusCode::OK,
            Self::Strict => StatusCode::NOT_FOUND,
        };
        let mut response = (status, PRODUCT_NOT_FOUND).into_response();
        response
            .extensions_mut()
            .insert(ProductMiss { policy: self });
        response
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Strict => "strict",
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub products: Arc<ProductService>,
    pub store: Arc<dyn ProductsRepo>,
    pub not_found: NotFoundPolicy,
}
