use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct ProductCreateRequest {
    pub city: String,
    pub country: String,
}

/// Body of `PUT /api/v1/product/{city}`. The path names the product; a `city`
/// field, when sent, has to agree with it.
#[derive(Debug, Deserialize, Serialize)]
pub struct ProductUpdateRequest {
    #[serde(default)]
    pub city: Option<String>,
    pub country: String,
}
