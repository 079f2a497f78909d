//! Product and category route handlers: public catalog reads and the
//! administrator's catalog management.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use stockroom_core::{CategoryId, Page, PageRequest, ProductId, ProductImageId};

use super::MultipartForm;
use crate::db::products::{ProductFilter, ProductSort};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Category, Product};
use crate::services::catalog::{CatalogService, ProductInput, ProductUpdate};
use crate::state::AppState;

const PUBLIC_PAGE_SIZE: u32 = 12;
const ADMIN_PAGE_SIZE: u32 = 20;

/// Multipart field names accepted for product images.
const IMAGE_FIELDS: &[&str] = &["images", "images[]", "image"];

pub fn router() -> Router<AppState> {
    Router::new()
        // Public
        .route("/api/products", get(list_products))
        .route("/api/products/categories", get(list_categories))
        .route("/api/products/category/{category_id}", get(products_in_category))
        .route("/api/products/{id}", get(show_product))
        // Admin
        .route(
            "/api/admin/products",
            get(admin_list_products).post(create_product),
        )
        .route(
            "/api/admin/products/{id}",
            get(admin_show_product)
                .put(update_product)
                .delete(delete_product),
        )
        .route("/api/admin/products/{id}/images", post(add_images))
        .route(
            "/api/admin/products/{id}/images/{image_id}",
            delete(delete_image),
        )
        .route(
            "/api/admin/categories",
            get(admin_list_categories).post(create_category),
        )
        .route(
            "/api/admin/categories/{id}",
            get(show_category)
                .put(update_category)
                .delete(delete_category),
        )
}

fn catalog(state: &AppState) -> CatalogService<'_> {
    CatalogService::new(state.pool(), state.storage(), state.email())
}

/// Product listing query. `active` is honoured only on the admin listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub active: Option<bool>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

impl ProductQuery {
    fn filter(&self, active: Option<bool>) -> ProductFilter {
        ProductFilter {
            name: self
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_owned),
            category_id: self.category_id,
            min_price: self.min_price,
            max_price: self.max_price,
            active,
            sort: ProductSort::parse(self.sort_by.as_deref()),
            descending: !self
                .sort_dir
                .as_deref()
                .is_some_and(|d| d.trim().eq_ignore_ascii_case("asc")),
        }
    }
}

/// Active products matching the query.
///
/// # Errors
///
/// Returns 400 when `minPrice` exceeds `maxPrice`.
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    let page = PageRequest::new(query.page, query.size, PUBLIC_PAGE_SIZE);
    let products = catalog(&state)
        .search(&query.filter(Some(true)), page)
        .await?;
    Ok(Json(products))
}

/// # Errors
///
/// Returns 404 if the product is missing or inactive.
pub async fn show_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(catalog(&state).public_product(id).await?))
}

/// # Errors
///
/// Returns 404 if the category doesn't exist.
pub async fn products_in_category(
    State(state): State<AppState>,
    Path(category_id): Path<CategoryId>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(catalog(&state).products_in_category(category_id).await?))
}

/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(catalog(&state).categories().await?))
}

// =============================================================================
// Admin: products
// =============================================================================

/// Every product, optionally filtered by `active`.
///
/// # Errors
///
/// Returns 400 when `minPrice` exceeds `maxPrice`.
pub async fn admin_list_products(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    let page = PageRequest::new(query.page, query.size, ADMIN_PAGE_SIZE);
    let products = catalog(&state)
        .search(&query.filter(query.active), page)
        .await?;
    Ok(Json(products))
}

/// # Errors
///
/// Returns 404 if the product doesn't exist.
pub async fn admin_show_product(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(catalog(&state).product(id).await?))
}

/// Create a product from a multipart form with optional images.
///
/// # Errors
///
/// Returns 400 for missing or invalid fields and rejected uploads, 404 for an
/// unknown category.
pub async fn create_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Product>)> {
    let mut form = MultipartForm::read(multipart).await?;
    let input = ProductInput {
        name: form.required("name")?,
        description: form.text("description").map(str::to_owned),
        price: form.required("price")?,
        stock: form.required("stock")?,
        category_id: form.required("categoryId")?,
        active: form.optional("active")?.unwrap_or(true),
    };
    let images = form.take_files(IMAGE_FIELDS);

    let product = catalog(&state).create_product(input, images).await?;
    tracing::info!(product_id = %product.id, admin_id = %admin.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category_id: Option<CategoryId>,
    pub active: Option<bool>,
}

impl From<UpdateProductRequest> for ProductUpdate {
    fn from(body: UpdateProductRequest) -> Self {
        Self {
            name: body.name,
            description: body.description,
            price: body.price,
            stock: body.stock,
            category_id: body.category_id,
            active: body.active,
        }
    }
}

/// Partially update a product.
///
/// # Errors
///
/// Returns 404 for an unknown product or category, 400 for invalid values.
pub async fn update_product(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    Ok(Json(catalog(&state).update_product(id, body.into()).await?))
}

/// Append uploaded images to a product.
///
/// # Errors
///
/// Returns 400 when no image was uploaded or a file is rejected.
pub async fn add_images(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Json<Product>> {
    let mut form = MultipartForm::read(multipart).await?;
    let images = form.take_files(IMAGE_FIELDS);
    Ok(Json(catalog(&state).add_images(id, images).await?))
}

/// # Errors
///
/// Returns 404 if the image does not belong to the product.
pub async fn delete_image(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path((id, image_id)): Path<(ProductId, ProductImageId)>,
) -> Result<Json<Product>> {
    Ok(Json(catalog(&state).delete_image(id, image_id).await?))
}

/// # Errors
///
/// Returns 409 when the product appears in orders.
pub async fn delete_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    catalog(&state).delete_product(id).await?;
    tracing::info!(product_id = %id, admin_id = %admin.id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Admin: categories
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// # Errors
///
/// Returns 500 if the query fails.
pub async fn admin_list_categories(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(catalog(&state).categories().await?))
}

/// # Errors
///
/// Returns 404 if the category doesn't exist.
pub async fn show_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    Ok(Json(catalog(&state).category(id).await?))
}

/// # Errors
///
/// Returns 400 without a name, 409 if the name is taken.
pub async fn create_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let name = body
        .name
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("name is required".to_owned()))?;
    let category = catalog(&state)
        .create_category(name, body.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// # Errors
///
/// Returns 404 if the category doesn't exist, 409 if the new name is taken.
pub async fn update_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(body): Json<CategoryRequest>,
) -> Result<Json<Category>> {
    let category = catalog(&state)
        .update_category(id, body.name.as_deref(), body.description.as_deref())
        .await?;
    Ok(Json(category))
}

/// # Errors
///
/// Returns 409 while products still use the category.
pub async fn delete_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    catalog(&state).delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_to_newest_first() {
        let filter = ProductQuery::default().filter(Some(true));
        assert_eq!(filter.sort, ProductSort::CreatedAt);
        assert!(filter.descending);
        assert_eq!(filter.active, Some(true));
    }

    #[test]
    fn test_filter_reads_sort_and_blank_name() {
        let query = ProductQuery {
            name: Some("   ".to_owned()),
            sort_by: Some("price".to_owned()),
            sort_dir: Some("ASC".to_owned()),
            ..ProductQuery::default()
        };
        let filter = query.filter(None);
        assert_eq!(filter.name, None);
        assert_eq!(filter.sort, ProductSort::Price);
        assert!(!filter.descending);
        assert_eq!(filter.active, None);
    }
}
