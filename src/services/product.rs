use std::sync::Arc;
use tracing::{info, instrument};

use super::{require_user, LoadingGuard};
use crate::api::ProductApi;
use crate::domain::{PagedResponse, Product, ProductRequest, ProductSearch};
use crate::error::ApiResult;
use crate::session::Session;
use crate::store::Store;
use crate::validation;

pub struct ProductService {
    api: Arc<dyn ProductApi>,
    session: Session,
    products: Store<Vec<Product>>,
    loading: Store<bool>,
}

impl ProductService {
    pub fn new(api: Arc<dyn ProductApi>, session: Session) -> Self {
        Self { api, session, products: Store::default(), loading: Store::new(false) }
    }

    pub fn products(&self) -> Vec<Product> { self.products.get() }
    pub fn is_loading(&self) -> bool { self.loading.get() }

    #[instrument(skip(self))]
    pub async fn get_all_products(&self) -> ApiResult<Vec<Product>> {
        let _loading = LoadingGuard::start(&self.loading);
        let products = self.api.list().await?;
        self.products.set(products.clone());
        Ok(products)
    }

    pub async fn get_product(&self, product_id: &str) -> ApiResult<Product> { self.api.get(product_id).await }

    pub async fn get_categories(&self) -> ApiResult<Vec<String>> { self.api.categories().await }

    #[instrument(skip(self))]
    pub async fn search_products(&self, search: &ProductSearch) -> ApiResult<PagedResponse<Product>> {
        self.api.search(search).await
    }

    /// Products listed by the logged-in seller.
    #[instrument(skip(self))]
    pub async fn get_seller_products(&self) -> ApiResult<Vec<Product>> {
        let seller_id = require_user(&self.session)?;
        let products = self.get_all_products().await?;
        Ok(products.into_iter().filter(|p| p.is_sold_by(&seller_id)).collect())
    }

    #[instrument(skip_all, fields(name = %request.name))]
    pub async fn create_product(&self, request: &ProductRequest) -> ApiResult<Product> {
        validation::check(request)?;
        require_user(&self.session)?;
        let product = self.api.create(request).await?;
        info!(product_id = %product.id, "product created");
        self.products.update(|products| products.push(product.clone()));
        Ok(product)
    }

    #[instrument(skip(self, request))]
    pub async fn update_product(&self, product_id: &str, request: &ProductRequest) -> ApiResult<Product> {
        validation::check(request)?;
        require_user(&self.session)?;
        let product = self.api.update(product_id, request).await?;
        self.products.update(|products| {
            if let Some(slot) = products.iter_mut().find(|p| p.id == product.id) {
                *slot = product.clone();
            }
        });
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: &str) -> ApiResult<()> {
        require_user(&self.session)?;
        self.api.delete(product_id).await?;
        info!(product_id, "product deleted");
        self.products.update(|products| products.retain(|p| p.id != product_id));
        Ok(())
    }

    /// Cached products whose category matches, ignoring case.
    pub fn products_in_category(&self, category: &str) -> Vec<Product> {
        self.products.with(|products| {
            products
                .iter()
                .filter(|p| p.category.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(category)))
                .cloned()
                .collect()
        })
    }

    pub fn reset(&self) { self.products.set(Vec::new()); }
}
