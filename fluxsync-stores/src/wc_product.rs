//! WooCommerce products, variations and reviews

use std::sync::Arc;

use fluxsync::{
    Action, ChangeError, ChangeEvent, LocalId, MemoryTable, Persistence, Reaction, RemoteId, Slice,
};
use tracing::debug;

use crate::client::{NetworkResult, ProductClient};
use crate::model::{Product, ProductReview, ProductVariation, Site};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchSingleProductPayload {
    pub site: Site,
    pub remote_product_id: RemoteId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSingleProductPayload {
    pub site: Site,
    pub remote_product_id: RemoteId,
    pub result: NetworkResult<Product>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchSingleVariationPayload {
    pub site: Site,
    pub remote_product_id: RemoteId,
    pub remote_variation_id: RemoteId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSingleVariationPayload {
    pub site: Site,
    pub remote_product_id: RemoteId,
    pub remote_variation_id: RemoteId,
    pub result: NetworkResult<ProductVariation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchVariationsPayload {
    pub site: Site,
    pub remote_product_id: RemoteId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedVariationsPayload {
    pub site: Site,
    pub remote_product_id: RemoteId,
    pub result: NetworkResult<Vec<ProductVariation>>,
}

/// Empty `product_ids` means every product; empty `statuses` means every status
#[derive(Debug, Clone, PartialEq)]
pub struct FetchProductReviewsPayload {
    pub site: Site,
    pub offset: usize,
    pub product_ids: Vec<RemoteId>,
    pub statuses: Vec<String>,
}

impl FetchProductReviewsPayload {
    pub fn new(site: Site, offset: usize) -> Self {
        Self {
            site,
            offset,
            product_ids: Vec::new(),
            statuses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedProductReviewsPayload {
    pub site: Site,
    pub offset: usize,
    pub product_ids: Vec<RemoteId>,
    pub result: NetworkResult<Vec<ProductReview>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchSingleReviewPayload {
    pub site: Site,
    pub remote_review_id: RemoteId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSingleReviewPayload {
    pub site: Site,
    pub remote_review_id: RemoteId,
    pub result: NetworkResult<ProductReview>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReviewStatusPayload {
    pub site: Site,
    pub review: ProductReview,
    pub new_status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedReviewStatusPayload {
    pub site: Site,
    pub review: ProductReview,
    pub result: NetworkResult<ProductReview>,
}

#[derive(Action, Clone, Debug, PartialEq)]
pub enum WcProductAction {
    FetchSingleProduct(FetchSingleProductPayload),
    FetchSingleProductVariation(FetchSingleVariationPayload),
    FetchProductVariations(FetchVariationsPayload),
    FetchProductReviews(FetchProductReviewsPayload),
    FetchSingleProductReview(FetchSingleReviewPayload),
    #[action(request)]
    UpdateProductReviewStatus(UpdateReviewStatusPayload),

    FetchedSingleProduct(FetchedSingleProductPayload),
    FetchedSingleProductVariation(FetchedSingleVariationPayload),
    FetchedProductVariations(FetchedVariationsPayload),
    FetchedProductReviews(FetchedProductReviewsPayload),
    FetchedSingleProductReview(FetchedSingleReviewPayload),
    UpdatedProductReviewStatus(UpdatedReviewStatusPayload),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WcProductChange {
    Product {
        local_id: LocalId,
        remote_product_id: RemoteId,
    },
    Variation {
        local_id: LocalId,
    },
    Variations {
        remote_product_id: RemoteId,
        count: usize,
    },
    Reviews {
        count: usize,
        loaded_more: bool,
        can_load_more: bool,
    },
    Review {
        local_id: LocalId,
    },
}

type WcProductReaction = Reaction<WcProductAction, WcProductChange>;

pub struct Products {
    products: MemoryTable<Product>,
    variations: MemoryTable<ProductVariation>,
    reviews: MemoryTable<ProductReview>,
    client: Arc<dyn ProductClient>,
    reviews_per_page: usize,
}

impl Products {
    pub fn new(client: Arc<dyn ProductClient>, reviews_per_page: usize) -> Self {
        Self {
            products: MemoryTable::new(),
            variations: MemoryTable::new(),
            reviews: MemoryTable::new(),
            client,
            reviews_per_page,
        }
    }

    // ===== Reads =====

    pub fn products_for_site(&self, site: LocalId) -> Vec<Product> {
        self.products.get_all_for_site(site)
    }

    pub fn product_by_remote_id(&self, site: LocalId, remote_product_id: RemoteId) -> Option<Product> {
        self.products.get_by_remote_id(site, remote_product_id)
    }

    pub fn variations_for_product(&self, site: LocalId, remote_product_id: RemoteId) -> Vec<ProductVariation> {
        self.variations
            .iter()
            .filter(|v| v.local_site_id == site && v.remote_product_id == Some(remote_product_id))
            .cloned()
            .collect()
    }

    pub fn variation(
        &self,
        site: LocalId,
        remote_product_id: RemoteId,
        remote_variation_id: RemoteId,
    ) -> Option<ProductVariation> {
        self.variations
            .get_by_remote_id(site, remote_variation_id)
            .filter(|v| v.remote_product_id == Some(remote_product_id))
    }

    pub fn reviews_for_site(&self, site: LocalId) -> Vec<ProductReview> {
        self.reviews.get_all_for_site(site)
    }

    pub fn reviews_for_product(&self, site: LocalId, remote_product_id: RemoteId) -> Vec<ProductReview> {
        self.reviews
            .iter()
            .filter(|r| r.local_site_id == site && r.remote_product_id == Some(remote_product_id))
            .cloned()
            .collect()
    }

    pub fn review_by_remote_id(&self, site: LocalId, remote_review_id: RemoteId) -> Option<ProductReview> {
        self.reviews.get_by_remote_id(site, remote_review_id)
    }

    // ===== Requests =====

    fn fetch_product_reviews(&self, payload: FetchProductReviewsPayload) -> WcProductReaction {
        let client = self.client.clone();
        let number = self.reviews_per_page;
        debug!(
            store = Self::NAME,
            action = "FetchProductReviews",
            site = %payload.site.local_id,
            offset = payload.offset,
            "requesting reviews"
        );
        Reaction::unchanged().request(async move {
            let result = client
                .fetch_product_reviews(
                    &payload.site,
                    payload.offset,
                    number,
                    &payload.product_ids,
                    &payload.statuses,
                )
                .await;
            WcProductAction::FetchedProductReviews(FetchedProductReviewsPayload {
                site: payload.site,
                offset: payload.offset,
                product_ids: payload.product_ids,
                result,
            })
        })
    }

    fn update_review_status(&self, payload: UpdateReviewStatusPayload) -> WcProductReaction {
        let cause = WcProductActionType::UpdateProductReviewStatus;
        let Some(remote_review_id) = payload.review.remote_review_id else {
            return Reaction::unchanged().emit(ChangeEvent::failed(
                cause,
                ChangeError::validation("unknown_review", "Review has no remote id"),
            ));
        };
        if payload.new_status.trim().is_empty() {
            return Reaction::unchanged().emit(ChangeEvent::failed(
                cause,
                ChangeError::validation("empty_status", "Review status must not be empty"),
            ));
        }

        let client = self.client.clone();
        debug!(store = Self::NAME, action = "UpdateProductReviewStatus", %remote_review_id, status = %payload.new_status, "updating review");
        Reaction::unchanged().request(async move {
            let result = client
                .update_product_review_status(&payload.site, remote_review_id, &payload.new_status)
                .await;
            WcProductAction::UpdatedProductReviewStatus(UpdatedReviewStatusPayload {
                site: payload.site,
                review: payload.review,
                result,
            })
        })
    }

    // ===== Responses =====

    fn store_review(&mut self, site: LocalId, mut review: ProductReview) -> LocalId {
        review.local_id = LocalId::default();
        review.local_site_id = site;
        self.reviews.upsert(review)
    }

    fn fetched_reviews(&mut self, payload: FetchedProductReviewsPayload) -> WcProductReaction {
        let cause = WcProductActionType::FetchedProductReviews;
        let reviews = match payload.result {
            Ok(reviews) => reviews,
            Err(error) => return Reaction::unchanged().emit(ChangeEvent::failed(cause, error)),
        };
        let site = payload.site.local_id;
        if payload.offset == 0 {
            let products = payload.product_ids;
            self.reviews.remove_where(|r| {
                r.local_site_id == site
                    && (products.is_empty()
                        || r.remote_product_id.is_some_and(|id| products.contains(&id)))
            });
        }
        let count = reviews.len();
        for review in reviews {
            self.store_review(site, review);
        }

        Reaction::changed().emit(ChangeEvent::ok(
            cause,
            WcProductChange::Reviews {
                count,
                loaded_more: payload.offset > 0,
                can_load_more: count == self.reviews_per_page,
            },
        ))
    }

    fn fetched_variations(&mut self, payload: FetchedVariationsPayload) -> WcProductReaction {
        let cause = WcProductActionType::FetchedProductVariations;
        let variations = match payload.result {
            Ok(variations) => variations,
            Err(error) => return Reaction::unchanged().emit(ChangeEvent::failed(cause, error)),
        };
        let site = payload.site.local_id;
        let product = payload.remote_product_id;
        self.variations
            .remove_where(|v| v.local_site_id == site && v.remote_product_id == Some(product));
        let count = variations.len();
        for mut variation in variations {
            variation.local_id = LocalId::default();
            variation.local_site_id = site;
            variation.remote_product_id = Some(product);
            self.variations.upsert(variation);
        }

        Reaction::changed().emit(ChangeEvent::ok(
            cause,
            WcProductChange::Variations {
                remote_product_id: product,
                count,
            },
        ))
    }
}

impl Slice for Products {
    type Action = WcProductAction;
    type Change = WcProductChange;
    const NAME: &'static str = "wc_product";
    const DOMAIN: &'static str = WcProductActionType::DOMAIN;

    fn reduce(&mut self, action: WcProductAction) -> WcProductReaction {
        match action {
            WcProductAction::FetchSingleProduct(payload) => {
                let client = self.client.clone();
                Reaction::unchanged().request(async move {
                    let result = client
                        .fetch_single_product(&payload.site, payload.remote_product_id)
                        .await;
                    WcProductAction::FetchedSingleProduct(FetchedSingleProductPayload {
                        site: payload.site,
                        remote_product_id: payload.remote_product_id,
                        result,
                    })
                })
            }
            WcProductAction::FetchSingleProductVariation(payload) => {
                let client = self.client.clone();
                Reaction::unchanged().request(async move {
                    let result = client
                        .fetch_single_product_variation(
                            &payload.site,
                            payload.remote_product_id,
                            payload.remote_variation_id,
                        )
                        .await;
                    WcProductAction::FetchedSingleProductVariation(FetchedSingleVariationPayload {
                        site: payload.site,
                        remote_product_id: payload.remote_product_id,
                        remote_variation_id: payload.remote_variation_id,
                        result,
                    })
                })
            }
            WcProductAction::FetchProductVariations(payload) => {
                let client = self.client.clone();
                Reaction::unchanged().request(async move {
                    let result = client
                        .fetch_product_variations(&payload.site, payload.remote_product_id)
                        .await;
                    WcProductAction::FetchedProductVariations(FetchedVariationsPayload {
                        site: payload.site,
                        remote_product_id: payload.remote_product_id,
                        result,
                    })
                })
            }
            WcProductAction::FetchProductReviews(payload) => self.fetch_product_reviews(payload),
            WcProductAction::FetchSingleProductReview(payload) => {
                let client = self.client.clone();
                Reaction::unchanged().request(async move {
                    let result = client
                        .fetch_product_review(&payload.site, payload.remote_review_id)
                        .await;
                    WcProductAction::FetchedSingleProductReview(FetchedSingleReviewPayload {
                        site: payload.site,
                        remote_review_id: payload.remote_review_id,
                        result,
                    })
                })
            }
            WcProductAction::UpdateProductReviewStatus(payload) => self.update_review_status(payload),

            WcProductAction::FetchedSingleProduct(payload) => {
                let cause = WcProductActionType::FetchedSingleProduct;
                match payload.result {
                    Ok(mut product) => {
                        product.local_id = LocalId::default();
                        product.local_site_id = payload.site.local_id;
                        product.remote_product_id = Some(payload.remote_product_id);
                        let local_id = self.products.upsert(product);
                        Reaction::changed().emit(ChangeEvent::ok(
                            cause,
                            WcProductChange::Product {
                                local_id,
                                remote_product_id: payload.remote_product_id,
                            },
                        ))
                    }
                    Err(error) => Reaction::unchanged().emit(ChangeEvent::failed(cause, error)),
                }
            }
            WcProductAction::FetchedSingleProductVariation(payload) => {
                let cause = WcProductActionType::FetchedSingleProductVariation;
                match payload.result {
                    Ok(mut variation) => {
                        variation.local_id = LocalId::default();
                        variation.local_site_id = payload.site.local_id;
                        variation.remote_product_id = Some(payload.remote_product_id);
                        variation.remote_variation_id = Some(payload.remote_variation_id);
                        let local_id = self.variations.upsert(variation);
                        Reaction::changed()
                            .emit(ChangeEvent::ok(cause, WcProductChange::Variation { local_id }))
                    }
                    Err(error) => Reaction::unchanged().emit(ChangeEvent::failed(cause, error)),
                }
            }
            WcProductAction::FetchedProductVariations(payload) => self.fetched_variations(payload),
            WcProductAction::FetchedProductReviews(payload) => self.fetched_reviews(payload),
            WcProductAction::FetchedSingleProductReview(payload) => {
                let cause = WcProductActionType::FetchedSingleProductReview;
                match payload.result {
                    Ok(review) => {
                        let local_id = self.store_review(payload.site.local_id, review);
                        Reaction::changed()
                            .emit(ChangeEvent::ok(cause, WcProductChange::Review { local_id }))
                    }
                    Err(error) => Reaction::unchanged().emit(ChangeEvent::failed(cause, error)),
                }
            }
            WcProductAction::UpdatedProductReviewStatus(payload) => {
                let cause = WcProductActionType::UpdatedProductReviewStatus;
                match payload.result {
                    Ok(review) => {
                        let local_id = self.store_review(payload.site.local_id, review);
                        Reaction::changed()
                            .emit(ChangeEvent::ok(cause, WcProductChange::Review { local_id }))
                    }
                    Err(error) => Reaction::unchanged().emit(ChangeEvent::failed(cause, error)),
                }
            }
        }
    }
}
