use log::trace;

use crate::{
    db_types::{CommissionRate, Product},
    resolvers::{common_category, resolve_commission_rate, CommissionScopes},
    traits::{MarketplaceDatabase, MarketplaceDbError},
};

/// The commission rate for an order from `store_id` containing `products`.
pub async fn commission_rate_for<B: MarketplaceDatabase>(
    db: &B,
    store_id: i64,
    products: &[Product],
    default: CommissionRate,
) -> Result<CommissionRate, MarketplaceDbError> {
    let rules = db.fetch_commission_rules(store_id).await?;
    let category = common_category(products);
    let scopes = CommissionScopes::from_rules(&rules, store_id, category);
    let rate = resolve_commission_rate(scopes.store, scopes.category, scopes.platform, default);
    trace!("💸️ Commission for store {store_id} (category {category:?}) resolved to {rate}");
    Ok(rate)
}

/// As [`commission_rate_for`], for an order that has already been written.
pub async fn commission_rate_for_order<B: MarketplaceDatabase>(
    db: &B,
    order_id: i64,
    store_id: i64,
    default: CommissionRate,
) -> Result<CommissionRate, MarketplaceDbError> {
    let items = db.fetch_order_items(order_id).await?;
    let ids = items.iter().map(|i| i.product_id).collect::<Vec<i64>>();
    let products = db.fetch_products(&ids).await?;
    commission_rate_for(db, store_id, &products, default).await
}
