use crate::db_types::{CommissionRate, CommissionRule, Product};

/// The commission rates that could apply to an order, one per scope. Build it with [`CommissionScopes::from_rules`]
/// and collapse it with [`resolve_commission_rate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommissionScopes {
    pub store: Option<CommissionRate>,
    pub category: Option<CommissionRate>,
    pub platform: Option<CommissionRate>,
}

impl CommissionScopes {
    /// Sorts active rules into scopes for an order from `store_id` whose items all belong to `category_id` (if any).
    ///
    /// A store rule that also names the order's category beats a store-wide one. Among equally specific rules the
    /// most recently added (highest id) wins.
    pub fn from_rules(rules: &[CommissionRule], store_id: i64, category_id: Option<i64>) -> Self {
        let active = || rules.iter().filter(|r| r.is_active);

        let store_and_category = latest(active().filter(|r| {
            r.store_id == Some(store_id) && r.category_id.is_some() && r.category_id == category_id
        }));
        let store_wide = latest(active().filter(|r| r.store_id == Some(store_id) && r.category_id.is_none()));
        let category = match category_id {
            Some(cat) => latest(active().filter(|r| r.store_id.is_none() && r.category_id == Some(cat))),
            None => None,
        };
        let platform = latest(active().filter(|r| r.store_id.is_none() && r.category_id.is_none()));
        Self { store: store_and_category.or(store_wide), category, platform }
    }
}

fn latest<'a, I: Iterator<Item = &'a CommissionRule>>(rules: I) -> Option<CommissionRate> {
    rules.max_by_key(|r| r.id).map(|r| r.commission_bps)
}

/// Store beats category, category beats platform, and `default` applies when nothing is configured.
pub fn resolve_commission_rate(
    store: Option<CommissionRate>,
    category: Option<CommissionRate>,
    platform: Option<CommissionRate>,
    default: CommissionRate,
) -> CommissionRate {
    store.or(category).or(platform).unwrap_or(default)
}

/// The category shared by every product, or `None` if they differ or any is uncategorised.
pub fn common_category<'a, I: IntoIterator<Item = &'a Product>>(products: I) -> Option<i64> {
    let mut products = products.into_iter();
    let first = products.next()?.category_id?;
    products.all(|p| p.category_id == Some(first)).then_some(first)
}
