use mkt_common::Money;
use serde::{Deserialize, Serialize};

use crate::ProviderApiError;

#[derive(Serialize, Deserialize)]
struct OAuthState {
    store_id: i64,
}

/// The `state` parameter carried through the MercadoPago OAuth round trip: base64 of `{"store_id":..}`.
pub fn encode_oauth_state(store_id: i64) -> String {
    let json = serde_json::json!({ "store_id": store_id }).to_string();
    base64::encode_config(json, base64::URL_SAFE_NO_PAD)
}

pub fn decode_oauth_state(state: &str) -> Result<i64, ProviderApiError> {
    let state = state.trim().trim_end_matches('=');
    let bytes = base64::decode_config(state, base64::URL_SAFE_NO_PAD)
        .or_else(|_| base64::decode_config(state, base64::STANDARD_NO_PAD))
        .map_err(|e| ProviderApiError::InvalidState(e.to_string()))?;
    let state = serde_json::from_slice::<OAuthState>(&bytes).map_err(|e| ProviderApiError::InvalidState(e.to_string()))?;
    Ok(state.store_id)
}

/// Converts a decimal amount as reported by MercadoPago into minor units, rounding to the nearest centavo.
pub fn money_from_major(amount: f64) -> Money {
    Money::from((amount * 100.0).round() as i64)
}
