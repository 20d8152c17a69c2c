//! Payment gateway integration via the Stripe REST API (no SDK dependency).

use async_trait::async_trait;

use crate::error::{AppError, AppResult};

/// Client confirmation token returned by the gateway. Opaque to this service;
/// card handling and fraud checks happen entirely on the gateway side.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for the given amount in the gateway's minor
    /// unit (cents for USD).
    async fn create_intent(&self, amount_minor: i64, user_id: &str) -> AppResult<PaymentIntent>;
}

pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, amount_minor: i64, user_id: &str) -> AppResult<PaymentIntent> {
        let amount = amount_minor.to_string();
        let resp: serde_json::Value = self
            .client
            .post("https://api.stripe.com/v1/payment_intents")
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", "usd"),
                ("metadata[userId]", user_id),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        let client_secret = resp["client_secret"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| AppError::Upstream(format!("Stripe payment intent failed: {resp}")))?;

        Ok(PaymentIntent { client_secret })
    }
}

/// Used when no gateway key is configured. Payment-intent requests fail as
/// upstream errors; the rest of the API stays available.
pub struct DisabledGateway;

#[async_trait]
impl PaymentGateway for DisabledGateway {
    async fn create_intent(&self, _amount_minor: i64, _user_id: &str) -> AppResult<PaymentIntent> {
        Err(AppError::Upstream("payment gateway is not configured".into()))
    }
}

/// Convert a dollar amount to Stripe's minor-unit convention.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollars_convert_to_cents() {
        assert_eq!(to_minor_units(19.99), 1999);
        assert_eq!(to_minor_units(0.0), 0);
    }

    #[test]
    fn fractional_cents_round_to_nearest() {
        assert_eq!(to_minor_units(10.005), 1001);
        assert_eq!(to_minor_units(10.004), 1000);
    }
}
