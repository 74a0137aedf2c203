use crate::domain::ports::RateProvider;
use crate::error::RateError;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Rate provider with a fixed configured rate. The production deployment
/// would sit a central-bank client behind the same port; the core only needs
/// `current_rate` and its failure mode.
pub struct StaticRateProvider {
    rate: Decimal,
}

impl StaticRateProvider {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }
}

#[async_trait]
impl RateProvider for StaticRateProvider {
    async fn current_rate(&self) -> Result<Decimal, RateError> {
        Ok(self.rate)
    }
}
