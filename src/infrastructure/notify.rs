use crate::domain::account::UserId;
use crate::domain::credit::{Credit, CreditId};
use crate::domain::ports::Notifier;
use crate::error::NotifyError;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Log-only notifier. Outbound email lives outside this crate; this sink
/// keeps the fire-and-forget contract visible in the logs.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn credit_approved(&self, user_id: UserId, credit: &Credit) -> Result<(), NotifyError> {
        tracing::info!(
            user = %user_id,
            credit = %credit.id,
            amount = %credit.amount,
            monthly_payment = %credit.monthly_payment,
            term = credit.term_months,
            "notify: credit approved"
        );
        Ok(())
    }

    async fn payment_settled(
        &self,
        user_id: UserId,
        credit_id: CreditId,
        amount: Decimal,
    ) -> Result<(), NotifyError> {
        tracing::info!(user = %user_id, credit = %credit_id, %amount, "notify: payment settled");
        Ok(())
    }

    async fn payment_overdue(
        &self,
        user_id: UserId,
        credit_id: CreditId,
        amount: Decimal,
    ) -> Result<(), NotifyError> {
        tracing::info!(user = %user_id, credit = %credit_id, %amount, "notify: payment overdue");
        Ok(())
    }
}
