use async_trait::async_trait;
use shared::domain::CustomerId;
use tracing::info;

#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn dispatch(&self, message: &str, recipients: &[CustomerId]) -> anyhow::Result<usize>;
}

/// Stand-in gateway: records each send in the log and reports it delivered.
pub struct LoggingSmsGateway;

#[async_trait]
impl SmsGateway for LoggingSmsGateway {
    async fn dispatch(&self, message: &str, recipients: &[CustomerId]) -> anyhow::Result<usize> {
        for recipient in recipients {
            info!(%recipient, chars = message.chars().count(), "sms queued");
        }
        Ok(recipients.len())
    }
}
