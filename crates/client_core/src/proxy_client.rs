use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{CustomerId, CustomerPage, NewCustomer},
    protocol::{
        CustomerListResponse, OperationResult, SendMessageRequest, SendMessageResponse,
        CUSTOMERS_ROUTE, CUSTOMER_ID_HEADER, SEND_MESSAGE_ROUTE, STARTING_FROM_HEADER,
    },
};
use tracing::warn;

use crate::{error::ClientError, CustomerSource};

/// HTTP client for the CRM proxy routes.
pub struct ProxyClient {
    http: Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.base_url)
    }
}

/// Turns a non-OK reply into an error. A 400 carrying `{ success: false }`
/// is a refusal (`Domain`); anything else is `Network`, keeping the proxy's
/// error text when the body carries one.
async fn ensure_ok(response: Response, operation: &'static str) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.json::<OperationResult>().await.ok();
    if status == StatusCode::BAD_REQUEST {
        if let Some(OperationResult {
            success: false,
            error,
        }) = body
        {
            let detail = error.unwrap_or_else(|| format!("{operation} was rejected"));
            warn!(operation, %detail, "proxy refused request");
            return Err(ClientError::Domain(detail));
        }
    }
    let detail = body
        .and_then(|body| body.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
    warn!(operation, status = status.as_u16(), %detail, "proxy request failed");
    Err(ClientError::Network(format!(
        "{operation} failed with {}: {detail}",
        status.as_u16()
    )))
}

async fn read_operation(response: Response, operation: &'static str) -> Result<(), ClientError> {
    let body = ensure_ok(response, operation).await?.text().await?;
    let result: OperationResult = serde_json::from_str(&body)?;
    if result.success {
        Ok(())
    } else {
        Err(ClientError::Domain(
            result
                .error
                .unwrap_or_else(|| format!("{operation} was rejected")),
        ))
    }
}

#[async_trait]
impl CustomerSource for ProxyClient {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<CustomerPage, ClientError> {
        let response = self
            .http
            .get(self.url(CUSTOMERS_ROUTE))
            .header(STARTING_FROM_HEADER, cursor.unwrap_or_default())
            .send()
            .await?;
        let body = ensure_ok(response, "fetch customers").await?.text().await?;
        let page: CustomerListResponse = serde_json::from_str(&body)?;
        Ok(page.into())
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(CUSTOMERS_ROUTE))
            .json(customer)
            .send()
            .await?;
        read_operation(response, "create customer").await
    }

    async fn delete_customer(&self, customer_id: &CustomerId) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(CUSTOMERS_ROUTE))
            .header(CUSTOMER_ID_HEADER, customer_id.as_str())
            .send()
            .await?;
        read_operation(response, "delete customer").await
    }

    async fn send_message(
        &self,
        message: &str,
        recipients: &[CustomerId],
    ) -> Result<usize, ClientError> {
        let request = SendMessageRequest {
            message: message.to_string(),
            customer_ids: recipients.iter().map(|id| id.0.clone()).collect(),
        };
        let response = self
            .http
            .post(self.url(SEND_MESSAGE_ROUTE))
            .json(&request)
            .send()
            .await?;
        let body = ensure_ok(response, "send message").await?.text().await?;
        let result: SendMessageResponse = serde_json::from_str(&body)?;
        if !result.success {
            return Err(ClientError::Domain(
                result
                    .error
                    .unwrap_or_else(|| "send message was rejected".to_string()),
            ));
        }
        Ok(result.messages_sent)
    }
}

#[cfg(test)]
#[path = "tests/proxy_client_tests.rs"]
mod tests;
