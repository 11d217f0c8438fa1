//! Outbound client for the external CRM's `/customers` REST resource.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shared::{
    domain::{CustomerId, NewCustomer},
    protocol::CustomerListResponse,
};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

const CUSTOMERS_RESOURCE: &str = "customers";

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("invalid CRM base url '{0}'")]
    InvalidBaseUrl(String),
    #[error("CRM request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("CRM responded with {status}: {reason}")]
    Status { status: u16, reason: String },
    #[error("CRM response did not match the expected schema: {0}")]
    Schema(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub base_url: Url,
    pub api_key: String,
}

impl CrmConfig {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, CrmError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|_| CrmError::InvalidBaseUrl(base_url.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(CrmError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            api_key: api_key.into(),
        })
    }
}

/// The customer operations the proxy forwards to the CRM.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn list_customers(
        &self,
        starting_after: Option<&str>,
        limit: u32,
    ) -> Result<CustomerListResponse, CrmError>;
    async fn create_customer(&self, customer: &NewCustomer) -> Result<(), CrmError>;
    async fn delete_customer(&self, customer_id: &CustomerId) -> Result<(), CrmError>;
}

#[derive(Debug, Serialize)]
struct CreatedBy {
    source: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePhoneNumbers<'a> {
    additional_phones: Vec<String>,
    primary_phone_country_code: &'a str,
    primary_phone_calling_code: &'a str,
    primary_phone_number: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateEmails<'a> {
    primary_email: &'a str,
    additional_emails: Vec<String>,
}

/// Body of `POST /customers` in the CRM's nested shape.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerBody<'a> {
    name: &'a str,
    created_by: CreatedBy,
    position: u32,
    numbers: CreatePhoneNumbers<'a>,
    emails: CreateEmails<'a>,
}

impl<'a> From<&'a NewCustomer> for CreateCustomerBody<'a> {
    fn from(value: &'a NewCustomer) -> Self {
        Self {
            name: &value.name,
            created_by: CreatedBy { source: "MANUAL" },
            position: 0,
            numbers: CreatePhoneNumbers {
                additional_phones: Vec::new(),
                primary_phone_country_code: &value.phone_extension,
                primary_phone_calling_code: "",
                primary_phone_number: &value.number,
            },
            emails: CreateEmails {
                primary_email: &value.email,
                additional_emails: Vec::new(),
            },
        }
    }
}

pub struct TwentyCrmClient {
    http: Client,
    config: CrmConfig,
}

impl TwentyCrmClient {
    pub fn new(config: CrmConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CrmError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CrmError::InvalidBaseUrl(self.config.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, CrmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let reason = status
        .canonical_reason()
        .unwrap_or("unknown status")
        .to_string();
    error!(operation, status = status.as_u16(), %reason, "CRM request rejected");
    Err(CrmError::Status {
        status: status.as_u16(),
        reason,
    })
}

#[async_trait]
impl CustomerDirectory for TwentyCrmClient {
    async fn list_customers(
        &self,
        starting_after: Option<&str>,
        limit: u32,
    ) -> Result<CustomerListResponse, CrmError> {
        let mut url = self.endpoint(&[CUSTOMERS_RESOURCE])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(cursor) = starting_after.filter(|cursor| !cursor.is_empty()) {
                query.append_pair("starting_after", cursor);
            }
        }

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let body = ensure_success(response, "list_customers")?.text().await?;
        let parsed: CustomerListResponse = serde_json::from_str(&body)?;
        debug!(
            customers = parsed.data.customers.len(),
            has_next_page = parsed.page_info.has_next_page,
            "retrieved customer page from CRM"
        );
        Ok(parsed)
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<(), CrmError> {
        let url = self.endpoint(&[CUSTOMERS_RESOURCE])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&CreateCustomerBody::from(customer))
            .send()
            .await?;
        ensure_success(response, "create_customer")?;
        Ok(())
    }

    async fn delete_customer(&self, customer_id: &CustomerId) -> Result<(), CrmError> {
        let url = self.endpoint(&[CUSTOMERS_RESOURCE, customer_id.as_str()])?;
        let response = self
            .http
            .delete(url)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        ensure_success(response, "delete_customer")?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
