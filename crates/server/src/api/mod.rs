use std::{collections::HashSet, sync::Arc};

use crm_integration::{CrmError, CustomerDirectory};
use shared::{
    domain::{CustomerId, NewCustomer},
    error::{ApiError, ErrorCode},
    protocol::{CustomerListResponse, SendMessageRequest},
};
use tracing::{error, info};

use crate::sms::SmsGateway;

#[derive(Clone)]
pub struct ApiContext {
    pub directory: Arc<dyn CustomerDirectory>,
    pub sms: Arc<dyn SmsGateway>,
    pub page_limit: u32,
}

pub async fn list_customers(
    ctx: &ApiContext,
    starting_from: Option<&str>,
) -> Result<CustomerListResponse, ApiError> {
    let cursor = starting_from.map(str::trim).filter(|c| !c.is_empty());
    let page = ctx
        .directory
        .list_customers(cursor, ctx.page_limit)
        .await
        .map_err(|err| upstream("retrieving customers", err))?;
    info!(
        customers = page.data.customers.len(),
        has_next_page = page.page_info.has_next_page,
        "customer page retrieved"
    );
    Ok(page)
}

pub async fn create_customer(ctx: &ApiContext, customer: &NewCustomer) -> Result<(), ApiError> {
    customer
        .check()
        .map_err(|messages| ApiError::validation(messages.join("; ")))?;
    ctx.directory
        .create_customer(customer)
        .await
        .map_err(|err| upstream("creating customer", err))?;
    info!(name = %customer.name, "customer created");
    Ok(())
}

pub async fn delete_customer(ctx: &ApiContext, customer_id: Option<&str>) -> Result<(), ApiError> {
    let customer_id = customer_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(CustomerId::from)
        .ok_or_else(|| {
            ApiError::validation("customerId must be provided when deleting a customer")
        })?;
    ctx.directory
        .delete_customer(&customer_id)
        .await
        .map_err(|err| upstream("deleting customer", err))?;
    info!(%customer_id, "customer deleted");
    Ok(())
}

/// Hands a message to the SMS gateway once per distinct recipient and returns
/// how many were accepted.
pub async fn send_message(ctx: &ApiContext, request: &SendMessageRequest) -> Result<usize, ApiError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::validation("message cannot be empty"));
    }

    let mut seen = HashSet::new();
    let recipients: Vec<CustomerId> = request
        .customer_ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
        .map(CustomerId::from)
        .collect();
    if recipients.is_empty() {
        return Err(ApiError::validation("at least one recipient is required"));
    }

    ctx.sms.dispatch(message, &recipients).await.map_err(|err| {
        error!(%err, "sms dispatch failed");
        ApiError::new(ErrorCode::Internal, err.to_string())
    })
}

fn upstream(operation: &'static str, err: CrmError) -> ApiError {
    error!(%err, operation, "CRM call failed");
    ApiError::upstream(err.to_string())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
