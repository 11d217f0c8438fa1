use serde::{Deserialize, Serialize};

use crate::domain::{Customer, CustomerPage};

pub const CUSTOMERS_ROUTE: &str = "/api/customers";
pub const SEND_MESSAGE_ROUTE: &str = "/api/send-message";

/// Header carrying the pagination cursor on `GET /api/customers`.
pub const STARTING_FROM_HEADER: &str = "starting_from";
/// Header carrying the target id on `DELETE /api/customers`.
pub const CUSTOMER_ID_HEADER: &str = "customerid";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmPhoneNumbers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_phone_country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_phone_calling_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmEmails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmCustomer {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numbers: Option<CrmPhoneNumbers>,
    pub emails: CrmEmails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerListData {
    pub customers: Vec<CrmCustomer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// Body of `GET /api/customers`; identical to what the CRM returns once the
/// payload has been shape-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerListResponse {
    pub data: CustomerListData,
    pub page_info: PageInfo,
}

impl From<CustomerListResponse> for CustomerPage {
    fn from(value: CustomerListResponse) -> Self {
        Self {
            customers: value
                .data
                .customers
                .into_iter()
                .map(Customer::from)
                .collect(),
            ending_cursor: value.page_info.end_cursor,
            has_next_page: value.page_info.has_next_page,
        }
    }
}

/// `{ success }` body shared by the create, delete and failure responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub message: String,
    pub customer_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub success: bool,
    pub messages_sent: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_response_accepts_nullish_fields() {
        let raw = json!({
            "data": {
                "customers": [
                    { "id": "1", "name": "John Doe", "numbers": null, "emails": {} },
                    {
                        "id": "2",
                        "name": "Jane Smith",
                        "numbers": { "primaryPhoneNumber": "7700900123", "primaryPhoneCallingCode": "+44" },
                        "emails": { "primaryEmail": "jane@example.com" }
                    }
                ]
            },
            "pageInfo": { "endCursor": null, "hasNextPage": false }
        });
        let parsed: CustomerListResponse = serde_json::from_value(raw).expect("parse");
        let page = CustomerPage::from(parsed);
        assert_eq!(page.customers.len(), 2);
        assert_eq!(page.customers[1].number, "+447700900123");
        assert_eq!(page.ending_cursor, None);
        assert!(!page.has_next_page);
    }

    #[test]
    fn list_response_rejects_missing_required_fields() {
        let missing_emails = json!({
            "data": { "customers": [ { "id": "1", "name": "John Doe" } ] },
            "pageInfo": { "hasNextPage": true }
        });
        assert!(serde_json::from_value::<CustomerListResponse>(missing_emails).is_err());

        let missing_has_next = json!({
            "data": { "customers": [] },
            "pageInfo": { "endCursor": "c1" }
        });
        assert!(serde_json::from_value::<CustomerListResponse>(missing_has_next).is_err());
    }

    #[test]
    fn operation_result_omits_absent_error() {
        let body = serde_json::to_value(OperationResult::ok()).expect("json");
        assert_eq!(body, json!({ "success": true }));
    }
}
