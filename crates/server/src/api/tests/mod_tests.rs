use super::*;
use async_trait::async_trait;
use shared::protocol::{CrmCustomer, CrmEmails, CustomerListData, PageInfo};
use tokio::sync::Mutex;

use crate::sms::LoggingSmsGateway;

#[derive(Default)]
struct FakeDirectory {
    fail: bool,
    list_calls: Mutex<Vec<(Option<String>, u32)>>,
    created: Mutex<Vec<NewCustomer>>,
    deleted: Mutex<Vec<CustomerId>>,
}

impl FakeDirectory {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), CrmError> {
        if self.fail {
            return Err(CrmError::Status {
                status: 500,
                reason: "Internal Server Error".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CustomerDirectory for FakeDirectory {
    async fn list_customers(
        &self,
        starting_after: Option<&str>,
        limit: u32,
    ) -> Result<CustomerListResponse, CrmError> {
        self.list_calls
            .lock()
            .await
            .push((starting_after.map(str::to_string), limit));
        self.check()?;
        Ok(CustomerListResponse {
            data: CustomerListData {
                customers: vec![CrmCustomer {
                    id: "1".into(),
                    name: "John Doe".into(),
                    numbers: None,
                    emails: CrmEmails {
                        primary_email: None,
                    },
                }],
            },
            page_info: PageInfo {
                end_cursor: Some("c1".into()),
                has_next_page: true,
            },
        })
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<(), CrmError> {
        self.check()?;
        self.created.lock().await.push(customer.clone());
        Ok(())
    }

    async fn delete_customer(&self, customer_id: &CustomerId) -> Result<(), CrmError> {
        self.check()?;
        self.deleted.lock().await.push(customer_id.clone());
        Ok(())
    }
}

fn context(directory: Arc<FakeDirectory>) -> ApiContext {
    ApiContext {
        directory,
        sms: Arc::new(LoggingSmsGateway),
        page_limit: 10,
    }
}

fn valid_customer() -> NewCustomer {
    NewCustomer {
        name: "Jane Smith".into(),
        email: "jane@example.com".into(),
        number: "7700900456".into(),
        phone_extension: "+44".into(),
    }
}

#[tokio::test]
async fn list_customers_treats_blank_cursor_as_first_page() {
    let directory = Arc::new(FakeDirectory::default());
    let ctx = context(directory.clone());

    list_customers(&ctx, Some("  ")).await.expect("first page");
    list_customers(&ctx, Some("c1")).await.expect("next page");

    let calls = directory.list_calls.lock().await.clone();
    assert_eq!(calls, vec![(None, 10), (Some("c1".to_string()), 10)]);
}

#[tokio::test]
async fn list_customers_maps_crm_failure_to_upstream() {
    let ctx = context(Arc::new(FakeDirectory::failing()));
    let err = list_customers(&ctx, None).await.expect_err("must fail");
    assert_eq!(err.code, ErrorCode::Upstream);
}

#[tokio::test]
async fn create_customer_rejects_invalid_input_before_calling_crm() {
    let directory = Arc::new(FakeDirectory::default());
    let ctx = context(directory.clone());
    let mut customer = valid_customer();
    customer.email = "jane-at-example".into();

    let err = create_customer(&ctx, &customer)
        .await
        .expect_err("must fail");
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(err.message.contains("Invalid email format"));
    assert!(directory.created.lock().await.is_empty());
}

#[tokio::test]
async fn create_customer_forwards_valid_input() {
    let directory = Arc::new(FakeDirectory::default());
    let ctx = context(directory.clone());
    create_customer(&ctx, &valid_customer())
        .await
        .expect("create");
    assert_eq!(directory.created.lock().await.len(), 1);
}

#[tokio::test]
async fn delete_customer_requires_an_id() {
    let directory = Arc::new(FakeDirectory::default());
    let ctx = context(directory.clone());

    for missing in [None, Some(""), Some("   ")] {
        let err = delete_customer(&ctx, missing)
            .await
            .expect_err("must fail");
        assert_eq!(err.code, ErrorCode::Validation);
    }

    delete_customer(&ctx, Some("2")).await.expect("delete");
    assert_eq!(
        directory.deleted.lock().await.clone(),
        vec![CustomerId::from("2")]
    );
}

#[tokio::test]
async fn delete_customer_surfaces_crm_failure() {
    let ctx = context(Arc::new(FakeDirectory::failing()));
    let err = delete_customer(&ctx, Some("2"))
        .await
        .expect_err("must fail");
    assert_eq!(err.code, ErrorCode::Upstream);
}

#[tokio::test]
async fn send_message_counts_distinct_recipients() {
    let ctx = context(Arc::new(FakeDirectory::default()));
    let request = SendMessageRequest {
        message: "Spring offers are live".into(),
        customer_ids: vec!["1".into(), "2".into(), "1".into(), " ".into()],
    };
    assert_eq!(send_message(&ctx, &request).await.expect("send"), 2);
}

#[tokio::test]
async fn send_message_validates_message_and_recipients() {
    let ctx = context(Arc::new(FakeDirectory::default()));

    let empty_message = SendMessageRequest {
        message: "  ".into(),
        customer_ids: vec!["1".into()],
    };
    let err = send_message(&ctx, &empty_message)
        .await
        .expect_err("must fail");
    assert_eq!(err.code, ErrorCode::Validation);

    let no_recipients = SendMessageRequest {
        message: "hello".into(),
        customer_ids: Vec::new(),
    };
    let err = send_message(&ctx, &no_recipients)
        .await
        .expect_err("must fail");
    assert_eq!(err.code, ErrorCode::Validation);
}
