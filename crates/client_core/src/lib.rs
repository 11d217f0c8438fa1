use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use shared::domain::{Customer, CustomerId, CustomerPage, NewCustomer};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

pub mod error;
pub mod pager;
pub mod proxy_client;

pub use error::ClientError;
pub use pager::{PagerStep, TablePager};
pub use proxy_client::ProxyClient;

/// Where customer pages come from and where mutations are sent.
#[async_trait]
pub trait CustomerSource: Send + Sync {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<CustomerPage, ClientError>;
    async fn create_customer(&self, customer: &NewCustomer) -> Result<(), ClientError>;
    async fn delete_customer(&self, customer_id: &CustomerId) -> Result<(), ClientError>;
    async fn send_message(
        &self,
        message: &str,
        recipients: &[CustomerId],
    ) -> Result<usize, ClientError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerListState {
    pub customers: Vec<Customer>,
    pub cursor: Option<String>,
    pub has_next_page: bool,
    pub is_loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Number of previously unseen customers added to the list.
    Appended(usize),
    AlreadyLoading,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationOutcome {
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageOutcome {
    pub success: bool,
    pub messages_sent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    ListUpdated {
        total: usize,
        has_next_page: bool,
    },
    CustomerCreated,
    CustomerDeleted(CustomerId),
    MessageSent {
        messages_sent: usize,
    },
    OperationFailed {
        operation: &'static str,
        message: String,
    },
}

#[derive(Default)]
struct ListInner {
    state: CustomerListState,
    seen: HashSet<CustomerId>,
    fetched_once: bool,
}

impl ListInner {
    fn absorb(&mut self, page: CustomerPage) -> usize {
        let before = self.state.customers.len();
        for customer in page.customers {
            if self.seen.insert(customer.id.clone()) {
                self.state.customers.push(customer);
            }
        }
        self.state.cursor = page.ending_cursor;
        self.state.has_next_page = page.has_next_page;
        self.fetched_once = true;
        self.state.customers.len() - before
    }
}

/// Accumulates customer pages fetched by cursor and forwards mutations to
/// the proxy. The list is only ever changed by fetching.
pub struct CustomerListController {
    source: Arc<dyn CustomerSource>,
    inner: Mutex<ListInner>,
    events: broadcast::Sender<ControllerEvent>,
}

impl CustomerListController {
    pub fn new(source: Arc<dyn CustomerSource>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            source,
            inner: Mutex::new(ListInner::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> CustomerListState {
        self.inner.lock().await.state.clone()
    }

    pub async fn fetch_next_batch(&self) -> Result<FetchOutcome, ClientError> {
        let cursor = {
            let mut inner = self.inner.lock().await;
            if inner.state.is_loading {
                return Ok(FetchOutcome::AlreadyLoading);
            }
            if inner.fetched_once && !inner.state.has_next_page {
                return Ok(FetchOutcome::Exhausted);
            }
            inner.state.is_loading = true;
            inner.state.cursor.clone()
        };

        let result = self.source.fetch_page(cursor.as_deref()).await;

        let mut inner = self.inner.lock().await;
        inner.state.is_loading = false;
        match result {
            Ok(page) => {
                let appended = inner.absorb(page);
                let total = inner.state.customers.len();
                let has_next_page = inner.state.has_next_page;
                drop(inner);
                info!(appended, total, has_next_page, "customer batch loaded");
                let _ = self.events.send(ControllerEvent::ListUpdated {
                    total,
                    has_next_page,
                });
                Ok(FetchOutcome::Appended(appended))
            }
            Err(err) => {
                drop(inner);
                self.report_failure("fetch customers", &err);
                Err(err)
            }
        }
    }

    /// Fetches pages until `pager` can show `target_page` or the CRM stops
    /// yielding new customers. Leaves the pager on the last page it reached.
    pub async fn load_through_page(
        &self,
        pager: &mut TablePager,
        target_page: usize,
    ) -> Result<CustomerListState, ClientError> {
        if !self.inner.lock().await.fetched_once {
            self.fetch_next_batch().await?;
        }
        loop {
            let state = self.snapshot().await;
            if pager.page() >= target_page {
                return Ok(state);
            }
            match pager.next(&state.customers, state.has_next_page) {
                PagerStep::Moved => {}
                PagerStep::NeedsFetch => match self.fetch_next_batch().await? {
                    FetchOutcome::Appended(n) if n > 0 => {}
                    outcome => {
                        warn!(?outcome, "CRM reported more pages but returned nothing new");
                        return Ok(self.snapshot().await);
                    }
                },
                PagerStep::AtEnd => return Ok(state),
            }
        }
    }

    /// Drops everything loaded so far and fetches the first page again.
    pub async fn refresh(&self) -> Result<FetchOutcome, ClientError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.state.is_loading {
                return Ok(FetchOutcome::AlreadyLoading);
            }
            *inner = ListInner::default();
        }
        self.fetch_next_batch().await
    }

    /// Sends a new customer to the CRM. The local list is left alone until
    /// the next refresh.
    pub async fn create_customer(&self, customer: NewCustomer) -> OperationOutcome {
        let result = match customer.check() {
            Ok(()) => self.source.create_customer(&customer).await,
            Err(messages) => Err(ClientError::Domain(messages.join("; "))),
        };
        match result {
            Ok(()) => {
                info!(name = %customer.name, "customer created");
                let _ = self.events.send(ControllerEvent::CustomerCreated);
                OperationOutcome { success: true }
            }
            Err(err) => {
                self.report_failure("create customer", &err);
                OperationOutcome { success: false }
            }
        }
    }

    /// Deletes a customer in the CRM. The row stays in the local list until
    /// the next refresh.
    pub async fn delete_customer(&self, customer_id: &str) -> OperationOutcome {
        let customer_id = customer_id.trim();
        let result = if customer_id.is_empty() {
            Err(ClientError::Domain("customer id is required".to_string()))
        } else {
            self.source
                .delete_customer(&CustomerId::from(customer_id))
                .await
        };
        match result {
            Ok(()) => {
                info!(customer_id, "customer deleted");
                let _ = self
                    .events
                    .send(ControllerEvent::CustomerDeleted(CustomerId::from(customer_id)));
                OperationOutcome { success: true }
            }
            Err(err) => {
                self.report_failure("delete customer", &err);
                OperationOutcome { success: false }
            }
        }
    }

    pub async fn send_message(&self, message: &str, recipients: &[CustomerId]) -> MessageOutcome {
        let result = if message.trim().is_empty() {
            Err(ClientError::Domain("message cannot be empty".to_string()))
        } else if recipients.is_empty() {
            Err(ClientError::Domain("select at least one customer".to_string()))
        } else {
            self.source.send_message(message, recipients).await
        };
        match result {
            Ok(messages_sent) => {
                info!(messages_sent, "message sent");
                let _ = self
                    .events
                    .send(ControllerEvent::MessageSent { messages_sent });
                MessageOutcome {
                    success: true,
                    messages_sent,
                }
            }
            Err(err) => {
                self.report_failure("send message", &err);
                MessageOutcome {
                    success: false,
                    messages_sent: 0,
                }
            }
        }
    }

    fn report_failure(&self, operation: &'static str, err: &ClientError) {
        warn!(operation, error = %err, "customer operation failed");
        let _ = self.events.send(ControllerEvent::OperationFailed {
            operation,
            message: err.to_string(),
        });
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
