use shared::domain::Customer;

pub const ROWS_PER_PAGE: usize = 10;

/// Result of asking the pager for the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerStep {
    Moved,
    /// The last local page is showing and the CRM has more rows.
    NeedsFetch,
    AtEnd,
}

/// Table pagination over the already-loaded customers, with an email filter.
/// Page numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePager {
    page: usize,
    rows_per_page: usize,
    email_filter: String,
}

impl Default for TablePager {
    fn default() -> Self {
        Self {
            page: 1,
            rows_per_page: ROWS_PER_PAGE,
            email_filter: String::new(),
        }
    }
}

impl TablePager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn email_filter(&self) -> &str {
        &self.email_filter
    }

    /// Case-insensitive substring match on email; resets to the first page.
    pub fn set_email_filter(&mut self, filter: impl Into<String>) {
        self.email_filter = filter.into().trim().to_lowercase();
        self.page = 1;
    }

    pub fn filtered<'a>(&self, customers: &'a [Customer]) -> Vec<&'a Customer> {
        customers
            .iter()
            .filter(|customer| {
                self.email_filter.is_empty()
                    || customer.email.to_lowercase().contains(&self.email_filter)
            })
            .collect()
    }

    pub fn page_count(&self, customers: &[Customer]) -> usize {
        self.filtered(customers)
            .len()
            .div_ceil(self.rows_per_page)
            .max(1)
    }

    pub fn rows<'a>(&self, customers: &'a [Customer]) -> Vec<&'a Customer> {
        self.filtered(customers)
            .into_iter()
            .skip((self.page - 1) * self.rows_per_page)
            .take(self.rows_per_page)
            .collect()
    }

    pub fn can_previous(&self) -> bool {
        self.page > 1
    }

    pub fn can_next(&self, customers: &[Customer], crm_has_more: bool) -> bool {
        self.page < self.page_count(customers) || crm_has_more
    }

    pub fn previous(&mut self) -> bool {
        if !self.can_previous() {
            return false;
        }
        self.page -= 1;
        true
    }

    pub fn next(&mut self, customers: &[Customer], crm_has_more: bool) -> PagerStep {
        if self.page < self.page_count(customers) {
            self.page += 1;
            PagerStep::Moved
        } else if crm_has_more {
            PagerStep::NeedsFetch
        } else {
            PagerStep::AtEnd
        }
    }

    /// Moves to `page`, clamped to the pages currently available locally.
    pub fn go_to(&mut self, page: usize, customers: &[Customer]) {
        self.page = page.clamp(1, self.page_count(customers));
    }
}
