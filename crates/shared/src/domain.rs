use std::fmt;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::protocol::CrmCustomer;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(CustomerId);

/// Extension used by the add-customer form when none is chosen.
pub const DEFAULT_PHONE_EXTENSION: &str = "+44";

/// Extensions offered by the add-customer form, with display labels.
pub const KNOWN_PHONE_EXTENSIONS: [(&str, &str); 3] = [
    ("+1", "US/Canada"),
    ("+44", "UK"),
    ("+61", "Australia"),
];

pub fn phone_extension_label(extension: &str) -> Option<&'static str> {
    let extension = extension.trim();
    KNOWN_PHONE_EXTENSIONS
        .iter()
        .find(|(code, _)| *code == extension)
        .map(|(_, label)| *label)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub number: String,
}

impl From<CrmCustomer> for Customer {
    fn from(value: CrmCustomer) -> Self {
        let number = value
            .numbers
            .as_ref()
            .map(|numbers| {
                let prefix = numbers
                    .primary_phone_calling_code
                    .as_deref()
                    .unwrap_or_default();
                format!(
                    "{prefix}{}",
                    numbers.primary_phone_number.as_deref().unwrap_or_default()
                )
            })
            .unwrap_or_default();

        Self {
            id: CustomerId(value.id),
            name: value.name,
            email: value.emails.primary_email.unwrap_or_default(),
            number,
        }
    }
}

/// Input for creating a customer, as submitted by the add-customer form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(custom(function = "validate_basic_email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub number: String,
    #[validate(length(min = 1, message = "Phone extension is required"))]
    pub phone_extension: String,
}

impl NewCustomer {
    /// Builds the payload from raw form fields: surrounding whitespace is
    /// dropped, the phone number keeps only its digits and a blank extension
    /// falls back to [`DEFAULT_PHONE_EXTENSION`].
    pub fn from_form(name: &str, email: &str, phone: &str, extension: Option<&str>) -> Self {
        let phone_extension = extension
            .map(str::trim)
            .filter(|ext| !ext.is_empty())
            .unwrap_or(DEFAULT_PHONE_EXTENSION)
            .to_string();
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            number: phone_digits(phone),
            phone_extension,
        }
    }

    /// Runs the form rules and flattens the failures into display messages.
    pub fn check(&self) -> Result<(), Vec<String>> {
        self.validate().map_err(|errors| validation_messages(&errors))
    }
}

pub fn phone_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Accepts `local@domain.tld`: one `@`, no whitespace, and a dot inside the
/// domain with non-empty labels on both sides.
pub fn is_basic_email(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn validate_basic_email(email: &str) -> Result<(), ValidationError> {
    if is_basic_email(email) {
        Ok(())
    } else {
        let mut err = ValidationError::new("email");
        err.message = Some("Invalid email format".into());
        Err(err)
    }
}

pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| {
                err.message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"))
            })
        })
        .collect();
    messages.sort();
    messages
}

/// One page of customers as returned by the CRM proxy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomerPage {
    pub customers: Vec<Customer>,
    pub ending_cursor: Option<String>,
    pub has_next_page: bool,
}
