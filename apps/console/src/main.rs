use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{CustomerListController, ProxyClient, TablePager};
use shared::domain::{phone_extension_label, CustomerId, NewCustomer, KNOWN_PHONE_EXTENSIONS};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "crm-console")]
struct Cli {
    #[arg(long, env = "CRM_PROXY_URL", default_value = "http://127.0.0.1:3000")]
    proxy_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one table page of customers, loading more from the CRM as needed.
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Only rows whose email contains this text.
        #[arg(long)]
        email: Option<String>,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        extension: Option<String>,
    },
    Delete {
        customer_id: String,
    },
    Send {
        #[arg(long)]
        message: String,
        #[arg(required = true)]
        customer_ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();

    let controller = CustomerListController::new(Arc::new(ProxyClient::new(cli.proxy_url)));

    match cli.command {
        Command::List { page, email } => list(&controller, page, email).await?,
        Command::Add {
            name,
            email,
            phone,
            extension,
        } => {
            if let Some(ext) = extension.as_deref() {
                if phone_extension_label(ext).is_none() {
                    let known: Vec<String> = KNOWN_PHONE_EXTENSIONS
                        .iter()
                        .map(|(code, label)| format!("{code} ({label})"))
                        .collect();
                    warn!(extension = ext, known = %known.join(", "), "unrecognised phone extension");
                }
            }
            let customer = NewCustomer::from_form(&name, &email, &phone, extension.as_deref());
            if let Err(messages) = customer.check() {
                bail!("invalid customer: {}", messages.join("; "));
            }
            if !controller.create_customer(customer).await.success {
                bail!("customer could not be created");
            }
            println!("created customer {name}");
        }
        Command::Delete { customer_id } => {
            if !controller.delete_customer(&customer_id).await.success {
                bail!("customer {customer_id} could not be deleted");
            }
            println!("deleted customer {customer_id}");
        }
        Command::Send {
            message,
            customer_ids,
        } => {
            let recipients: Vec<CustomerId> = customer_ids
                .iter()
                .map(|id| CustomerId::from(id.as_str()))
                .collect();
            let outcome = controller.send_message(&message, &recipients).await;
            if !outcome.success {
                bail!("message could not be sent");
            }
            println!("messages sent: {}", outcome.messages_sent);
        }
    }

    Ok(())
}

async fn list(controller: &CustomerListController, page: usize, email: Option<String>) -> Result<()> {
    let mut pager = TablePager::new();
    if let Some(filter) = email {
        pager.set_email_filter(filter);
    }

    let state = controller.load_through_page(&mut pager, page).await?;
    let rows = pager.rows(&state.customers);
    if rows.is_empty() {
        println!("no customers");
    }
    for customer in rows {
        println!(
            "{:<28} {:<24} {:<32} {}",
            customer.id.as_str(),
            customer.name,
            customer.email,
            customer.number
        );
    }
    let more = if state.has_next_page { "+" } else { "" };
    println!(
        "page {} of {}{more} ({} loaded)",
        pager.page(),
        pager.page_count(&state.customers),
        state.customers.len()
    );
    Ok(())
}
