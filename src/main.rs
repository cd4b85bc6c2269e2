//! Demo CLI entry point. Builds a [`ServiceContainer`] from [`Config`] and
//! exercises the ticket pipeline end to end: `submit` creates a ticket and
//! runs (or queues) it through classification, sentiment, priority, and
//! routing; `show` prints the result back out. Not a server -- there's no
//! HTTP framework in front of [`TicketService`] here, just enough surface
//! to poke the pipeline from a shell.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ticketflow::config::Config;
use ticketflow::ingress::SubmitTicketRequest;
use ticketflow::ServiceContainer;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "ticketflow", about = "Ticket classification, scoring, and routing")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a new ticket and wait for it to finish processing.
    Submit {
        /// Ticket body text.
        content: String,
        #[arg(long)]
        customer_email: Option<String>,
        #[arg(long)]
        customer_tier: Option<String>,
        #[arg(long)]
        language: Option<String>,
        /// Queue the ticket instead of processing it inline.
        #[arg(long)]
        async_mode: bool,
    },
    /// Fetch and print a previously submitted ticket by id.
    Show { ticket_id: Uuid },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ticketflow=info")))
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let container = match ServiceContainer::build(&config).await {
        Ok(container) => container,
        Err(err) => {
            tracing::error!(error = %err, "failed to build service container");
            return ExitCode::FAILURE;
        }
    };

    let result = run(&container, Cli::parse().command).await;
    container.shutdown().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(container: &ServiceContainer, command: Command) -> ticketflow::error::Result<()> {
    match command {
        Command::Submit { content, customer_email, customer_tier, language, async_mode } => {
            let req = SubmitTicketRequest {
                content,
                customer_email,
                customer_tier,
                language,
                process_async: async_mode,
                ..Default::default()
            };
            let response = container.tickets.submit_ticket(req).await?;
            println!("ticket_id: {}", response.ticket_id);
            println!("status: {:?}", response.status);
            if let Some(ms) = response.processing_time_ms {
                println!("processing_time_ms: {ms}");
            }
            if let Some(error) = response.error {
                println!("error: {error}");
            }
            Ok(())
        }
        Command::Show { ticket_id } => {
            let ticket = container.tickets.get_ticket(ticket_id).await?;
            println!("{}", serde_json::to_string_pretty(&ticket).unwrap_or_else(|_| "<unserializable>".to_string()));
            Ok(())
        }
    }
}
