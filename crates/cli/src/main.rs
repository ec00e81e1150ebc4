//! Crave CLI - cart and ordering-session tools.
//!
//! Each invocation behaves like a page load: the cart is hydrated from the
//! data directory, one action is applied, and the result is written back.
//!
//! # Usage
//!
//! ```bash
//! # Add two burgers with cheese
//! crave cart add burger --name Burger --price 10 --quantity 2 --modifier cheese:Cheese:1
//!
//! # Show the cart with a tip
//! crave cart show --tip 3
//!
//! # Bind the visitor to a remote cart
//! crave session start downtown --param table=12
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and edit the local cart
//! - `session` - Start, show and forget ordering sessions
//! - `auth` - Store or clear the API auth token

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use crave_core::LineId;
use crave_storefront::config::StorefrontConfig;
use crave_storefront::error::Result;
use crave_storefront::telemetry;

mod commands;

use commands::Context;
use commands::cart::AddArgs;

#[derive(Parser)]
#[command(name = "crave")]
#[command(author, version, about = "Crave cart and ordering tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage ordering sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Manage the API auth token
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print lines and totals
    Show {
        /// Tip amount to include in the total
        #[arg(long)]
        tip: Option<f64>,
    },
    /// Add an item
    Add(AddArgs),
    /// Set a line's quantity (0 removes it)
    Update {
        /// Line ID as printed by `cart show`
        line_id: LineId,
        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Line ID as printed by `cart show`
        line_id: LineId,
    },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Start or resume the ordering session for a location
    Start {
        /// Location ID
        location: String,
        /// Search parameter forwarded to the backend (`key=value`)
        #[arg(long = "param", value_parser = commands::session::parse_param)]
        params: Vec<(String, String)>,
    },
    /// Show the stored session for a location
    Show {
        /// Location ID
        location: String,
    },
    /// Forget the stored session for a location
    Forget {
        /// Location ID
        location: String,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Store the bearer token sent to the commerce API
    SetToken {
        /// Token value
        token: String,
    },
    /// Remove the stored token
    Clear,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().with_writer(std::io::stderr).init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let sentry_guard = telemetry::init(&config);
    let ctx = Context::new(config);

    let code = match run(cli, &ctx).await {
        Ok(output) => {
            commands::emit(&output);
            0
        }
        Err(e) => {
            e.report();
            1
        }
    };

    // Flush Sentry before exiting
    drop(sentry_guard);
    std::process::exit(code);
}

async fn run(cli: Cli, ctx: &Context) -> Result<String> {
    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show { tip } => Ok(commands::cart::show(ctx, tip)),
            CartAction::Add(args) => commands::cart::add(ctx, args),
            CartAction::Update { line_id, quantity } => {
                commands::cart::update(ctx, line_id, quantity)
            }
            CartAction::Remove { line_id } => commands::cart::remove(ctx, line_id),
            CartAction::Clear => Ok(commands::cart::clear(ctx)),
        },
        Commands::Session { action } => match action {
            SessionAction::Start { location, params } => {
                commands::session::start(ctx, &location.into(), params.into_iter().collect())
                    .await
            }
            SessionAction::Show { location } => {
                Ok(commands::session::show(ctx, &location.into()))
            }
            SessionAction::Forget { location } => {
                Ok(commands::session::forget(ctx, &location.into()))
            }
        },
        Commands::Auth { action } => match action {
            AuthAction::SetToken { token } => commands::auth::set_token(ctx, &token),
            AuthAction::Clear => Ok(commands::auth::clear(ctx)),
        },
    }
}
