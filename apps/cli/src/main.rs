//! Storefront console for the Chipper backend.
//!
//! This binary is the composition root: it constructs the API client, the
//! local store, the auth manager and the cart service, wires them together,
//! and maps subcommands onto them. Nothing here holds global state.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chipper_core::orders::OrderStatus;

use crate::commands::App;
use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "chipper", about = "Storefront console for the Chipper backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List products, optionally filtered by category or a search term
    Products {
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one product
    Product { id: i64 },
    /// List categories
    Categories,
    /// Cart operations
    #[command(subcommand)]
    Cart(CartCommand),
    /// Product review operations
    #[command(subcommand)]
    Review(ReviewCommand),
    /// Place an order for everything in the cart
    Checkout {
        /// Delivery details (name, address)
        #[arg(long)]
        details: String,
    },
    /// List your orders
    Orders,
    /// Show one order
    Order { id: i64 },
    /// Log in and store the session token
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register {
        name: String,
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Drop the stored session
    Logout,
    /// Show the current session
    Whoami,
    /// Admin operations (require an admin session)
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Stream live store events until interrupted
    Watch,
}

#[derive(Debug, Subcommand)]
enum CartCommand {
    /// Show the cart with totals
    Show,
    /// Add a product to the cart
    Add {
        product_id: i64,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a product already in the cart (0 removes it)
    Set { product_id: i64, quantity: u32 },
    /// Remove a product from the cart
    Remove { product_id: i64 },
    /// Empty the cart
    Clear,
}

#[derive(Debug, Subcommand)]
enum ReviewCommand {
    /// Post a review on a product
    Add {
        product_id: i64,
        /// Stars, 1 to 5
        #[arg(long)]
        rating: u8,
        #[arg(long)]
        comment: String,
    },
    /// Delete one of your reviews (admins can delete any)
    Delete { review_id: i64 },
}

#[derive(Debug, Subcommand)]
enum AdminCommand {
    CreateProduct {
        name: String,
        price: rust_decimal::Decimal,
        #[arg(long)]
        category: i64,
        #[arg(long, default_value_t = 0)]
        stock: i32,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    UpdateProduct {
        id: i64,
        name: String,
        price: rust_decimal::Decimal,
        #[arg(long)]
        category: i64,
        #[arg(long, default_value_t = 0)]
        stock: i32,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    DeleteProduct { id: i64 },
    CreateCategory {
        name: String,
        #[arg(long)]
        image_url: Option<String>,
    },
    UpdateCategory {
        id: i64,
        name: String,
        #[arg(long)]
        image_url: Option<String>,
    },
    DeleteCategory { id: i64 },
    /// Move an order to a new status
    SetOrderStatus { id: i64, status: OrderStatus },
    DeleteOrder { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let app = App::new(Config::from_env());
    app.restore_session();

    let result = app.run(cli.command).await;
    // Let outstanding fire-and-forget cart syncs land before exiting.
    app.flush().await;
    result
}
