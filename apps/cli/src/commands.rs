//! Command handlers wired over the client crates.

use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::warn;

use chipper_api_client::ApiClient;
use chipper_core::auth::AuthManager;
use chipper_core::cart::CartService;
use chipper_core::orders::NewOrder;
use chipper_core::products::{CategoryPayload, ProductPayload};
use chipper_core::reviews::{average_rating, ReviewPayload};
use chipper_feed::{FeedClient, StoreEvent};
use chipper_store::LocalStore;

use crate::config::Config;
use crate::{AdminCommand, CartCommand, Command, ReviewCommand};

pub struct App {
    api: Arc<ApiClient>,
    auth: Arc<AuthManager>,
    cart: CartService,
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        let store = Arc::new(LocalStore::new(&config.data_dir));
        let api = Arc::new(ApiClient::new(&config.api_url));
        let auth = Arc::new(AuthManager::new(store.clone()));
        let cart = CartService::new(store, api.clone(), auth.clone());
        Self {
            api,
            auth,
            cart,
            config,
        }
    }

    pub fn restore_session(&self) {
        self.auth.restore();
    }

    pub async fn flush(&self) {
        self.cart.flush().await;
    }

    fn require_token(&self) -> anyhow::Result<String> {
        self.auth
            .token()
            .context("not logged in — run `chipper login` first")
    }

    pub async fn run(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Products { category, search } => {
                self.list_products(category, search.as_deref()).await
            }
            Command::Product { id } => self.show_product(id).await,
            Command::Categories => self.list_categories().await,
            Command::Cart(command) => self.cart_command(command).await,
            Command::Review(command) => self.review_command(command).await,
            Command::Checkout { details } => self.checkout(&details).await,
            Command::Orders => self.list_orders().await,
            Command::Order { id } => self.show_order(id).await,
            Command::Login { username, password } => self.login(&username, &password).await,
            Command::Register {
                name,
                email,
                password,
                confirm_password,
            } => self.register(&name, &email, &password, &confirm_password).await,
            Command::Logout => {
                self.auth.logout();
                println!("Signed out.");
                Ok(())
            }
            Command::Whoami => {
                match self.auth.session() {
                    Some(session) => println!(
                        "{} (user id {}, role {})",
                        session.username, session.user_id, session.role
                    ),
                    None => println!("Not logged in."),
                }
                Ok(())
            }
            Command::Admin(command) => self.admin_command(command).await,
            Command::Watch => self.watch().await,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────

    async fn list_products(&self, category: Option<i64>, search: Option<&str>) -> anyhow::Result<()> {
        // List screens degrade to empty rather than failing the command.
        let products = match self.api.products(category, search).await {
            Ok(products) => products,
            Err(err) => {
                warn!("could not load products: {err}");
                println!("Could not load products: {err}");
                return Ok(());
            }
        };
        if products.is_empty() {
            println!("No products.");
            return Ok(());
        }
        for product in products {
            println!(
                "#{:<5} {:<30} {:>10}  (stock {})",
                product.id, product.name, product.price, product.stock
            );
        }
        Ok(())
    }

    async fn show_product(&self, id: i64) -> anyhow::Result<()> {
        let product = self.api.product(id).await?;
        println!("#{} {}", product.id, product.name);
        println!("  price: {}", product.price);
        println!("  stock: {}", product.stock);
        if let Some(description) = &product.description {
            println!("  {description}");
        }
        if let Some(category) = &product.category {
            println!("  category: {}", category.name);
        }

        // Reviews degrade to absent rather than failing the detail view.
        match self.api.reviews(id, self.auth.token().as_deref()).await {
            Ok(reviews) if reviews.is_empty() => println!("  no reviews yet"),
            Ok(reviews) => {
                println!(
                    "  rating: {:.1}/5 ({} reviews)",
                    average_rating(&reviews),
                    reviews.len()
                );
                for review in &reviews {
                    let name = review
                        .user
                        .as_ref()
                        .map(|user| user.name.as_str())
                        .unwrap_or("anonymous");
                    println!("  #{:<5} {}/5 {name}: {}", review.id, review.rating, review.comment);
                }
            }
            Err(err) => {
                warn!("could not load reviews for product {id}: {err}");
                println!("  (reviews unavailable: {err})");
            }
        }
        Ok(())
    }

    async fn review_command(&self, command: ReviewCommand) -> anyhow::Result<()> {
        let token = self.require_token()?;
        match command {
            ReviewCommand::Add {
                product_id,
                rating,
                comment,
            } => {
                if !(1..=5).contains(&rating) {
                    bail!("rating must be between 1 and 5");
                }
                let comment = comment.trim();
                if comment.is_empty() {
                    bail!("a review needs a comment");
                }
                let review = self
                    .api
                    .add_review(
                        &token,
                        product_id,
                        &ReviewPayload {
                            rating,
                            comment: comment.to_string(),
                        },
                    )
                    .await?;
                println!("Review #{} posted: {}/5.", review.id, review.rating);
            }
            ReviewCommand::Delete { review_id } => {
                self.api.delete_review(&token, review_id).await?;
                println!("Deleted review #{review_id}.");
            }
        }
        Ok(())
    }

    async fn list_categories(&self) -> anyhow::Result<()> {
        let categories = match self.api.categories().await {
            Ok(categories) => categories,
            Err(err) => {
                warn!("could not load categories: {err}");
                println!("Could not load categories: {err}");
                return Ok(());
            }
        };
        for category in categories {
            println!("#{:<5} {}", category.id, category.name);
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Cart & checkout
    // ─────────────────────────────────────────────────────────────────────

    async fn cart_command(&self, command: CartCommand) -> anyhow::Result<()> {
        match command {
            CartCommand::Show => {
                let cart = self.cart.cart();
                if cart.is_empty() {
                    println!("Your cart is empty.");
                    return Ok(());
                }
                for line in &cart.lines {
                    println!(
                        "#{:<5} {:<30} x{:<3} {:>10}",
                        line.product_id(),
                        line.product.name,
                        line.quantity,
                        line.line_total()
                    );
                }
                println!("{} items, total {}", cart.item_count(), cart.total());
            }
            CartCommand::Add {
                product_id,
                quantity,
            } => {
                let product = self.api.product(product_id).await?;
                let name = product.name.clone();
                self.cart.add_item(&product, quantity);
                println!("Added {quantity} x {name}.");
            }
            CartCommand::Set {
                product_id,
                quantity,
            } => {
                let line = self.line_for(product_id)?;
                self.cart.update_quantity(line, quantity);
                println!("Updated.");
            }
            CartCommand::Remove { product_id } => {
                let line = self.line_for(product_id)?;
                self.cart.remove_item(line);
                println!("Removed.");
            }
            CartCommand::Clear => {
                self.cart.clear();
                println!("Cart cleared.");
            }
        }
        Ok(())
    }

    fn line_for(&self, product_id: i64) -> anyhow::Result<uuid::Uuid> {
        self.cart
            .cart()
            .line_for_product(product_id)
            .map(|line| line.local_id)
            .with_context(|| format!("product {product_id} is not in the cart"))
    }

    async fn checkout(&self, details: &str) -> anyhow::Result<()> {
        let details = details.trim();
        if details.is_empty() {
            bail!("delivery details must not be empty");
        }
        let token = self.require_token()?;
        let cart = self.cart.cart();
        if cart.is_empty() {
            bail!("your cart is empty");
        }

        // One order per cart line; stock problems surface here as API errors.
        for line in &cart.lines {
            let order = self
                .api
                .create_order(
                    &token,
                    &NewOrder {
                        product_id: line.product_id(),
                        quantity: line.quantity,
                        customer_details: Some(details.to_string()),
                        status: None,
                    },
                )
                .await
                .with_context(|| format!("could not order {}", line.product.name))?;
            println!("Order #{} placed: {} x{}", order.id, line.product.name, line.quantity);
        }

        self.cart.clear();
        println!("Checkout complete, total was {}.", cart.total());
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Orders
    // ─────────────────────────────────────────────────────────────────────

    async fn list_orders(&self) -> anyhow::Result<()> {
        let token = self.require_token()?;
        let orders = match self.api.orders(&token).await {
            Ok(orders) => orders,
            Err(err) => {
                warn!("could not load orders: {err}");
                println!("Could not load orders: {err}");
                return Ok(());
            }
        };
        if orders.is_empty() {
            println!("No orders yet.");
            return Ok(());
        }
        for order in orders {
            let name = order
                .product
                .as_ref()
                .map(|p| p.name.as_str())
                .unwrap_or("(unknown product)");
            println!(
                "#{:<5} {:<30} x{:<3} {}",
                order.id, name, order.quantity, order.status
            );
        }
        Ok(())
    }

    async fn show_order(&self, id: i64) -> anyhow::Result<()> {
        let token = self.require_token()?;
        let order = self.api.order(&token, id).await?;
        println!("Order #{} — {}", order.id, order.status);
        println!("  product {}, quantity {}", order.product_id, order.quantity);
        if let Some(details) = &order.customer_details {
            println!("  deliver to: {details}");
        }
        if let Some(created_at) = order.created_at {
            println!("  placed: {created_at}");
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Auth
    // ─────────────────────────────────────────────────────────────────────

    async fn login(&self, username: &str, password: &str) -> anyhow::Result<()> {
        let response = self.api.login(username, password).await?;
        let session = self
            .auth
            .login(&response.token)
            .context("server returned an unusable token")?;
        println!("Welcome back, {}.", session.username);

        // Local wins: replay the anonymous cart to the backend.
        self.cart.push_all();
        Ok(())
    }

    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> anyhow::Result<()> {
        if password != confirm_password {
            bail!("passwords do not match");
        }
        let response = self.api.register(name, email, password).await?;
        let session = self
            .auth
            .login(&response.token)
            .context("server returned an unusable token")?;
        println!("Account created, welcome {}.", session.username);
        self.cart.push_all();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────

    async fn admin_command(&self, command: AdminCommand) -> anyhow::Result<()> {
        let token = self.require_token()?;
        if !self.auth.session().is_some_and(|s| s.is_admin()) {
            // Best-effort gate for nicer errors; the backend enforces this.
            warn!("current session is not an admin; the backend will likely refuse");
        }

        match command {
            AdminCommand::CreateProduct {
                name,
                price,
                category,
                stock,
                description,
                image_url,
            } => {
                let product = self
                    .api
                    .create_product(
                        &token,
                        &ProductPayload {
                            name,
                            description,
                            price,
                            image_url,
                            stock,
                            category_id: category,
                        },
                    )
                    .await?;
                println!("Created product #{}.", product.id);
            }
            AdminCommand::UpdateProduct {
                id,
                name,
                price,
                category,
                stock,
                description,
                image_url,
            } => {
                self.api
                    .update_product(
                        &token,
                        id,
                        &ProductPayload {
                            name,
                            description,
                            price,
                            image_url,
                            stock,
                            category_id: category,
                        },
                    )
                    .await?;
                println!("Updated product #{id}.");
            }
            AdminCommand::DeleteProduct { id } => {
                self.api.delete_product(&token, id).await?;
                println!("Deleted product #{id}.");
            }
            AdminCommand::CreateCategory { name, image_url } => {
                let category = self
                    .api
                    .create_category(&token, &CategoryPayload { name, image_url })
                    .await?;
                println!("Created category #{}.", category.id);
            }
            AdminCommand::UpdateCategory {
                id,
                name,
                image_url,
            } => {
                self.api
                    .update_category(&token, id, &CategoryPayload { name, image_url })
                    .await?;
                println!("Updated category #{id}.");
            }
            AdminCommand::DeleteCategory { id } => {
                self.api.delete_category(&token, id).await?;
                println!("Deleted category #{id}.");
            }
            AdminCommand::SetOrderStatus { id, status } => {
                let order = self.api.set_order_status(&token, id, status).await?;
                println!("Order #{} is now {}.", order.id, order.status);
            }
            AdminCommand::DeleteOrder { id } => {
                self.api.delete_order(&token, id).await?;
                println!("Deleted order #{id}.");
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Live feed
    // ─────────────────────────────────────────────────────────────────────

    async fn watch(&self) -> anyhow::Result<()> {
        let feed = FeedClient::new(&self.config.ws_url);
        let mut events = feed.subscribe();
        feed.connect()?;
        println!("Watching {} (ctrl-c to stop)...", self.config.ws_url);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = events.recv() => match event {
                    Ok(event) => print_event(&event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("feed lagged, {missed} events dropped");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        feed.disconnect();
        Ok(())
    }
}

fn print_event(event: &StoreEvent) {
    match event {
        StoreEvent::NewOrder(order) => {
            println!("new order #{}: product {} x{}", order.id, order.product_id, order.quantity);
        }
        StoreEvent::StockUpdate(update) => {
            println!("stock update: product {} now {}", update.product_id, update.stock);
        }
        StoreEvent::NewProduct(product) => println!("new product #{}: {}", product.id, product.name),
        StoreEvent::UpdateProduct(product) => {
            println!("product #{} updated: {}", product.id, product.name);
        }
        StoreEvent::DeleteProduct(deleted) => println!("product #{} deleted", deleted.id),
        StoreEvent::NewCategory(category) => {
            println!("new category #{}: {}", category.id, category.name);
        }
        StoreEvent::UpdateCategory(category) => {
            println!("category #{} updated: {}", category.id, category.name);
        }
        StoreEvent::DeleteCategory(deleted) => println!("category #{} deleted", deleted.id),
    }
}
