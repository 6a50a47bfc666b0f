//! Decanter Application CLI

use std::process;

use clap::{Args, Parser, Subcommand};
use decanter::catalog::{EntityKey, EntityKind, EntityRef};
use decanter::checkout::{BuyingType, OrderDetails, OrderStatus};
use decanter::price::format_price;
use decanter_app::{
    context::AppContext,
    domain::{
        carts::models::{CartIdentity, CartRecord, SessionUuid},
        catalog::models::{NewProduct, ProductUuid},
        customers::models::{CustomerUuid, NewCustomer, UserUuid},
        orders::models::{NewOrder, OrderUuid},
    },
};
use jiff::civil::Date;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "decanter-app", about = "Decanter storefront CLI", long_about = None)]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Product(ProductCommand),
    Cart(CartCommand),
    Customer(CustomerCommand),
    Wishlist(WishlistCommand),
    Order(OrderCommand),
    Notification(NotificationCommand),
}

#[derive(Debug, Args)]
struct ProductCommand {
    #[command(subcommand)]
    command: ProductSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProductSubcommand {
    Create(CreateProductArgs),
    List,
    Restock(RestockArgs),
}

#[derive(Debug, Args)]
struct CreateProductArgs {
    /// Unique URL slug
    #[arg(long)]
    slug: String,

    /// Display name
    #[arg(long)]
    name: String,

    /// Brand name
    #[arg(long)]
    brand: Option<String>,

    /// Unit price in minor units
    #[arg(long)]
    price: u64,

    /// Units on hand
    #[arg(long, default_value_t = 0)]
    stock: u32,
}

#[derive(Debug, Args)]
struct RestockArgs {
    /// Product UUID
    #[arg(long)]
    product: Uuid,

    /// New stock level
    #[arg(long)]
    stock: u32,
}

#[derive(Debug, Args)]
struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    Show(IdentityArgs),
    Add(CartAddArgs),
    SetQuantity(CartSetQuantityArgs),
    Remove(CartRemoveArgs),
}

/// Which identity's open cart to operate on: exactly one of a customer or an
/// anonymous session.
#[derive(Debug, Args)]
struct IdentityArgs {
    /// Customer UUID
    #[arg(long, conflicts_with = "session")]
    customer: Option<Uuid>,

    /// Anonymous session UUID
    #[arg(long, required_unless_present = "customer")]
    session: Option<Uuid>,
}

impl IdentityArgs {
    fn identity(&self) -> Result<CartIdentity, String> {
        match (self.customer, self.session) {
            (Some(customer), None) => {
                Ok(CartIdentity::Customer(CustomerUuid::from_uuid(customer)))
            }
            (None, Some(session)) => Ok(CartIdentity::Anonymous(SessionUuid::from_uuid(session))),
            _ => Err("provide exactly one of --customer or --session".to_string()),
        }
    }
}

#[derive(Debug, Args)]
struct ProductKeyArgs {
    /// Product URL slug
    #[arg(long, conflicts_with = "product")]
    slug: Option<String>,

    /// Product UUID
    #[arg(long, required_unless_present = "slug")]
    product: Option<Uuid>,
}

impl ProductKeyArgs {
    fn key(&self) -> Result<EntityKey, String> {
        match (&self.slug, self.product) {
            (Some(slug), None) => Ok(EntityKey::Slug(slug.clone())),
            (None, Some(product)) => Ok(EntityKey::Id(product)),
            _ => Err("provide exactly one of --slug or --product".to_string()),
        }
    }
}

#[derive(Debug, Args)]
struct CartAddArgs {
    #[command(flatten)]
    identity: IdentityArgs,

    #[command(flatten)]
    entity: ProductKeyArgs,

    /// How many units to add
    #[arg(long, default_value_t = 1)]
    quantity: u32,
}

#[derive(Debug, Args)]
struct CartSetQuantityArgs {
    #[command(flatten)]
    identity: IdentityArgs,

    /// Product UUID of the cart line
    #[arg(long)]
    product: Uuid,

    /// New quantity
    #[arg(long)]
    quantity: u32,
}

#[derive(Debug, Args)]
struct CartRemoveArgs {
    #[command(flatten)]
    identity: IdentityArgs,

    /// Product UUID of the cart line
    #[arg(long)]
    product: Uuid,
}

#[derive(Debug, Args)]
struct CustomerCommand {
    #[command(subcommand)]
    command: CustomerSubcommand,
}

#[derive(Debug, Subcommand)]
enum CustomerSubcommand {
    Register(RegisterCustomerArgs),
}

#[derive(Debug, Args)]
struct RegisterCustomerArgs {
    /// Authentication user UUID the profile hangs off
    #[arg(long)]
    user: Uuid,

    /// Contact phone number
    #[arg(long)]
    phone: Option<String>,

    /// Birth date (YYYY-MM-DD)
    #[arg(long)]
    birth_date: Option<Date>,
}

#[derive(Debug, Args)]
struct WishlistCommand {
    #[command(subcommand)]
    command: WishlistSubcommand,
}

#[derive(Debug, Subcommand)]
enum WishlistSubcommand {
    Add(WishlistItemArgs),
    Remove(WishlistItemArgs),
    Show(WishlistShowArgs),
}

#[derive(Debug, Args)]
struct WishlistItemArgs {
    /// Customer UUID
    #[arg(long)]
    customer: Uuid,

    /// Product UUID to watch
    #[arg(long)]
    product: Uuid,
}

#[derive(Debug, Args)]
struct WishlistShowArgs {
    /// Customer UUID
    #[arg(long)]
    customer: Uuid,
}

#[derive(Debug, Args)]
struct OrderCommand {
    #[command(subcommand)]
    command: OrderSubcommand,
}

#[derive(Debug, Subcommand)]
enum OrderSubcommand {
    Place(PlaceOrderArgs),
    List(ListOrdersArgs),
    SetStatus(SetOrderStatusArgs),
}

#[derive(Debug, Args)]
struct PlaceOrderArgs {
    /// Customer UUID placing the order
    #[arg(long)]
    customer: Uuid,

    /// Recipient's first name
    #[arg(long)]
    first_name: String,

    /// Recipient's last name
    #[arg(long)]
    last_name: String,

    /// Contact phone number
    #[arg(long)]
    phone: String,

    /// Delivery address; omit for pickup
    #[arg(long)]
    address: Option<String>,

    /// Collect from the shop instead of delivery
    #[arg(long)]
    pickup: bool,

    /// Preferred delivery or pickup day (YYYY-MM-DD)
    #[arg(long)]
    preferred_date: Option<Date>,

    /// Free-form note for the shop
    #[arg(long)]
    comment: Option<String>,
}

#[derive(Debug, Args)]
struct ListOrdersArgs {
    /// Customer UUID
    #[arg(long)]
    customer: Uuid,
}

#[derive(Debug, Args)]
struct SetOrderStatusArgs {
    /// Order UUID
    #[arg(long)]
    order: Uuid,

    /// New status tag
    #[arg(long)]
    status: OrderStatus,
}

#[derive(Debug, Args)]
struct NotificationCommand {
    #[command(subcommand)]
    command: NotificationSubcommand,
}

#[derive(Debug, Subcommand)]
enum NotificationSubcommand {
    List(NotificationListArgs),
    MarkRead(NotificationListArgs),
}

#[derive(Debug, Args)]
struct NotificationListArgs {
    /// Customer UUID
    #[arg(long)]
    customer: Uuid,
}

#[tokio::main]
pub async fn main() {
    let _env = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        eprintln!("{error}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let ctx = AppContext::from_database_url(&cli.database_url)
        .await
        .map_err(|error| format!("failed to initialise: {error}"))?;

    match cli.command {
        Commands::Product(ProductCommand { command }) => product(&ctx, command).await,
        Commands::Cart(CartCommand { command }) => cart(&ctx, command).await,
        Commands::Customer(CustomerCommand { command }) => customer(&ctx, command).await,
        Commands::Wishlist(WishlistCommand { command }) => wishlist(&ctx, command).await,
        Commands::Order(OrderCommand { command }) => order(&ctx, command).await,
        Commands::Notification(NotificationCommand { command }) => {
            notification(&ctx, command).await
        }
    }
}

async fn product(ctx: &AppContext, command: ProductSubcommand) -> Result<(), String> {
    match command {
        ProductSubcommand::Create(args) => {
            let product = ctx
                .catalog
                .create_product(NewProduct {
                    uuid: ProductUuid::generate(),
                    slug: args.slug,
                    name: args.name,
                    brand: args.brand,
                    price: args.price,
                    stock: args.stock,
                })
                .await
                .map_err(|error| format!("failed to create product: {error}"))?;

            println!("{} {} {}", product.uuid, product.slug, product.name);
        }
        ProductSubcommand::List => {
            let products = ctx
                .catalog
                .list_products()
                .await
                .map_err(|error| format!("failed to list products: {error}"))?;

            for product in products {
                println!(
                    "{} {} {} {} (stock {})",
                    product.uuid,
                    product.slug,
                    product.name,
                    format_price(product.price),
                    product.stock
                );
            }
        }
        ProductSubcommand::Restock(args) => {
            let outcome = ctx
                .catalog
                .update_stock(ProductUuid::from_uuid(args.product), args.stock)
                .await
                .map_err(|error| format!("failed to update stock: {error}"))?;

            println!(
                "{} stock {} ({} customers notified)",
                outcome.product.uuid,
                outcome.product.stock,
                outcome.notified.len()
            );
        }
    }

    Ok(())
}

async fn cart(ctx: &AppContext, command: CartSubcommand) -> Result<(), String> {
    let cart = match command {
        CartSubcommand::Show(identity) => ctx
            .carts
            .resolve_or_create_cart(identity.identity()?)
            .await
            .map_err(|error| format!("failed to resolve cart: {error}"))?,
        CartSubcommand::Add(args) => ctx
            .carts
            .add_to_cart(
                args.identity.identity()?,
                EntityKind::Product,
                args.entity.key()?,
                args.quantity,
            )
            .await
            .map_err(|error| format!("failed to add to cart: {error}"))?,
        CartSubcommand::SetQuantity(args) => ctx
            .carts
            .set_item_quantity(
                args.identity.identity()?,
                EntityRef {
                    kind: EntityKind::Product,
                    id: args.product,
                },
                args.quantity,
            )
            .await
            .map_err(|error| format!("failed to set quantity: {error}"))?,
        CartSubcommand::Remove(args) => ctx
            .carts
            .remove_from_cart(
                args.identity.identity()?,
                EntityRef {
                    kind: EntityKind::Product,
                    id: args.product,
                },
            )
            .await
            .map_err(|error| format!("failed to remove from cart: {error}"))?,
    };

    print_cart(&cart);

    Ok(())
}

fn print_cart(cart: &CartRecord) {
    println!("cart {}", cart.uuid);

    for item in &cart.items {
        println!(
            "  {} x{} @ {} = {}",
            item.display_name,
            item.quantity,
            format_price(item.unit_price),
            format_price(item.subtotal)
        );
    }

    println!(
        "total {} ({} items)",
        format_price(cart.final_price),
        cart.item_count
    );
}

async fn customer(ctx: &AppContext, command: CustomerSubcommand) -> Result<(), String> {
    match command {
        CustomerSubcommand::Register(args) => {
            let customer = ctx
                .customers
                .register_customer(NewCustomer {
                    uuid: CustomerUuid::generate(),
                    user_uuid: UserUuid::from_uuid(args.user),
                    phone: args.phone,
                    birth_date: args.birth_date,
                })
                .await
                .map_err(|error| format!("failed to register customer: {error}"))?;

            println!("customer {}", customer.uuid);
        }
    }

    Ok(())
}

async fn wishlist(ctx: &AppContext, command: WishlistSubcommand) -> Result<(), String> {
    match command {
        WishlistSubcommand::Add(args) => {
            let added = ctx
                .customers
                .add_to_wishlist(
                    CustomerUuid::from_uuid(args.customer),
                    EntityRef {
                        kind: EntityKind::Product,
                        id: args.product,
                    },
                )
                .await
                .map_err(|error| format!("failed to add to wishlist: {error}"))?;

            println!("{}", if added { "added" } else { "already present" });
        }
        WishlistSubcommand::Remove(args) => {
            ctx.customers
                .remove_from_wishlist(
                    CustomerUuid::from_uuid(args.customer),
                    EntityRef {
                        kind: EntityKind::Product,
                        id: args.product,
                    },
                )
                .await
                .map_err(|error| format!("failed to remove from wishlist: {error}"))?;

            println!("removed");
        }
        WishlistSubcommand::Show(args) => {
            let wishlist = ctx
                .customers
                .wishlist(CustomerUuid::from_uuid(args.customer))
                .await
                .map_err(|error| format!("failed to load wishlist: {error}"))?;

            for entry in wishlist.entries() {
                println!("{entry}");
            }
        }
    }

    Ok(())
}

async fn order(ctx: &AppContext, command: OrderSubcommand) -> Result<(), String> {
    match command {
        OrderSubcommand::Place(args) => {
            let buying_type = if args.pickup {
                BuyingType::Pickup
            } else {
                BuyingType::Delivery
            };

            let order = ctx
                .orders
                .place_order(
                    CustomerUuid::from_uuid(args.customer),
                    NewOrder {
                        uuid: OrderUuid::generate(),
                        details: OrderDetails {
                            first_name: args.first_name,
                            last_name: args.last_name,
                            phone: args.phone,
                            address: args.address,
                            buying_type,
                            preferred_date: args.preferred_date,
                            comment: args.comment,
                        },
                    },
                )
                .await
                .map_err(|error| format!("failed to place order: {error}"))?;

            println!(
                "order {} ({}) total {}",
                order.uuid,
                order.status,
                format_price(order.final_price)
            );
        }
        OrderSubcommand::List(args) => {
            let orders = ctx
                .orders
                .list_orders(CustomerUuid::from_uuid(args.customer))
                .await
                .map_err(|error| format!("failed to list orders: {error}"))?;

            for order in orders {
                println!(
                    "{} {} {} {}",
                    order.uuid,
                    order.placed_at,
                    order.status,
                    format_price(order.final_price)
                );
            }
        }
        OrderSubcommand::SetStatus(args) => {
            let order = ctx
                .orders
                .update_status(OrderUuid::from_uuid(args.order), args.status)
                .await
                .map_err(|error| format!("failed to update status: {error}"))?;

            println!("order {} now {}", order.uuid, order.status);
        }
    }

    Ok(())
}

async fn notification(ctx: &AppContext, command: NotificationSubcommand) -> Result<(), String> {
    match command {
        NotificationSubcommand::List(args) => {
            let notifications = ctx
                .notifications
                .unread(CustomerUuid::from_uuid(args.customer))
                .await
                .map_err(|error| format!("failed to list notifications: {error}"))?;

            for notification in notifications {
                println!("{} {}", notification.created_at, notification.text);
            }
        }
        NotificationSubcommand::MarkRead(args) => {
            let marked = ctx
                .notifications
                .mark_all_read(CustomerUuid::from_uuid(args.customer))
                .await
                .map_err(|error| format!("failed to mark notifications read: {error}"))?;

            println!("{marked} marked read");
        }
    }

    Ok(())
}
