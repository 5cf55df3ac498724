use clap::Parser;
use storefront_cart::core::{ConfigProvider, Notifier};
use storefront_cart::utils::{logger, validation::Validate};
use storefront_cart::{
    ApiClient, AppConfig, Cart, CartCommand, CartManager, CliConfig, ConsoleNotifier, FileStore,
    OperationResult, TracingNotifier,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // Logging
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::info!("Starting storefront-cart");

    // Defaults, config file, flags
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!("Resolved config: {:?}", config);

    // Validate before touching the API or the store
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    // JSON mode runs without a terminal, so notifications go to the log.
    let outcome = if cli.json_logs {
        run(&config, cli.command, TracingNotifier).await?
    } else {
        run(&config, cli.command, ConsoleNotifier).await?
    };

    // Rejected operations exit with 2; the notifier already told the user why
    if let Err(failure) = outcome {
        tracing::info!("Cart left unchanged: {:?}", failure);
        std::process::exit(2);
    }

    Ok(())
}

async fn run<N: Notifier>(
    config: &AppConfig,
    command: CartCommand,
    notifier: N,
) -> anyhow::Result<OperationResult> {
    // Both lookups share one HTTP client
    let api = ApiClient::from_config(config)?;
    let store = FileStore::new(config.storage_directory());
    let mut manager = CartManager::initialize(api.clone(), api, store, notifier, config.cart_key());

    // Run the command against the restored cart
    let outcome = match command {
        CartCommand::Show => Ok(()),
        CartCommand::Add { product_id } => manager.add_product(product_id).await,
        CartCommand::Remove { product_id } => manager.remove_product(product_id),
        CartCommand::Update { product_id, amount } => {
            manager.update_product_amount(product_id, amount).await
        }
    };

    print_cart(manager.cart());
    Ok(outcome)
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("🛒 Cart is empty");
        return;
    }

    println!("🛒 {} product(s), {} unit(s)", cart.len(), cart.total_units());
    for item in cart.items() {
        let title = item.title().unwrap_or("-");
        match item.price() {
            Some(price) => println!(
                "  #{:<6} {:>3} x {:<40} {:>10.2}",
                item.id, item.amount, title, price
            ),
            None => println!("  #{:<6} {:>3} x {}", item.id, item.amount, title),
        }
    }
    println!("  Subtotal: {:.2}", cart.subtotal());
}
