//! Command Handlers
//!
//! Handler functions for CLI commands.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use scratch_core::signature::CallbackFields;
use scratch_core::{GameType, LotteryStatus};
use scratch_engine::{
    Authenticator, CallbackOutcome, Caller, EngineConfig, EngineError, LotteryStore,
    NewLotteryType, ScratchEngine, StaticAuthenticator,
};
use scratch_store::{MemoryStore, SledStore, StoreConfig};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::commands::{Cli, Commands, LevelArg, OutputFormat};
use crate::error::{CliError, CliResult};
use crate::output;

/// Levels used by `simulate` when none are given
const DEFAULT_LEVELS: [LevelArg; 3] = [
    LevelArg {
        level: 1,
        prize_amount: 1000,
        quantity: 1,
    },
    LevelArg {
        level: 2,
        prize_amount: 100,
        quantity: 20,
    },
    LevelArg {
        level: 3,
        prize_amount: 20,
        quantity: 150,
    },
];

/// Gateway notification as read from a file
#[derive(Debug, Deserialize)]
struct CallbackFile {
    #[serde(flatten)]
    fields: CallbackFields,
    sign: String,
}

/// Per-level result of a simulation
#[derive(Debug, Serialize)]
struct LevelTally {
    level: u32,
    prize_amount: i64,
    quantity: u64,
    won: u64,
}

/// Simulation summary
#[derive(Debug, Serialize)]
struct SimulationReport {
    tickets: u64,
    price: i64,
    revenue: i64,
    payout: i64,
    winners: u64,
    return_percent: f64,
    levels: Vec<LevelTally>,
    ledger_consistent: bool,
}

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> CliResult<()> {
    let config = load_config(&cli)?;

    if let Commands::Simulate {
        tickets,
        price,
        levels,
    } = &cli.command
    {
        return handle_simulate(&config, *tickets, *price, levels, cli.format).await;
    }

    let store_config = StoreConfig {
        data_dir: cli.data_dir.clone(),
        ..StoreConfig::default()
    };
    if store_config.is_in_memory() {
        let engine = open_engine(Arc::new(MemoryStore::new()), config)?;
        dispatch(&engine, cli).await
    } else {
        let engine = open_engine(Arc::new(SledStore::new(&store_config)?), config)?;
        dispatch(&engine, cli).await?;
        engine.store().flush()?;
        Ok(())
    }
}

fn load_config(cli: &Cli) -> CliResult<EngineConfig> {
    if cli.dev {
        return Ok(EngineConfig::development());
    }
    EngineConfig::from_env().map_err(|e| CliError::config(e.to_string()))
}

fn open_engine<S: LotteryStore>(store: Arc<S>, config: EngineConfig) -> CliResult<ScratchEngine<S>> {
    ScratchEngine::new(store, config).map_err(|e| match e {
        EngineError::Configuration(message) => CliError::config(message),
        other => other.into(),
    })
}

/// Resolve `--as` against the configured identities
async fn resolve_caller<S: LotteryStore>(engine: &ScratchEngine<S>, name: &str) -> CliResult<Caller> {
    let auth = StaticAuthenticator::new(&engine.config().dev_identities);
    if auth.is_empty() {
        return Err(CliError::config("SCRATCH_DEV_USERS is empty"));
    }
    let caller = auth.authenticate(name).await?;
    debug!(identity = name, user_id = caller.user_id, role = ?caller.role, "Acting as");
    Ok(caller)
}

async fn dispatch<S: LotteryStore>(engine: &ScratchEngine<S>, cli: Cli) -> CliResult<()> {
    let format = cli.format;
    let identity = cli.identity.as_str();

    match cli.command {
        Commands::Seed => {
            let caller = resolve_caller(engine, identity).await?;
            handle_seed(engine, &caller, format).await
        }
        Commands::Register { user_id } => {
            let wallet = engine.register_user(user_id).await?;
            match format {
                OutputFormat::Json => output::print_json(&wallet),
                OutputFormat::Table => println!(
                    "Wallet {} opened for user {} with {} points",
                    wallet.id, wallet.user_id, wallet.balance
                ),
            }
            Ok(())
        }
        Commands::Balance => {
            let caller = resolve_caller(engine, identity).await?;
            let balance = engine.balance(&caller).await?;
            match format {
                OutputFormat::Json => output::print_json(&json!({
                    "user_id": caller.user_id,
                    "balance": balance,
                })),
                OutputFormat::Table => println!("Balance: {}", balance),
            }
            Ok(())
        }
        Commands::History { limit } => {
            let caller = resolve_caller(engine, identity).await?;
            let rows = engine.transactions(&caller, limit).await?;
            output::print_transactions(&rows, format);
            Ok(())
        }
        Commands::Catalog => {
            let types = engine.lottery_types().await?;
            output::print_catalog(&types, format);
            Ok(())
        }
        Commands::Pool { pool_id } => {
            let stats = engine.pool_stats(pool_id).await?;
            output::print_pool(&stats, format);
            Ok(())
        }
        Commands::OpenPool {
            lottery_type_id,
            total_tickets,
        } => {
            let caller = resolve_caller(engine, identity).await?;
            let pool = engine.open_pool(&caller, lottery_type_id, total_tickets).await?;
            match format {
                OutputFormat::Json => output::print_json(&pool),
                OutputFormat::Table => println!(
                    "Pool {} opened for lottery type {} with {} tickets",
                    pool.id, pool.lottery_type_id, pool.total_tickets
                ),
            }
            Ok(())
        }
        Commands::Buy {
            lottery_type_id,
            quantity,
        } => {
            let caller = resolve_caller(engine, identity).await?;
            let receipt = engine.purchase(&caller, lottery_type_id, quantity).await?;
            output::print_purchase(&receipt, format);
            Ok(())
        }
        Commands::Tickets => {
            let caller = resolve_caller(engine, identity).await?;
            let views = engine.tickets_for_user(&caller).await?;
            output::print_tickets(&views, format);
            Ok(())
        }
        Commands::Scratch { ticket_id } => {
            let caller = resolve_caller(engine, identity).await?;
            let result = engine.scratch(&caller, ticket_id).await?;
            output::print_scratch(&result, format);
            Ok(())
        }
        Commands::Claim { ticket_id } => {
            let caller = resolve_caller(engine, identity).await?;
            let view = engine.claim(&caller, ticket_id).await?;
            output::print_view(&view, format);
            Ok(())
        }
        Commands::Verify { code } => {
            let view = engine.verify_by_code(&code).await?;
            output::print_view(&view, format);
            Ok(())
        }
        Commands::Products => {
            let products = engine.products().await?;
            output::print_products(&products, format);
            Ok(())
        }
        Commands::Redeem { product_id } => {
            let caller = resolve_caller(engine, identity).await?;
            let receipt = engine.redeem(&caller, product_id).await?;
            match format {
                OutputFormat::Json => output::print_json(&receipt),
                OutputFormat::Table => {
                    println!("Card key: {}", receipt.card_secret);
                    println!("Cost:     {}", receipt.record.cost);
                    println!("Balance:  {}", receipt.balance);
                }
            }
            Ok(())
        }
        Commands::Recharge { points, money } => {
            let caller = resolve_caller(engine, identity).await?;
            let request = engine.create_recharge_order(&caller, points, &money).await?;
            match format {
                OutputFormat::Json => output::print_json(&request),
                OutputFormat::Table => {
                    println!("Order {} ({} points for {})", request.order.out_trade_no, points, money);
                    for (key, value) in &request.params {
                        println!("  {:<13} {}", key, value);
                    }
                }
            }
            Ok(())
        }
        Commands::Callback { file } => handle_callback(engine, &file, format).await,
        Commands::Adjust {
            user_id,
            amount,
            reason,
        } => {
            let caller = resolve_caller(engine, identity).await?;
            let posting = engine.admin_adjust(&caller, user_id, amount, &reason).await?;
            match format {
                OutputFormat::Json => output::print_json(&posting),
                OutputFormat::Table => println!(
                    "User {} adjusted by {:+}, balance {}",
                    user_id, amount, posting.wallet.balance
                ),
            }
            Ok(())
        }
        Commands::Reconcile => {
            let reports = engine.reconcile_all().await?;
            output::print_reconcile(&reports, format);
            if reports.iter().all(|r| r.is_consistent()) {
                Ok(())
            } else {
                Err(EngineError::Integrity("wallet balance differs from ledger".to_string()).into())
            }
        }
        Commands::Simulate { .. } => Err(CliError::invalid_arg("simulate runs without a store")),
    }
}

/// Create a demo catalog: two lottery types with open pools and a product
async fn handle_seed<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    format: OutputFormat,
) -> CliResult<()> {
    let classic = engine
        .create_lottery_type(
            caller,
            NewLotteryType {
                name: "Lucky Numbers".to_string(),
                price: 10,
                max_prize: 1000,
                game_type: GameType::NumberMatch,
                rules_config: json!({"area_count": 6}),
            },
        )
        .await?;
    for (level, amount, quantity) in [(1, 1000, 1), (2, 100, 10), (3, 20, 100), (4, 10, 200)] {
        engine
            .add_prize_level(caller, classic.id, level, amount, quantity)
            .await?;
    }
    let classic_pool = engine.open_pool(caller, classic.id, 1000).await?;

    let grid = engine
        .create_lottery_type(
            caller,
            NewLotteryType {
                name: "Fruit Grid".to_string(),
                price: 20,
                max_prize: 2000,
                game_type: GameType::Pattern,
                rules_config: json!({
                    "area_count": 9,
                    "points_palette": [5, 10, 20, 50, 100],
                    "patterns": [
                        {"id": "cherry", "name": "Cherry", "points": 40},
                        {"id": "bell", "name": "Bell", "points": 100},
                        {"id": "seven", "name": "Seven", "points": 500},
                        {"id": "star", "name": "Star", "special": true}
                    ],
                    "special_chance_percent": 10
                }),
            },
        )
        .await?;
    for (level, amount, quantity) in [(1, 500, 2), (2, 100, 20), (3, 40, 120)] {
        engine
            .add_prize_level(caller, grid.id, level, amount, quantity)
            .await?;
    }
    let grid_pool = engine.open_pool(caller, grid.id, 500).await?;

    let product = engine.create_product(caller, "Gift Card 10", 200).await?;
    let secrets: Vec<String> = (1..=5)
        .map(|i| format!("GIFT-{:04}-{:04}", product.id, i))
        .collect();
    let product = engine.add_card_keys(caller, product.id, &secrets).await?;

    info!(
        classic = classic.id,
        grid = grid.id,
        product = product.id,
        "Demo catalog created"
    );

    match format {
        OutputFormat::Json => output::print_json(&json!({
            "lottery_types": [classic, grid],
            "pools": [classic_pool, grid_pool],
            "product": product,
        })),
        OutputFormat::Table => {
            println!("Seeded demo catalog");
            println!("  {} #{} (pool {})", classic.name, classic.id, classic_pool.id);
            println!("  {} #{} (pool {})", grid.name, grid.id, grid_pool.id);
            println!("  {} #{} ({} keys)", product.name, product.id, product.stock);
        }
    }
    Ok(())
}

async fn handle_callback<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    file: &Path,
    format: OutputFormat,
) -> CliResult<()> {
    let raw = std::fs::read_to_string(file)?;
    let notification: CallbackFile = serde_json::from_str(&raw)?;
    let outcome = engine
        .process_payment_callback(&notification.fields, &notification.sign)
        .await?;

    match format {
        OutputFormat::Json => output::print_json(&outcome),
        OutputFormat::Table => match outcome {
            CallbackOutcome::Credited { order, balance } => println!(
                "Order {} paid, {} points credited to user {}, balance {}",
                order.out_trade_no, order.points, order.user_id, balance
            ),
            CallbackOutcome::Acknowledged {
                out_trade_no,
                trade_status,
            } => println!("Order {} left pending ({})", out_trade_no, trade_status),
        },
    }
    Ok(())
}

/// Sell and scratch an entire in-memory pool
async fn handle_simulate(
    config: &EngineConfig,
    tickets: u64,
    price: i64,
    levels: &[LevelArg],
    format: OutputFormat,
) -> CliResult<()> {
    let levels = if levels.is_empty() {
        &DEFAULT_LEVELS[..]
    } else {
        levels
    };
    let revenue = i64::try_from(tickets)
        .ok()
        .and_then(|t| t.checked_mul(price))
        .ok_or_else(|| CliError::invalid_arg("tickets * price overflows"))?;

    let batch: u32 = 100;
    let config = config
        .clone()
        .with_initial_grant(revenue)
        .with_max_purchase_quantity(batch);
    let engine = open_engine(Arc::new(MemoryStore::new()), config)?;
    let admin = Caller::admin(0);
    let player = Caller::user(1);

    let lottery = engine
        .create_lottery_type(
            &admin,
            NewLotteryType {
                name: "Simulation".to_string(),
                price,
                max_prize: 0,
                game_type: GameType::Multiplier,
                rules_config: serde_json::Value::Null,
            },
        )
        .await?;
    for level in levels {
        engine
            .add_prize_level(&admin, lottery.id, level.level, level.prize_amount, level.quantity)
            .await?;
    }
    let pool = engine.open_pool(&admin, lottery.id, tickets).await?;
    engine.register_user(player.user_id).await?;

    let mut won: BTreeMap<u32, u64> = BTreeMap::new();
    let mut payout = 0i64;
    let mut winners = 0u64;
    let mut sold = 0u64;
    while sold < tickets {
        let quantity = (tickets - sold).min(u64::from(batch)) as u32;
        let receipt = engine.purchase(&player, lottery.id, quantity).await?;
        sold += receipt.tickets.len() as u64;
        for ticket in &receipt.tickets {
            let result = engine.scratch(&player, ticket.ticket_id).await?;
            if result.is_win {
                winners += 1;
                payout += result.prize_amount;
                if let Some(level) = result.content.prize_level() {
                    *won.entry(level).or_default() += 1;
                }
            }
        }
    }

    let stats = engine.pool_stats(pool.id).await?;
    let reconcile = engine.reconcile(player.user_id).await?;
    debug!(status = ?stats.pool.status, paid_out = stats.paid_out, "Pool drained");

    let report = SimulationReport {
        tickets,
        price,
        revenue,
        payout,
        winners,
        return_percent: if revenue > 0 {
            payout as f64 * 100.0 / revenue as f64
        } else {
            0.0
        },
        levels: levels
            .iter()
            .map(|arg| LevelTally {
                level: arg.level,
                prize_amount: arg.prize_amount,
                quantity: arg.quantity,
                won: won.get(&arg.level).copied().unwrap_or(0),
            })
            .collect(),
        ledger_consistent: reconcile.is_consistent() && stats.paid_out == payout,
    };

    let lottery_status = engine
        .lottery_types()
        .await?
        .into_iter()
        .find(|l| l.id == lottery.id)
        .map(|l| l.status);
    debug!(?lottery_status, "Lottery after simulation");
    if lottery_status != Some(LotteryStatus::SoldOut) {
        return Err(EngineError::Integrity("drained pool left the lottery on sale".to_string()).into());
    }

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            println!("Simulated {} tickets at {} points", report.tickets, report.price);
            println!("==================");
            println!("Revenue:   {}", report.revenue);
            println!("Payout:    {}", report.payout);
            println!("Winners:   {}", report.winners);
            println!("Return:    {:.2}%", report.return_percent);
            println!("Ledger:    {}", if report.ledger_consistent { "consistent" } else { "MISMATCH" });
            println!();
            println!("{:>5} {:>9} {:>9} {:>9}", "LEVEL", "AMOUNT", "QUANTITY", "WON");
            for l in &report.levels {
                println!("{:>5} {:>9} {:>9} {:>9}", l.level, l.prize_amount, l.quantity, l.won);
            }
        }
    }
    Ok(())
}
