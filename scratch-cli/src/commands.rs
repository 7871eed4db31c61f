//! CLI Commands
//!
//! Command definitions for the scratch CLI.

use clap::{Parser, Subcommand};

/// Scratch lottery CLI
#[derive(Parser, Debug)]
#[command(name = "scratch")]
#[command(version)]
#[command(about = "Scratch lottery engine command line interface")]
#[command(long_about = "Operate a scratch lottery over a local store.\n\n\
    Configuration is read from SCRATCH_* environment variables (a .env file \
    is honoured). Use --dev for a throwaway development configuration.")]
pub struct Cli {
    /// Data directory; empty selects the in-memory store (env: SCRATCH_DATA_DIR)
    #[arg(short, long, env = "SCRATCH_DATA_DIR", default_value = "./scratch_data")]
    pub data_dir: String,

    /// Identity to act as, from SCRATCH_DEV_USERS (env: SCRATCH_AS)
    #[arg(short = 'u', long = "as", env = "SCRATCH_AS", default_value = "admin")]
    pub identity: String,

    /// Use the built-in development configuration
    #[arg(long)]
    pub dev: bool,

    /// Output format (json, table)
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable
    #[default]
    Table,
}

/// Prize level given as `rank:amount:quantity`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelArg {
    /// Rank
    pub level: u32,
    /// Payout
    pub prize_amount: i64,
    /// Supply per pool
    pub quantity: u64,
}

/// Parse `rank:amount:quantity`
pub fn parse_level(s: &str) -> Result<LevelArg, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("expected rank:amount:quantity, got '{}'", s));
    }
    Ok(LevelArg {
        level: parts[0].parse().map_err(|_| format!("bad rank '{}'", parts[0]))?,
        prize_amount: parts[1]
            .parse()
            .map_err(|_| format!("bad amount '{}'", parts[1]))?,
        quantity: parts[2]
            .parse()
            .map_err(|_| format!("bad quantity '{}'", parts[2]))?,
    })
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a demo catalog (admin)
    Seed,

    /// Create a wallet with the initial grant
    Register {
        /// Wallet owner ID
        user_id: u64,
    },

    /// Show the current balance
    Balance,

    /// Show recent ledger rows
    History {
        /// Number of rows
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// List lottery types
    Catalog,

    /// Inventory figures for a pool
    Pool {
        /// Pool ID
        pool_id: u64,
    },

    /// Open a new pool for a lottery type (admin)
    OpenPool {
        /// Lottery type ID
        lottery_type_id: u64,
        /// Tickets in the pool
        total_tickets: u64,
    },

    /// Buy tickets
    Buy {
        /// Lottery type ID
        lottery_type_id: u64,
        /// Number of tickets
        #[arg(short, long, default_value = "1")]
        quantity: u32,
    },

    /// List owned tickets
    Tickets,

    /// Scratch a ticket
    Scratch {
        /// Ticket ID
        ticket_id: u64,
    },

    /// Mark a winning ticket as claimed
    Claim {
        /// Ticket ID
        ticket_id: u64,
    },

    /// Look a ticket up by security code
    Verify {
        /// Security code
        code: String,
    },

    /// List products
    Products,

    /// Redeem points for a product
    Redeem {
        /// Product ID
        product_id: u64,
    },

    /// Open a recharge order and print the signed gateway request
    Recharge {
        /// Points to credit
        points: i64,
        /// Money amount, e.g. 10.00
        money: String,
    },

    /// Feed a gateway notification (JSON file) into the engine
    Callback {
        /// Path to a JSON object with the notification fields and `sign`
        file: std::path::PathBuf,
    },

    /// Adjust a balance (admin)
    Adjust {
        /// Wallet owner ID
        user_id: u64,
        /// Signed amount
        #[arg(allow_hyphen_values = true)]
        amount: i64,
        /// Reason recorded on the ledger row
        #[arg(short, long)]
        reason: String,
    },

    /// Check every wallet against its ledger
    Reconcile,

    /// Drain an in-memory pool and report the prize distribution
    Simulate {
        /// Tickets in the pool
        #[arg(short, long, default_value = "1000")]
        tickets: u64,
        /// Ticket price
        #[arg(short, long, default_value = "10")]
        price: i64,
        /// Prize levels as rank:amount:quantity
        #[arg(short, long = "level", value_parser = parse_level)]
        levels: Vec<LevelArg>,
    },
}
