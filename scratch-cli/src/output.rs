//! Output Formatting

use scratch_core::{LotteryType, Product, TicketContent, TicketView, Transaction};
use scratch_engine::{PoolStats, PurchaseReceipt, ReconcileReport, ScratchResult};
use serde::Serialize;

use crate::commands::OutputFormat;

/// Print as JSON
pub fn print_json<T: Serialize + ?Sized>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error formatting JSON: {}", e),
    }
}

pub fn print_transactions(rows: &[Transaction], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(rows),
        OutputFormat::Table => {
            println!("{:>6}  {:<11} {:>8} {:>9}  {}", "ID", "TYPE", "AMOUNT", "BALANCE", "DESCRIPTION");
            for t in rows {
                println!(
                    "{:>6}  {:<11} {:>+8} {:>9}  {}",
                    t.id, t.tx_type, t.amount, t.balance_after, t.description
                );
            }
        }
    }
}

pub fn print_catalog(types: &[LotteryType], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(types),
        OutputFormat::Table => {
            println!("{:>4}  {:<20} {:<13} {:>6} {:>9}  {}", "ID", "NAME", "GAME", "PRICE", "MAX", "STATUS");
            for l in types {
                println!(
                    "{:>4}  {:<20} {:<13} {:>6} {:>9}  {:?}",
                    l.id, l.name, l.game_type, l.price, l.max_prize, l.status
                );
            }
        }
    }
}

pub fn print_pool(stats: &PoolStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(stats),
        OutputFormat::Table => {
            let p = &stats.pool;
            println!("Pool {} (lottery type {})", p.id, p.lottery_type_id);
            println!("==================");
            println!("Status:          {:?}", p.status);
            println!("Sold:            {}/{}", p.sold_tickets, p.total_tickets);
            println!("Unscratched:     {}", stats.unscratched);
            println!("Prizes claimed:  {}", p.claimed_prizes);
            println!("Prize liability: {}", stats.prize_liability);
            println!("Paid out:        {}", stats.paid_out);
            println!();
            println!("{:>5} {:>9} {:>9} {:>9} {:>9}", "LEVEL", "AMOUNT", "QUANTITY", "DRAWN", "LEFT");
            for l in &stats.levels {
                println!(
                    "{:>5} {:>9} {:>9} {:>9} {:>9}",
                    l.level, l.prize_amount, l.quantity, l.drawn, l.remaining
                );
            }
        }
    }
}

pub fn print_purchase(receipt: &PurchaseReceipt, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(receipt),
        OutputFormat::Table => {
            println!(
                "Bought {} ticket(s) for {} points, balance {}",
                receipt.tickets.len(),
                receipt.total_cost,
                receipt.balance
            );
            for t in &receipt.tickets {
                println!("  #{:<6} {}", t.ticket_id, t.security_code);
            }
        }
    }
}

pub fn print_tickets(views: &[TicketView], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(views),
        OutputFormat::Table => {
            for view in views {
                print_view(view, format);
            }
        }
    }
}

pub fn print_view(view: &TicketView, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(view),
        OutputFormat::Table => match view {
            TicketView::Unrevealed(t) => {
                println!("#{:<6} {}  {}", t.ticket_id, t.security_code, t.status)
            }
            TicketView::Revealed(t) => println!(
                "#{:<6} {}  {}  prize {}",
                t.ticket_id, t.security_code, t.status, t.prize_amount
            ),
        },
    }
}

pub fn print_scratch(result: &ScratchResult, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Table => {
            if let TicketContent::Pattern(grid) = &result.content {
                let width = (grid.cells.len() as f64).sqrt().ceil().max(1.0) as usize;
                for row in grid.cells.chunks(width) {
                    let line: Vec<String> = row
                        .iter()
                        .map(|c| {
                            let mark = if c.winning { "*" } else { " " };
                            format!("{}{:<8}{:>4}", mark, c.symbol, c.points)
                        })
                        .collect();
                    println!("  {}", line.join(" | "));
                }
            }
            if result.is_win {
                println!("Ticket #{} wins {} points", result.ticket_id, result.prize_amount);
            } else {
                println!("Ticket #{}: no prize", result.ticket_id);
            }
            println!("Balance: {}", result.balance);
        }
    }
}

pub fn print_products(products: &[Product], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(products),
        OutputFormat::Table => {
            println!("{:>4}  {:<20} {:>6} {:>6}  {}", "ID", "NAME", "PRICE", "STOCK", "STATUS");
            for p in products {
                println!(
                    "{:>4}  {:<20} {:>6} {:>6}  {:?}",
                    p.id, p.name, p.price, p.stock, p.status
                );
            }
        }
    }
}

pub fn print_reconcile(reports: &[ReconcileReport], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(reports),
        OutputFormat::Table => {
            let bad: Vec<_> = reports.iter().filter(|r| !r.is_consistent()).collect();
            println!("Wallets checked: {}", reports.len());
            println!("Mismatched:      {}", bad.len());
            for r in bad {
                println!(
                    "  user {}: balance {} vs ledger {} ({} rows)",
                    r.user_id, r.balance, r.ledger_sum, r.entries
                );
            }
        }
    }
}
