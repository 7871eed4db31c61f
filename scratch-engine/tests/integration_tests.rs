//! Integration tests for the scratch engine
//!
//! These tests drive the engine end to end over the in-memory store and
//! check ledger, inventory and settlement consistency after each flow.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use scratch_core::security_code::{SECURITY_CODE_ALPHABET, SECURITY_CODE_LEN};
use scratch_core::signature::{self, CallbackFields, TRADE_SUCCESS};
use scratch_core::{
    GameType, LotteryStatus, LotteryType, OrderStatus, PrizePool, ProductStatus, TicketContent,
    TicketStatus, TicketView, TransactionType,
};
use scratch_engine::{
    CallbackOutcome, Caller, EngineConfig, EngineError, NewLotteryType, Role, ScratchEngine,
};
use scratch_store::{LotteryStore, MemoryStore};
use serde_json::json;

const ADMIN: Caller = Caller {
    user_id: 1,
    role: Role::Admin,
};

/// Create test engine over an in-memory store
fn create_test_engine() -> ScratchEngine<MemoryStore> {
    create_engine_with(EngineConfig::test())
}

fn create_engine_with(config: EngineConfig) -> ScratchEngine<MemoryStore> {
    ScratchEngine::new(Arc::new(MemoryStore::new()), config).unwrap()
}

/// Register a player wallet
async fn create_player(engine: &ScratchEngine<MemoryStore>, user_id: u64) -> Caller {
    engine.register_user(user_id).await.unwrap();
    Caller::user(user_id)
}

/// Create a standard lottery type with `levels` as (rank, amount, quantity)
/// and open a pool of `total` tickets
async fn create_lottery(
    engine: &ScratchEngine<MemoryStore>,
    price: i64,
    levels: &[(u32, i64, u64)],
    total: u64,
) -> (LotteryType, PrizePool) {
    let lottery = engine
        .create_lottery_type(
            &ADMIN,
            NewLotteryType {
                name: "Lucky Numbers".to_string(),
                price,
                max_prize: 0,
                game_type: GameType::NumberMatch,
                rules_config: serde_json::Value::Null,
            },
        )
        .await
        .unwrap();
    for (rank, amount, quantity) in levels {
        engine
            .add_prize_level(&ADMIN, lottery.id, *rank, *amount, *quantity)
            .await
            .unwrap();
    }
    let pool = engine.open_pool(&ADMIN, lottery.id, total).await.unwrap();
    (lottery, pool)
}

async fn assert_ledger_consistent(engine: &ScratchEngine<MemoryStore>) {
    for report in engine.reconcile_all().await.unwrap() {
        assert!(report.is_consistent(), "inconsistent wallet: {:?}", report);
        assert!(report.balance >= 0);
    }
}

fn callback_for(order_no: &str, money: &str, status: &str) -> CallbackFields {
    CallbackFields {
        pid: "1000".to_string(),
        trade_no: "T20240101000001".to_string(),
        out_trade_no: order_no.to_string(),
        payment_type: "alipay".to_string(),
        name: "100 points".to_string(),
        money: money.to_string(),
        trade_status: status.to_string(),
    }
}

// ============ Wallet Tests ============

#[tokio::test]
async fn test_new_wallet_gets_initial_grant() {
    let engine = create_test_engine();
    let player = create_player(&engine, 2).await;

    assert_eq!(engine.balance(&player).await.unwrap(), 50);
    let rows = engine.transactions(&player, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tx_type, TransactionType::Initial);
    assert_eq!(rows[0].amount, 50);
    assert_eq!(rows[0].balance_after, 50);

    assert!(matches!(
        engine.register_user(2).await,
        Err(EngineError::WalletExists(2))
    ));
}

#[tokio::test]
async fn test_admin_adjust() {
    let engine = create_test_engine();
    let player = create_player(&engine, 2).await;

    let posting = engine.admin_adjust(&ADMIN, 2, 25, "compensation").await.unwrap();
    assert_eq!(posting.wallet.balance, 75);
    assert_eq!(posting.transaction.tx_type, TransactionType::Adjustment);

    let posting = engine.admin_adjust(&ADMIN, 2, -70, "chargeback").await.unwrap();
    assert_eq!(posting.wallet.balance, 5);

    assert!(matches!(
        engine.admin_adjust(&ADMIN, 2, -6, "too much").await,
        Err(EngineError::InsufficientBalance { .. })
    ));
    assert!(matches!(
        engine.admin_adjust(&player, 2, 1000, "self service").await,
        Err(EngineError::Forbidden(_))
    ));

    // Newest first
    let rows = engine.transactions(&player, 2).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].amount, -70);
    assert_eq!(rows[1].amount, 25);

    assert_ledger_consistent(&engine).await;
}

#[tokio::test]
async fn test_reconcile_detects_tampered_balance() {
    let engine = create_test_engine();
    create_player(&engine, 2).await;

    engine
        .store()
        .transaction(|tx| {
            let mut wallet = tx.wallet_by_user(2)?.unwrap();
            wallet.balance += 7;
            tx.update_wallet(&wallet)?;
            Ok::<_, EngineError>(())
        })
        .unwrap();

    let report = engine.reconcile(2).await.unwrap();
    assert!(!report.is_consistent());
    assert_eq!(report.balance, 57);
    assert_eq!(report.ledger_sum, 50);
}

// ============ Catalog Tests ============

#[tokio::test]
async fn test_catalog_requires_admin() {
    let engine = create_test_engine();
    let player = create_player(&engine, 2).await;

    let result = engine
        .create_lottery_type(
            &player,
            NewLotteryType {
                name: "Mine".to_string(),
                price: 1,
                max_prize: 0,
                game_type: GameType::NumberMatch,
                rules_config: serde_json::Value::Null,
            },
        )
        .await;
    assert!(matches!(result, Err(EngineError::Forbidden(_))));
}

#[tokio::test]
async fn test_malformed_pattern_rules_rejected() {
    let engine = create_test_engine();
    let result = engine
        .create_lottery_type(
            &ADMIN,
            NewLotteryType {
                name: "Broken grid".to_string(),
                price: 5,
                max_prize: 0,
                game_type: GameType::Pattern,
                rules_config: json!({"area_count": 9}),
            },
        )
        .await;
    assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    assert!(engine.lottery_types().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pool_rules() {
    let engine = create_test_engine();
    let (lottery, _pool) = create_lottery(&engine, 10, &[(1, 100, 2)], 5).await;

    assert!(matches!(
        engine.open_pool(&ADMIN, lottery.id, 5).await,
        Err(EngineError::PoolAlreadyActive(_))
    ));
    assert!(matches!(
        engine.add_prize_level(&ADMIN, lottery.id, 2, 10, 1).await,
        Err(EngineError::PoolAlreadyActive(_))
    ));

    // More prize slots than tickets is refused up front
    let engine2 = create_test_engine();
    let lone = engine2
        .create_lottery_type(
            &ADMIN,
            NewLotteryType {
                name: "Tight".to_string(),
                price: 1,
                max_prize: 0,
                game_type: GameType::AmountSum,
                rules_config: serde_json::Value::Null,
            },
        )
        .await
        .unwrap();
    engine2.add_prize_level(&ADMIN, lone.id, 1, 5, 4).await.unwrap();
    assert!(matches!(
        engine2.open_pool(&ADMIN, lone.id, 3).await,
        Err(EngineError::InvalidConfig(_))
    ));
    assert!(matches!(
        engine2.add_prize_level(&ADMIN, lone.id, 1, 7, 1).await,
        Err(EngineError::InvalidConfig(_))
    ));
}

#[tokio::test]
async fn test_prize_level_above_max_prize_rejected() {
    let engine = create_test_engine();
    let lottery = engine
        .create_lottery_type(
            &ADMIN,
            NewLotteryType {
                name: "Capped".to_string(),
                price: 10,
                max_prize: 100,
                game_type: GameType::NumberMatch,
                rules_config: serde_json::Value::Null,
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        engine.add_prize_level(&ADMIN, lottery.id, 1, 500, 1).await,
        Err(EngineError::InvalidConfig(_))
    ));
    engine.add_prize_level(&ADMIN, lottery.id, 1, 100, 1).await.unwrap();
    engine.open_pool(&ADMIN, lottery.id, 1).await.unwrap();

    let player = create_player(&engine, 2).await;
    let receipt = engine.purchase(&player, lottery.id, 1).await.unwrap();
    let result = engine
        .scratch(&player, receipt.tickets[0].ticket_id)
        .await
        .unwrap();
    assert_eq!(result.prize_amount, 100);
    assert_eq!(result.balance, 50 - 10 + 100);
}

#[tokio::test]
async fn test_pattern_palette_overflow_rejected() {
    let engine = create_test_engine();
    let result = engine
        .create_lottery_type(
            &ADMIN,
            NewLotteryType {
                name: "Huge grid".to_string(),
                price: 5,
                max_prize: 0,
                game_type: GameType::Pattern,
                rules_config: json!({
                    "area_count": 4,
                    "points_palette": [i64::MAX / 2],
                    "patterns": [
                        {"id": "cherry", "name": "Cherry", "points": 100},
                        {"id": "star", "name": "Star", "special": true}
                    ],
                    "special_chance_percent": 100
                }),
            },
        )
        .await;
    assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    assert!(engine.lottery_types().await.unwrap().is_empty());
}

// ============ Purchase Tests ============

#[tokio::test]
async fn test_purchase_charges_once_for_many_tickets() {
    let engine = create_test_engine();
    let (lottery, pool) = create_lottery(&engine, 5, &[(1, 20, 1)], 100).await;
    let player = create_player(&engine, 2).await;

    let receipt = engine.purchase(&player, lottery.id, 4).await.unwrap();
    assert_eq!(receipt.tickets.len(), 4);
    assert_eq!(receipt.total_cost, 20);
    assert_eq!(receipt.balance, 30);
    assert_eq!(receipt.pool_id, pool.id);

    let purchases: Vec<_> = engine
        .transactions(&player, 100)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.tx_type == TransactionType::Purchase)
        .collect();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].amount, -20);

    let stats = engine.pool_stats(pool.id).await.unwrap();
    assert_eq!(stats.pool.sold_tickets, 4);
    assert_eq!(stats.unscratched, 4);
    assert_ledger_consistent(&engine).await;
}

#[tokio::test]
async fn test_purchase_is_atomic_on_insufficient_balance() {
    let engine = create_test_engine();
    let (lottery, pool) = create_lottery(&engine, 30, &[(1, 100, 1)], 10).await;
    let player = create_player(&engine, 2).await;

    let result = engine.purchase(&player, lottery.id, 2).await;
    assert!(matches!(
        result,
        Err(EngineError::InsufficientBalance {
            required: 60,
            available: 50
        })
    ));

    assert_eq!(engine.balance(&player).await.unwrap(), 50);
    assert_eq!(engine.transactions(&player, 10).await.unwrap().len(), 1);
    assert!(engine.tickets_for_user(&player).await.unwrap().is_empty());
    let stats = engine.pool_stats(pool.id).await.unwrap();
    assert_eq!(stats.pool.sold_tickets, 0);
    assert_eq!(stats.levels[0].remaining, 1);
}

#[tokio::test]
async fn test_purchase_validation() {
    let engine = create_test_engine();
    let (lottery, _) = create_lottery(&engine, 1, &[], 3).await;
    let player = create_player(&engine, 2).await;

    assert!(matches!(
        engine.purchase(&player, lottery.id, 0).await,
        Err(EngineError::InvalidQuantity { quantity: 0, max: 10 })
    ));
    assert!(matches!(
        engine.purchase(&player, lottery.id, 11).await,
        Err(EngineError::InvalidQuantity { .. })
    ));
    assert!(matches!(
        engine.purchase(&player, 999, 1).await,
        Err(EngineError::NotFound { .. })
    ));

    // Partial supply is refused as a whole
    assert!(matches!(
        engine.purchase(&player, lottery.id, 4).await,
        Err(EngineError::SoldOut)
    ));
    assert_eq!(engine.balance(&player).await.unwrap(), 50);

    engine
        .set_lottery_status(&ADMIN, lottery.id, LotteryStatus::Disabled)
        .await
        .unwrap();
    assert!(matches!(
        engine.purchase(&player, lottery.id, 1).await,
        Err(EngineError::TypeDisabled(_))
    ));
}

#[tokio::test]
async fn test_security_codes() {
    let engine = create_test_engine();
    let (lottery, _) = create_lottery(&engine, 1, &[], 50).await;
    let player = create_player(&engine, 2).await;

    let mut codes = HashSet::new();
    for _ in 0..3 {
        let receipt = engine.purchase(&player, lottery.id, 10).await.unwrap();
        for ticket in receipt.tickets {
            assert_eq!(ticket.security_code.len(), SECURITY_CODE_LEN);
            assert!(ticket
                .security_code
                .bytes()
                .all(|b| SECURITY_CODE_ALPHABET.contains(&b)));
            assert!(codes.insert(ticket.security_code));
        }
    }
    assert_eq!(codes.len(), 30);

    let code = codes.iter().next().unwrap().clone();
    let view = engine
        .verify_by_code(&format!("  {}  ", code.to_lowercase()))
        .await
        .unwrap();
    assert_eq!(view.status(), TicketStatus::Unscratched);

    let grouped = format!("{}-{}-{}-{}", &code[..4], &code[4..8], &code[8..12], &code[12..]);
    let view = engine.verify_by_code(&grouped).await.unwrap();
    assert_eq!(view.status(), TicketStatus::Unscratched);

    assert!(matches!(
        engine.verify_by_code("short").await,
        Err(EngineError::InvalidFormat(_))
    ));
    assert!(matches!(
        engine.verify_by_code("AAAAAAAAAAAAAAA0").await,
        Err(EngineError::InvalidFormat(_))
    ));
    assert!(matches!(
        engine.verify_by_code("AAAAAAAAAAAAAAAA").await,
        Err(EngineError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_pool_conservation() {
    let engine = create_engine_with(EngineConfig::test().with_initial_grant(1000));
    let (lottery, pool) = create_lottery(&engine, 1, &[(1, 100, 2), (2, 10, 5)], 20).await;
    let player = create_player(&engine, 2).await;

    let mut ticket_ids = Vec::new();
    for _ in 0..2 {
        let receipt = engine.purchase(&player, lottery.id, 10).await.unwrap();
        ticket_ids.extend(receipt.tickets.iter().map(|t| t.ticket_id));
    }
    assert!(matches!(
        engine.purchase(&player, lottery.id, 1).await,
        Err(EngineError::SoldOut)
    ));

    let stats = engine.pool_stats(pool.id).await.unwrap();
    assert_eq!(stats.pool.sold_tickets, 20);
    assert!(stats.levels.iter().all(|l| l.remaining == 0 && l.drawn == l.quantity));
    assert_eq!(stats.prize_liability, 2 * 100 + 5 * 10);

    let lottery_now = engine
        .lottery_types()
        .await
        .unwrap()
        .into_iter()
        .find(|l| l.id == lottery.id)
        .unwrap();
    assert_eq!(lottery_now.status, LotteryStatus::SoldOut);

    let mut wins: HashMap<Option<u32>, u64> = HashMap::new();
    let mut paid = 0;
    for id in ticket_ids {
        let result = engine.scratch(&player, id).await.unwrap();
        *wins.entry(result.content.prize_level()).or_default() += 1;
        paid += result.prize_amount;
    }
    assert_eq!(wins.get(&Some(1)), Some(&2));
    assert_eq!(wins.get(&Some(2)), Some(&5));
    assert_eq!(wins.get(&None), Some(&13));
    assert_eq!(paid, 250);

    let stats = engine.pool_stats(pool.id).await.unwrap();
    assert_eq!(stats.pool.claimed_prizes, 7);
    assert_eq!(stats.paid_out, 250);
    assert_eq!(engine.balance(&player).await.unwrap(), 1000 - 20 + 250);
    assert_ledger_consistent(&engine).await;
}

#[tokio::test]
async fn test_reopened_pool_restocks_levels() {
    let engine = create_test_engine();
    let (lottery, first) = create_lottery(&engine, 1, &[(1, 5, 1)], 2).await;
    let player = create_player(&engine, 2).await;

    engine.purchase(&player, lottery.id, 2).await.unwrap();
    let second = engine.open_pool(&ADMIN, lottery.id, 4).await.unwrap();
    assert_ne!(first.id, second.id);

    let stats = engine.pool_stats(second.id).await.unwrap();
    assert_eq!(stats.levels[0].remaining, 1);
    let old = engine.pool_stats(first.id).await.unwrap();
    assert_eq!(old.levels[0].drawn, 1);

    let types = engine.lottery_types().await.unwrap();
    assert_eq!(types[0].status, LotteryStatus::Available);
    let receipt = engine.purchase(&player, lottery.id, 1).await.unwrap();
    assert_eq!(receipt.pool_id, second.id);
}

// ============ Scratch Tests ============

#[tokio::test]
async fn test_e2e_winning_ticket() {
    let engine = create_engine_with(EngineConfig::test().with_initial_grant(100));
    let (lottery, pool) = create_lottery(&engine, 10, &[(1, 1000, 1)], 1).await;
    let player = create_player(&engine, 2).await;

    let receipt = engine.purchase(&player, lottery.id, 1).await.unwrap();
    assert_eq!(receipt.balance, 90);
    let ticket = &receipt.tickets[0];

    // Before scratching nothing about the prize is visible
    let view = engine.verify_by_code(&ticket.security_code).await.unwrap();
    assert!(matches!(view, TicketView::Unrevealed(_)));
    let exposed = serde_json::to_string(&view).unwrap();
    assert!(!exposed.contains("prize"));
    assert!(!exposed.contains("win"));
    assert!(matches!(
        engine.reveal(&player, ticket.ticket_id).await,
        Err(EngineError::Sealed(_))
    ));

    let result = engine.scratch(&player, ticket.ticket_id).await.unwrap();
    assert!(result.is_win);
    assert_eq!(result.prize_amount, 1000);
    assert_eq!(result.balance, 1090);

    assert!(matches!(
        engine.scratch(&player, ticket.ticket_id).await,
        Err(EngineError::AlreadyScratched(_))
    ));
    assert_eq!(engine.balance(&player).await.unwrap(), 1090);

    match engine.verify_by_code(&ticket.security_code).await.unwrap() {
        TicketView::Revealed(t) => {
            assert_eq!(t.prize_amount, 1000);
            assert!(t.is_win);
            assert_eq!(t.status, TicketStatus::Scratched);
        }
        other => panic!("expected revealed view, got {:?}", other),
    }

    let content = engine.reveal(&player, ticket.ticket_id).await.unwrap();
    assert_eq!(content, result.content);

    let rows = engine.transactions(&player, 10).await.unwrap();
    let kinds: Vec<_> = rows.iter().map(|t| (t.tx_type, t.amount)).collect();
    assert_eq!(
        kinds,
        vec![
            (TransactionType::Win, 1000),
            (TransactionType::Purchase, -10),
            (TransactionType::Initial, 100),
        ]
    );

    let stats = engine.pool_stats(pool.id).await.unwrap();
    assert_eq!(stats.pool.claimed_prizes, 1);
    assert_ledger_consistent(&engine).await;

    let claimed = engine.claim(&player, ticket.ticket_id).await.unwrap();
    assert_eq!(claimed.status(), TicketStatus::Claimed);
    assert!(matches!(
        engine.claim(&player, ticket.ticket_id).await,
        Err(EngineError::NotClaimable(..))
    ));
    assert_eq!(engine.balance(&player).await.unwrap(), 1090);
}

#[tokio::test]
async fn test_losing_ticket() {
    let engine = create_test_engine();
    let (lottery, pool) = create_lottery(&engine, 10, &[], 3).await;
    let player = create_player(&engine, 2).await;

    let receipt = engine.purchase(&player, lottery.id, 1).await.unwrap();
    let id = receipt.tickets[0].ticket_id;
    let result = engine.scratch(&player, id).await.unwrap();
    assert!(!result.is_win);
    assert_eq!(result.prize_amount, 0);
    assert_eq!(result.balance, 40);
    assert!(matches!(
        engine.claim(&player, id).await,
        Err(EngineError::NotClaimable(..))
    ));

    let stats = engine.pool_stats(pool.id).await.unwrap();
    assert_eq!(stats.pool.claimed_prizes, 0);
    assert_eq!(engine.transactions(&player, 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_scratch_requires_ownership() {
    let engine = create_test_engine();
    let (lottery, _) = create_lottery(&engine, 10, &[(1, 100, 1)], 1).await;
    let owner = create_player(&engine, 2).await;
    let other = create_player(&engine, 3).await;

    let receipt = engine.purchase(&owner, lottery.id, 1).await.unwrap();
    let id = receipt.tickets[0].ticket_id;

    assert!(matches!(
        engine.scratch(&other, id).await,
        Err(EngineError::NotOwned(_))
    ));
    assert!(matches!(
        engine.scratch(&owner, 999).await,
        Err(EngineError::NotFound { .. })
    ));
    assert_eq!(engine.balance(&other).await.unwrap(), 50);
    assert!(engine.scratch(&owner, id).await.unwrap().is_win);
}

#[tokio::test]
async fn test_tampered_ticket_content_is_rejected() {
    let engine = create_test_engine();
    let (lottery, _) = create_lottery(&engine, 10, &[(1, 100, 1)], 1).await;
    let player = create_player(&engine, 2).await;

    let receipt = engine.purchase(&player, lottery.id, 1).await.unwrap();
    let id = receipt.tickets[0].ticket_id;

    engine
        .store()
        .transaction(|tx| {
            let mut ticket = tx.ticket(id)?.unwrap();
            ticket.content_encrypted = ticket.content_encrypted.chars().rev().collect();
            tx.update_ticket(&ticket)?;
            Ok::<_, EngineError>(())
        })
        .unwrap();

    assert!(matches!(
        engine.scratch(&player, id).await,
        Err(EngineError::Integrity(_))
    ));
    assert_eq!(engine.balance(&player).await.unwrap(), 40);
    let view = &engine.tickets_for_user(&player).await.unwrap()[0];
    assert_eq!(view.status(), TicketStatus::Unscratched);
}

#[tokio::test]
async fn test_pattern_game_payouts() {
    let engine = create_test_engine();
    let lottery = engine
        .create_lottery_type(
            &ADMIN,
            NewLotteryType {
                name: "Fruit Grid".to_string(),
                price: 5,
                max_prize: 400,
                game_type: GameType::Pattern,
                rules_config: json!({
                    "area_count": 9,
                    "points_palette": [5, 10, 20, 50],
                    "patterns": [
                        {"id": "cherry", "name": "Cherry", "points": 100},
                        {"id": "bell", "name": "Bell", "points": 300},
                        {"id": "star", "name": "Star", "special": true}
                    ]
                }),
            },
        )
        .await
        .unwrap();
    engine.add_prize_level(&ADMIN, lottery.id, 1, 100, 5).await.unwrap();
    engine.open_pool(&ADMIN, lottery.id, 8).await.unwrap();
    let player = create_player(&engine, 2).await;

    let receipt = engine.purchase(&player, lottery.id, 8).await.unwrap();
    let mut winners = 0;
    let mut credited = 0;
    for ticket in &receipt.tickets {
        let result = engine.scratch(&player, ticket.ticket_id).await.unwrap();
        match &result.content {
            TicketContent::Pattern(grid) => {
                assert_eq!(grid.cells.len(), 9);
                assert_eq!(grid.prize_amount, result.prize_amount);
                assert!(grid.prize_amount <= 400);
                if result.is_win {
                    winners += 1;
                    assert!(grid.winning_cell.is_some());
                    assert_eq!(grid.prize_level, Some(1));
                } else {
                    assert!(grid.winning_cell.is_none());
                }
            }
            other => panic!("expected pattern content, got {:?}", other),
        }
        credited += result.prize_amount;
    }
    assert_eq!(winners, 5);
    assert_eq!(engine.balance(&player).await.unwrap(), 50 - 40 + credited);
    assert_ledger_consistent(&engine).await;
}

// ============ Exchange Tests ============

async fn create_product(engine: &ScratchEngine<MemoryStore>, price: i64, keys: &[&str]) -> u64 {
    let product = engine.create_product(&ADMIN, "Gift Card", price).await.unwrap();
    let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    let product = engine.add_card_keys(&ADMIN, product.id, &keys).await.unwrap();
    assert_eq!(product.stock, keys.len() as u64);
    product.id
}

#[tokio::test]
async fn test_redeem_consistency() {
    let engine = create_test_engine();
    let product_id = create_product(&engine, 30, &["KEY-A", "KEY-B"]).await;
    let player = create_player(&engine, 2).await;

    let receipt = engine.redeem(&player, product_id).await.unwrap();
    assert_eq!(receipt.card_secret, "KEY-A");
    assert_eq!(receipt.balance, 20);
    assert_eq!(receipt.record.cost, 30);

    assert!(matches!(
        engine.redeem(&player, product_id).await,
        Err(EngineError::InsufficientPoints {
            required: 30,
            available: 20
        })
    ));
    let products = engine.products().await.unwrap();
    assert_eq!(products[0].stock, 1);

    engine.admin_adjust(&ADMIN, 2, 100, "top up").await.unwrap();
    let receipt = engine.redeem(&player, product_id).await.unwrap();
    assert_eq!(receipt.card_secret, "KEY-B");

    let products = engine.products().await.unwrap();
    assert_eq!(products[0].stock, 0);
    assert_eq!(products[0].status, ProductStatus::SoldOut);
    assert!(matches!(
        engine.redeem(&player, product_id).await,
        Err(EngineError::SoldOut)
    ));

    let records = engine.exchange_records(&player).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, receipt.record.id);

    let exchanges = engine
        .transactions(&player, 100)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.tx_type == TransactionType::Exchange)
        .count();
    assert_eq!(exchanges, 2);
    assert_ledger_consistent(&engine).await;
}

#[tokio::test]
async fn test_redeem_without_key_changes_nothing() {
    let engine = create_test_engine();
    let product_id = create_product(&engine, 10, &["ONLY"]).await;
    let player = create_player(&engine, 2).await;
    engine.redeem(&player, product_id).await.unwrap();

    // Stock says 3 but every key is gone
    engine
        .store()
        .transaction(|tx| {
            let mut product = tx.product(product_id)?.unwrap();
            product.restock(3);
            tx.put_product(&product)?;
            Ok::<_, EngineError>(())
        })
        .unwrap();

    assert!(matches!(
        engine.redeem(&player, product_id).await,
        Err(EngineError::NoAvailableKey(_))
    ));
    assert_eq!(engine.balance(&player).await.unwrap(), 40);
    assert_eq!(engine.exchange_records(&player).await.unwrap().len(), 1);
    assert_eq!(engine.products().await.unwrap()[0].stock, 3);
}

#[tokio::test]
async fn test_redeem_disabled_product() {
    let engine = create_test_engine();
    let product_id = create_product(&engine, 10, &["K1"]).await;
    let player = create_player(&engine, 2).await;

    assert!(matches!(
        engine
            .set_product_status(&player, product_id, ProductStatus::Disabled)
            .await,
        Err(EngineError::Forbidden(_))
    ));
    let product = engine
        .set_product_status(&ADMIN, product_id, ProductStatus::Disabled)
        .await
        .unwrap();
    assert_eq!(product.status, ProductStatus::Disabled);

    assert!(matches!(
        engine.redeem(&player, product_id).await,
        Err(EngineError::ProductDisabled(_))
    ));
    assert_eq!(engine.balance(&player).await.unwrap(), 50);

    // Re-enabling derives the status from stock
    let product = engine
        .set_product_status(&ADMIN, product_id, ProductStatus::Available)
        .await
        .unwrap();
    assert_eq!(product.status, ProductStatus::Available);
    engine.redeem(&player, product_id).await.unwrap();
    let product = engine
        .set_product_status(&ADMIN, product_id, ProductStatus::Available)
        .await
        .unwrap();
    assert_eq!(product.status, ProductStatus::SoldOut);
}

// ============ Payment Tests ============

#[tokio::test]
async fn test_recharge_request_is_signed() {
    let engine = create_test_engine();
    let player = create_player(&engine, 2).await;

    let request = engine
        .create_recharge_order(&player, 100, "10.00")
        .await
        .unwrap();
    assert_eq!(request.order.status, OrderStatus::Pending);
    assert!(request.order.out_trade_no.starts_with('R'));

    let sign = request.params.get("sign").unwrap().clone();
    assert!(signature::verify(
        &request.params,
        &engine.config().payment_secret,
        &sign
    ));

    assert!(matches!(
        engine.create_recharge_order(&player, 0, "10.00").await,
        Err(EngineError::InvalidAmount(0))
    ));
    assert!(matches!(
        engine.create_recharge_order(&player, 10, "ten").await,
        Err(EngineError::InvalidConfig(_))
    ));
}

#[tokio::test]
async fn test_callback_credits_exactly_once() {
    let engine = create_test_engine();
    let player = create_player(&engine, 2).await;
    let secret = engine.config().payment_secret.clone();

    let request = engine
        .create_recharge_order(&player, 100, "10.00")
        .await
        .unwrap();
    let fields = callback_for(&request.order.out_trade_no, "10.00", TRADE_SUCCESS);
    let sign = signature::sign(&fields.to_params(), &secret);

    match engine.process_payment_callback(&fields, &sign).await.unwrap() {
        CallbackOutcome::Credited { order, balance } => {
            assert_eq!(balance, 150);
            assert_eq!(order.status, OrderStatus::Paid);
            assert_eq!(order.trade_no.as_deref(), Some("T20240101000001"));
        }
        other => panic!("expected credit, got {:?}", other),
    }

    // Gateways retry; a replay must not credit twice
    assert!(matches!(
        engine.process_payment_callback(&fields, &sign).await,
        Err(EngineError::AlreadyPaid(_))
    ));
    assert_eq!(engine.balance(&player).await.unwrap(), 150);
    assert_ledger_consistent(&engine).await;
}

#[tokio::test]
async fn test_callback_rejections() {
    let engine = create_test_engine();
    let player = create_player(&engine, 2).await;
    let secret = engine.config().payment_secret.clone();
    let request = engine
        .create_recharge_order(&player, 100, "10.00")
        .await
        .unwrap();
    let order_no = request.order.out_trade_no.clone();

    let fields = callback_for(&order_no, "10.00", TRADE_SUCCESS);
    assert!(matches!(
        engine.process_payment_callback(&fields, "deadbeef").await,
        Err(EngineError::InvalidSignature)
    ));
    let forged = signature::sign(&fields.to_params(), "wrong-secret");
    assert!(matches!(
        engine.process_payment_callback(&fields, &forged).await,
        Err(EngineError::InvalidSignature)
    ));

    let cheap = callback_for(&order_no, "1.00", TRADE_SUCCESS);
    let sign = signature::sign(&cheap.to_params(), &secret);
    assert!(matches!(
        engine.process_payment_callback(&cheap, &sign).await,
        Err(EngineError::AmountMismatch { .. })
    ));

    let unknown = callback_for("R-unknown", "10.00", TRADE_SUCCESS);
    let sign = signature::sign(&unknown.to_params(), &secret);
    assert!(matches!(
        engine.process_payment_callback(&unknown, &sign).await,
        Err(EngineError::OrderNotFound(_))
    ));

    let waiting = callback_for(&order_no, "10.00", "WAIT_BUYER_PAY");
    let sign = signature::sign(&waiting.to_params(), &secret);
    assert!(matches!(
        engine.process_payment_callback(&waiting, &sign).await.unwrap(),
        CallbackOutcome::Acknowledged { .. }
    ));

    assert_eq!(engine.balance(&player).await.unwrap(), 50);

    // Equivalent money formatting still settles
    let fields = callback_for(&order_no, "10.0", TRADE_SUCCESS);
    let sign = signature::sign(&fields.to_params(), &secret);
    assert!(matches!(
        engine.process_payment_callback(&fields, &sign).await.unwrap(),
        CallbackOutcome::Credited { balance: 150, .. }
    ));
}

#[test]
fn test_signature_is_deterministic() {
    let fields = callback_for("R1", "10.00", TRADE_SUCCESS);
    let a = signature::sign(&fields.to_params(), "secret");
    let b = signature::sign(&fields.to_params(), "secret");
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);

    let mut changed = fields.clone();
    changed.money = "10.01".to_string();
    assert_ne!(a, signature::sign(&changed.to_params(), "secret"));

    let mut params = fields.to_params();
    params.insert("sign".to_string(), "ignored".to_string());
    params.insert("sign_type".to_string(), "SHA256".to_string());
    assert_eq!(a, signature::sign(&params, "secret"));
}

// ============ Concurrency Tests ============

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_purchases_never_oversell() {
    let engine = create_test_engine();
    let (lottery, pool) = create_lottery(&engine, 10, &[(1, 50, 2)], 5).await;
    for user in 10..20 {
        create_player(&engine, user).await;
    }

    let mut handles = Vec::new();
    for user in 10..20 {
        let engine = engine.clone();
        let lottery_id = lottery.id;
        handles.push(tokio::spawn(async move {
            engine.purchase(&Caller::user(user), lottery_id, 1).await
        }));
    }

    let mut sold = 0;
    let mut sold_out = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(EngineError::SoldOut) => sold_out += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(sold, 5);
    assert_eq!(sold_out, 5);

    let stats = engine.pool_stats(pool.id).await.unwrap();
    assert_eq!(stats.pool.sold_tickets, 5);
    assert_eq!(stats.levels[0].remaining, 0);
    assert_ledger_consistent(&engine).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_spending_never_overdraws() {
    let engine = create_test_engine();
    let (lottery, _) = create_lottery(&engine, 30, &[], 10).await;
    let player = create_player(&engine, 2).await;
    let lottery_id = lottery.id;

    let a = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.purchase(&player, lottery_id, 1).await })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.purchase(&player, lottery_id, 1).await })
    };
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(EngineError::InsufficientBalance { .. }))));
    assert_eq!(engine.balance(&player).await.unwrap(), 20);
    assert_ledger_consistent(&engine).await;
}
