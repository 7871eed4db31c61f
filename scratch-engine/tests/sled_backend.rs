//! Engine flows over the sled backend
//!
//! Exercises optimistic transaction retries under contention and checks
//! that committed state survives a reopen.

use std::sync::Arc;

use scratch_core::{GameType, TicketStatus, TicketView};
use scratch_engine::{Caller, EngineConfig, EngineError, NewLotteryType, ScratchEngine};
use scratch_store::{LotteryStore, SledStore};
use tempfile::TempDir;

fn open_engine(dir: &TempDir, config: EngineConfig) -> ScratchEngine<SledStore> {
    let store = SledStore::open(dir.path().join("lottery.db")).unwrap();
    ScratchEngine::new(Arc::new(store), config).unwrap()
}

async fn create_lottery(engine: &ScratchEngine<SledStore>, total: u64) -> u64 {
    let admin = Caller::admin(1);
    let lottery = engine
        .create_lottery_type(
            &admin,
            NewLotteryType {
                name: "Sled Special".to_string(),
                price: 10,
                max_prize: 0,
                game_type: GameType::Multiplier,
                rules_config: serde_json::Value::Null,
            },
        )
        .await
        .unwrap();
    engine
        .add_prize_level(&admin, lottery.id, 1, 500, 1)
        .await
        .unwrap();
    engine.open_pool(&admin, lottery.id, total).await.unwrap();
    lottery.id
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::test();
    let player = Caller::user(2);

    let (code, prize) = {
        let engine = open_engine(&dir, config.clone());
        let lottery_id = create_lottery(&engine, 1).await;
        engine.register_user(2).await.unwrap();

        let receipt = engine.purchase(&player, lottery_id, 1).await.unwrap();
        let ticket = &receipt.tickets[0];
        let result = engine.scratch(&player, ticket.ticket_id).await.unwrap();
        engine.store().flush().unwrap();
        (ticket.security_code.clone(), result.prize_amount)
    };
    assert_eq!(prize, 500);

    let engine = open_engine(&dir, config);
    assert_eq!(engine.balance(&player).await.unwrap(), 50 - 10 + 500);
    match engine.verify_by_code(&code).await.unwrap() {
        TicketView::Revealed(t) => {
            assert_eq!(t.status, TicketStatus::Scratched);
            assert_eq!(t.prize_amount, 500);
        }
        other => panic!("expected revealed ticket, got {:?}", other),
    }
    let report = engine.reconcile(2).await.unwrap();
    assert!(report.is_consistent());
    assert_eq!(report.entries, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_purchases_on_sled() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir, EngineConfig::test());
    let lottery_id = create_lottery(&engine, 4).await;
    for user in 10..18 {
        engine.register_user(user).await.unwrap();
    }

    let mut handles = Vec::new();
    for user in 10..18 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.purchase(&Caller::user(user), lottery_id, 1).await
        }));
    }

    let mut sold = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(EngineError::SoldOut) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(sold, 4);

    let stats = engine.pool_stats(1).await.unwrap();
    assert_eq!(stats.pool.sold_tickets, 4);
    assert_eq!(stats.levels[0].remaining, 0);
    for report in engine.reconcile_all().await.unwrap() {
        assert!(report.is_consistent());
    }
}
