use contention::{
    run_all, CancellationToken, ConcurrentScoreMap, Error, FairResource, FairResourceConfig,
    GuardedCounter, WithdrawResult, WorkerGroup,
};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Once};
use std::time::Duration;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

#[test]
fn test_two_threads_thousand_increments() {
    init_tracing();
    let counter = Arc::new(GuardedCounter::new());
    let tasks = (0..2).map(|_| {
        let counter = counter.clone();
        move || {
            for _ in 0..1000 {
                counter.increment();
            }
        }
    });
    run_all("counter", tasks).unwrap();
    assert_eq!(counter.get(), 2000);
}

#[test]
fn test_two_concurrent_withdrawals_of_fifty() {
    init_tracing();
    let account = Arc::new(FairResource::with_config(
        100,
        FairResourceConfig::instant().with_processing_delay(Duration::from_millis(100)),
    ));
    let tasks = (0..2).map(|_| {
        let account = account.clone();
        move || account.try_withdraw(50)
    });
    let outcomes = run_all("withdraw", tasks)
        .unwrap()
        .into_iter()
        .collect::<contention::Result<Vec<_>>>()
        .unwrap();

    let applied: u64 = outcomes
        .iter()
        .filter(|o| o.is_applied())
        .map(|_| 50)
        .sum();
    let final_balance = account.balance();
    assert!(applied >= 50);
    assert_eq!(final_balance, 100 - applied);
    for outcome in &outcomes {
        assert!(matches!(
            outcome,
            WithdrawResult::Applied { .. } | WithdrawResult::LockUnavailable
        ));
    }
}

#[test]
fn test_user_score_updates() {
    init_tracing();
    let scores: Arc<ConcurrentScoreMap> = Arc::new(
        [("User1", 10), ("User2", 20), ("User3", 30)]
            .into_iter()
            .map(|(user, score)| (user.to_string(), score))
            .collect(),
    );
    let tasks = [("User1", 5), ("User2", 3), ("User3", 7), ("User4", 9)].map(|(user, delta)| {
        let scores = scores.clone();
        move || scores.update_if_present(user, delta)
    });
    let updated = run_all("score", tasks).unwrap();
    assert_eq!(updated, vec![Some(15), Some(23), Some(37), None]);
    assert_eq!(
        scores.snapshot(),
        HashMap::from([
            ("User1".to_string(), 15),
            ("User2".to_string(), 23),
            ("User3".to_string(), 37),
        ])
    );
}

#[test]
fn test_cancelled_withdrawal_is_reported() {
    init_tracing();
    let account = Arc::new(FairResource::with_config(
        100,
        FairResourceConfig::instant().with_processing_delay(Duration::from_secs(30)),
    ));
    let token = CancellationToken::new();
    let mut workers = WorkerGroup::new("cancel");
    {
        let account = account.clone();
        let token = token.clone();
        workers
            .spawn(move || account.try_withdraw_with(25, &token))
            .unwrap();
    }
    while !account.is_locked() {
        std::thread::yield_now();
    }
    token.cancel();
    assert_eq!(workers.join_all().unwrap(), vec![Err(Error::Cancelled)]);
    assert_eq!(account.balance(), 100);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_counter_never_loses_updates(threads in 1usize..6, per_thread in 0usize..300) {
        let counter = Arc::new(GuardedCounter::new());
        let tasks = (0..threads).map(|_| {
            let counter = counter.clone();
            move || (0..per_thread).for_each(|_| counter.increment())
        });
        run_all("prop-counter", tasks).unwrap();
        prop_assert_eq!(counter.get(), (threads * per_thread) as u64);
    }

    #[test]
    fn prop_withdrawals_never_overdraw(
        initial in 0u64..500,
        amounts in prop::collection::vec(1u64..120, 1..12),
    ) {
        let account = Arc::new(FairResource::with_config(initial, FairResourceConfig::instant()));
        let tasks = amounts.iter().map(|&amount| {
            let account = account.clone();
            move || (amount, account.withdraw_with_retry(amount, &CancellationToken::new()))
        });
        let mut applied = 0u64;
        for (amount, outcome) in run_all("prop-withdraw", tasks).unwrap() {
            match outcome.unwrap() {
                WithdrawResult::Applied { .. } => applied += amount,
                WithdrawResult::InsufficientFunds { balance } => prop_assert!(balance < amount),
                WithdrawResult::LockUnavailable => {}
            }
        }
        prop_assert!(applied <= initial);
        prop_assert_eq!(account.balance(), initial - applied);
    }

    #[test]
    fn prop_score_updates_commute(
        start in -1000i64..1000,
        deltas in prop::collection::vec(-50i64..50, 0..24),
    ) {
        let scores = Arc::new(ConcurrentScoreMap::<String>::new());
        scores.put("k".to_string(), start);
        let tasks = deltas.iter().map(|&delta| {
            let scores = scores.clone();
            move || {
                scores.update_if_present("k", delta);
                scores.update_if_present("absent", delta);
            }
        });
        run_all("prop-score", tasks).unwrap();
        prop_assert_eq!(scores.get("k"), Some(start + deltas.iter().sum::<i64>()));
        prop_assert_eq!(scores.get("absent"), None);
        prop_assert_eq!(scores.len(), 1);
    }
}
