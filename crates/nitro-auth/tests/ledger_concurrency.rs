use nitro_auth::{Authorization, ConsumeOutcome, Credits, MeteringGate, TokenLedger};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn thousand_threads_never_overspend() {
    let ledger = Arc::new(TokenLedger::new());
    let token = ledger.upsert("0xchan", Credits::from(500u64)).snapshot.token;

    let consumed = Arc::new(AtomicUsize::new(0));
    let exhausted = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..1_000)
        .map(|_| {
            let ledger = ledger.clone();
            let token = token.clone();
            let consumed = consumed.clone();
            let exhausted = exhausted.clone();
            thread::spawn(move || match ledger.consume(&token, Credits::from(1u64)) {
                ConsumeOutcome::Consumed(_) => {
                    consumed.fetch_add(1, Ordering::SeqCst);
                }
                ConsumeOutcome::Exhausted(_) => {
                    exhausted.fetch_add(1, Ordering::SeqCst);
                }
                ConsumeOutcome::NotFound => panic!("token vanished"),
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(consumed.load(Ordering::SeqCst), 500);
    assert_eq!(exhausted.load(Ordering::SeqCst), 500);

    let snapshot = ledger.get_by_token(&token).unwrap();
    assert_eq!(snapshot.used, snapshot.total);
    assert_eq!(snapshot.remaining, Credits::ZERO);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_gate_calls_on_runtime() {
    let ledger = Arc::new(TokenLedger::new());
    let token = ledger.upsert("0xchan", Credits::from(500u64)).snapshot.token;
    let gate = MeteringGate::new(ledger.clone());

    let tasks: Vec<_> = (0..1_000)
        .map(|_| {
            let gate = gate.clone();
            let token = token.clone();
            tokio::spawn(async move { gate.authorize(&token) })
        })
        .collect();

    let outcomes = futures::future::join_all(tasks).await;
    let authorized = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(Authorization::Authorized(_))))
        .count();
    let refused = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(Authorization::PaymentRequired(_))))
        .count();

    assert_eq!(authorized, 500);
    assert_eq!(refused, 500);
}

#[test]
fn top_ups_racing_spends_stay_consistent() {
    let ledger = Arc::new(TokenLedger::new());
    let token = ledger.upsert("0xchan", Credits::from(1u64)).snapshot.token;

    // Writers push the total up to 1000 in shuffled order while readers spend.
    let writers: Vec<_> = (0..4u64)
        .map(|w| {
            let ledger = ledger.clone();
            thread::spawn(move || {
                for step in (1..=250u64).rev() {
                    ledger.upsert("0xchan", Credits::from(step * 4 - w));
                }
            })
        })
        .collect();

    let spent = Arc::new(AtomicUsize::new(0));
    let spenders: Vec<_> = (0..8)
        .map(|_| {
            let ledger = ledger.clone();
            let token = token.clone();
            let spent = spent.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    if let ConsumeOutcome::Consumed(s) = ledger.consume(&token, Credits::from(1u64)) {
                        assert!(s.used <= s.total);
                        spent.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(spenders) {
        handle.join().unwrap();
    }

    let snapshot = ledger.get_by_channel("0xchan").unwrap();
    assert_eq!(snapshot.total, Credits::from(1_000u64));
    assert_eq!(snapshot.used, Credits::from(spent.load(Ordering::SeqCst) as u64));
    assert!(snapshot.used <= snapshot.total);
}

#[test]
fn independent_channels_do_not_interfere() {
    let ledger = Arc::new(TokenLedger::new());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let ledger = ledger.clone();
            thread::spawn(move || {
                let channel = format!("0x{i:02x}");
                let token = ledger.upsert(&channel, Credits::from(50u64)).snapshot.token;
                for _ in 0..50 {
                    assert!(matches!(
                        ledger.consume(&token, Credits::from(1u64)),
                        ConsumeOutcome::Consumed(_)
                    ));
                }
                assert!(matches!(
                    ledger.consume(&token, Credits::from(1u64)),
                    ConsumeOutcome::Exhausted(_)
                ));
                (channel, token)
            })
        })
        .collect();

    for handle in handles {
        let (channel, token) = handle.join().unwrap();
        assert_eq!(ledger.get_by_channel(&channel).unwrap().token, token);
    }
    assert_eq!(ledger.len(), 16);
}

#[test]
fn racing_first_vouchers_issue_one_token() {
    let ledger = Arc::new(TokenLedger::new());

    let handles: Vec<_> = (0..32u64)
        .map(|i| {
            let ledger = ledger.clone();
            thread::spawn(move || ledger.upsert("0xshared", Credits::from(10 + i)))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let created = results.iter().filter(|u| u.created).count();
    assert_eq!(created, 1);

    let token = &results[0].snapshot.token;
    assert!(results.iter().all(|u| &u.snapshot.token == token));
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.get_by_token(token).unwrap().total, Credits::from(41u64));
}
