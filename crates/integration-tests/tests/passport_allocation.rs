//! Allocator tests against a real `PostgreSQL` database.
//!
//! Everything lives in one test function on purpose: the tests share one
//! database and cargo runs test functions concurrently, so splitting the
//! scenarios would let one scenario's reset clobber another's counter.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::Arc;

use socio_api::db::MemberStore;
use socio_api::models::{FinancialResponsible, NewMember};
use socio_core::{AccountId, Email, MemberStatus, NationalId, PassportId};

use socio_integration_tests::TestContext;

fn new_member(tag: usize) -> NewMember {
    NewMember {
        account_id: Some(AccountId::new(format!("acct_{tag}"))),
        external_customer_id: None,
        created_by: AccountId::new("acct_admin"),
        plan_id: "plan_family".to_owned(),
        financial_responsible: FinancialResponsible {
            name: format!("Socio {tag}"),
            national_id: NationalId::parse("123.456.789-09").ok(),
            date_of_birth: Some("1990-04-12".to_owned()),
            email: Email::parse(&format!("socio{tag}@example.com")).unwrap(),
            phone: None,
            address: None,
        },
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn passport_allocation_against_postgres() {
    let Some(ctx) = TestContext::connect().await else {
        // No SOCIO_TEST_DATABASE_URL: nothing to exercise on this machine.
        return;
    };

    // --- Counter at 41: the next registration gets "00042" -----------------
    ctx.set_counter(41).await;

    let record = ctx.repo.create_member(new_member(0)).await.unwrap();
    assert_eq!(record.passport_id.as_str(), "00042");
    assert_eq!(record.status, MemberStatus::Active);
    assert_eq!(ctx.repo.counter_value().await.unwrap(), 42);

    let fetched = ctx
        .repo
        .get_by_passport(&record.passport_id)
        .await
        .unwrap()
        .expect("member should be readable back");
    assert_eq!(fetched.financial_responsible.email.as_str(), "socio0@example.com");
    assert_eq!(fetched.created_by.as_str(), "acct_admin");

    // --- Concurrent allocation: {1..N}, each exactly once ------------------
    ctx.set_counter(0).await;
    sqlx::query("TRUNCATE member")
        .execute(&ctx.pool)
        .await
        .unwrap();

    const N: usize = 32;
    let repo = Arc::new(ctx.repo.clone());

    let mut handles = Vec::with_capacity(N);
    for i in 1..=N {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            repo.create_member(new_member(i)).await
        }));
    }

    let mut issued = BTreeSet::new();
    for handle in handles {
        let record = handle.await.unwrap().unwrap();
        issued.insert(record.passport_id.into_inner());
    }

    let expected: BTreeSet<String> = (1..=N)
        .map(|n| PassportId::from_sequence(n as i64).into_inner())
        .collect();
    assert_eq!(issued, expected, "no duplicates, no gaps");
    assert_eq!(ctx.repo.counter_value().await.unwrap(), N as i64);
}
