use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cadence_billing::{
    BillingAttempt, BillingCycle, BillingCycleWindowResolver, BillingInterval,
    InMemoryBillingCycleFeed,
};
use cadence_core::{ContractId, OrderId, TenantId};
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::runtime::Runtime;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

/// Weekly calendar centred on `now`: history alternates fulfilled and
/// declined attempts, the future is unbilled.
fn weekly_calendar(cycles: i64) -> Vec<BillingCycle> {
    (-cycles / 2..cycles / 2)
        .map(|week| {
            let cycle = BillingCycle::new(now() + Duration::weeks(week));
            match week {
                w if w >= 0 => cycle,
                w if w % 2 == 0 => {
                    cycle.with_attempt(BillingAttempt::fulfilled(OrderId::from_numeric(w.unsigned_abs())))
                }
                _ => cycle.with_attempt(BillingAttempt::failed("CARD_DECLINED")),
            }
        })
        .collect()
}

fn resolver(cycles: i64) -> (BillingCycleWindowResolver, TenantId, ContractId) {
    let tenant = TenantId::new("bench.myshopify.com").unwrap();
    let contract = ContractId::from_numeric(1);
    let feed = InMemoryBillingCycleFeed::arc();
    feed.insert_cycles(tenant.clone(), contract.clone(), weekly_calendar(cycles));
    (BillingCycleWindowResolver::new(feed), tenant, contract)
}

fn bench_past_since_page_walk(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("past_since_page_walk");

    for cycles in [10i64, 100, 1000].iter() {
        let (resolver, tenant, contract) = resolver(*cycles);
        group.throughput(Throughput::Elements(*cycles as u64));
        group.bench_with_input(BenchmarkId::from_parameter(cycles), cycles, |b, _| {
            b.iter(|| {
                let past = rt
                    .block_on(resolver.past_since_at(&tenant, &contract, now() - Duration::weeks(1000), now()))
                    .unwrap();
                black_box(past);
            });
        });
    }

    group.finish();
}

fn bench_upcoming(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("upcoming");
    let (resolver, tenant, contract) = resolver(1000);

    for page_size in [1u32, 10, 50].iter() {
        group.bench_with_input(BenchmarkId::new("page_size", page_size), page_size, |b, size| {
            b.iter(|| {
                let upcoming = rt
                    .block_on(resolver.upcoming_at(
                        &tenant,
                        &contract,
                        *size,
                        BillingInterval::Week,
                        1,
                        12,
                        now(),
                    ))
                    .unwrap();
                black_box(upcoming);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_past_since_page_walk, bench_upcoming);
criterion_main!(benches);
