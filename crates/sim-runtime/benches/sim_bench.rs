use criterion::{criterion_group, criterion_main, Criterion};
use sim_core::{Catalog, IngredientKey, ProductKey, SimConfig, VendorId};
use sim_runtime::Bakery;

fn stocked_bakery() -> Bakery {
    let mut bakery = Bakery::new(Catalog::standard(), SimConfig::default()).unwrap();
    let vendor = VendorId::new("city-wholesale");
    for key in ["flour", "yeast", "milk", "butter", "sugar"] {
        let _ = bakery.purchase_ingredient(&IngredientKey::new(key), &vendor, 500.0);
    }
    bakery
}

fn bench_trading_day(c: &mut Criterion) {
    c.bench_function("full_trading_day", |b| {
        b.iter(|| {
            let mut bakery = stocked_bakery();
            let _ = bakery.start_production(&ProductKey::new("bread"), 20.0);
            bakery.advance_time(sim_core::MINUTES_PER_DAY);
            bakery.end_day()
        })
    });
}

fn bench_production_tick(c: &mut Criterion) {
    c.bench_function("production_minute", |b| {
        let mut bakery = stocked_bakery();
        let _ = bakery.start_production(&ProductKey::new("bread"), 20.0);
        let _ = bakery.start_production(&ProductKey::new("croissant"), 20.0);
        b.iter(|| bakery.advance_time(1))
    });
}

criterion_group!(benches, bench_trading_day, bench_production_tick);
criterion_main!(benches);
