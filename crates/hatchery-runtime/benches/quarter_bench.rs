use criterion::{criterion_group, criterion_main, Criterion};
use hatchery_core::{ProductId, SupplierId};
use hatchery_econ::NewWorker;
use hatchery_runtime::Hatchery;

fn staffed() -> Hatchery {
    let mut h = Hatchery::with_defaults();
    let _ = h.add_workers(vec![
        NewWorker::specialist("Ana", "Modal Bass"),
        NewWorker::generalist("Bo"),
        NewWorker::generalist("Cy"),
    ]);
    h
}

fn bench_quarter(c: &mut Criterion) {
    let supplier = SupplierId::from("Scaly Wholesaler");
    let products: Vec<ProductId> = ["Timpani Snapper", "Andalusian Brim", "Modal Bass"]
        .into_iter()
        .map(ProductId::from)
        .collect();

    c.bench_function("quarter_cycle", |b| {
        b.iter(|| {
            let mut h = staffed();
            let _ = h.start_quarter();
            for p in &products {
                let _ = h.attempt_sale(p, 5);
            }
            let _ = h.run_quarter_close(&supplier);
        })
    });

    let mut h = staffed();
    let _ = h.start_quarter();
    let bass = ProductId::from("Modal Bass");
    c.bench_function("max_fulfillable", |b| {
        b.iter(|| {
            let _ = h.max_fulfillable(&bass);
        })
    });
}

criterion_group!(benches, bench_quarter);
criterion_main!(benches);
