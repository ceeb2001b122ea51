use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fim::{Algorithm, Miner, MinerConfig, SamVariant, Target};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate a 0/1 transaction matrix
///
/// Parameters:
/// - num_transactions: Number of rows
/// - num_items: Number of columns
/// - avg_transaction_size: Average items per transaction
/// - density: Probability that a drawn item is kept
fn generate_transactions(
    num_transactions: usize,
    num_items: usize,
    avg_transaction_size: usize,
    density: f64,
) -> Array2<i32> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut data = vec![0i32; num_transactions * num_items];

    for tx_idx in 0..num_transactions {
        let random_factor: f64 = rng.gen();
        let num_items_in_tx = (avg_transaction_size as f64 * (0.5 + random_factor)).round() as usize;
        let num_items_in_tx = num_items_in_tx.min(num_items);

        for _ in 0..num_items_in_tx {
            if rng.gen::<f64>() < density {
                // skewed towards small ids so that item frequencies differ
                let item = (rng.gen::<f64>().powi(2) * num_items as f64) as usize;
                data[tx_idx * num_items + item.min(num_items - 1)] = 1;
            }
        }
    }

    Array2::from_shape_vec((num_transactions, num_items), data).unwrap()
}

fn miner(target: Target, supp: f64, algorithm: Algorithm) -> Miner {
    Miner::new(MinerConfig::new(target, supp).with_algorithm(algorithm)).unwrap()
}

const ENGINES: [Algorithm; 6] = [
    Algorithm::Eclat,
    Algorithm::Apriori,
    Algorithm::Relim,
    Algorithm::Sam,
    Algorithm::FpGrowth,
    Algorithm::Auto,
];

/// Every engine on the same data set
fn bench_engines(c: &mut Criterion) {
    let mut group = c.benchmark_group("engines");
    let transactions = generate_transactions(1000, 50, 10, 0.7);

    for algorithm in ENGINES {
        let m = miner(Target::All, 5.0, algorithm);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", algorithm)),
            &transactions,
            |b, tx| {
                b.iter(|| m.mine_dense(black_box(tx.view())).unwrap());
            },
        );
    }

    group.finish();
}

/// Eclat and FP-growth with growing data sets
fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    let configs = vec![
        ("small_100tx", 100, 20, 5),
        ("medium_500tx", 500, 50, 10),
        ("large_1000tx", 1000, 100, 15),
        ("xlarge_5000tx", 5000, 100, 20),
    ];

    for (name, num_tx, num_items, avg_size) in configs {
        let transactions = generate_transactions(num_tx, num_items, avg_size, 0.7);
        for algorithm in [Algorithm::Eclat, Algorithm::FpGrowth] {
            let m = miner(Target::All, 10.0, algorithm);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", algorithm), name),
                &transactions,
                |b, tx| {
                    b.iter(|| m.mine_dense(black_box(tx.view())).unwrap());
                },
            );
        }
    }

    group.finish();
}

/// Lower thresholds for the default engine
fn bench_min_support(c: &mut Criterion) {
    let mut group = c.benchmark_group("min_support");
    let transactions = generate_transactions(1000, 50, 10, 0.7);

    for &min_sup in &[5.0, 10.0, 20.0, 30.0, 50.0] {
        let m = miner(Target::All, min_sup, Algorithm::Auto);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{:.0}%", min_sup)), &min_sup, |b, _| {
            b.iter(|| m.mine_dense(black_box(transactions.view())).unwrap());
        });
    }

    group.finish();
}

/// Closed and maximal sets on wide data: Carpenter and IsTa against Eclat
fn bench_closed_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("closed_wide");
    let transactions = generate_transactions(40, 200, 30, 0.9);

    for target in [Target::Closed, Target::Maximal] {
        for algorithm in [Algorithm::Carpenter, Algorithm::Ista, Algorithm::Eclat] {
            let m = miner(target, 40.0, algorithm);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", algorithm), target),
                &transactions,
                |b, tx| {
                    b.iter(|| m.mine_dense(black_box(tx.view())).unwrap());
                },
            );
        }
    }

    group.finish();
}

/// SaM merge variants on dense data
fn bench_sam_variants(c: &mut Criterion) {
    let mut group = c.benchmark_group("sam_variants");
    let transactions = generate_transactions(2000, 30, 8, 0.8);

    for variant in [SamVariant::Basic, SamVariant::Bsearch, SamVariant::DoubleSource, SamVariant::Tree] {
        let mut config = MinerConfig::new(Target::All, 2.0).with_algorithm(Algorithm::Sam);
        config.sam = variant;
        let m = Miner::new(config).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", variant)),
            &transactions,
            |b, tx| {
                b.iter(|| m.mine_dense(black_box(tx.view())).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_engines,
    bench_scaling,
    bench_min_support,
    bench_closed_wide,
    bench_sam_variants
);
criterion_main!(benches);
