use std::thread;
use std::time::{Duration, Instant};

use fim::{Algorithm, CancelToken, MineError, Miner, MinerConfig, Target};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn generate_transactions(
    num_transactions: usize,
    num_items: usize,
    avg_transaction_size: usize,
    density: f64,
) -> Array2<i32> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut data = vec![0i32; num_transactions * num_items];

    for tx_idx in 0..num_transactions {
        let random_factor: f64 = rng.gen();
        let num_items_in_tx = (avg_transaction_size as f64 * (0.5 + random_factor)).round() as usize;
        let num_items_in_tx = num_items_in_tx.min(num_items);

        for _ in 0..num_items_in_tx {
            if rng.gen::<f64>() < density {
                let item = rng.gen_range(0..num_items);
                data[tx_idx * num_items + item] = 1;
            }
        }
    }

    Array2::from_shape_vec((num_transactions, num_items), data).unwrap()
}

fn run(name: &str, miner: &Miner, transactions: &Array2<i32>) {
    let start = Instant::now();
    match miner.mine_dense(transactions.view()) {
        Ok(found) => {
            let levels = found.levels();
            println!("  {}: {} patterns, max size {} in {:?}", name, found.len(), levels.len(), start.elapsed());
            if found.len() > 1_000_000 {
                println!("  ⚠ Pattern explosion detected!");
            }
        }
        Err(MineError::BudgetExceeded { requested, available }) => {
            println!(
                "  {}: ✗ budget exceeded after {:?} ({} bytes requested, {} available)",
                name,
                start.elapsed(),
                requested,
                available
            );
        }
        Err(e) => println!("  {}: ✗ {} after {:?}", name, e, start.elapsed()),
    }
}

fn stress_test_memory_budget() {
    println!("\n=== Memory Budget Test ===");

    let configs = vec![
        ("10K x 50", 10_000, 50, 15),
        ("50K x 80", 50_000, 80, 20),
        ("100K x 100", 100_000, 100, 25),
    ];

    for (name, num_tx, num_items, avg_size) in configs {
        println!("\nTesting: {}", name);
        let transactions = generate_transactions(num_tx, num_items, avg_size, 0.7);
        for algorithm in [Algorithm::Eclat, Algorithm::Sam, Algorithm::FpGrowth] {
            let mut config = MinerConfig::new(Target::All, 1.0).with_algorithm(algorithm);
            config.memory_limit = Some(64 << 20);
            run(&format!("{:?}", algorithm), &Miner::new(config).unwrap(), &transactions);
        }
    }
}

fn stress_test_extreme_low_support() {
    println!("\n=== Extreme Low Support Test ===");

    let transactions = generate_transactions(20_000, 100, 20, 0.6);

    for &min_support in &[5.0, 2.0, 1.0, 0.5, 0.1] {
        println!("\nTesting min_support = {}%", min_support);
        let mut config = MinerConfig::new(Target::Closed, min_support);
        config.memory_limit = Some(256 << 20);
        run("closed", &Miner::new(config).unwrap(), &transactions);
    }
}

fn stress_test_cancellation() {
    println!("\n=== Cancellation Test (dense data) ===");

    let transactions = generate_transactions(10_000, 50, 45, 0.9);
    for algorithm in [Algorithm::Eclat, Algorithm::Apriori, Algorithm::Relim] {
        let cancel = CancelToken::new();
        let config = MinerConfig::new(Target::All, 5.0).with_algorithm(algorithm);
        let miner = Miner::new(config).unwrap().with_cancel(cancel.clone());
        let timer = thread::spawn(move || {
            thread::sleep(Duration::from_secs(2));
            cancel.cancel();
        });
        run(&format!("{:?}", algorithm), &miner, &transactions);
        timer.join().unwrap();
    }
}

fn main() {
    env_logger::init();
    println!("=== Mining Stress Testing Suite ===");
    println!("Testing memory budgets, pattern explosion and cancellation\n");

    stress_test_memory_budget();
    stress_test_extreme_low_support();
    stress_test_cancellation();

    println!("\n=== Stress Testing Complete ===");
}
