use std::time::Instant;

use serde::Serialize;
use xoshirodev_core::{DeviceConfig, DeviceStats};
use xoshirodev_tests::TestResult;

#[derive(Serialize)]
struct Report<'a> {
    samples: usize,
    score: f64,
    passed: usize,
    total: usize,
    elapsed_secs: f64,
    device: &'a DeviceStats,
    results: &'a [TestResult],
}

pub fn run(config: DeviceConfig, samples: usize, json: bool) {
    let device = super::start_device(config);
    let t0 = Instant::now();
    let data = match device.open() {
        Ok(mut session) => session.read_bytes(samples),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let results = xoshirodev_tests::run_all_tests(&data);
    let score = xoshirodev_tests::calculate_quality_score(&results);
    let passed = results.iter().filter(|r| r.passed).count();
    let stats = device.stats();

    if json {
        let report = Report {
            samples,
            score,
            passed,
            total: results.len(),
            elapsed_secs: t0.elapsed().as_secs_f64(),
            device: &stats,
            results: &results,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!(
        "Test battery on {} ({} bytes, {} refills)\n",
        stats.name, samples, stats.refills
    );
    println!(
        "  {:<22} {:>4} {:>6} {:>10} {:>12}  Details",
        "Test", "Pass", "Grade", "p-value", "Statistic"
    );
    println!("  {}", "-".repeat(72));
    for r in &results {
        let ok = if r.passed { "✓" } else { "✗" };
        let pval = r
            .p_value
            .map(|p| format!("{p:.6}"))
            .unwrap_or_else(|| "—".to_string());
        println!(
            "  {:<22} {:>4} {:>6} {:>10} {:>12.4}  {}",
            r.name, ok, r.grade, pval, r.statistic, r.details
        );
    }
    println!(
        "\nScore: {score:.1}/100 ({passed}/{} passed) [{:.2}s]",
        results.len(),
        t0.elapsed().as_secs_f64()
    );
}
