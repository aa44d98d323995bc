//! Statistical test battery for the device's byte stream.
//!
//! A compact set of NIST SP 800-22 style checks. Each test returns a
//! [`TestResult`] with a p-value (where applicable), a pass/fail decision and
//! a letter grade (A through F). Passing says the stream *looks* random; it
//! says nothing about cryptographic strength.

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use statrs::function::erf::erfc;

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

/// Default significance level.
pub const ALPHA: f64 = 0.01;

/// Result of a single randomness test.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub p_value: Option<f64>,
    pub statistic: f64,
    pub details: String,
    pub grade: char,
}

impl TestResult {
    /// Letter grade from a p-value: A ≥ 0.1, B ≥ 0.01, C ≥ 0.001,
    /// D ≥ 0.0001, F otherwise or when there is no p-value.
    pub fn grade_from_p(p: Option<f64>) -> char {
        match p {
            Some(p) if p >= 0.1 => 'A',
            Some(p) if p >= 0.01 => 'B',
            Some(p) if p >= 0.001 => 'C',
            Some(p) if p >= 0.0001 => 'D',
            _ => 'F',
        }
    }

    pub fn pass_from_p(p: Option<f64>, threshold: f64) -> bool {
        p.is_some_and(|p| p >= threshold)
    }

    fn from_p(name: &str, p: f64, statistic: f64, details: String) -> Self {
        let p = p.clamp(0.0, 1.0);
        Self {
            name: name.to_string(),
            passed: Self::pass_from_p(Some(p), ALPHA),
            p_value: Some(p),
            statistic,
            details,
            grade: Self::grade_from_p(Some(p)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Unpack bytes into bits, MSB first.
fn to_bits(data: &[u8]) -> Vec<u8> {
    data.iter()
        .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1))
        .collect()
}

fn insufficient(name: &str, needed: usize, got: usize) -> TestResult {
    TestResult {
        name: name.to_string(),
        passed: false,
        p_value: None,
        statistic: 0.0,
        details: format!("Insufficient data: need {needed}, got {got}"),
        grade: 'F',
    }
}

/// Upper tail of the chi-squared distribution.
fn chi2_sf(stat: f64, dof: f64) -> f64 {
    match ChiSquared::new(dof) {
        Ok(dist) => 1.0 - dist.cdf(stat),
        Err(_) => 0.0,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Frequency
// ═══════════════════════════════════════════════════════════════════════════════

/// Proportion of ones should be about one half.
pub fn monobit_frequency(data: &[u8]) -> TestResult {
    let name = "Monobit Frequency";
    let n = data.len() * 8;
    if n < 100 {
        return insufficient(name, 100, n);
    }
    let ones: i64 = data.iter().map(|b| b.count_ones() as i64).sum();
    let s = 2 * ones - n as i64;
    let s_obs = (s as f64).abs() / (n as f64).sqrt();
    let p = erfc(s_obs / std::f64::consts::SQRT_2);
    TestResult::from_p(name, p, s_obs, format!("S={s}, n={n}"))
}

/// Proportion of ones within 128-bit blocks.
pub fn block_frequency(data: &[u8]) -> TestResult {
    let name = "Block Frequency";
    const BLOCK_BITS: usize = 128;
    let block_bytes = BLOCK_BITS / 8;
    let blocks = data.len() / block_bytes;
    if blocks < 10 {
        return insufficient(name, 10 * block_bytes, data.len());
    }
    let chi2: f64 = data
        .chunks_exact(block_bytes)
        .map(|block| {
            let ones: u32 = block.iter().map(|b| b.count_ones()).sum();
            let pi = ones as f64 / BLOCK_BITS as f64;
            (pi - 0.5).powi(2)
        })
        .sum::<f64>()
        * 4.0
        * BLOCK_BITS as f64;
    let p = chi2_sf(chi2, blocks as f64);
    TestResult::from_p(name, p, chi2, format!("N={blocks}, M={BLOCK_BITS}"))
}

/// Every byte value should appear about equally often.
pub fn byte_frequency(data: &[u8]) -> TestResult {
    let name = "Byte Frequency";
    let n = data.len();
    // Five expected observations per bin at the very least.
    if n < 256 * 5 {
        return insufficient(name, 256 * 5, n);
    }
    let mut hist = [0u64; 256];
    for &b in data {
        hist[b as usize] += 1;
    }
    let expected = n as f64 / 256.0;
    let chi2: f64 = hist
        .iter()
        .map(|&c| (c as f64 - expected).powi(2) / expected)
        .sum();
    let p = chi2_sf(chi2, 255.0);
    TestResult::from_p(name, p, chi2, format!("n={n}, df=255"))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runs and drift
// ═══════════════════════════════════════════════════════════════════════════════

/// Number of uninterrupted runs of identical bits.
pub fn runs_test(data: &[u8]) -> TestResult {
    let name = "Runs";
    let bits = to_bits(data);
    let n = bits.len();
    if n < 100 {
        return insufficient(name, 100, n);
    }
    let nf = n as f64;
    let pi = bits.iter().filter(|&&b| b == 1).count() as f64 / nf;
    // Frequency prerequisite: the runs statistic is meaningless on biased input.
    if (pi - 0.5).abs() >= 2.0 / nf.sqrt() {
        return TestResult {
            name: name.to_string(),
            passed: false,
            p_value: Some(0.0),
            statistic: pi,
            details: format!("frequency prerequisite failed, pi={pi:.4}"),
            grade: 'F',
        };
    }
    let runs = 1 + bits.windows(2).filter(|w| w[0] != w[1]).count();
    let v = runs as f64;
    let num = (v - 2.0 * nf * pi * (1.0 - pi)).abs();
    let den = 2.0 * (2.0 * nf).sqrt() * pi * (1.0 - pi);
    let p = erfc(num / den);
    TestResult::from_p(name, p, v, format!("runs={runs}, pi={pi:.4}"))
}

/// Maximum excursion of the ±1 random walk (forward mode).
pub fn cusum_test(data: &[u8]) -> TestResult {
    let name = "Cumulative Sums";
    let bits = to_bits(data);
    let n = bits.len();
    if n < 100 {
        return insufficient(name, 100, n);
    }
    let mut s: i64 = 0;
    let mut z: u64 = 0;
    for &bit in &bits {
        s += if bit == 1 { 1 } else { -1 };
        z = z.max(s.unsigned_abs());
    }
    if z == 0 {
        return TestResult::from_p(name, 1.0, 0.0, format!("max|S|=0, n={n}"));
    }

    let nf = n as f64;
    let zf = z as f64;
    let sqrt_n = nf.sqrt();
    let norm = Normal::standard();
    let phi = |x: f64| norm.cdf(x * zf / sqrt_n);

    let mut first = 0.0;
    let k_lo = ((-nf / zf + 1.0) / 4.0).floor() as i64;
    let k_hi = ((nf / zf - 1.0) / 4.0).floor() as i64;
    for k in k_lo..=k_hi {
        let k = k as f64;
        first += phi(4.0 * k + 1.0) - phi(4.0 * k - 1.0);
    }
    let mut second = 0.0;
    let k_lo = ((-nf / zf - 3.0) / 4.0).floor() as i64;
    for k in k_lo..=k_hi {
        let k = k as f64;
        second += phi(4.0 * k + 3.0) - phi(4.0 * k + 1.0);
    }
    let p = 1.0 - first + second;
    TestResult::from_p(name, p, zf, format!("max|S|={z}, n={n}"))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Correlation and entropy
// ═══════════════════════════════════════════════════════════════════════════════

/// Lag-1 correlation between consecutive bytes.
pub fn serial_correlation(data: &[u8]) -> TestResult {
    let name = "Serial Correlation";
    let n = data.len();
    if n < 100 {
        return insufficient(name, 100, n);
    }
    let mean = data.iter().map(|&b| b as f64).sum::<f64>() / n as f64;
    let var: f64 = data.iter().map(|&b| (b as f64 - mean).powi(2)).sum();
    if var == 0.0 {
        return TestResult {
            name: name.to_string(),
            passed: false,
            p_value: None,
            statistic: 1.0,
            details: "constant input".to_string(),
            grade: 'F',
        };
    }
    let cov: f64 = data
        .windows(2)
        .map(|w| (w[0] as f64 - mean) * (w[1] as f64 - mean))
        .sum();
    let r = cov / var;
    let z = r * (n as f64).sqrt();
    let p = erfc(z.abs() / std::f64::consts::SQRT_2);
    TestResult::from_p(name, p, r, format!("r={r:.6}, n={n}"))
}

/// Bits of Shannon entropy per byte (max 8.0).
pub fn shannon_entropy(data: &[u8]) -> TestResult {
    let name = "Shannon Entropy";
    let n = data.len();
    if n < 256 * 10 {
        return insufficient(name, 256 * 10, n);
    }
    let mut hist = [0u64; 256];
    for &b in data {
        hist[b as usize] += 1;
    }
    let h: f64 = hist
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n as f64;
            -p * p.log2()
        })
        .sum();
    let grade = match h {
        h if h >= 7.95 => 'A',
        h if h >= 7.9 => 'B',
        h if h >= 7.5 => 'C',
        h if h >= 7.0 => 'D',
        _ => 'F',
    };
    TestResult {
        name: name.to_string(),
        passed: h >= 7.9,
        p_value: None,
        statistic: h,
        details: format!("{h:.4} / 8.0 bits"),
        grade,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Battery
// ═══════════════════════════════════════════════════════════════════════════════

/// Every test in the battery, in report order.
pub const TESTS: &[(&str, fn(&[u8]) -> TestResult)] = &[
    ("monobit", monobit_frequency),
    ("block_frequency", block_frequency),
    ("byte_frequency", byte_frequency),
    ("runs", runs_test),
    ("cusum", cusum_test),
    ("serial_correlation", serial_correlation),
    ("shannon", shannon_entropy),
];

/// Run the full battery on a byte slice.
pub fn run_all_tests(data: &[u8]) -> Vec<TestResult> {
    TESTS.iter().map(|(_, test)| test(data)).collect()
}

/// Overall score (0-100): A=100, B=75, C=50, D=25, F=0, averaged.
pub fn calculate_quality_score(results: &[TestResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let total: f64 = results
        .iter()
        .map(|r| match r.grade {
            'A' => 100.0,
            'B' => 75.0,
            'C' => 50.0,
            'D' => 25.0,
            _ => 0.0,
        })
        .sum();
    total / results.len() as f64
}
