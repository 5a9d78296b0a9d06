//! Per-format compression statistics for the verification run.
//!
//! Collected with explicit updates at each pipeline stage and printed as a
//! summary once the run completes. A "raw" baseline of one (pixel id, ADC)
//! record per hit puts the per-format bit counts into perspective.

/// Bit-size statistics of one encoder format.
#[derive(Debug, Clone)]
pub struct FormatStats {
    /// Format display name
    pub name: &'static str,

    /// Chips encoded
    pub chips: u64,

    /// Chips whose decode did not match the input
    pub mismatches: u64,

    /// Total encoded size in bits
    pub total_bits: u64,

    /// Smallest package seen, in bits
    pub min_bits: u64,

    /// Largest package seen, in bits
    pub max_bits: u64,
}

impl FormatStats {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            chips: 0,
            mismatches: 0,
            total_bits: 0,
            min_bits: u64::MAX,
            max_bits: 0,
        }
    }

    /// Record one encoded chip.
    pub fn record(&mut self, package_bits: usize, matched: bool) {
        let bits = package_bits as u64;
        self.chips += 1;
        self.total_bits += bits;
        self.min_bits = self.min_bits.min(bits);
        self.max_bits = self.max_bits.max(bits);
        if !matched {
            self.mismatches += 1;
        }
    }

    /// Mean package size in bits.
    pub fn mean_bits(&self) -> f64 {
        if self.chips == 0 {
            0.0
        } else {
            self.total_bits as f64 / self.chips as f64
        }
    }
}

/// Statistics of a whole verification run.
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Per-format accumulators
    pub formats: Vec<FormatStats>,

    /// Total pixels across all generated chips
    pub total_pixels: u64,

    /// Baseline bits: one (pixel id, ADC) record per pixel
    pub baseline_bits: u64,
}

impl RunStats {
    pub fn new(format_names: &[&'static str]) -> Self {
        Self {
            formats: format_names.iter().map(|name| FormatStats::new(name)).collect(),
            total_pixels: 0,
            baseline_bits: 0,
        }
    }

    /// Record one generated chip against the raw baseline.
    pub fn record_chip(&mut self, n_pixels: usize, bits_per_record: usize) {
        self.total_pixels += n_pixels as u64;
        self.baseline_bits += (n_pixels * bits_per_record) as u64;
    }

    /// Whether every decode matched its input.
    pub fn all_verified(&self) -> bool {
        self.formats.iter().all(|f| f.mismatches == 0)
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Compression Summary ===");
        println!("Pixels: {}", self.total_pixels);
        println!(
            "Raw baseline: {} bits ({:.1} bits/pixel)",
            self.baseline_bits,
            if self.total_pixels == 0 {
                0.0
            } else {
                self.baseline_bits as f64 / self.total_pixels as f64
            }
        );
        println!();
        println!(
            "{:<24}{:>8}{:>12}{:>10}{:>10}{:>10}",
            "Format", "chips", "mean bits", "min", "max", "ratio"
        );
        for format in &self.formats {
            let ratio = if self.baseline_bits == 0 {
                0.0
            } else {
                format.total_bits as f64 / self.baseline_bits as f64
            };
            println!(
                "{:<24}{:>8}{:>12.1}{:>10}{:>10}{:>9.1}%",
                format.name,
                format.chips,
                format.mean_bits(),
                if format.min_bits == u64::MAX { 0 } else { format.min_bits },
                format.max_bits,
                ratio * 100.0
            );
        }
        println!();
    }

    /// Print just the final result (pass/fail).
    pub fn print_result(&self) {
        if self.all_verified() {
            println!("All formats verified: every decoded chip matched its input.");
        } else {
            for format in &self.formats {
                if format.mismatches > 0 {
                    println!(
                        "Verification FAILED for {}: {} of {} chips mismatched",
                        format.name, format.mismatches, format.chips
                    );
                }
            }
        }
    }
}
