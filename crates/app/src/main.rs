//! chip-codec: dictionary building and codec verification driver.
//!
//! Pipeline: generate synthetic chips -> accumulate a dictionary -> save and
//! reload it -> encode every chip with all four formats -> decode and verify
//! the round trip -> report per-format compression statistics.

mod config;
mod input_gen;
mod stats;

use std::process::ExitCode;

use chip_codec_core::dictionary::DictionaryBuilder;
use chip_codec_core::{
    Chip, ChipDataEncoder, EncoderFormat, MultiRegionLayout, Ordering, RegionLayout, Result,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use config::Config;
use input_gen::generate_chip;
use stats::RunStats;

const ALL_FORMATS: [EncoderFormat; 4] = [
    EncoderFormat::SinglePixel,
    EncoderFormat::Region,
    EncoderFormat::RegionWithCompressedAdc,
    EncoderFormat::Delta,
];

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("chip-codec: {message}");
            eprintln!("Try 'chip-codec --help' for usage.");
            return ExitCode::from(2);
        }
    };

    if config.print_config {
        config.print();
    }

    match run(&config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("chip-codec: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Run the full pipeline; returns whether every round trip verified.
fn run(config: &Config) -> Result<bool> {
    let chip_layout = MultiRegionLayout::with_region_counts(
        config.chip_rows,
        config.chip_columns,
        config.n_region_rows,
        config.n_region_columns,
    )?;
    let readout_unit_layout =
        RegionLayout::new(config.readout_unit_rows, config.readout_unit_columns)?;

    // Stage 1: generate the chip sample.
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let chips: Vec<Chip> = (0..config.n_chips)
        .map(|_| generate_chip(&mut rng, &chip_layout, config.occupancy, config.max_adc))
        .collect();
    println!(
        "Generated {} chips of {}x{} pixels (seed {}).",
        chips.len(),
        config.chip_rows,
        config.chip_columns,
        config.seed
    );

    // Stage 2: build and save the dictionary.
    let builder = DictionaryBuilder::new(
        chip_layout.clone(),
        Ordering::ByRegionByColumn,
        readout_unit_layout,
        config.max_adc,
        config.max_alphabet_size,
    );
    for chip in &chips {
        builder.add_chip(chip)?;
    }
    builder.save(&config.dictionary_file)?;
    println!("Dictionary saved to {}.", config.dictionary_file.display());

    // Stage 3: construct one encoder per format from the saved dictionary.
    let encoders: Vec<(EncoderFormat, ChipDataEncoder)> = ALL_FORMATS
        .into_iter()
        .map(|format| {
            ChipDataEncoder::new(
                format,
                chip_layout.clone(),
                readout_unit_layout,
                config.max_adc,
                Ordering::ByRegionByColumn,
                Some(&config.dictionary_file),
            )
            .map(|encoder| (format, encoder))
        })
        .collect::<Result<_>>()?;

    // Stage 4: encode, decode and verify every chip with every format.
    let format_names: Vec<&'static str> = ALL_FORMATS.iter().map(|f| f.name()).collect();
    let mut run_stats = RunStats::new(&format_names);
    let bits_per_record =
        chip_layout.bits_per_id() + RegionLayout::bits_per_value(config.max_adc);
    for chip in &chips {
        run_stats.record_chip(chip.pixels().len(), bits_per_record);
        for (n, (format, encoder)) in encoders.iter().enumerate() {
            let package = encoder.encode(chip)?;
            let decoded = encoder.decode(&package)?;
            let matched = decoded.has_same_pixels(chip);
            if !matched {
                eprintln!("Round-trip mismatch for format {}.", format.name());
            }
            run_stats.formats[n].record(package.size(), matched);
        }
    }

    if config.print_summary {
        run_stats.print_summary();
    }
    run_stats.print_result();
    Ok(run_stats.all_verified())
}
