//! Synthetic chip generation for dictionary building and verification.
//!
//! Generated chips mimic the hit patterns the codecs are tuned for: most
//! hits arrive in small clusters (charge sharing between neighboring
//! pixels), with a fraction of isolated single-pixel hits spread uniformly.
//! This makes the delta alphabets peak at small values, so compression
//! behavior is visible in the summary.

use chip_codec_core::{Adc, Chip, MultiRegionLayout, Pixel};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Fraction of hits placed as cluster seeds rather than isolated pixels.
const CLUSTER_FRACTION: f64 = 0.6;

/// Generate one chip with approximately `occupancy * n_pixels` hits.
///
/// # Arguments
/// - `rng`: seeded generator; one generator drives a whole reproducible run
/// - `layout`: chip layout to populate
/// - `occupancy`: target hit fraction (0.0 - 1.0)
/// - `max_adc`: exclusive ADC upper bound; stored ADCs are in `1..max_adc`
pub fn generate_chip(
    rng: &mut ChaCha8Rng,
    layout: &MultiRegionLayout,
    occupancy: f64,
    max_adc: usize,
) -> Chip {
    let mut chip = Chip::new(layout.clone());
    let n_target = ((layout.n_pixels() as f64) * occupancy).round() as usize;

    let mut placed = 0;
    // Bounded attempts: collisions with existing hits are simply skipped.
    let mut attempts = 0;
    let max_attempts = n_target * 8 + 16;
    while placed < n_target && attempts < max_attempts {
        attempts += 1;
        let seed_pixel = Pixel::new(
            rng.gen_range(0..layout.n_rows()) as i16,
            rng.gen_range(0..layout.n_columns()) as i16,
        );
        if try_add(&mut chip, layout, seed_pixel, random_adc(rng, max_adc)) {
            placed += 1;
        } else {
            continue;
        }

        if rng.gen_bool(CLUSTER_FRACTION) {
            // Grow a small cluster around the seed.
            let cluster_size = rng.gen_range(1..=3);
            for _ in 0..cluster_size {
                if placed >= n_target {
                    break;
                }
                let neighbor = Pixel::new(
                    seed_pixel.row + rng.gen_range(-1..=1),
                    seed_pixel.column + rng.gen_range(-1..=1),
                );
                if try_add(&mut chip, layout, neighbor, random_adc(rng, max_adc)) {
                    placed += 1;
                }
            }
        }
    }

    chip
}

/// ADC spectrum falling off toward large values.
fn random_adc(rng: &mut ChaCha8Rng, max_adc: usize) -> Adc {
    let r: f64 = rng.gen();
    let value = 1.0 + r * r * (max_adc as f64 - 1.0);
    (value as usize).clamp(1, max_adc - 1) as Adc
}

/// Add the pixel unless it is outside the chip or already present.
fn try_add(chip: &mut Chip, layout: &MultiRegionLayout, pixel: Pixel, adc: Adc) -> bool {
    if !layout.contains(&pixel) || chip.get_adc(&pixel) != 0 {
        return false;
    }
    chip.add_pixel(pixel, adc).is_ok()
}
