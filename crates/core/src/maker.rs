//! The package-maker interface and the SinglePixel codec.
//!
//! A package maker turns a chip snapshot into a bit-packed package and
//! reconstructs an identical snapshot from it. Every maker is an exact
//! inverse of itself: `read(make(chip), layout) == chip`.

use crate::chip::Chip;
use crate::error::Result;
use crate::layout::MultiRegionLayout;
use crate::package::Package;
use crate::pixel::Adc;

/// Common interface of the four codecs.
pub trait PackageMaker {
    /// Encode a chip snapshot into a package.
    fn make(&self, chip: &Chip) -> Result<Package>;

    /// Decode a package back into a chip with the given layout.
    fn read(&self, package: &Package, layout: &MultiRegionLayout) -> Result<Chip>;
}

/// The SinglePixel format: a plain list of (pixel id, ADC) pairs.
///
/// Pixels are emitted in the chip's global map order, each as the pixel id
/// on `bits_per_id` bits followed by the ADC on `bits_per_adc` bits. A
/// readout cycle is recorded after every `n_macro_regions` pixels and after
/// the final pixel.
#[derive(Debug, Clone)]
pub struct SinglePixelMaker {
    bits_per_adc: usize,
}

impl SinglePixelMaker {
    pub fn new(bits_per_adc: usize) -> Self {
        Self { bits_per_adc }
    }
}

impl PackageMaker for SinglePixelMaker {
    fn make(&self, chip: &Chip) -> Result<Package> {
        let layout = chip.multi_layout();
        let bits_per_pixel_id = layout.bits_per_id();
        let n_regions = layout.n_regions();

        let mut package = Package::new();
        let n_pixels = chip.pixels().len();
        for (n, (pixel, adc)) in chip.pixels().iter().enumerate() {
            let pixel_id = layout.pixel_id(pixel)?;
            package.write(pixel_id as u64, bits_per_pixel_id)?;
            package.write(*adc as u64, self.bits_per_adc)?;
            if (n + 1) % n_regions == 0 || n + 1 == n_pixels {
                package.next_readout_cycle();
            }
        }
        Ok(package)
    }

    fn read(&self, package: &Package, layout: &MultiRegionLayout) -> Result<Chip> {
        let bits_per_pixel_id = layout.bits_per_id();

        let mut chip = Chip::new(layout.clone());
        let mut reader = package.reader();
        while !reader.at_end() {
            let pixel_id = reader.read(bits_per_pixel_id)? as usize;
            let adc = reader.read(self.bits_per_adc)? as Adc;
            let pixel = layout.pixel(pixel_id)?;
            chip.add_pixel(pixel, adc)?;
        }
        Ok(chip)
    }
}
