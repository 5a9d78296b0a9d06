//! The Region codec: fixed-size readout units addressed by id.
//!
//! Each active macro-region of the chip is partitioned into readout units of
//! a fixed layout. The stream is a sequence of records, one per non-empty
//! unit: the combined unit/macro-region address followed by the ADC of every
//! cell of the unit in row-major order, zeros included. The ADC field is
//! either raw (`bits_per_adc`) or Huffman-coded against the `all_adc`
//! alphabet, which covers zeros.
//!
//! Units are drained round-robin: each pass over the pending macro-regions
//! emits one unit per region and ends with a readout-cycle annotation.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::chip::{Chip, PixelRegion};
use crate::error::Result;
use crate::huffman;
use crate::layout::{MultiRegionLayout, RegionLayout};
use crate::maker::PackageMaker;
use crate::package::Package;
use crate::pixel::{Adc, Pixel};
use crate::statistics::AlphabetStatistics;

/// Package maker for the Region and Region+CompressedADC formats.
#[derive(Debug, Clone)]
pub struct BlockPackageMaker {
    /// `all_adc` statistics; `None` encodes ADC values raw
    adc_statistics: Option<Arc<AlphabetStatistics>>,
    readout_unit_layout: RegionLayout,
    bits_per_adc: usize,
}

impl BlockPackageMaker {
    pub fn new(
        adc_statistics: Option<Arc<AlphabetStatistics>>,
        readout_unit_layout: RegionLayout,
        bits_per_adc: usize,
    ) -> Self {
        Self {
            adc_statistics,
            readout_unit_layout,
            bits_per_adc,
        }
    }

    /// Combined address of a readout unit within the whole chip.
    fn full_region_id(macro_region_id: usize, region_id: usize, n_macro_regions: usize) -> usize {
        region_id * n_macro_regions + macro_region_id
    }

    /// Inverse of [`BlockPackageMaker::full_region_id`].
    fn split_full_region_id(full_region_id: usize, n_macro_regions: usize) -> (usize, usize) {
        let macro_region_id = full_region_id % n_macro_regions;
        (macro_region_id, (full_region_id - macro_region_id) / n_macro_regions)
    }

    /// Layout splitting one nominal macro-region into readout units.
    fn unit_split(&self, multi_layout: &MultiRegionLayout) -> Result<MultiRegionLayout> {
        let region_layout = multi_layout.region_layout();
        MultiRegionLayout::with_region_layout(
            region_layout.n_rows,
            region_layout.n_columns,
            self.readout_unit_layout,
        )
    }
}

impl PackageMaker for BlockPackageMaker {
    fn make(&self, chip: &Chip) -> Result<Package> {
        let multi_layout = chip.multi_layout();
        let n_macro_regions = multi_layout.n_regions();
        let n_regions = self.unit_split(multi_layout)?.n_regions();

        // Active readout units per active macro-region, in unit-id order.
        let mut pending: Vec<(usize, VecDeque<(usize, PixelRegion)>)> = Vec::new();
        for macro_region_id in 0..n_macro_regions {
            if !chip.is_region_active(macro_region_id)? {
                continue;
            }
            let pixel_area =
                Chip::from_region_split(chip.region(macro_region_id)?, &self.readout_unit_layout)?;
            let mut units = VecDeque::new();
            for region_id in 0..pixel_area.multi_layout().n_regions() {
                if pixel_area.is_region_active(region_id)? {
                    units.push_back((region_id, pixel_area.region(region_id)?.clone()));
                }
            }
            if !units.is_empty() {
                pending.push((macro_region_id, units));
            }
        }

        let n_bits_per_address = RegionLayout::bits_per_value(n_regions * n_macro_regions);

        let mut package = Package::new();
        while !pending.is_empty() {
            for (macro_region_id, units) in pending.iter_mut() {
                let (region_id, region) = match units.pop_front() {
                    Some(unit) => unit,
                    None => continue,
                };
                let full_region_id =
                    Self::full_region_id(*macro_region_id, region_id, n_macro_regions);
                package.write(full_region_id as u64, n_bits_per_address)?;

                for row in 0..self.readout_unit_layout.n_rows {
                    for column in 0..self.readout_unit_layout.n_columns {
                        let adc = region.get_adc_at(row, column);
                        match &self.adc_statistics {
                            Some(statistics) => {
                                huffman::encode_letter(statistics, adc as i32, &mut package)?
                            }
                            None => package.write(adc as u64, self.bits_per_adc)?,
                        }
                    }
                }
            }
            pending.retain(|(_, units)| !units.is_empty());
            package.next_readout_cycle();
        }

        Ok(package)
    }

    fn read(&self, package: &Package, multi_layout: &MultiRegionLayout) -> Result<Chip> {
        let n_macro_regions = multi_layout.n_regions();
        let unit_split = self.unit_split(multi_layout)?;
        let n_regions = unit_split.n_regions();
        let n_bits_per_address = RegionLayout::bits_per_value(n_regions * n_macro_regions);

        let mut chip = Chip::new(multi_layout.clone());
        let mut reader = package.reader();
        while !reader.at_end() {
            let full_region_id = reader.read(n_bits_per_address)? as usize;
            let (macro_region_id, region_id) =
                Self::split_full_region_id(full_region_id, n_macro_regions);

            for row in 0..self.readout_unit_layout.n_rows {
                for column in 0..self.readout_unit_layout.n_columns {
                    let adc = match &self.adc_statistics {
                        Some(statistics) => {
                            huffman::decode_letter(statistics, &mut reader)? as Adc
                        }
                        None => reader.read(self.bits_per_adc)? as Adc,
                    };
                    if adc == 0 {
                        continue;
                    }
                    let readout_pixel = Pixel::new(row as i16, column as i16);
                    let macro_region_pixel = unit_split.from_region(region_id, &readout_pixel)?;
                    let chip_pixel =
                        multi_layout.from_region(macro_region_id, &macro_region_pixel)?;
                    chip.add_pixel(chip_pixel, adc)?;
                }
            }
        }
        Ok(chip)
    }
}
