//! The dictionary builder: letter-frequency accumulation across many chips
//! and serialization of the resulting alphabet statistics.
//!
//! The builder drives three producers:
//! - `all_adc`: every cell of every active readout unit, zeros included
//! - `active_adc`: the ADC of every stored pixel
//! - `delta_row_column`: the combined delta between consecutive ordered
//!   pixels of each macro-region
//!
//! `save` writes the three alphabets as consecutive text blocks; the
//! `delta_row_column` alphabet is reduced to the configured maximum size
//! with the special escape letter before serialization.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::chip::Chip;
use crate::error::Result;
use crate::huffman::{Letter, SPECIAL_LETTER};
use crate::layout::{MultiRegionLayout, RegionLayout};
use crate::pixel::{Ordering, Pixel};
use crate::statistics::AlphabetStatisticsProducer;

/// Accumulates alphabet statistics over a stream of chips.
///
/// Thread-safe: `add_chip` and `save` are serialized by an internal lock
/// (held for the whole method, including the file write in `save`).
#[derive(Debug)]
pub struct DictionaryBuilder {
    chip_layout: MultiRegionLayout,
    ordering: Ordering,
    readout_unit_layout: RegionLayout,
    max_alphabet_size: usize,
    all_adc: AlphabetStatisticsProducer,
    active_adc: AlphabetStatisticsProducer,
    delta_row_column: AlphabetStatisticsProducer,
    lock: Mutex<()>,
}

impl DictionaryBuilder {
    /// Create a builder with the three alphabets pre-seeded:
    /// `all_adc` with `0..max_adc`, `active_adc` with `1..max_adc` and
    /// `delta_row_column` with every pixel id of one macro-region.
    pub fn new(
        chip_layout: MultiRegionLayout,
        ordering: Ordering,
        readout_unit_layout: RegionLayout,
        max_adc: usize,
        max_alphabet_size: usize,
    ) -> Self {
        let n_region_pixels = chip_layout.region_layout().n_pixels();
        Self {
            chip_layout,
            ordering,
            readout_unit_layout,
            max_alphabet_size,
            all_adc: AlphabetStatisticsProducer::with_alphabet("all_adc", 0..max_adc as Letter),
            active_adc: AlphabetStatisticsProducer::with_alphabet(
                "active_adc",
                1..max_adc as Letter,
            ),
            delta_row_column: AlphabetStatisticsProducer::with_alphabet(
                "delta_row_column",
                0..n_region_pixels as Letter,
            ),
            lock: Mutex::new(()),
        }
    }

    /// Record the letter frequencies of one chip.
    pub fn add_chip(&self, chip: &Chip) -> Result<()> {
        let _guard = self.lock_builder();

        let split_chip;
        let chip = if chip.multi_layout() == &self.chip_layout {
            chip
        } else {
            split_chip = Chip::from_region(
                chip.as_region(),
                self.chip_layout.n_region_rows(),
                self.chip_layout.n_region_columns(),
            )?;
            &split_chip
        };

        for macro_region_id in 0..self.chip_layout.n_regions() {
            if !chip.is_region_active(macro_region_id)? {
                continue;
            }
            let pixel_area = Chip::from_region_split(
                chip.region(macro_region_id)?,
                &self.readout_unit_layout,
            )?;
            let ordered_pixels = pixel_area.ordered_pixels(self.ordering)?;
            self.process_ordered_pixels(&ordered_pixels)?;
            self.process_region_blocks(&pixel_area)?;
        }
        Ok(())
    }

    /// Feed `active_adc` and `delta_row_column` from the ordered pixels of
    /// one macro-region.
    fn process_ordered_pixels(&self, ordered_pixels: &[(Pixel, crate::pixel::Adc)]) -> Result<()> {
        let layout = self.chip_layout.region_layout();
        let n_rows = layout.n_rows as i32;
        let n_columns = layout.n_columns as i32;
        let mut previous_pixel = Pixel::default();
        for &(pixel, adc) in ordered_pixels {
            let delta_row = (pixel.row as i32 + n_rows - previous_pixel.row as i32) % n_rows;
            let delta_column =
                (pixel.column as i32 + n_columns - previous_pixel.column as i32) % n_columns;
            let delta_pixel = Pixel::new(delta_row as i16, delta_column as i16);
            let delta_row_column = layout.pixel_id(&delta_pixel)?;
            self.active_adc.add_count(adc as Letter);
            self.delta_row_column.add_count(delta_row_column as Letter);
            previous_pixel = pixel;
        }
        Ok(())
    }

    /// Feed `all_adc` from every cell of every active readout unit.
    fn process_region_blocks(&self, pixel_area: &Chip) -> Result<()> {
        for region_id in 0..pixel_area.multi_layout().n_regions() {
            if !pixel_area.is_region_active(region_id)? {
                continue;
            }
            let region = pixel_area.region(region_id)?;
            for row in 0..region.n_rows() {
                for column in 0..region.n_columns() {
                    self.all_adc.add_count(region.get_adc_at(row, column) as Letter);
                }
            }
        }
        Ok(())
    }

    /// Produce the three alphabets and write them to the dictionary file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let _guard = self.lock_builder();

        let mut out = BufWriter::new(File::create(path)?);
        self.save_statistics(&self.all_adc, &mut out, false)?;
        self.save_statistics(&self.active_adc, &mut out, false)?;
        self.save_statistics(&self.delta_row_column, &mut out, true)?;
        out.flush()?;
        Ok(())
    }

    fn save_statistics<W: Write>(
        &self,
        producer: &AlphabetStatisticsProducer,
        out: &mut W,
        reduce: bool,
    ) -> Result<()> {
        let statistics = if reduce && producer.n_letters() > self.max_alphabet_size {
            producer
                .reduce(self.max_alphabet_size, producer.name(), SPECIAL_LETTER)?
                .produce()?
        } else {
            producer.produce()?
        };
        statistics.write(out)?;
        writeln!(out)?;
        Ok(())
    }

    fn lock_builder(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::AlphabetStatisticsCollection;

    fn builder_4x4() -> DictionaryBuilder {
        DictionaryBuilder::new(
            MultiRegionLayout::single(4, 4).unwrap(),
            Ordering::ByRegionByColumn,
            RegionLayout::new(2, 2).unwrap(),
            16,
            32,
        )
    }

    fn sample_chip() -> Chip {
        let mut chip = Chip::new(MultiRegionLayout::single(4, 4).unwrap());
        chip.add_pixel(Pixel::new(0, 0), 3).unwrap();
        chip.add_pixel(Pixel::new(0, 1), 7).unwrap();
        chip.add_pixel(Pixel::new(2, 2), 7).unwrap();
        chip
    }

    #[test]
    fn test_add_chip_counts() {
        let builder = builder_4x4();
        builder.add_chip(&sample_chip()).unwrap();

        // Three active pixels feed the active-ADC alphabet.
        assert_eq!(builder.active_adc.n_counts(), 3);
        let frequencies = builder.active_adc.frequencies();
        assert_eq!(frequencies[&3], 1);
        assert_eq!(frequencies[&7], 2);

        // Two active readout units of 2x2 cells each feed all_adc.
        assert_eq!(builder.all_adc.n_counts(), 8);
        assert_eq!(builder.all_adc.frequencies()[&0], 5);

        assert_eq!(builder.delta_row_column.n_counts(), 3);
    }

    #[test]
    fn test_add_chip_resplits() {
        let builder = DictionaryBuilder::new(
            MultiRegionLayout::with_region_counts(4, 4, 2, 2).unwrap(),
            Ordering::ByRegionByColumn,
            RegionLayout::new(2, 2).unwrap(),
            16,
            32,
        );
        // Single-region chip, re-split into the 2x2 macro grid on the fly.
        builder.add_chip(&sample_chip()).unwrap();
        assert_eq!(builder.active_adc.n_counts(), 3);
    }

    #[test]
    fn test_save_and_reload() {
        let builder = builder_4x4();
        builder.add_chip(&sample_chip()).unwrap();

        let path = std::env::temp_dir().join(format!(
            "chip-codec-dictionary-{}.txt",
            std::process::id()
        ));
        builder.save(&path).unwrap();

        let collection = AlphabetStatisticsCollection::load(&path).unwrap();
        assert!(collection.contains("all_adc"));
        assert!(collection.contains("active_adc"));
        assert!(collection.contains("delta_row_column"));

        let all_adc = collection.get("all_adc").unwrap();
        assert_eq!(all_adc.alphabet().len(), 16);
        assert_eq!(all_adc.original_counts(), 8);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_save_reduces_oversized_delta_alphabet() {
        let builder = DictionaryBuilder::new(
            MultiRegionLayout::single(4, 4).unwrap(),
            Ordering::ByRegionByColumn,
            RegionLayout::new(2, 2).unwrap(),
            16,
            4,
        );
        builder.add_chip(&sample_chip()).unwrap();

        let path = std::env::temp_dir().join(format!(
            "chip-codec-reduced-dictionary-{}.txt",
            std::process::id()
        ));
        builder.save(&path).unwrap();

        let collection = AlphabetStatisticsCollection::load(&path).unwrap();
        let delta = collection.get("delta_row_column").unwrap();
        assert_eq!(delta.alphabet().len(), 4);
        assert!(delta.contains(SPECIAL_LETTER));

        std::fs::remove_file(&path).ok();
    }
}
