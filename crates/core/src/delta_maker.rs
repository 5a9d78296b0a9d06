//! The Delta codec: Huffman-coded pixel-to-pixel deltas.
//!
//! Active pixels of each macro-region are visited in a configurable order;
//! for every pixel the codec emits the modular delta to the previous pixel
//! (starting from (0, 0)) and then the ADC, all Huffman-coded. In
//! `Separate` mode the row and column deltas use two alphabets; in
//! `Combined` mode a single alphabet covers the flattened delta
//! `delta_row * n_columns + delta_column`.
//!
//! Reduced delta alphabets reserve the special letter -1 as an escape: the
//! code of the special letter is followed by the raw absolute value (pixel
//! row, column or id) on a fixed number of bits.
//!
//! Macro-regions are interleaved one pixel per tick, with a readout-cycle
//! annotation every second tick. When the chip has more than one
//! macro-region, a trailer of per-region pixel counts (10 bits each)
//! terminates the stream; decoders consume the trailer first to learn how
//! many pixels each region owes.

use std::sync::Arc;

use crate::chip::Chip;
use crate::error::Result;
use crate::huffman::{self, Letter, SPECIAL_LETTER};
use crate::layout::{MultiRegionLayout, RegionLayout};
use crate::maker::PackageMaker;
use crate::package::{Package, PackageReader};
use crate::pixel::{Adc, Coordinate, Ordering, Pixel};
use crate::statistics::{AlphabetStatistics, AlphabetStatisticsCollection, AlphabetType};

/// Width of one per-macro-region pixel count in the trailer.
pub const BITS_PER_N_PIXELS: usize = 10;

/// Delta alphabet selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaMode {
    /// Separate `delta_row` and `delta_column` alphabets
    Separate,
    /// One combined `delta_row_column` alphabet
    Combined,
}

/// Cursor over the ordered pixels one macro-region contributes.
struct RegionCursor {
    pixels: Vec<(Pixel, Adc)>,
    index: usize,
}

impl RegionCursor {
    fn new(pixels: Vec<(Pixel, Adc)>) -> Self {
        Self { pixels, index: 0 }
    }

    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn has_current(&self) -> bool {
        self.index < self.pixels.len()
    }

    fn current(&self) -> Option<&(Pixel, Adc)> {
        self.pixels.get(self.index)
    }

    /// The pixel before the cursor, or (0, 0) at the start.
    fn previous_pixel(&self) -> Pixel {
        if self.index == 0 {
            Pixel::default()
        } else {
            self.pixels[self.index - 1].0
        }
    }

    fn advance(&mut self) {
        self.index += 1;
    }
}

/// Package maker for the Delta format.
#[derive(Debug, Clone)]
pub struct DeltaPackageMaker {
    readout_unit_layout: RegionLayout,
    mode: DeltaMode,
    ordering: Ordering,
    bits_per_adc: usize,
    adc_statistics: Arc<AlphabetStatistics>,
    delta_row_statistics: Option<Arc<AlphabetStatistics>>,
    delta_column_statistics: Option<Arc<AlphabetStatistics>>,
    delta_row_column_statistics: Option<Arc<AlphabetStatistics>>,
}

impl DeltaPackageMaker {
    /// Build a delta maker, fetching the mode's alphabets from the
    /// dictionary collection.
    pub fn new(
        source: &AlphabetStatisticsCollection,
        readout_unit_layout: RegionLayout,
        mode: DeltaMode,
        ordering: Ordering,
        bits_per_adc: usize,
    ) -> Result<Self> {
        let adc_statistics = source.get_by_type(AlphabetType::ActiveAdc)?;
        let mut maker = Self {
            readout_unit_layout,
            mode,
            ordering,
            bits_per_adc,
            adc_statistics,
            delta_row_statistics: None,
            delta_column_statistics: None,
            delta_row_column_statistics: None,
        };
        match mode {
            DeltaMode::Separate => {
                maker.delta_row_statistics = Some(source.get_by_type(AlphabetType::DeltaRow)?);
                maker.delta_column_statistics =
                    Some(source.get_by_type(AlphabetType::DeltaColumn)?);
            }
            DeltaMode::Combined => {
                maker.delta_row_column_statistics =
                    Some(source.get_by_type(AlphabetType::DeltaRowColumn)?);
            }
        }
        Ok(maker)
    }

    /// Emit a letter, escaping through the special letter plus the raw
    /// absolute value when the letter is outside the (reduced) alphabet.
    fn encode_letter_or_raw(
        statistics: &AlphabetStatistics,
        letter: Letter,
        raw_value: u64,
        bits_per_raw_value: usize,
        package: &mut Package,
    ) -> Result<()> {
        if statistics.contains(letter) {
            huffman::encode_letter(statistics, letter, package)
        } else {
            huffman::encode_letter(statistics, SPECIAL_LETTER, package)?;
            package.write(raw_value, bits_per_raw_value)
        }
    }

    /// Decode a letter; a special letter is resolved into the raw absolute
    /// value that follows it. Returns `(letter, raw_value)` where exactly
    /// one of the two is meaningful.
    fn decode_letter_or_raw(
        statistics: &AlphabetStatistics,
        reader: &mut PackageReader<'_>,
        bits_per_raw_value: usize,
    ) -> Result<(Letter, u64)> {
        let letter = huffman::decode_letter(statistics, reader)?;
        if letter == SPECIAL_LETTER {
            let raw_value = reader.read(bits_per_raw_value)?;
            Ok((letter, raw_value))
        } else {
            Ok((letter, 0))
        }
    }

    /// Emit the delta of one pixel relative to the previous one, both in
    /// macro-region-local coordinates.
    fn encode_pixel(
        &self,
        package: &mut Package,
        layout: &RegionLayout,
        pixel: &Pixel,
        previous_pixel: &Pixel,
    ) -> Result<()> {
        let n_rows = layout.n_rows as i32;
        let n_columns = layout.n_columns as i32;
        let delta_row = (pixel.row as i32 + n_rows - previous_pixel.row as i32) % n_rows;
        let delta_column =
            (pixel.column as i32 + n_columns - previous_pixel.column as i32) % n_columns;

        match self.mode {
            DeltaMode::Separate => {
                let row_statistics = self.delta_statistics(&self.delta_row_statistics)?;
                let column_statistics = self.delta_statistics(&self.delta_column_statistics)?;
                Self::encode_letter_or_raw(
                    row_statistics,
                    delta_row,
                    pixel.row as u64,
                    layout.bits_per_row(),
                    package,
                )?;
                Self::encode_letter_or_raw(
                    column_statistics,
                    delta_column,
                    pixel.column as u64,
                    layout.bits_per_column(),
                    package,
                )
            }
            DeltaMode::Combined => {
                let statistics = self.delta_statistics(&self.delta_row_column_statistics)?;
                let delta_pixel =
                    Pixel::new(delta_row as Coordinate, delta_column as Coordinate);
                let delta_row_column = layout.pixel_id(&delta_pixel)? as Letter;
                let pixel_id = layout.pixel_id(pixel)?;
                Self::encode_letter_or_raw(
                    statistics,
                    delta_row_column,
                    pixel_id as u64,
                    layout.bits_per_id(),
                    package,
                )
            }
        }
    }

    /// Decode one pixel in macro-region-local coordinates.
    fn decode_pixel(
        &self,
        reader: &mut PackageReader<'_>,
        layout: &RegionLayout,
        previous_pixel: &Pixel,
    ) -> Result<Pixel> {
        let n_rows = layout.n_rows as i32;
        let n_columns = layout.n_columns as i32;

        match self.mode {
            DeltaMode::Separate => {
                let row_statistics = self.delta_statistics(&self.delta_row_statistics)?;
                let column_statistics = self.delta_statistics(&self.delta_column_statistics)?;
                let (delta_row, raw_row) =
                    Self::decode_letter_or_raw(row_statistics, reader, layout.bits_per_row())?;
                let (delta_column, raw_column) = Self::decode_letter_or_raw(
                    column_statistics,
                    reader,
                    layout.bits_per_column(),
                )?;
                let row = if delta_row == SPECIAL_LETTER {
                    raw_row as i32
                } else {
                    (previous_pixel.row as i32 + delta_row) % n_rows
                };
                let column = if delta_column == SPECIAL_LETTER {
                    raw_column as i32
                } else {
                    (previous_pixel.column as i32 + delta_column) % n_columns
                };
                Ok(Pixel::new(row as Coordinate, column as Coordinate))
            }
            DeltaMode::Combined => {
                let statistics = self.delta_statistics(&self.delta_row_column_statistics)?;
                let (delta_row_column, raw_pixel_id) =
                    Self::decode_letter_or_raw(statistics, reader, layout.bits_per_id())?;
                if delta_row_column == SPECIAL_LETTER {
                    return layout.pixel(raw_pixel_id as usize);
                }
                let delta = layout.pixel(delta_row_column as usize)?;
                let row = (previous_pixel.row as i32 + delta.row as i32) % n_rows;
                let column = (previous_pixel.column as i32 + delta.column as i32) % n_columns;
                Ok(Pixel::new(row as Coordinate, column as Coordinate))
            }
        }
    }

    /// Decode one ADC letter, escaping through the raw fallback.
    fn decode_adc(&self, reader: &mut PackageReader<'_>) -> Result<Adc> {
        let (letter, raw_value) =
            Self::decode_letter_or_raw(&self.adc_statistics, reader, self.bits_per_adc)?;
        if letter == SPECIAL_LETTER {
            Ok(raw_value as Adc)
        } else {
            Ok(letter as Adc)
        }
    }

    fn delta_statistics<'a>(
        &self,
        statistics: &'a Option<Arc<AlphabetStatistics>>,
    ) -> Result<&'a AlphabetStatistics> {
        statistics
            .as_deref()
            .ok_or_else(|| crate::error::StatisticsError::DictionaryRequired.into())
    }
}

impl PackageMaker for DeltaPackageMaker {
    fn make(&self, chip: &Chip) -> Result<Package> {
        let multi_layout = chip.multi_layout();
        let layout = *multi_layout.region_layout();
        let n_macro_regions = multi_layout.n_regions();

        let mut cursors = Vec::with_capacity(n_macro_regions);
        let mut max_len = 0;
        for macro_region_id in 0..n_macro_regions {
            let pixels = if chip.is_region_active(macro_region_id)? {
                let pixel_area = Chip::from_region_split(
                    chip.region(macro_region_id)?,
                    &self.readout_unit_layout,
                )?;
                pixel_area.ordered_pixels(self.ordering)?
            } else {
                Vec::new()
            };
            max_len = max_len.max(pixels.len());
            cursors.push(RegionCursor::new(pixels));
        }

        let mut package = Package::new();
        for n in 0..max_len {
            for cursor in cursors.iter_mut() {
                let (pixel, adc) = match cursor.current() {
                    Some(entry) => *entry,
                    None => continue,
                };
                let previous_pixel = cursor.previous_pixel();
                self.encode_pixel(&mut package, &layout, &pixel, &previous_pixel)?;
                Self::encode_letter_or_raw(
                    &self.adc_statistics,
                    adc as Letter,
                    adc as u64,
                    self.bits_per_adc,
                    &mut package,
                )?;
                cursor.advance();
            }
            if (n + 1) % 2 == 0 || n + 1 == max_len {
                package.next_readout_cycle();
            }
        }

        if n_macro_regions > 1 {
            for cursor in &cursors {
                package.write(cursor.len() as u64, BITS_PER_N_PIXELS)?;
            }
            package.next_readout_cycle();
        }

        Ok(package)
    }

    fn read(&self, package: &Package, multi_layout: &MultiRegionLayout) -> Result<Chip> {
        let layout = *multi_layout.region_layout();
        let n_macro_regions = multi_layout.n_regions();

        let mut previous_pixels = vec![Pixel::default(); n_macro_regions];
        let mut n_pixels = vec![0usize; n_macro_regions];
        let mut max_n_pixels = 0;
        if n_macro_regions > 1 {
            let mut trailer = package.reader_at_end();
            trailer.rewind(BITS_PER_N_PIXELS * n_macro_regions)?;
            for count in n_pixels.iter_mut() {
                *count = trailer.read(BITS_PER_N_PIXELS)? as usize;
                max_n_pixels = max_n_pixels.max(*count);
            }
        } else {
            max_n_pixels = usize::MAX;
            n_pixels[0] = usize::MAX;
        }

        let mut chip = Chip::new(multi_layout.clone());
        let mut reader = package.reader();
        let mut n = 0;
        while n < max_n_pixels && !reader.at_end() {
            for (macro_region_id, previous_pixel) in previous_pixels.iter_mut().enumerate() {
                if n_pixels[macro_region_id] <= n {
                    continue;
                }
                let region_pixel = self.decode_pixel(&mut reader, &layout, previous_pixel)?;
                let adc = self.decode_adc(&mut reader)?;
                let pixel = multi_layout.from_region(macro_region_id, &region_pixel)?;
                chip.add_pixel(pixel, adc)?;
                *previous_pixel = region_pixel;
            }
            n += 1;
        }

        Ok(chip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::AlphabetStatisticsProducer;

    /// Dictionary over a 4x4 macro-region with all deltas and ADCs known.
    fn full_collection() -> AlphabetStatisticsCollection {
        let mut text = Vec::new();
        let active_adc = AlphabetStatisticsProducer::with_alphabet("active_adc", 1..16);
        for letter in 1..16 {
            active_adc.add_count(letter);
        }
        active_adc.produce().unwrap().write(&mut text).unwrap();

        let delta = AlphabetStatisticsProducer::with_alphabet("delta_row_column", 0..16);
        for letter in 0..16 {
            delta.add_count(letter);
        }
        delta.produce().unwrap().write(&mut text).unwrap();

        AlphabetStatisticsCollection::parse(&String::from_utf8(text).unwrap()).unwrap()
    }

    fn combined_maker() -> DeltaPackageMaker {
        DeltaPackageMaker::new(
            &full_collection(),
            RegionLayout::new(2, 2).unwrap(),
            DeltaMode::Combined,
            Ordering::ByRegionByColumn,
            4,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_chip_single_region() {
        let maker = combined_maker();
        let chip = Chip::new(MultiRegionLayout::single(4, 4).unwrap());
        let package = maker.make(&chip).unwrap();
        assert_eq!(package.size(), 0);
        assert_eq!(maker.read(&package, chip.multi_layout()).unwrap(), chip);
    }

    #[test]
    fn test_empty_chip_multi_region_trailer() {
        let maker = combined_maker();
        let layout = MultiRegionLayout::with_region_counts(8, 8, 2, 2).unwrap();
        let chip = Chip::new(layout);
        let package = maker.make(&chip).unwrap();
        // Only the four zero counts of the trailer.
        assert_eq!(package.size(), 4 * BITS_PER_N_PIXELS);
        assert_eq!(maker.read(&package, chip.multi_layout()).unwrap(), chip);
    }

    #[test]
    fn test_round_trip_single_region() {
        let maker = combined_maker();
        let mut chip = Chip::new(MultiRegionLayout::single(4, 4).unwrap());
        chip.add_pixel(Pixel::new(0, 0), 3).unwrap();
        chip.add_pixel(Pixel::new(0, 1), 7).unwrap();
        chip.add_pixel(Pixel::new(3, 2), 15).unwrap();

        let package = maker.make(&chip).unwrap();
        assert_eq!(maker.read(&package, chip.multi_layout()).unwrap(), chip);
    }

    #[test]
    fn test_adjacent_pixels_use_delta_codes() {
        let maker = combined_maker();
        let collection = full_collection();
        let layout = MultiRegionLayout::single(4, 4).unwrap();
        let mut chip = Chip::new(layout.clone());
        chip.add_pixel(Pixel::new(0, 0), 3).unwrap();
        chip.add_pixel(Pixel::new(0, 1), 7).unwrap();

        // Reconstruct the stream by hand: delta 0 then ADC 3, delta 1 then
        // ADC 7, all straight Huffman codes without escapes.
        let delta = collection.get("delta_row_column").unwrap();
        let active_adc = collection.get("active_adc").unwrap();
        let mut expected = Package::new();
        huffman::encode_letter(&delta, 0, &mut expected).unwrap();
        huffman::encode_letter(&active_adc, 3, &mut expected).unwrap();
        huffman::encode_letter(&delta, 1, &mut expected).unwrap();
        huffman::encode_letter(&active_adc, 7, &mut expected).unwrap();

        let package = maker.make(&chip).unwrap();
        assert_eq!(package, expected);
        assert_eq!(maker.read(&package, chip.multi_layout()).unwrap(), chip);
    }

    #[test]
    fn test_round_trip_multi_macro_region() {
        let maker = combined_maker();
        let layout = MultiRegionLayout::with_region_counts(8, 8, 2, 2).unwrap();
        let mut chip = Chip::new(layout);
        chip.add_pixel(Pixel::new(0, 0), 1).unwrap();
        chip.add_pixel(Pixel::new(1, 2), 2).unwrap();
        chip.add_pixel(Pixel::new(0, 4), 3).unwrap();
        chip.add_pixel(Pixel::new(6, 1), 4).unwrap();
        chip.add_pixel(Pixel::new(7, 7), 5).unwrap();
        chip.add_pixel(Pixel::new(4, 4), 6).unwrap();

        let package = maker.make(&chip).unwrap();
        assert_eq!(maker.read(&package, chip.multi_layout()).unwrap(), chip);
    }

    #[test]
    fn test_separate_mode_round_trip() {
        let mut text = Vec::new();
        let active_adc = AlphabetStatisticsProducer::with_alphabet("active_adc", 1..16);
        for letter in 1..16 {
            active_adc.add_count(letter);
        }
        active_adc.produce().unwrap().write(&mut text).unwrap();
        let delta_row = AlphabetStatisticsProducer::with_alphabet("delta_row", 0..4);
        let delta_column = AlphabetStatisticsProducer::with_alphabet("delta_column", 0..4);
        for letter in 0..4 {
            delta_row.add_count(letter);
            delta_column.add_count(letter);
        }
        delta_row.produce().unwrap().write(&mut text).unwrap();
        delta_column.produce().unwrap().write(&mut text).unwrap();
        let collection =
            AlphabetStatisticsCollection::parse(&String::from_utf8(text).unwrap()).unwrap();

        let maker = DeltaPackageMaker::new(
            &collection,
            RegionLayout::new(2, 2).unwrap(),
            DeltaMode::Separate,
            Ordering::ByRegionByColumn,
            4,
        )
        .unwrap();

        let mut chip = Chip::new(MultiRegionLayout::single(4, 4).unwrap());
        chip.add_pixel(Pixel::new(1, 1), 9).unwrap();
        chip.add_pixel(Pixel::new(2, 3), 4).unwrap();

        let package = maker.make(&chip).unwrap();
        assert_eq!(maker.read(&package, chip.multi_layout()).unwrap(), chip);
    }

    #[test]
    fn test_special_letter_fallback() {
        // Reduced delta alphabet: only deltas {0, 1} and the special letter.
        let delta = AlphabetStatisticsProducer::with_alphabet("delta_row_column", 0..16);
        for _ in 0..100 {
            delta.add_count(0);
            delta.add_count(1);
        }
        delta.add_count(7);
        let reduced = delta.reduce(3, "delta_row_column", SPECIAL_LETTER).unwrap();

        let mut text = Vec::new();
        let active_adc = AlphabetStatisticsProducer::with_alphabet("active_adc", 1..16);
        for letter in 1..16 {
            active_adc.add_count(letter);
        }
        active_adc.produce().unwrap().write(&mut text).unwrap();
        reduced.produce().unwrap().write(&mut text).unwrap();
        let collection =
            AlphabetStatisticsCollection::parse(&String::from_utf8(text).unwrap()).unwrap();

        let maker = DeltaPackageMaker::new(
            &collection,
            RegionLayout::new(2, 2).unwrap(),
            DeltaMode::Combined,
            Ordering::ByRegionByColumn,
            4,
        )
        .unwrap();

        let layout = MultiRegionLayout::single(4, 4).unwrap();
        let mut chip = Chip::new(layout.clone());
        // Delta from (0, 0) is 1*4 + 3 = 7: outside the reduced alphabet.
        chip.add_pixel(Pixel::new(1, 3), 5).unwrap();

        let delta_statistics = collection.get("delta_row_column").unwrap();
        assert!(!delta_statistics.contains(7));
        assert!(delta_statistics.contains(SPECIAL_LETTER));

        // Expected stream: special letter, then the raw pixel id on 4 bits,
        // then the ADC code.
        let active = collection.get("active_adc").unwrap();
        let mut expected = Package::new();
        huffman::encode_letter(&delta_statistics, SPECIAL_LETTER, &mut expected).unwrap();
        expected.write(7, 4).unwrap();
        huffman::encode_letter(&active, 5, &mut expected).unwrap();

        let package = maker.make(&chip).unwrap();
        assert_eq!(package, expected);
        assert_eq!(maker.read(&package, chip.multi_layout()).unwrap(), chip);
    }
}
