//! The encoder façade: format selection, dictionary loading and chip
//! re-splitting in front of the package makers.

use std::path::Path;
use std::sync::Arc;

use crate::block_maker::BlockPackageMaker;
use crate::chip::Chip;
use crate::delta_maker::{DeltaMode, DeltaPackageMaker};
use crate::error::{Result, StatisticsError};
use crate::layout::{MultiRegionLayout, RegionLayout};
use crate::maker::{PackageMaker, SinglePixelMaker};
use crate::package::Package;
use crate::pixel::Ordering;
use crate::statistics::{AlphabetStatisticsCollection, AlphabetType};

/// The four on-the-wire package formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderFormat {
    /// Plain (pixel id, ADC) pairs
    SinglePixel,
    /// Readout-unit records with raw ADC fields
    Region,
    /// Readout-unit records with Huffman-coded ADC fields
    RegionWithCompressedAdc,
    /// Huffman-coded pixel deltas (combined mode)
    Delta,
}

impl EncoderFormat {
    pub fn name(&self) -> &'static str {
        match self {
            EncoderFormat::SinglePixel => "single_pixel",
            EncoderFormat::Region => "region",
            EncoderFormat::RegionWithCompressedAdc => "region_compressed_adc",
            EncoderFormat::Delta => "delta",
        }
    }
}

/// Applies one encoding schema to chip data.
///
/// Construction selects the concrete package maker and, for the compressed
/// formats, loads the alphabet dictionary. Chips whose outer layout differs
/// from the configured one are re-split before encoding.
pub struct ChipDataEncoder {
    chip_layout: MultiRegionLayout,
    package_maker: Box<dyn PackageMaker + Send + Sync>,
}

impl ChipDataEncoder {
    /// Create an encoder for the given format.
    ///
    /// `dictionary_file` is required for `RegionWithCompressedAdc` and
    /// `Delta`; the other formats ignore it.
    pub fn new(
        encoder_format: EncoderFormat,
        chip_layout: MultiRegionLayout,
        readout_unit_layout: RegionLayout,
        max_adc: usize,
        ordering: Ordering,
        dictionary_file: Option<&Path>,
    ) -> Result<Self> {
        let bits_per_adc = RegionLayout::bits_per_value(max_adc);
        let package_maker: Box<dyn PackageMaker + Send + Sync> = match encoder_format {
            EncoderFormat::SinglePixel => Box::new(SinglePixelMaker::new(bits_per_adc)),
            EncoderFormat::Region => Box::new(BlockPackageMaker::new(
                None,
                readout_unit_layout,
                bits_per_adc,
            )),
            EncoderFormat::RegionWithCompressedAdc => {
                let source = Self::load_dictionary(dictionary_file)?;
                let adc_statistics = source.get_by_type(AlphabetType::Adc)?;
                Box::new(BlockPackageMaker::new(
                    Some(adc_statistics),
                    readout_unit_layout,
                    bits_per_adc,
                ))
            }
            EncoderFormat::Delta => {
                let source = Self::load_dictionary(dictionary_file)?;
                Box::new(DeltaPackageMaker::new(
                    &source,
                    readout_unit_layout,
                    DeltaMode::Combined,
                    ordering,
                    bits_per_adc,
                )?)
            }
        };
        Ok(Self {
            chip_layout,
            package_maker,
        })
    }

    fn load_dictionary(dictionary_file: Option<&Path>) -> Result<Arc<AlphabetStatisticsCollection>> {
        let path = dictionary_file.ok_or(StatisticsError::DictionaryRequired)?;
        Ok(Arc::new(AlphabetStatisticsCollection::load(path)?))
    }

    pub fn chip_layout(&self) -> &MultiRegionLayout {
        &self.chip_layout
    }

    /// Encode a chip, re-splitting it first when its layout differs from the
    /// configured one.
    pub fn encode(&self, chip: &Chip) -> Result<Package> {
        if chip.multi_layout() == &self.chip_layout {
            return self.package_maker.make(chip);
        }
        let split_chip = Chip::from_region(
            chip.as_region(),
            self.chip_layout.n_region_rows(),
            self.chip_layout.n_region_columns(),
        )?;
        self.package_maker.make(&split_chip)
    }

    /// Decode a package into a chip with the configured layout.
    pub fn decode(&self, package: &Package) -> Result<Chip> {
        self.package_maker.read(package, &self.chip_layout)
    }
}
