//! Pixel content of a readout chip.
//!
//! `PixelRegion` is a sparse pixel->ADC map over one `RegionLayout`.
//! `Chip` couples a global region over the outer layout with an optional
//! decomposition into sub-regions; every pixel added to the chip is mirrored
//! into the sub-region that owns it. Chips are accreted with `add_pixel`
//! and read-only afterwards: the encoders never mutate them.

use std::collections::BTreeMap;

use crate::error::{ChipError, Result};
use crate::layout::{MultiRegionLayout, RegionLayout};
use crate::pixel::{Adc, Coordinate, Ordering, Pixel};

/// Sparse pixel map over a single region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelRegion {
    layout: RegionLayout,
    pixels: BTreeMap<Pixel, Adc>,
}

impl PixelRegion {
    /// Create an empty region with the given layout.
    pub fn new(layout: RegionLayout) -> Self {
        Self {
            layout,
            pixels: BTreeMap::new(),
        }
    }

    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    pub fn n_rows(&self) -> usize {
        self.layout.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.layout.n_columns
    }

    /// All stored pixels in (row, column) lexicographic order.
    pub fn pixels(&self) -> &BTreeMap<Pixel, Adc> {
        &self.pixels
    }

    /// ADC of the pixel, or 0 when the pixel holds no hit.
    pub fn get_adc(&self, pixel: &Pixel) -> Adc {
        self.pixels.get(pixel).copied().unwrap_or(0)
    }

    /// ADC at the given unsigned cell coordinates, or 0 when empty.
    pub fn get_adc_at(&self, row: usize, column: usize) -> Adc {
        self.get_adc(&Pixel::new(row as Coordinate, column as Coordinate))
    }

    /// Whether the region holds at least one pixel.
    pub fn has_active_pixels(&self) -> bool {
        !self.pixels.is_empty()
    }

    /// Insert a pixel hit.
    ///
    /// # Errors
    /// - `LayoutError::PixelOutOfRange` if the pixel is outside the layout
    /// - `ChipError::DuplicatePixel` if the pixel is already present
    pub fn add_pixel(&mut self, pixel: Pixel, adc: Adc) -> Result<()> {
        self.layout.check_pixel(&pixel)?;
        if self.pixels.contains_key(&pixel) {
            return Err(ChipError::DuplicatePixel {
                row: pixel.row,
                column: pixel.column,
            }
            .into());
        }
        self.pixels.insert(pixel, adc);
        Ok(())
    }

    /// Pixels sorted in the requested order.
    ///
    /// Only the plain `ByRow` and `ByColumn` orders apply at region level;
    /// the region-major orders need a multi-region context.
    pub fn ordered_pixels(&self, ordering: Ordering) -> Result<Vec<(Pixel, Adc)>> {
        let mut result: Vec<(Pixel, Adc)> = self.pixels.iter().map(|(p, a)| (*p, *a)).collect();
        match ordering {
            Ordering::ByRow => result.sort_by_key(|(p, _)| (p.row, p.column)),
            Ordering::ByColumn => result.sort_by_key(|(p, _)| (p.column, p.row)),
            _ => return Err(ChipError::UnsupportedOrdering { ordering }.into()),
        }
        Ok(result)
    }

    /// Compare pixel content with another region.
    pub fn has_same_pixels(&self, other: &PixelRegion) -> bool {
        self.pixels == other.pixels
    }
}

/// One readout chip: a global pixel region over the outer layout plus the
/// decomposition into sub-regions given by the multi-region layout.
///
/// Sub-regions exist only when the layout has more than one region; they are
/// created lazily, so a region is active exactly when it holds pixels.
#[derive(Debug, Clone)]
pub struct Chip {
    multi_layout: MultiRegionLayout,
    global: PixelRegion,
    regions: Vec<Option<PixelRegion>>,
}

impl Chip {
    /// Create an empty chip for the given layout.
    pub fn new(multi_layout: MultiRegionLayout) -> Self {
        let n_regions = if multi_layout.n_regions() > 1 {
            multi_layout.n_regions()
        } else {
            0
        };
        let global = PixelRegion::new(*multi_layout.outer());
        Self {
            multi_layout,
            global,
            regions: vec![None; n_regions],
        }
    }

    /// Re-split the pixels of an existing region into a grid of
    /// `n_region_rows x n_region_columns` sub-regions.
    pub fn from_region(
        original: &PixelRegion,
        n_region_rows: usize,
        n_region_columns: usize,
    ) -> Result<Self> {
        let multi_layout = MultiRegionLayout::with_region_counts(
            original.n_rows(),
            original.n_columns(),
            n_region_rows,
            n_region_columns,
        )?;
        Self::from_region_with_layout(original, multi_layout)
    }

    /// Re-split the pixels of an existing region into sub-regions of the
    /// given layout.
    pub fn from_region_split(
        original: &PixelRegion,
        region_layout: &RegionLayout,
    ) -> Result<Self> {
        let multi_layout = MultiRegionLayout::with_region_layout(
            original.n_rows(),
            original.n_columns(),
            *region_layout,
        )?;
        Self::from_region_with_layout(original, multi_layout)
    }

    fn from_region_with_layout(
        original: &PixelRegion,
        multi_layout: MultiRegionLayout,
    ) -> Result<Self> {
        let mut chip = Self::new(multi_layout);
        chip.global = original.clone();
        let entries: Vec<(Pixel, Adc)> = chip.global.pixels().iter().map(|(p, a)| (*p, *a)).collect();
        for (pixel, adc) in entries {
            chip.add_pixel_to_region(pixel, adc)?;
        }
        Ok(chip)
    }

    pub fn multi_layout(&self) -> &MultiRegionLayout {
        &self.multi_layout
    }

    /// The chip viewed as one flat region over the outer layout.
    pub fn as_region(&self) -> &PixelRegion {
        &self.global
    }

    /// All stored pixels in (row, column) lexicographic order.
    pub fn pixels(&self) -> &BTreeMap<Pixel, Adc> {
        self.global.pixels()
    }

    /// ADC of the pixel, or 0 when the pixel holds no hit.
    pub fn get_adc(&self, pixel: &Pixel) -> Adc {
        self.global.get_adc(pixel)
    }

    /// Whether the chip holds at least one pixel.
    pub fn has_active_pixels(&self) -> bool {
        self.global.has_active_pixels()
    }

    /// Insert a pixel hit, mirroring it into the owning sub-region.
    pub fn add_pixel(&mut self, pixel: Pixel, adc: Adc) -> Result<()> {
        self.global.add_pixel(pixel, adc)?;
        self.add_pixel_to_region(pixel, adc)
    }

    fn add_pixel_to_region(&mut self, pixel: Pixel, adc: Adc) -> Result<()> {
        if self.multi_layout.n_regions() <= 1 {
            return Ok(());
        }
        let (region_id, region_pixel) = self.multi_layout.to_region(&pixel)?;
        let region_layout = *self.multi_layout.region_layout();
        let region = self.regions[region_id].get_or_insert_with(|| PixelRegion::new(region_layout));
        region.add_pixel(region_pixel, adc)
    }

    /// Whether the region holds any pixels.
    pub fn is_region_active(&self, region_id: usize) -> Result<bool> {
        self.multi_layout.check_region_id(region_id)?;
        if self.multi_layout.n_regions() == 1 {
            return Ok(self.global.has_active_pixels());
        }
        Ok(self.regions[region_id].is_some())
    }

    /// The sub-region at `region_id`; for single-region layouts this is the
    /// chip itself.
    ///
    /// # Errors
    /// `ChipError::InactiveRegion` if the region holds no pixels.
    pub fn region(&self, region_id: usize) -> Result<&PixelRegion> {
        if !self.is_region_active(region_id)? {
            return Err(ChipError::InactiveRegion { region_id }.into());
        }
        if self.multi_layout.n_regions() == 1 {
            return Ok(&self.global);
        }
        self.regions[region_id]
            .as_ref()
            .ok_or_else(|| ChipError::InactiveRegion { region_id }.into())
    }

    /// Pixels sorted in the requested order.
    ///
    /// The region-major orders walk the sub-region grid (by region row or by
    /// region column) and emit each active region's pixels in their map
    /// order, converted back to global coordinates.
    pub fn ordered_pixels(&self, ordering: Ordering) -> Result<Vec<(Pixel, Adc)>> {
        let (outer_major, by_row_major) = match ordering {
            Ordering::ByRegionByRow => (
                (self.multi_layout.n_region_rows(), self.multi_layout.n_region_columns()),
                true,
            ),
            Ordering::ByRegionByColumn => (
                (self.multi_layout.n_region_columns(), self.multi_layout.n_region_rows()),
                false,
            ),
            _ => return self.global.ordered_pixels(ordering),
        };

        let mut result = Vec::new();
        for n in 0..outer_major.0 {
            for k in 0..outer_major.1 {
                let region_id = if by_row_major {
                    self.multi_layout.region_id(n, k)
                } else {
                    self.multi_layout.region_id(k, n)
                };
                if !self.is_region_active(region_id)? {
                    continue;
                }
                for (region_pixel, adc) in self.region(region_id)?.pixels() {
                    let pixel = self.multi_layout.from_region(region_id, region_pixel)?;
                    result.push((pixel, *adc));
                }
            }
        }
        Ok(result)
    }

    /// Compare pixel content with another chip.
    pub fn has_same_pixels(&self, other: &Chip) -> bool {
        self.global.has_same_pixels(&other.global)
    }
}

impl PartialEq for Chip {
    fn eq(&self, other: &Self) -> bool {
        self.has_same_pixels(other)
    }
}

impl Eq for Chip {}
