//! Zone rectangle tables.

use std::path::Path;

use field_spectra_core::Rect;
use field_spectra_zones::ZoneLayout;

use crate::table::{TableError, TextTable};

/// Zone rectangle table of one camera, keyed by measurement name.
///
/// Each zone (or the spectralon, prefix `spec`) occupies four columns:
/// `{prefix}_row_start`, `{prefix}_row_end`, `{prefix}_col_start` and
/// `{prefix}_col_end`.
#[derive(Clone, Debug)]
pub struct PositionsTable {
    table: TextTable,
}

impl PositionsTable {
    pub fn parse(text: &str) -> Result<Self, TableError> {
        Ok(Self {
            table: TextTable::parse(text)?,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        Ok(Self {
            table: TextTable::load(path)?,
        })
    }

    /// Row index of a measurement, if present.
    pub fn measurement_index(&self, name: &str) -> Result<Option<usize>, TableError> {
        self.table.find_row("measurement", name)
    }

    /// Rectangle of `prefix` at a measurement row.
    pub fn rect(&self, prefix: &str, row: usize) -> Result<Rect, TableError> {
        Ok(Rect::new(
            self.table.get_usize(&format!("{prefix}_row_start"), row)?,
            self.table.get_usize(&format!("{prefix}_row_end"), row)?,
            self.table.get_usize(&format!("{prefix}_col_start"), row)?,
            self.table.get_usize(&format!("{prefix}_col_end"), row)?,
        ))
    }

    /// Whether the table has columns for `prefix`.
    pub fn has_zone(&self, prefix: &str) -> bool {
        self.table.has_column(&format!("{prefix}_row_start"))
    }

    /// [`ZoneLayout`] view of one measurement row.
    pub fn at(&self, row: usize) -> MeasurementPositions<'_> {
        MeasurementPositions { table: self, row }
    }
}

/// One measurement row of a [`PositionsTable`], usable as a zone layout.
#[derive(Clone, Copy, Debug)]
pub struct MeasurementPositions<'a> {
    table: &'a PositionsTable,
    row: usize,
}

impl ZoneLayout for MeasurementPositions<'_> {
    fn resolve(&self, zone: &str) -> Option<Rect> {
        self.table.rect(zone, self.row).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSITIONS: &str = "\
        measurement zone1_row_start zone1_row_end zone1_col_start zone1_col_end \
        spec_row_start spec_row_end spec_col_start spec_col_end\n\
        20170815_meas1 10 15 5 8 30 35 18 25\n";

    #[test]
    fn builds_rectangles_from_prefixed_columns() {
        let positions = PositionsTable::parse(POSITIONS).unwrap();
        let row = positions.measurement_index("20170815_meas1").unwrap().unwrap();
        assert_eq!(positions.rect("zone1", row).unwrap(), Rect::new(10, 15, 5, 8));
        assert_eq!(positions.rect("spec", row).unwrap(), Rect::new(30, 35, 18, 25));
    }

    #[test]
    fn layout_resolves_known_zones_only() {
        let positions = PositionsTable::parse(POSITIONS).unwrap();
        let layout = positions.at(0);
        assert_eq!(layout.resolve("zone1"), Some(Rect::new(10, 15, 5, 8)));
        assert_eq!(layout.resolve("zone2"), None);
    }
}
