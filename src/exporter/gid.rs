//! Geometry-index resolver.
//!
//! Resolves once, per geometry binding, the position of every axis the
//! exporter reads off geometry identifiers, together with the category type
//! codes used to tell scintillator families apart.

use crate::error::{ExportError, Result};
use crate::source::geom::{CategoryInfo, GeomId, IdManager};

pub const CALO_CATEGORY: &str = "calorimeter_block";
pub const XCALO_CATEGORY: &str = "xcalo_block";
pub const GVETO_CATEGORY: &str = "gveto_block";
pub const GG_CATEGORY: &str = "drift_cell_core";

/// Decoded scintillator axes, `-1` where the family has no such axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScinAddress {
    pub module: i32,
    pub side: i32,
    pub column: i32,
    pub row: i32,
    pub wall: i32,
}

/// Axis positions of one scintillator block family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScinAxes {
    pub geom_type: u32,
    pub module: usize,
    pub side: usize,
    pub column: usize,
    pub row: Option<usize>,
    pub wall: Option<usize>,
}

impl ScinAxes {
    pub fn decode(&self, gid: &GeomId) -> ScinAddress {
        ScinAddress {
            module: gid.axis(Some(self.module)),
            side: gid.axis(Some(self.side)),
            column: gid.axis(Some(self.column)),
            row: gid.axis(self.row),
            wall: gid.axis(self.wall),
        }
    }
}

/// Decoded drift-cell axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellAddress {
    pub module: i32,
    pub side: i32,
    pub layer: i32,
    pub row: i32,
}

/// Axis positions of the drift-cell category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellAxes {
    pub geom_type: u32,
    pub module: usize,
    pub side: usize,
    pub layer: usize,
    pub row: usize,
}

impl CellAxes {
    pub fn decode(&self, gid: &GeomId) -> CellAddress {
        CellAddress {
            module: gid.axis(Some(self.module)),
            side: gid.axis(Some(self.side)),
            layer: gid.axis(Some(self.layer)),
            row: gid.axis(Some(self.row)),
        }
    }
}

/// Resolved geometry index table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GidInfo {
    pub calo: ScinAxes,
    pub xcalo: ScinAxes,
    pub gveto: ScinAxes,
    pub gg: CellAxes,
}

fn category<'a>(ids: &'a IdManager, name: &str) -> Result<&'a CategoryInfo> {
    ids.category_info(name).ok_or_else(|| ExportError::Geometry {
        category: name.to_string(),
        reason: "category is not declared by the geometry manager".to_string(),
    })
}

fn axis(info: &CategoryInfo, category: &str, name: &str) -> Result<usize> {
    info.subaddress_index(name)
        .ok_or_else(|| ExportError::Geometry {
            category: category.to_string(),
            reason: format!("no sub-address named '{name}'"),
        })
}

impl GidInfo {
    /// Resolve the whole table from scratch.
    pub fn resolve(ids: &IdManager) -> Result<Self> {
        let calo = category(ids, CALO_CATEGORY)?;
        let xcalo = category(ids, XCALO_CATEGORY)?;
        let gveto = category(ids, GVETO_CATEGORY)?;
        let gg = category(ids, GG_CATEGORY)?;

        Ok(Self {
            calo: ScinAxes {
                geom_type: calo.get_type(),
                module: axis(calo, CALO_CATEGORY, "module")?,
                side: axis(calo, CALO_CATEGORY, "side")?,
                column: axis(calo, CALO_CATEGORY, "column")?,
                row: Some(axis(calo, CALO_CATEGORY, "row")?),
                wall: None,
            },
            xcalo: ScinAxes {
                geom_type: xcalo.get_type(),
                module: axis(xcalo, XCALO_CATEGORY, "module")?,
                side: axis(xcalo, XCALO_CATEGORY, "side")?,
                column: axis(xcalo, XCALO_CATEGORY, "column")?,
                row: Some(axis(xcalo, XCALO_CATEGORY, "row")?),
                wall: Some(axis(xcalo, XCALO_CATEGORY, "wall")?),
            },
            gveto: ScinAxes {
                geom_type: gveto.get_type(),
                module: axis(gveto, GVETO_CATEGORY, "module")?,
                side: axis(gveto, GVETO_CATEGORY, "side")?,
                column: axis(gveto, GVETO_CATEGORY, "column")?,
                row: None,
                wall: Some(axis(gveto, GVETO_CATEGORY, "wall")?),
            },
            gg: CellAxes {
                geom_type: gg.get_type(),
                module: axis(gg, GG_CATEGORY, "module")?,
                side: axis(gg, GG_CATEGORY, "side")?,
                layer: axis(gg, GG_CATEGORY, "layer")?,
                row: axis(gg, GG_CATEGORY, "row")?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::geom::{GeometryManager, GeometrySetup, INVALID_ADDRESS};

    #[test]
    fn test_resolve_builtin_layout() {
        let setup = GeometrySetup::snemo();
        let info = GidInfo::resolve(setup.id_manager()).unwrap();
        assert_eq!(info.calo.geom_type, 1302);
        assert_eq!(info.xcalo.geom_type, 1232);
        assert_eq!(info.gveto.geom_type, 1252);
        assert_eq!(info.gg.geom_type, 1204);
        assert_eq!((info.calo.column, info.calo.row), (2, Some(3)));
        assert_eq!((info.xcalo.wall, info.xcalo.column), (Some(2), 3));
        assert_eq!(info.gveto.row, None);
        assert_eq!(info.gg.layer, 2);
    }

    #[test]
    fn test_decode_gveto_leaves_row_invalid() {
        let setup = GeometrySetup::snemo();
        let info = GidInfo::resolve(setup.id_manager()).unwrap();
        let gid = GeomId::new(1252, vec![0, 1, 1, 9, 0]);
        let address = info.gveto.decode(&gid);
        assert_eq!(
            address,
            ScinAddress {
                module: 0,
                side: 1,
                column: 9,
                row: -1,
                wall: 1
            }
        );
        let calo = info.calo.decode(&GeomId::new(1302, vec![0, 0, 5, INVALID_ADDRESS, 0]));
        assert_eq!(calo.row, -1);
        assert_eq!(calo.wall, -1);
    }

    #[test]
    fn test_missing_category_is_fatal() {
        let mut ids = GeometrySetup::snemo().categories;
        let mut partial = IdManager::default();
        for (name, info) in ids.categories() {
            if name != GVETO_CATEGORY {
                partial.add_category(name, info.clone());
            }
        }
        let err = GidInfo::resolve(&partial).unwrap_err();
        assert!(matches!(err, ExportError::Geometry { ref category, .. } if category == GVETO_CATEGORY));

        ids.add_category(GG_CATEGORY, CategoryInfo::new(1204, &["module", "side", "row"]));
        let err = GidInfo::resolve(&ids).unwrap_err();
        assert!(err.to_string().contains("layer"));
    }
}
