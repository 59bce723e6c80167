//! Bridge between engine grids and their protobuf form.

use nca_engine::error::{EngineError, EngineResult};
use nca_engine::grid::Grid;
use nca_engine::ENGINE_VERSION;

use crate::proto_types::{ProtoFrame, ProtoGrid};

pub fn grid_to_proto(grid: &Grid) -> ProtoGrid {
    ProtoGrid {
        height: grid.height() as u64,
        width: grid.width() as u64,
        cells: grid.cells().to_vec(),
    }
}

/// Rebuild a grid. Shape mismatches are reported, not trusted.
pub fn proto_to_grid(proto: &ProtoGrid) -> EngineResult<Grid> {
    let dim = |v: u64| {
        usize::try_from(v)
            .map_err(|_| EngineError::Shape(format!("grid dimension {} out of range", v)))
    };
    Grid::from_cells(dim(proto.height)?, dim(proto.width)?, proto.cells.clone())
}

pub fn frame_to_proto(index: usize, grid: &Grid) -> ProtoFrame {
    ProtoFrame {
        index: index as u64,
        engine_version: ENGINE_VERSION,
        grid: Some(grid_to_proto(grid)),
    }
}

/// Extract `(index, grid)` from a stored frame.
pub fn proto_to_frame(proto: &ProtoFrame) -> EngineResult<(usize, Grid)> {
    if proto.engine_version != ENGINE_VERSION {
        return Err(EngineError::Shape(format!(
            "frame {} written by engine v{}, this is v{}",
            proto.index, proto.engine_version, ENGINE_VERSION
        )));
    }
    let grid = proto
        .grid
        .as_ref()
        .ok_or_else(|| EngineError::Shape(format!("frame {} has no grid", proto.index)))?;
    Ok((proto.index as usize, proto_to_grid(grid)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn frame_survives_encoding() {
        let g = Grid::from_rows(&[vec![0.0, 0.125], vec![1.0, 0.5]]).unwrap();
        let bytes = frame_to_proto(7, &g).encode_to_vec();
        let decoded = ProtoFrame::decode(bytes.as_slice()).unwrap();
        let (index, back) = proto_to_frame(&decoded).unwrap();
        assert_eq!(index, 7);
        assert_eq!(back, g);
    }

    #[test]
    fn missing_grid_rejected() {
        let p = ProtoFrame {
            index: 0,
            engine_version: ENGINE_VERSION,
            grid: None,
        };
        assert!(proto_to_frame(&p).is_err());
    }

    #[test]
    fn inconsistent_shape_rejected() {
        let p = ProtoGrid {
            height: 2,
            width: 2,
            cells: vec![0.0; 3],
        };
        assert!(proto_to_grid(&p).is_err());
    }

    #[test]
    fn foreign_engine_version_rejected() {
        let mut p = frame_to_proto(0, &Grid::zeros(1, 1));
        p.engine_version = ENGINE_VERSION + 1;
        assert!(proto_to_frame(&p).is_err());
    }
}
