pub mod array;
pub mod l3;
pub mod l3_image;
#[cfg(feature = "plot")]
pub mod plot;
pub mod projection;
pub mod stack;
pub mod topo;

pub use array::{ElementOp, RasterHandle};
pub use l3::{get_l3_image_paths, DownloadOutcome, L3DataManager, L3Datatype, L3Product};
pub use l3_image::{Calibrated, Calibration, L3Image};
pub use stack::{load, load_cycle, pixel_timeseries, stack};
pub use topo::{LolaTopo, ProductKind, Tile, TopoProduct};
