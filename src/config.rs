use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Local data directories for topography and L3 thermal products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRoots {
    /// Root of the derived DEM products (`<dems>/divgdr/ldem_128_*.tif`)
    pub dems: PathBuf,
    /// Directory holding downloaded `dgdr_*` L3 images and labels
    pub l3_data: PathBuf,
}

impl Default for DataRoots {
    fn default() -> Self {
        Self {
            dems: PathBuf::from("/luna4/maye/dems"),
            l3_data: PathBuf::from("/luna4/maye/l3_data"),
        }
    }
}

impl DataRoots {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(dems: P, l3_data: Q) -> Self {
        Self {
            dems: dems.as_ref().to_path_buf(),
            l3_data: l3_data.as_ref().to_path_buf(),
        }
    }

    /// Same L3 directory, different DEM root
    pub fn with_dems<P: AsRef<Path>>(&self, dems: P) -> Self {
        Self {
            dems: dems.as_ref().to_path_buf(),
            l3_data: self.l3_data.clone(),
        }
    }

    /// Same DEM root, different L3 directory
    pub fn with_l3_data<P: AsRef<Path>>(&self, l3_data: P) -> Self {
        Self {
            dems: self.dems.clone(),
            l3_data: l3_data.as_ref().to_path_buf(),
        }
    }
}
