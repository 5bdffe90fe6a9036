//! Diviner GDR level 3 product naming, remote locations and downloads.

use crate::config::DataRoots;
use crate::io::download::Retriever;
use crate::types::{Cycle, DivinerError, DivinerResult};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// PDS Geosciences node volume holding the Diviner RDR level 4 products
pub const DIVINER_URL: &str = "https://pds-geosciences.wustl.edu/lro/lro-l-dlre-4-rdr-v1/lrodlr_1001/data";

/// GDR L3 data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum L3Datatype {
    /// Rock abundance
    Ra,
    /// RMS error of the rock abundance fit
    Rms,
    /// Regolith temperature
    St,
    /// Average bolometric temperature
    Tbol,
}

impl L3Datatype {
    pub const ALL: [L3Datatype; 4] = [
        L3Datatype::Ra,
        L3Datatype::Rms,
        L3Datatype::St,
        L3Datatype::Tbol,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            L3Datatype::Ra => "ra",
            L3Datatype::Rms => "rms",
            L3Datatype::St => "st",
            L3Datatype::Tbol => "tbol",
        }
    }
}

impl FromStr for L3Datatype {
    type Err = DivinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ra" => Ok(L3Datatype::Ra),
            "rms" => Ok(L3Datatype::Rms),
            "st" => Ok(L3Datatype::St),
            "tbol" => Ok(L3Datatype::Tbol),
            _ => Err(DivinerError::Config(format!(
                "Invalid L3 datatype '{}', only {:?} allowed",
                s,
                L3Datatype::ALL.iter().map(|d| d.as_str()).collect::<Vec<_>>()
            ))),
        }
    }
}

impl std::fmt::Display for L3Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a data download request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded(PathBuf),
    /// Target already present and overwriting was not requested
    Skipped(PathBuf),
}

/// One GDR L3 product: everything needed to name and locate its files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct L3Product {
    cycle: Option<Cycle>,
    datatype: L3Datatype,
    map_res: String,
    projection: String,
    format: String,
    year: Option<String>,
}

impl Default for L3Product {
    fn default() -> Self {
        Self {
            cycle: None,
            datatype: L3Datatype::St,
            map_res: "001".to_string(),
            projection: "cylindrical".to_string(),
            format: "jp2".to_string(),
            year: None,
        }
    }
}

impl L3Product {
    /// Regolith temperature product for `cycle` with default layout
    pub fn new(cycle: Cycle) -> Self {
        Self {
            cycle: Some(cycle),
            ..Self::default()
        }
    }

    /// Product for a year without a specific cycle (folder URLs only)
    pub fn for_year<Y: ToString>(year: Y) -> Self {
        Self {
            year: Some(year.to_string()),
            ..Self::default()
        }
    }

    /// Recover the product description from a `dgdr_*` filename
    pub fn from_fname(fname: &str) -> DivinerResult<Self> {
        let cycle = Cycle::from_fname(fname)?;
        let tokens: Vec<&str> = fname.split('_').collect();
        let datatype = tokens[1].parse::<L3Datatype>()?;
        let format = Path::new(fname)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| DivinerError::Parse(format!("No file format in {}", fname)))?;
        let res = tokens.get(5).ok_or_else(|| {
            DivinerError::Parse(format!("No resolution token in {}", fname))
        })?;

        Self::new(cycle)
            .with_datatype(datatype)
            .with_format(format)
            .with_map_res(res)
    }

    pub fn with_datatype(mut self, datatype: L3Datatype) -> Self {
        self.datatype = datatype;
        self
    }

    /// Set the datatype from a string, case-insensitive
    pub fn set_datatype(&mut self, value: &str) -> DivinerResult<()> {
        self.datatype = value.parse()?;
        Ok(())
    }

    /// Map resolution, zero padded to three characters (`4` becomes `004`)
    pub fn with_map_res<R: ToString>(mut self, map_res: R) -> DivinerResult<Self> {
        self.set_map_res(map_res)?;
        Ok(self)
    }

    pub fn set_map_res<R: ToString>(&mut self, map_res: R) -> DivinerResult<()> {
        let value = map_res.to_string();
        if value.is_empty() {
            return Err(DivinerError::Config("Empty map resolution".to_string()));
        }
        self.map_res = format!("{:0>3}", value);
        Ok(())
    }

    pub fn with_projection<S: Into<String>>(mut self, projection: S) -> Self {
        self.projection = projection.into();
        self
    }

    pub fn with_format<S: Into<String>>(mut self, format: S) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_year<Y: ToString>(mut self, year: Y) -> Self {
        self.year = Some(year.to_string());
        self
    }

    pub fn cycle(&self) -> Option<Cycle> {
        self.cycle
    }

    pub fn datatype(&self) -> L3Datatype {
        self.datatype
    }

    pub fn map_res(&self) -> &str {
        &self.map_res
    }

    pub fn projection(&self) -> &str {
        &self.projection
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Folder year: taken from the cycle when set, else the configured year
    pub fn year(&self) -> Option<String> {
        match self.cycle {
            Some(cycle) => Some(cycle.year()),
            None => {
                if self.year.is_none() {
                    log::warn!("Set `year` for getting a correct folder URL.");
                }
                self.year.clone()
            }
        }
    }

    pub fn second_token(&self) -> &'static str {
        if self.datatype == L3Datatype::Tbol {
            "avg"
        } else {
            "clc"
        }
    }

    /// Resolution token used in filenames; only tbol carries the map resolution
    pub fn resolution_token(&self) -> &str {
        if self.datatype == L3Datatype::Tbol {
            &self.map_res
        } else {
            "128"
        }
    }

    fn require_cycle(&self) -> DivinerResult<Cycle> {
        self.cycle.ok_or_else(|| {
            DivinerError::Config("L3 product has no cycle, cannot build a filename".to_string())
        })
    }

    /// Data filename, e.g. `dgdr_st_clc_cyl_20090115n_128_jp2.jp2`
    pub fn fname(&self) -> DivinerResult<String> {
        let cycle = self.require_cycle()?;
        Ok(format!(
            "dgdr_{}_{}_cyl_{}n_{}_{}.{}",
            self.datatype,
            self.second_token(),
            cycle,
            self.resolution_token(),
            self.format,
            self.format
        ))
    }

    /// Label filename sharing the data file's stem
    pub fn label(&self) -> DivinerResult<String> {
        let fname = self.fname()?;
        Ok(Path::new(&fname)
            .with_extension("lbl")
            .to_string_lossy()
            .into_owned())
    }

    pub fn folder_url(&self) -> DivinerResult<Url> {
        let year = self.year().ok_or_else(|| {
            DivinerError::Config("L3 product has neither cycle nor year".to_string())
        })?;
        let mut url = Url::parse(DIVINER_URL)
            .map_err(|e| DivinerError::Config(format!("Invalid base URL {}: {}", DIVINER_URL, e)))?;
        url.path_segments_mut()
            .map_err(|_| DivinerError::Config(format!("Base URL {} cannot hold a path", DIVINER_URL)))?
            .pop_if_empty()
            .extend(["gdr_l3", year.as_str(), self.projection.as_str(), self.format.as_str()]);
        Ok(url)
    }

    pub fn data_url(&self) -> DivinerResult<Url> {
        join_url(self.folder_url()?, &self.fname()?)
    }

    pub fn label_url(&self) -> DivinerResult<Url> {
        join_url(self.folder_url()?, &self.label()?)
    }

    /// Fetch the label into `folder`. Always downloads, even when present.
    pub fn download_label<P: AsRef<Path>, R: Retriever>(
        &self,
        folder: P,
        retriever: &R,
    ) -> DivinerResult<PathBuf> {
        let folder = folder.as_ref();
        std::fs::create_dir_all(folder)?;
        let savepath = folder.join(self.label()?);
        if savepath.exists() {
            log::debug!("Re-downloading existing label {}", savepath.display());
        }
        retriever.retrieve(&self.label_url()?, &savepath)?;
        Ok(savepath)
    }

    /// Fetch the data file into `folder`.
    ///
    /// An existing file is left alone unless `overwrite` is set; that case is
    /// reported, not treated as an error.
    pub fn download_data<P: AsRef<Path>, R: Retriever>(
        &self,
        folder: P,
        overwrite: bool,
        retriever: &R,
    ) -> DivinerResult<DownloadOutcome> {
        let folder = folder.as_ref();
        std::fs::create_dir_all(folder)?;
        let savepath = folder.join(self.fname()?);
        if savepath.exists() && !overwrite {
            log::info!(
                "File exists, use `overwrite = true` to force download: {}",
                savepath.display()
            );
            return Ok(DownloadOutcome::Skipped(savepath));
        }
        retriever.retrieve(&self.data_url()?, &savepath)?;
        Ok(DownloadOutcome::Downloaded(savepath))
    }
}

fn join_url(mut folder: Url, fname: &str) -> DivinerResult<Url> {
    let base = folder.to_string();
    folder
        .path_segments_mut()
        .map_err(|_| DivinerError::Config(format!("URL {} cannot hold a path", base)))?
        .push(fname);
    Ok(folder)
}

/// Local `dgdr_*` files under the L3 data root
#[derive(Debug, Clone)]
pub struct L3DataManager {
    root: PathBuf,
}

impl L3DataManager {
    pub fn new(roots: &DataRoots) -> Self {
        Self {
            root: roots.l3_data.clone(),
        }
    }

    /// Sorted label files
    pub fn labels(&self) -> DivinerResult<Vec<PathBuf>> {
        self.list("lbl")
    }

    /// Sorted GeoTIFF images
    pub fn images(&self) -> DivinerResult<Vec<PathBuf>> {
        self.list("tif")
    }

    fn list(&self, extension: &str) -> DivinerResult<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                let dgdr = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with("dgdr_"));
                dgdr && path.extension().map_or(false, |e| e == extension)
            })
            .collect();
        files.sort();
        log::debug!(
            "Found {} dgdr_*.{} file(s) in {}",
            files.len(),
            extension,
            self.root.display()
        );
        Ok(files)
    }
}

/// Sorted L3 GeoTIFF images under the configured root
pub fn get_l3_image_paths(roots: &DataRoots) -> DivinerResult<Vec<PathBuf>> {
    L3DataManager::new(roots).images()
}
