use diviner::config::DataRoots;
use diviner::core::topo::{LolaTopo, ProductKind, Tile};
use diviner::types::{DivinerError, LonConvention};
use gdal::DriverManager;
use ndarray::Array2;
use std::path::Path;
use tempfile::TempDir;

const ROWS: usize = 19;
const COLS: usize = 36;

fn write_tiff(path: &Path, data: &Array2<f64>) {
    let driver = DriverManager::get_driver_by_name("GTiff").expect("GTiff driver");
    let (height, width) = data.dim();
    let dataset = driver
        .create_with_band_type::<f64, _>(path, width as isize, height as isize, 1)
        .expect("Failed to create GeoTIFF");
    let mut rasterband = dataset.rasterband(1).expect("band 1");
    let buffer = gdal::raster::Buffer::new((width, height), data.iter().cloned().collect());
    rasterband
        .write((0, 0), (width, height), &buffer)
        .expect("Failed to write band");
}

/// 10 degree global grid: elevation encodes the pixel, slope is 45 deg
/// everywhere, aspect grows eastward by 10 deg per column
fn dems_root() -> TempDir {
    let dir = TempDir::new().unwrap();
    let divgdr = dir.path().join("divgdr");
    std::fs::create_dir_all(&divgdr).unwrap();

    write_tiff(
        &divgdr.join("ldem_128_topo_img.tif"),
        &Array2::from_shape_fn((ROWS, COLS), |(r, c)| (r * 1000 + c) as f64),
    );
    write_tiff(&divgdr.join("ldem_128_slope_img.tif"), &Array2::from_elem((ROWS, COLS), 45.0));
    write_tiff(
        &divgdr.join("ldem_128_az_img.tif"),
        &Array2::from_shape_fn((ROWS, COLS), |(_, c)| c as f64 * 10.0),
    );
    dir
}

fn roots(dir: &TempDir) -> DataRoots {
    DataRoots::default().with_dems(dir.path())
}

#[test]
fn test_open_divgdr() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = dems_root();
    let topo = LolaTopo::open("divgdr", None, &roots(&dir)).expect("Failed to open topography");

    let lats = topo.dem().data().rows().coords().to_vec();
    let lons = topo.dem().data().cols().coords().to_vec();
    assert_eq!(lats.len(), ROWS);
    assert_eq!((lats[0], lats[ROWS - 1]), (90.0, -90.0));
    assert!(lats.windows(2).all(|w| w[0] > w[1]));
    assert_eq!(lons[0], 0.0);
    assert_eq!(lons[COLS - 1], 350.0);
    assert!(lons.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(topo.dem_scale(), 1.0);
    assert_eq!(topo.get_elev_by_pixel(9, 18).unwrap(), 9018.0);
    assert_eq!(topo.get_elev_by_coord(1.0, 181.0).unwrap(), 9018.0);
    assert!((topo.get_slope_by_coord(-30.0, 20.0).unwrap() - 1.0).abs() < 1e-12);
    assert_eq!(topo.get_az_by_pixel(0, 0).unwrap(), 180.0);
    assert_eq!(topo.get_az_by_pixel(0, 20).unwrap(), 20.0);
}

#[test]
fn test_lon_convention_roundtrip() {
    let dir = dems_root();
    let mut topo = LolaTopo::open("divgdr", Some(60.0), &roots(&dir)).unwrap();
    assert_eq!(topo.dem().data().rows().coords().first(), Some(&60.0));

    let samples = [(50.0, 10.0), (0.0, 190.0), (-60.0, 350.0)];
    let before: Vec<f64> = samples
        .iter()
        .map(|&(lat, lon)| topo.get_elev_by_coord(lat, lon).unwrap())
        .collect();

    topo.convert_to_lon180();
    assert_eq!(topo.lon_convention(), LonConvention::Lon180);
    for (&(lat, lon), &value) in samples.iter().zip(&before) {
        let lon180 = if lon >= 180.0 { lon - 360.0 } else { lon };
        assert_eq!(topo.get_elev_by_coord(lat, lon180).unwrap(), value);
        assert_eq!(topo.get_az_by_coord(lat, lon180).unwrap(), topo_aspect(lon));
    }

    topo.convert_to_lon360();
    for (&(lat, lon), &value) in samples.iter().zip(&before) {
        assert_eq!(topo.get_elev_by_coord(lat, lon).unwrap(), value);
    }
}

fn topo_aspect(lon: f64) -> f64 {
    (lon + 180.0) % 360.0
}

#[test]
fn test_slices() {
    let dir = dems_root();
    let topo = LolaTopo::open("divgdr", None, &roots(&dir)).unwrap();

    let tile = Tile::with_delta(-20.0, 100.0, 20.0, 30.0);
    let sliced = topo.get_slice(ProductKind::Dem, &tile).compute_2d().unwrap();
    assert_eq!(sliced.dim(), (3, 4));
    assert_eq!(sliced[[0, 0]], 9010.0);

    let inverted = Tile::with_bounds(20.0, 100.0, -20.0, 130.0);
    assert_eq!(topo.get_slice(ProductKind::Dem, &inverted).shape(), vec![0, 4]);

    let banded = topo.slice_lat(ProductKind::Aspect, 30.0);
    assert_eq!(banded.shape(), vec![7, COLS]);
}

#[test]
fn test_missing_files() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        LolaTopo::open("divgdr", None, &roots(&dir)),
        Err(DivinerError::Io(_))
    ));
    assert!(matches!(
        LolaTopo::open("lola_pds", None, &roots(&dir)),
        Err(DivinerError::Config(_))
    ));
}
