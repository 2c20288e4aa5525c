pub mod hit;
pub mod raster;

pub use hit::{hit_test, hit_test_rect};
pub use raster::{Rasterizer, SoftwareRasterizer};
