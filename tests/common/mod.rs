#![allow(dead_code)]

mod fixture_loader;
mod xml_check;

pub use fixture_loader::{Case, ConformanceTest};
pub use xml_check::check_well_formed;
