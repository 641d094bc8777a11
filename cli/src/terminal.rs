pub mod logging;
pub mod spinner;
