pub mod optimize;
pub mod returns;
pub mod risk;
pub mod simulate;
