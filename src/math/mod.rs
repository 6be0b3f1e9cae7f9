pub mod affine;
pub mod basis;
