mod biguint_ext;
pub use biguint_ext::{rounds_for_certainty, BigUintExt};
