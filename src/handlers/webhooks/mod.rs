mod identity;
pub mod signature;

pub use identity::*;
