pub mod error;
pub mod review;
pub mod work;

pub use error::*;
pub use review::*;
pub use work::*;
