pub mod memory;
pub mod selectors;
pub mod traits;

pub use memory::*;
pub use selectors::*;
pub use traits::*;
