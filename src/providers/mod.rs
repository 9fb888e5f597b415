pub mod keys;
pub mod tricount;
pub mod util;

pub use tricount::TricountProvider;
