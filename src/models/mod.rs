pub mod error;
pub mod player;
pub mod score;

pub use error::*;
pub use player::*;
pub use score::*;
