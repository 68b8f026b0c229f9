pub mod control;
pub mod fusion;
pub mod relax;
pub mod stoch;
pub mod thermal;

pub use control::*;
pub use fusion::*;
pub use relax::*;
pub use stoch::*;
pub use thermal::*;
