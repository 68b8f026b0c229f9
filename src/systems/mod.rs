pub mod sdk;
pub mod ambient;
pub mod plant;
pub mod sensors;
pub mod pid;
#[cfg(feature = "system-simulator")] pub mod simulator;
#[cfg(feature = "system-autotune")]  pub mod autotune;
