pub mod clock;
pub mod quantity;
pub mod telemetry;
pub mod types;

pub use clock::*;
pub use quantity::*;
pub use telemetry::*;
pub use types::*;
