// Domain layer: models and ports. No dependencies on adapters.

pub mod model;
pub mod ports;
