// Domain layer: models, ports and the pure trend computation.

pub mod model;
pub mod ports;

pub mod services;
