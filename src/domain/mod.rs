// Domain layer: the tabular model and the ports workflows are written against.

pub mod model;
pub mod ports;
