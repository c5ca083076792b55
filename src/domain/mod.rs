// Domain layer: value types, ports to the external collaborators and the remote message schema.

pub mod message;
pub mod model;
pub mod ports;
