//! Domain entities and the ports both application components depend on.

pub mod ports;
pub mod record;
