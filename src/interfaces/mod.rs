//! Boundary adapters for the replay driver.

pub mod csv;
