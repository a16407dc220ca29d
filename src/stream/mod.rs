//! Stream utilities for observers of the controller

mod coalesce;

pub use coalesce::{Coalesce, CoalesceExt};
