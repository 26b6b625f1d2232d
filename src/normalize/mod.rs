//! Quantity normalization: turning free-text part descriptions into
//! structured electrical attributes.
//!
//! Each `parse_*` function is pure and independent; [`PartAttributes`]
//! bundles all six and [`NormalizationPipeline`] applies them to the whole
//! catalog.

mod attributes;
mod capacitance;
mod current;
mod dielectric;
mod inductance;
mod pipeline;
mod quantity;
mod resistance;
mod voltage;

pub use attributes::PartAttributes;
pub use capacitance::parse_capacitance;
pub use current::parse_current;
pub use dielectric::parse_dielectric;
pub use inductance::parse_inductance;
pub use pipeline::{
    BatchError, BatchPlan, BatchRange, DEFAULT_BATCH_TARGET, DEFAULT_WORKERS,
    NormalizationPipeline, NormalizeError, NormalizeStats,
};
pub use quantity::{Dielectric, Quantity, Unit};
pub use resistance::parse_resistance;
pub use voltage::parse_voltage;
