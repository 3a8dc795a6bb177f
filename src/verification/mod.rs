//! Remote deliverability confirmation and the final signal aggregation.

pub(crate) mod api;
pub(crate) mod confidence;
pub(crate) mod deliverability;
