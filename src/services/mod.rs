//! Business logic services: pure lead state transitions and the
//! dashboard aggregation they feed.

pub mod dashboard;
pub mod leads;
