//! Traffic analysis over the reading store.
//!
//! This module turns raw sensor readings into the answers the API serves:
//! lag features and a 15-minute speed forecast, 10-minute speed histories,
//! the sensors visible in a map view, and a congestion summary for a route.

pub mod congestion;
pub mod features;
pub mod history;
pub mod polyline;
pub mod prediction;
pub mod route;
pub mod sensors;
pub mod types;
pub mod utility;
