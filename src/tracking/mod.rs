mod tracker;

pub use tracker::{start, Liveness, Tracker, TrackingHandle};
