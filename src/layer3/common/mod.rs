// Layer3 Common Module - shared helpers for coincidence analysis

pub mod window_ramp;

pub use window_ramp::{WindowRamp, MAX_WINDOWS};
