//! Lights and the tier manager that uploads them

mod light;
mod manager;

pub use light::{Light, LightData, LightKey, LightType};
pub use manager::{LightError, LightTier, LightTierManager, TierMask, UploadReport};
