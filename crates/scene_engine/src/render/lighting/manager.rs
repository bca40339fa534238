//! Tiered light storage and uniform upload
//!
//! Lights live in three tiers by how often they move:
//!
//! | Tier       | Storage                  | Capacity        |
//! |------------|--------------------------|-----------------|
//! | Static     | growable `Vec`           | unbounded       |
//! | Stationary | fixed slots + free list  | configurable    |
//! | Dynamic    | fixed slots + free list  | configurable    |
//!
//! Adding or removing a light dirties its tier. Dirty tiers are compacted
//! (expired lights dropped, fixed slots released) when the scene sweeps and
//! again at the start of every [`LightTierManager::upload`], so the
//! `activeLightCount` it writes always reflects post-compaction occupancy.

use std::fmt;

use bitflags::bitflags;
use thiserror::Error;

use super::light::{Light, LightKey};
use crate::core::config::LightingConfig;
use crate::foundation::collections::SlotAllocator;
use crate::render::shader::{try_set, UniformSink, UniformValue};
use crate::scene::registry::SceneObjectRegistry;
use crate::scene::scene_object::Mobility;

/// Light tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightTier {
    /// Unbounded, never moves
    Static,
    /// Bounded, moves rarely
    Stationary,
    /// Bounded, moves every frame
    Dynamic,
}

impl LightTier {
    /// All tiers in upload order
    pub const ALL: [Self; 3] = [Self::Static, Self::Stationary, Self::Dynamic];

    /// Tier for an object's mobility; anything unclassified goes to the stationary tier
    pub fn from_mobility(mobility: Mobility) -> Self {
        match mobility {
            Mobility::Static => Self::Static,
            Mobility::Dynamic => Self::Dynamic,
            Mobility::Stationary | Mobility::NonType => Self::Stationary,
        }
    }

    /// Mobility recorded on lights in this tier
    pub fn mobility(self) -> Mobility {
        match self {
            Self::Static => Mobility::Static,
            Self::Stationary => Mobility::Stationary,
            Self::Dynamic => Mobility::Dynamic,
        }
    }

    fn mask(self) -> TierMask {
        match self {
            Self::Static => TierMask::STATIC,
            Self::Stationary => TierMask::STATIONARY,
            Self::Dynamic => TierMask::DYNAMIC,
        }
    }
}

impl fmt::Display for LightTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Static => "static",
            Self::Stationary => "stationary",
            Self::Dynamic => "dynamic",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Set of tiers owing a compaction pass
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TierMask: u8 {
        /// Static tier
        const STATIC = 1 << 0;
        /// Stationary tier
        const STATIONARY = 1 << 1;
        /// Dynamic tier
        const DYNAMIC = 1 << 2;
    }
}

/// Light manager errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LightError {
    /// Fixed tier has no free slot; the light was dropped
    #[error("{tier} light tier is full (capacity {capacity})")]
    TierFull {
        /// Tier that rejected the light
        tier: LightTier,
        /// Its capacity
        capacity: u32,
    },

    /// No light with this key
    #[error("no light with key {0:?}")]
    UnknownKey(LightKey),
}

/// Result of one [`LightTierManager::upload`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Entries written, equal to the `activeLightCount` value
    pub lights_written: u32,
    /// Uniform writes skipped because the program lacks the uniform
    pub missing_uniforms: usize,
    /// Lights skipped because their visual object vanished before compaction
    pub stale_lights: usize,
}

/// Fixed-capacity tier backed by a slot allocator
#[derive(Debug)]
struct FixedTier {
    slots: Vec<Option<Light>>,
    allocator: SlotAllocator,
}

impl FixedTier {
    fn new(capacity: u32) -> Self {
        Self {
            slots: Vec::with_capacity(capacity as usize),
            allocator: SlotAllocator::with_capacity(capacity),
        }
    }

    fn capacity(&self) -> u32 {
        self.allocator.capacity().unwrap_or(0)
    }

    fn insert(&mut self, light: Light) -> Option<u32> {
        let index = self.allocator.acquire().ok()?;
        let slot = index as usize;
        if slot == self.slots.len() {
            self.slots.push(None);
        }
        self.slots[slot] = Some(light);
        Some(index)
    }

    /// Occupied slots in `[0, high_water_mark)`
    fn iter(&self) -> impl Iterator<Item = &Light> {
        self.slots.iter().flatten()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Light> {
        self.slots.iter_mut().flatten()
    }

    /// Returns `(reclaimed, failed_releases)`
    fn compact(&mut self, registry: &SceneObjectRegistry) -> (usize, usize) {
        let mut reclaimed = 0;
        let mut failed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !slot.as_ref().is_some_and(|light| light.is_expired(registry)) {
                continue;
            }
            *slot = None;
            if let Err(e) = self.allocator.release(index as u32) {
                log::error!("Light slot {} could not be released: {}", index, e);
                failed += 1;
                continue;
            }
            reclaimed += 1;
        }
        (reclaimed, failed)
    }
}

/// Owner of every light, grouped by tier
#[derive(Debug)]
pub struct LightTierManager {
    static_lights: Vec<Light>,
    stationary: FixedTier,
    dynamic: FixedTier,
    dirty: TierMask,
    next_key: u64,
}

impl Default for LightTierManager {
    fn default() -> Self {
        Self::new(&LightingConfig::default())
    }
}

impl LightTierManager {
    /// Create a manager with the configured tier capacities
    pub fn new(config: &LightingConfig) -> Self {
        Self {
            static_lights: Vec::new(),
            stationary: FixedTier::new(config.stationary_capacity),
            dynamic: FixedTier::new(config.dynamic_capacity),
            dirty: TierMask::empty(),
            next_key: 0,
        }
    }

    /// Append a light to the static tier
    pub fn add_static(&mut self, light: Light) -> LightKey {
        let (key, light) = self.keyed(light, LightTier::Static);
        self.static_lights.push(light);
        self.dirty |= TierMask::STATIC;
        log::info!("Static light added");
        key
    }

    /// Place a light in a free stationary slot
    pub fn add_stationary(&mut self, light: Light) -> Result<LightKey, LightError> {
        self.add_fixed(light, LightTier::Stationary)
    }

    /// Place a light in a free dynamic slot
    pub fn add_dynamic(&mut self, light: Light) -> Result<LightKey, LightError> {
        self.add_fixed(light, LightTier::Dynamic)
    }

    /// Add a light to the tier matching `mobility`
    pub fn add(&mut self, light: Light, mobility: Mobility) -> Result<LightKey, LightError> {
        match LightTier::from_mobility(mobility) {
            LightTier::Static => Ok(self.add_static(light)),
            tier => self.add_fixed(light, tier),
        }
    }

    fn add_fixed(&mut self, light: Light, tier: LightTier) -> Result<LightKey, LightError> {
        let capacity = self.fixed(tier).map_or(0, FixedTier::capacity);
        if !self.has_room(tier) {
            log::warn!("Maximum {} light count reached ({}), light dropped", tier, capacity);
            return Err(LightError::TierFull { tier, capacity });
        }

        let (key, light) = self.keyed(light, tier);
        let inserted = self.fixed_mut(tier).and_then(|fixed| fixed.insert(light));
        if inserted.is_none() {
            return Err(LightError::TierFull { tier, capacity });
        }

        self.dirty |= tier.mask();
        log::info!("{} light added", tier);
        Ok(key)
    }

    fn keyed(&mut self, mut light: Light, tier: LightTier) -> (LightKey, Light) {
        let key = LightKey(self.next_key);
        self.next_key += 1;
        light.assign(key, tier.mobility());
        (key, light)
    }

    fn fixed(&self, tier: LightTier) -> Option<&FixedTier> {
        match tier {
            LightTier::Static => None,
            LightTier::Stationary => Some(&self.stationary),
            LightTier::Dynamic => Some(&self.dynamic),
        }
    }

    fn fixed_mut(&mut self, tier: LightTier) -> Option<&mut FixedTier> {
        match tier {
            LightTier::Static => None,
            LightTier::Stationary => Some(&mut self.stationary),
            LightTier::Dynamic => Some(&mut self.dynamic),
        }
    }

    /// Whether `tier` can take another light right now
    pub fn has_room(&self, tier: LightTier) -> bool {
        self.fixed(tier).map_or(true, |fixed| !fixed.allocator.is_full())
    }

    /// Request removal of a light; its slot is reclaimed at the next compaction
    pub fn remove(&mut self, key: LightKey) -> Result<(), LightError> {
        let tier = self.find_tier(key).ok_or(LightError::UnknownKey(key))?;
        if let Some(light) = self.get_mut(key) {
            light.request_removal();
        }
        self.dirty |= tier.mask();
        Ok(())
    }

    fn find_tier(&self, key: LightKey) -> Option<LightTier> {
        LightTier::ALL
            .into_iter()
            .find(|&tier| self.iter_tier(tier).any(|light| light.key() == Some(key)))
    }

    /// Light by key
    pub fn get(&self, key: LightKey) -> Option<&Light> {
        LightTier::ALL
            .into_iter()
            .find_map(|tier| self.iter_tier(tier).find(|light| light.key() == Some(key)))
    }

    /// Mutable light by key, for colour and attenuation edits
    pub fn get_mut(&mut self, key: LightKey) -> Option<&mut Light> {
        self.static_lights
            .iter_mut()
            .chain(self.stationary.iter_mut())
            .chain(self.dynamic.iter_mut())
            .find(|light| light.key() == Some(key))
    }

    /// Lights of one tier in upload order
    pub fn iter_tier(&self, tier: LightTier) -> Box<dyn Iterator<Item = &Light> + '_> {
        match tier {
            LightTier::Static => Box::new(self.static_lights.iter()),
            LightTier::Stationary => Box::new(self.stationary.iter()),
            LightTier::Dynamic => Box::new(self.dynamic.iter()),
        }
    }

    /// All lights in upload order
    pub fn iter(&self) -> impl Iterator<Item = &Light> + '_ {
        LightTier::ALL.into_iter().flat_map(|tier| self.iter_tier(tier))
    }

    /// Occupied entries of one tier
    ///
    /// For fixed tiers this is `high_water_mark - free_slots`.
    pub fn active_count(&self, tier: LightTier) -> u32 {
        match self.fixed(tier) {
            Some(fixed) => fixed.allocator.count(),
            None => self.static_lights.len() as u32,
        }
    }

    /// Occupied entries across all tiers
    pub fn total_active_count(&self) -> u32 {
        LightTier::ALL.into_iter().map(|tier| self.active_count(tier)).sum()
    }

    /// Capacity of a fixed tier, `None` for the static tier
    pub fn capacity(&self, tier: LightTier) -> Option<u32> {
        self.fixed(tier).map(FixedTier::capacity)
    }

    /// Whether `tier` owes a compaction pass
    pub fn is_dirty(&self, tier: LightTier) -> bool {
        self.dirty.contains(tier.mask())
    }

    /// Schedule every tier for compaction, e.g. after objects were swept
    pub fn mark_all_dirty(&mut self) {
        self.dirty = TierMask::all();
    }

    /// Drop expired lights from one tier
    ///
    /// The dirty flag is cleared only when every slot was released; a failed
    /// release leaves the tier dirty. Returns the number of lights reclaimed.
    pub fn compact(&mut self, tier: LightTier, registry: &SceneObjectRegistry) -> usize {
        let (reclaimed, failed) = match tier {
            LightTier::Static => {
                let before = self.static_lights.len();
                self.static_lights.retain(|light| !light.is_expired(registry));
                (before - self.static_lights.len(), 0)
            }
            LightTier::Stationary => self.stationary.compact(registry),
            LightTier::Dynamic => self.dynamic.compact(registry),
        };

        if failed == 0 {
            self.dirty.remove(tier.mask());
        } else {
            log::warn!("{} {} light slots failed to release, tier stays dirty", failed, tier);
        }
        if reclaimed > 0 {
            log::debug!("Reclaimed {} expired {} lights", reclaimed, tier);
        }
        reclaimed
    }

    /// Compact every dirty tier
    pub fn compact_dirty(&mut self, registry: &SceneObjectRegistry) -> usize {
        let dirty: Vec<LightTier> = LightTier::ALL
            .into_iter()
            .filter(|&tier| self.is_dirty(tier))
            .collect();
        dirty.into_iter().map(|tier| self.compact(tier, registry)).sum()
    }

    /// Write every light to `program` and set `activeLightCount`
    ///
    /// Binds the program, compacts dirty tiers, then walks Static, Stationary
    /// and Dynamic with one shared index. Each light's position and direction
    /// are re-derived from its visual object first. Missing uniforms are
    /// skipped with a warning and never abort the upload.
    pub fn upload(&mut self, registry: &SceneObjectRegistry, program: &dyn UniformSink) -> UploadReport {
        program.bind();
        self.compact_dirty(registry);

        let mut report = UploadReport::default();
        let tiers = [
            (TierMask::STATIC, self.static_lights.iter_mut().collect::<Vec<_>>()),
            (TierMask::STATIONARY, self.stationary.iter_mut().collect()),
            (TierMask::DYNAMIC, self.dynamic.iter_mut().collect()),
        ];

        let mut stale_tiers = TierMask::empty();
        for (mask, lights) in tiers {
            for light in lights {
                if !light.refresh(registry) {
                    log::warn!("Light {:?} lost its visual object, skipping", light.key());
                    stale_tiers |= mask;
                    report.stale_lights += 1;
                    continue;
                }
                report.missing_uniforms += write_light(program, report.lights_written, light);
                report.lights_written += 1;
            }
        }
        self.dirty |= stale_tiers;

        if !try_set(program, "activeLightCount", UniformValue::Uint(report.lights_written)) {
            report.missing_uniforms += 1;
        }
        report
    }
}

/// Write one `lights[index]` struct, returning the number of missing fields
fn write_light(program: &dyn UniformSink, index: u32, light: &Light) -> usize {
    let data = &light.data;
    let fields = [
        ("position", UniformValue::Vec3(data.position)),
        ("direction", UniformValue::Vec3(data.direction)),
        ("diffuse", UniformValue::Vec3(data.diffuse)),
        ("specular", UniformValue::Vec3(data.specular)),
        ("constant", UniformValue::Float(data.constant)),
        ("linear", UniformValue::Float(data.linear)),
        ("quadratic", UniformValue::Float(data.quadratic)),
        ("cutOff", UniformValue::Float(data.cut_off)),
        ("outerCutOff", UniformValue::Float(data.outer_cut_off)),
        ("type", UniformValue::Int(light.light_type().shader_value())),
    ];

    fields
        .into_iter()
        .filter(|(field, value)| !try_set(program, &format!("lights[{index}].{field}"), *value))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::lighting::{LightData, LightType};
    use crate::render::shader::RecordingProgram;

    fn point() -> Light {
        Light::new(LightType::Point, LightData::default())
    }

    fn small_config() -> LightingConfig {
        LightingConfig::default().with_capacities(2, 2)
    }

    #[test]
    fn test_tier_from_mobility() {
        assert_eq!(LightTier::from_mobility(Mobility::Static), LightTier::Static);
        assert_eq!(LightTier::from_mobility(Mobility::Dynamic), LightTier::Dynamic);
        assert_eq!(LightTier::from_mobility(Mobility::NonType), LightTier::Stationary);
    }

    #[test]
    fn test_fixed_tier_rejects_when_full() {
        let mut lights = LightTierManager::new(&small_config());
        lights.add_stationary(point()).unwrap();
        lights.add_stationary(point()).unwrap();

        assert_eq!(
            lights.add_stationary(point()),
            Err(LightError::TierFull {
                tier: LightTier::Stationary,
                capacity: 2
            })
        );
        assert_eq!(lights.active_count(LightTier::Stationary), 2);
        // Rejected lights are not promoted to another tier
        assert_eq!(lights.active_count(LightTier::Dynamic), 0);
        assert_eq!(lights.active_count(LightTier::Static), 0);
    }

    #[test]
    fn test_static_tier_is_unbounded() {
        let mut lights = LightTierManager::new(&small_config());
        for _ in 0..50 {
            lights.add_static(point());
        }
        assert_eq!(lights.active_count(LightTier::Static), 50);
        assert!(lights.has_room(LightTier::Static));
    }

    #[test]
    fn test_remove_waits_for_compaction() {
        let registry = SceneObjectRegistry::new();
        let mut lights = LightTierManager::new(&small_config());
        let key = lights.add_dynamic(point()).unwrap();
        lights.compact_dirty(&registry);
        assert!(!lights.is_dirty(LightTier::Dynamic));

        lights.remove(key).unwrap();
        assert!(lights.is_dirty(LightTier::Dynamic));
        assert_eq!(lights.active_count(LightTier::Dynamic), 1);

        assert_eq!(lights.compact(LightTier::Dynamic, &registry), 1);
        assert_eq!(lights.active_count(LightTier::Dynamic), 0);
        assert!(!lights.is_dirty(LightTier::Dynamic));
        assert_eq!(lights.remove(key), Err(LightError::UnknownKey(key)));
    }

    #[test]
    fn test_failed_release_keeps_tier_dirty() {
        let registry = SceneObjectRegistry::new();
        let mut lights = LightTierManager::new(&small_config());
        let key = lights.add_dynamic(point()).unwrap();
        lights.remove(key).unwrap();

        // Allocator that never handed out slot 0, so releasing it fails
        lights.dynamic.allocator = SlotAllocator::with_capacity(2);

        assert_eq!(lights.compact(LightTier::Dynamic, &registry), 0);
        assert!(lights.is_dirty(LightTier::Dynamic));
        assert!(lights.get(key).is_none());
    }

    #[test]
    fn test_compact_dirty_visits_every_dirty_tier() {
        let registry = SceneObjectRegistry::new();
        let mut lights = LightTierManager::new(&small_config());
        let stationary = lights.add_stationary(point()).unwrap();
        let dynamic = lights.add_dynamic(point()).unwrap();
        lights.remove(stationary).unwrap();
        lights.remove(dynamic).unwrap();

        assert_eq!(lights.compact_dirty(&registry), 2);
        assert!(LightTier::ALL.iter().all(|&tier| !lights.is_dirty(tier)));
        assert_eq!(lights.total_active_count(), 0);
    }

    #[test]
    fn test_upload_orders_tiers_with_shared_index() {
        let registry = SceneObjectRegistry::new();
        let mut lights = LightTierManager::default();
        lights.add_dynamic(Light::new(LightType::Spot, LightData::default())).unwrap();
        lights.add_stationary(Light::new(LightType::Directional, LightData::default())).unwrap();
        lights.add_static(point());

        let program = RecordingProgram::forward_lit(8);
        let report = lights.upload(&registry, &program);

        assert_eq!(report.lights_written, 3);
        assert_eq!(report.missing_uniforms, 0);
        assert_eq!(program.bind_count(), 1);
        assert_eq!(program.value("lights[0].type"), Some(UniformValue::Int(0)));
        assert_eq!(program.value("lights[1].type"), Some(UniformValue::Int(1)));
        assert_eq!(program.value("lights[2].type"), Some(UniformValue::Int(2)));
        assert_eq!(program.value("activeLightCount"), Some(UniformValue::Uint(3)));
        assert!(!lights.is_dirty(LightTier::Static));
    }

    #[test]
    fn test_upload_skips_freed_slots() {
        let registry = SceneObjectRegistry::new();
        let mut lights = LightTierManager::new(&small_config());
        let first = lights.add_stationary(point()).unwrap();
        lights.add_stationary(Light::new(LightType::Spot, LightData::default())).unwrap();
        lights.remove(first).unwrap();

        let program = RecordingProgram::forward_lit(4);
        let report = lights.upload(&registry, &program);

        assert_eq!(report.lights_written, 1);
        assert_eq!(program.value("lights[0].type"), Some(UniformValue::Int(2)));
        assert!(!program.was_written("lights[1].type"));
        assert_eq!(program.value("activeLightCount"), Some(UniformValue::Uint(1)));
    }

    #[test]
    fn test_get_mut_edits_colour() {
        let mut lights = LightTierManager::default();
        let key = lights.add_static(point());
        lights.get_mut(key).unwrap().data.diffuse = crate::foundation::math::Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(lights.get(key).unwrap().data.diffuse.x, 1.0);
        assert_eq!(lights.get(key).unwrap().mobility(), Mobility::Static);
        assert_eq!(lights.iter().count(), 1);
    }
}
