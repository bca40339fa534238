//! Scene object registry
//!
//! Owns every scene object. Each live object has one id, one unique name and
//! one storage slot; ids and slots come from two independent
//! [`SlotAllocator`]s so both are recycled before the registry grows.
//!
//! Deletion is two-phase. [`SceneObjectRegistry::mark_for_deletion`] only
//! flags the object, which stays findable and iterable. The flagged objects
//! are physically removed by [`SceneObjectRegistry::sweep`], which the frame
//! driver runs once at the start of each frame.

use std::collections::HashMap;

use thiserror::Error;

use crate::foundation::collections::{SlotAllocator, SlotError};
use crate::scene::input::InputContext;
use crate::scene::scene_object::{ObjectHandle, ObjectId, SceneObject};

/// Registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Another live object already uses the name
    #[error("an object named '{0}' already exists")]
    DuplicateName(String),

    /// Objects need a name to be findable
    #[error("object name cannot be empty")]
    EmptyName,

    /// Id or slot allocation failed
    #[error(transparent)]
    Slot(#[from] SlotError),
}

/// Slotted storage for all scene objects
#[derive(Debug, Default)]
pub struct SceneObjectRegistry {
    ids: SlotAllocator,
    slots: SlotAllocator,
    storage: Vec<Option<SceneObject>>,
    generations: Vec<u32>,
    /// id -> storage slot
    id_slots: Vec<Option<u32>>,
    name_index: HashMap<String, u32>,
    needs_sweep: bool,
}

impl SceneObjectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object and assign its id
    ///
    /// Rejects empty and duplicate names; the registry is unchanged on error.
    pub fn create(&mut self, mut object: SceneObject) -> Result<ObjectHandle, RegistryError> {
        if object.name().is_empty() {
            log::error!("Refusing to register an object without a name");
            return Err(RegistryError::EmptyName);
        }
        if self.name_index.contains_key(object.name()) {
            log::warn!("Object '{}' already exists, creation rejected", object.name());
            return Err(RegistryError::DuplicateName(object.name().to_string()));
        }

        let id = self.ids.acquire()?;
        let index = match self.slots.acquire() {
            Ok(index) => index,
            Err(e) => {
                self.ids.release(id)?;
                return Err(e.into());
            }
        };

        let slot = index as usize;
        if slot == self.storage.len() {
            self.storage.push(None);
            self.generations.push(0);
        }
        let id_slot = id as usize;
        if id_slot >= self.id_slots.len() {
            self.id_slots.resize(id_slot + 1, None);
        }

        let object_id = ObjectId(id);
        object.assign_id(object_id);
        self.name_index.insert(object.name().to_string(), index);
        self.id_slots[id_slot] = Some(index);
        log::debug!("Registered '{}' as {} in slot {}", object.name(), object_id, index);
        self.storage[slot] = Some(object);

        Ok(ObjectHandle {
            id: object_id,
            index,
            generation: self.generations[slot],
        })
    }

    /// Look up an object by name, logging a warning on a miss
    pub fn find_by_name(&self, name: &str) -> Option<&SceneObject> {
        let found = self.name_index.get(name).and_then(|&index| self.slot(index));
        if found.is_none() {
            log::warn!("Object with name '{}' not found", name);
        }
        found
    }

    /// Mutable lookup by name, logging a warning on a miss
    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        let Some(&index) = self.name_index.get(name) else {
            log::warn!("Object with name '{}' not found", name);
            return None;
        };
        self.storage.get_mut(index as usize).and_then(Option::as_mut)
    }

    /// Whether a live object uses `name`
    pub fn contains(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    /// Current handle of the object named `name`
    pub fn handle_of(&self, name: &str) -> Option<ObjectHandle> {
        let &index = self.name_index.get(name)?;
        self.handle_at(index)
    }

    /// Resolve a handle; stale handles return `None`
    pub fn get(&self, handle: ObjectHandle) -> Option<&SceneObject> {
        if self.generations.get(handle.index as usize) != Some(&handle.generation) {
            return None;
        }
        self.slot(handle.index).filter(|object| object.id() == Some(handle.id))
    }

    /// Resolve a handle mutably; stale handles return `None`
    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut SceneObject> {
        if self.generations.get(handle.index as usize) != Some(&handle.generation) {
            return None;
        }
        self.storage
            .get_mut(handle.index as usize)
            .and_then(Option::as_mut)
            .filter(|object| object.id() == Some(handle.id))
    }

    /// Look up a live object by id
    pub fn get_by_id(&self, id: ObjectId) -> Option<&SceneObject> {
        let index = self.id_slots.get(id.0 as usize).copied().flatten()?;
        self.slot(index)
    }

    /// Flag `name` for removal at the next sweep
    ///
    /// Unknown names are tolerated with a warning. Returns whether an object
    /// was flagged.
    pub fn mark_for_deletion(&mut self, name: &str) -> bool {
        let Some(object) = self.name_index.get(name).and_then(|&index| self.storage[index as usize].as_mut()) else {
            log::warn!("Cannot delete '{}': no such object", name);
            return false;
        };
        object.mark_for_deletion();
        self.needs_sweep = true;
        log::debug!("Marked '{}' for deletion", name);
        true
    }

    /// Flag the object behind `handle` for removal at the next sweep
    pub fn mark_handle_for_deletion(&mut self, handle: ObjectHandle) -> bool {
        let Some(object) = self.get_mut(handle) else {
            log::warn!("Cannot delete {}: handle is stale", handle.id);
            return false;
        };
        object.mark_for_deletion();
        self.needs_sweep = true;
        true
    }

    /// Remove every flagged object, recycling its id and slot
    ///
    /// Returns the number of objects removed. Cheap when nothing is flagged.
    pub fn sweep(&mut self) -> usize {
        if !self.needs_sweep {
            return 0;
        }

        let mut removed = 0;
        for index in 0..self.storage.len() {
            let marked = self.storage[index]
                .as_ref()
                .is_some_and(SceneObject::is_marked_for_deletion);
            if !marked {
                continue;
            }
            let Some(object) = self.storage[index].take() else {
                continue;
            };

            self.generations[index] = self.generations[index].wrapping_add(1);
            self.name_index.remove(object.name());

            let slot = index as u32;
            if let Err(e) = self.slots.release(slot) {
                log::error!("Slot {} could not be recycled: {}", slot, e);
            }
            if let Some(id) = object.id() {
                self.id_slots[id.0 as usize] = None;
                if let Err(e) = self.ids.release(id.0) {
                    log::error!("Id {} could not be recycled: {}", id, e);
                }
            }

            log::debug!("Swept '{}'", object.name());
            removed += 1;
        }

        self.needs_sweep = false;
        if removed > 0 {
            log::info!("Cleaned up {} marked objects", removed);
        }
        removed
    }

    /// Live objects in slot order, including ones flagged for deletion
    pub fn iter_live(&self) -> impl Iterator<Item = (ObjectHandle, &SceneObject)> + '_ {
        self.storage.iter().enumerate().filter_map(move |(index, slot)| {
            let object = slot.as_ref()?;
            Some((self.make_handle(index, object)?, object))
        })
    }

    /// Visit every live object
    pub fn for_each_live<F>(&self, mut f: F)
    where
        F: FnMut(ObjectHandle, &SceneObject),
    {
        for (handle, object) in self.iter_live() {
            f(handle, object);
        }
    }

    /// Visit every live object mutably
    pub fn for_each_live_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(ObjectHandle, &mut SceneObject),
    {
        for (index, slot) in self.storage.iter_mut().enumerate() {
            let Some(object) = slot.as_mut() else {
                continue;
            };
            let Some(id) = object.id() else {
                continue;
            };
            let handle = ObjectHandle {
                id,
                index: index as u32,
                generation: self.generations[index],
            };
            f(handle, object);
        }
    }

    /// Run every object's input behaviour; flagged objects are left alone
    pub fn update_inputs(&mut self, ctx: &InputContext) {
        self.for_each_live_mut(|_, object| {
            if object.is_marked_for_deletion() {
                return;
            }
            if let Some(input) = object.input().cloned() {
                input.update(&mut object.transform, ctx);
            }
        });
    }

    /// Names of live objects, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.name_index.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.name_index.len()
    }

    /// Whether there are no live objects
    pub fn is_empty(&self) -> bool {
        self.name_index.is_empty()
    }

    /// Whether a sweep has work to do
    pub fn has_pending_deletions(&self) -> bool {
        self.needs_sweep
    }

    /// Storage slots ever allocated
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Verify that names, ids and slots agree for every live object
    pub fn check_consistency(&self) -> Result<(), String> {
        for (name, &index) in &self.name_index {
            let object = self
                .slot(index)
                .ok_or_else(|| format!("'{name}' points at empty slot {index}"))?;
            if object.name() != name {
                return Err(format!("slot {index} holds '{}' but is indexed as '{name}'", object.name()));
            }
            let id = object.id().ok_or_else(|| format!("'{name}' has no id"))?;
            if self.id_slots.get(id.0 as usize).copied().flatten() != Some(index) {
                return Err(format!("id {id} of '{name}' does not map to slot {index}"));
            }
        }

        let occupied = self.storage.iter().filter(|slot| slot.is_some()).count();
        let mapped_ids = self.id_slots.iter().filter(|slot| slot.is_some()).count();
        let counts = [
            occupied,
            mapped_ids,
            self.ids.count() as usize,
            self.slots.count() as usize,
        ];
        if counts.iter().any(|&count| count != self.name_index.len()) {
            return Err(format!(
                "live counts disagree: names {}, slots {}, ids {}, id allocator {}, slot allocator {}",
                self.name_index.len(),
                counts[0],
                counts[1],
                counts[2],
                counts[3]
            ));
        }
        Ok(())
    }

    fn slot(&self, index: u32) -> Option<&SceneObject> {
        self.storage.get(index as usize).and_then(Option::as_ref)
    }

    fn handle_at(&self, index: u32) -> Option<ObjectHandle> {
        let object = self.slot(index)?;
        self.make_handle(index as usize, object)
    }

    fn make_handle(&self, index: usize, object: &SceneObject) -> Option<ObjectHandle> {
        Some(ObjectHandle {
            id: object.id()?,
            index: index as u32,
            generation: self.generations[index],
        })
    }
}
