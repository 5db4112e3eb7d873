//! Minimal host object model
//!
//! [`HostWorld`] is a generational table of named objects, each carrying a
//! bag of components keyed by type. Every object is spawned with a
//! [`Transform`]. Scripts see it only through [`HostAccess`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use void_script_api::{HostAccess, HostId, Transform};

/// One object in the world
pub struct HostObject {
    name: String,
    components: HashMap<TypeId, Box<dyn Any>>,
}

impl HostObject {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component<T: Any>(&self) -> Option<&T> {
        self.components.get(&TypeId::of::<T>())?.downcast_ref()
    }

    pub fn component_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.components.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }
}

struct Slot {
    generation: u32,
    object: Option<HostObject>,
}

/// Generational table of host objects
#[derive(Default)]
pub struct HostWorld {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
}

impl HostWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an object with a default [`Transform`]
    pub fn spawn(&mut self, name: impl Into<String>) -> HostId {
        let mut components: HashMap<TypeId, Box<dyn Any>> = HashMap::new();
        components.insert(TypeId::of::<Transform>(), Box::new(Transform::default()));
        let object = HostObject {
            name: name.into(),
            components,
        };

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            HostId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                object: Some(object),
            });
            HostId::new(index, 0)
        }
    }

    /// Remove an object. Ids referring to it become stale.
    pub fn despawn(&mut self, id: HostId) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        slot.object = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        true
    }

    fn slot(&self, id: HostId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.object.is_some())
    }

    fn slot_mut(&mut self, id: HostId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.object.is_some())
    }

    pub fn contains(&self, id: HostId) -> bool {
        self.slot(id).is_some()
    }

    pub fn get(&self, id: HostId) -> Option<&HostObject> {
        self.slot(id)?.object.as_ref()
    }

    pub fn get_mut(&mut self, id: HostId) -> Option<&mut HostObject> {
        self.slot_mut(id)?.object.as_mut()
    }

    /// Attach or replace a component; false if `id` is stale
    pub fn insert_component<T: Any>(&mut self, id: HostId, component: T) -> bool {
        match self.get_mut(id) {
            Some(object) => {
                object
                    .components
                    .insert(TypeId::of::<T>(), Box::new(component));
                true
            }
            None => false,
        }
    }

    pub fn component<T: Any>(&self, id: HostId) -> Option<&T> {
        self.get(id)?.component::<T>()
    }

    pub fn component_mut<T: Any>(&mut self, id: HostId) -> Option<&mut T> {
        self.get_mut(id)?.component_mut::<T>()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.object.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (HostId, &HostObject)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.object
                .as_ref()
                .map(|object| (HostId::new(index as u32, slot.generation), object))
        })
    }
}

impl HostAccess for HostWorld {
    fn is_alive(&self, host: HostId) -> bool {
        self.contains(host)
    }

    fn component_mut(&mut self, host: HostId, type_id: TypeId) -> Option<&mut dyn Any> {
        self.get_mut(host)?
            .components
            .get_mut(&type_id)
            .map(|component| &mut **component)
    }

    fn log(&self, host: HostId, message: &str) {
        let name = self.get(host).map_or("<dead>", HostObject::name);
        log::info!(target: "script", "[{}] {}", name, message);
    }
}
