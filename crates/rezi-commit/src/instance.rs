use ahash::AHashMap;
use rezi_view::VNode;
use slab::Slab;

/// A mutable binding of a [`VNode`] to a stable identity. Identity lives
/// here, never on the `VNode` itself.
pub struct RuntimeInstance {
    pub instance_id: u32,
    pub vnode: VNode,
    /// Child instance ids, in tree order.
    pub children: Vec<u32>,
    /// Incremented every time this instance is updated in place (not on
    /// creation).
    pub generation: u32,
    /// Set by commit when this instance's own props/children identity
    /// changed, or any descendant is dirty; consumed by the renderer.
    pub dirty: bool,
    cleanup_effects: Vec<Box<dyn FnOnce()>>,
}

impl RuntimeInstance {
    pub(crate) fn new(instance_id: u32, vnode: VNode, children: Vec<u32>) -> Self {
        Self {
            instance_id,
            vnode,
            children,
            generation: 0,
            dirty: true,
            cleanup_effects: Vec::new(),
        }
    }

    /// Registers a cleanup closure run when this instance is disposed.
    pub fn on_dispose(&mut self, effect: impl FnOnce() + 'static) {
        self.cleanup_effects.push(Box::new(effect));
    }

    pub(crate) fn take_cleanup_effects(&mut self) -> Vec<Box<dyn FnOnce()>> {
        std::mem::take(&mut self.cleanup_effects)
    }
}

/// Arena-backed instance storage: a [`Slab`] indexed by slot (reused after
/// disposal) plus an `instanceId -> slot` index, since instance ids are
/// monotonic and never reissued while slab slots are.
#[derive(Default)]
pub struct InstanceRegistry {
    slab: Slab<RuntimeInstance>,
    id_to_slot: AHashMap<u32, usize>,
    next_id: u32,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self {
            slab: Slab::new(),
            id_to_slot: AHashMap::default(),
            next_id: 1,
        }
    }

    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.checked_add(1).expect("instance id space exhausted");
        id
    }

    pub fn insert(&mut self, id: u32, instance: RuntimeInstance) {
        let slot = self.slab.insert(instance);
        self.id_to_slot.insert(id, slot);
    }

    pub fn get(&self, id: u32) -> Option<&RuntimeInstance> {
        self.id_to_slot.get(&id).map(|&slot| &self.slab[slot])
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut RuntimeInstance> {
        let slot = *self.id_to_slot.get(&id)?;
        Some(&mut self.slab[slot])
    }

    pub fn remove(&mut self, id: u32) -> Option<RuntimeInstance> {
        let slot = self.id_to_slot.remove(&id)?;
        Some(self.slab.remove(slot))
    }

    pub fn live_count(&self) -> usize {
        self.slab.len()
    }
}
