//! Kernel objects that cross the IPC boundary as handles.
//!
//! Only the surface HLE services touch is modelled: shared memory blocks that
//! services retain and name, and events that services hand back to guests.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Guest-visible handle value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u32);

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle(0x{:08X})", self.0)
    }
}

/// A shared memory block mapped by a guest process.
#[derive(Debug)]
pub struct SharedMemory {
    size: u32,
    name: Mutex<String>,
}

impl SharedMemory {
    pub fn new(size: u32, name: impl Into<String>) -> Self {
        Self {
            size,
            name: Mutex::new(name.into()),
        }
    }

    /// Size of the block in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Debug name of the block.
    pub fn name(&self) -> String {
        match self.name.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the debug name.
    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        match self.name.lock() {
            Ok(mut guard) => *guard = name,
            Err(poisoned) => *poisoned.into_inner() = name,
        }
    }
}

/// How an event clears after a waiter observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetType {
    OneShot,
    Sticky,
    Pulse,
}

/// A waitable kernel event.
#[derive(Debug)]
pub struct Event {
    name: String,
    reset_type: ResetType,
    signaled: AtomicBool,
}

impl Event {
    pub fn new(reset_type: ResetType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reset_type,
            signaled: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reset_type(&self) -> ResetType {
        self.reset_type
    }

    pub fn signal(&self) {
        self.signaled.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.signaled.store(false, Ordering::SeqCst);
    }

    /// Whether the event is signaled. One-shot events clear on observation.
    pub fn poll(&self) -> bool {
        match self.reset_type {
            ResetType::OneShot => self.signaled.swap(false, Ordering::SeqCst),
            ResetType::Sticky | ResetType::Pulse => self.signaled.load(Ordering::SeqCst),
        }
    }
}

/// Any object a handle may refer to.
#[derive(Debug, Clone)]
pub enum KernelObject {
    SharedMemory(Arc<SharedMemory>),
    Event(Arc<Event>),
}

/// Typed access into [`KernelObject`].
pub trait KernelObjectKind: Sized {
    /// Human-readable kind, used in logs.
    const KIND: &'static str;

    fn from_object(object: &KernelObject) -> Option<Arc<Self>>;
    fn into_object(this: Arc<Self>) -> KernelObject;
}

impl KernelObjectKind for SharedMemory {
    const KIND: &'static str = "SharedMemory";

    fn from_object(object: &KernelObject) -> Option<Arc<Self>> {
        match object {
            KernelObject::SharedMemory(memory) => Some(Arc::clone(memory)),
            _ => None,
        }
    }

    fn into_object(this: Arc<Self>) -> KernelObject {
        KernelObject::SharedMemory(this)
    }
}

impl KernelObjectKind for Event {
    const KIND: &'static str = "Event";

    fn from_object(object: &KernelObject) -> Option<Arc<Self>> {
        match object {
            KernelObject::Event(event) => Some(Arc::clone(event)),
            _ => None,
        }
    }

    fn into_object(this: Arc<Self>) -> KernelObject {
        KernelObject::Event(this)
    }
}

/// Per-process table from handle values to kernel objects.
#[derive(Debug)]
pub struct HandleTable {
    objects: HashMap<Handle, KernelObject>,
    next_handle: u32,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self {
            objects: HashMap::new(),
            next_handle: 0x100,
        }
    }
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object and return its fresh handle.
    pub fn create<T: KernelObjectKind>(&mut self, object: Arc<T>) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        self.objects.insert(handle, T::into_object(object));
        handle
    }

    /// Look up a handle as a specific object kind.
    pub fn get<T: KernelObjectKind>(&self, handle: Handle) -> Option<Arc<T>> {
        self.objects.get(&handle).and_then(T::from_object)
    }

    /// Close a handle, returning the object it referred to.
    pub fn close(&mut self, handle: Handle) -> Option<KernelObject> {
        self.objects.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
