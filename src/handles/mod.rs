//! Handle Table
//!
//! Maps small integer handles to host objects the guest cannot represent in
//! linear memory. Freed slots are tombstoned and reused (lowest index first)
//! before the table grows.
//!
//! Every entry carries an explicit [`ObjectKind`] so that asking for the wrong
//! kind of object through a handle fails with [`HandleError::TypeMismatch`]
//! instead of being silently reinterpreted.

use std::fmt;

use crate::gamepad::GamepadSnapshot;

/// Host-assigned reference to a host object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(i32);

impl Handle {
    /// The reserved handle denoting "no object"
    pub const NULL: Handle = Handle(-1);

    /// Wrap a raw value received from the guest
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw value handed to the guest
    pub const fn raw(self) -> i32 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == Self::NULL.0
    }

    fn slot(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("null")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Kind tag of a host object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Snapshot of the connected gamepads (the array-like kind)
    GamepadList,
    /// Snapshot of a single gamepad
    Gamepad,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::GamepadList => f.write_str("gamepad list"),
            ObjectKind::Gamepad => f.write_str("gamepad"),
        }
    }
}

/// A host object referenced by the guest through a handle
#[derive(Debug, Clone, PartialEq)]
pub enum HostObject {
    GamepadList(Vec<Option<GamepadSnapshot>>),
    Gamepad(GamepadSnapshot),
}

impl HostObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            HostObject::GamepadList(_) => ObjectKind::GamepadList,
            HostObject::Gamepad(_) => ObjectKind::Gamepad,
        }
    }

    /// Elements of an array-like object, `None` for absent entries
    pub fn elements(&self) -> Option<Vec<Option<HostObject>>> {
        match self {
            HostObject::GamepadList(pads) => Some(
                pads.iter()
                    .map(|pad| pad.clone().map(HostObject::Gamepad))
                    .collect(),
            ),
            HostObject::Gamepad(_) => None,
        }
    }
}

/// Error type for handle lookups
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    #[error("null handle")]
    Null,

    #[error("handle {0} does not refer to a live object")]
    Dangling(Handle),

    #[error("handle {handle} refers to a {found}, expected a {expected}")]
    TypeMismatch {
        handle: Handle,
        expected: ObjectKind,
        found: ObjectKind,
    },

    #[error("{0} is not array-like")]
    NotArray(Handle),
}

/// Table of host objects addressed by [`Handle`]
#[derive(Debug, Clone)]
pub struct HandleTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Store an object, reusing the lowest freed slot if there is one
    pub fn add(&mut self, object: T) -> Handle {
        let index = match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(object);
                index
            }
            None => {
                self.slots.push(Some(object));
                self.slots.len() - 1
            }
        };
        // Slot count is bounded by guest calls, far below i32::MAX in practice
        Handle(index as i32)
    }

    /// Store an optional object; `None` maps to the null handle
    pub fn add_optional(&mut self, object: Option<T>) -> Handle {
        match object {
            Some(object) => self.add(object),
            None => Handle::NULL,
        }
    }

    /// Look up an object. The null handle and freed handles yield `None`.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots.get(handle.slot()?)?.as_ref()
    }

    /// Like [`get`](Self::get) but distinguishes the failure cases
    pub fn try_get(&self, handle: Handle) -> Result<&T, HandleError> {
        if handle.is_null() {
            return Err(HandleError::Null);
        }
        self.get(handle).ok_or(HandleError::Dangling(handle))
    }

    /// Free a handle, returning the object it referred to
    pub fn remove(&mut self, handle: Handle) -> Result<T, HandleError> {
        if handle.is_null() {
            return Err(HandleError::Null);
        }
        handle
            .slot()
            .and_then(|slot| self.slots.get_mut(slot))
            .and_then(Option::take)
            .ok_or(HandleError::Dangling(handle))
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots, live or freed
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl HandleTable<HostObject> {
    /// Look up a gamepad snapshot
    pub fn gamepad(&self, handle: Handle) -> Result<&GamepadSnapshot, HandleError> {
        match self.try_get(handle)? {
            HostObject::Gamepad(pad) => Ok(pad),
            other => Err(HandleError::TypeMismatch {
                handle,
                expected: ObjectKind::Gamepad,
                found: other.kind(),
            }),
        }
    }

    /// Look up a gamepad list snapshot
    pub fn gamepad_list(&self, handle: Handle) -> Result<&[Option<GamepadSnapshot>], HandleError> {
        match self.try_get(handle)? {
            HostObject::GamepadList(pads) => Ok(pads),
            other => Err(HandleError::TypeMismatch {
                handle,
                expected: ObjectKind::GamepadList,
                found: other.kind(),
            }),
        }
    }

    /// Elements of an array-like object
    pub fn array_elements(&self, handle: Handle) -> Result<Vec<Option<HostObject>>, HandleError> {
        self.try_get(handle)?
            .elements()
            .ok_or(HandleError::NotArray(handle))
    }
}
