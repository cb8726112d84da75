//! Gamepad registry
//!
//! Host-side model of the connected game controllers. The embedder connects
//! and disconnects pads and updates their state; the guest only ever sees
//! snapshots, either through handles or by slot index.
//!
//! Connection changes are queued as [`GamepadEvent`]s and delivered to the
//! guest on the next frame tick. Rumble effects queue the other way, for the
//! embedder to play on the physical device.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Axis and button counts of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamepadLayout {
    pub axes: usize,
    pub buttons: usize,
    pub haptics: bool,
}

impl GamepadLayout {
    /// The "standard" gamepad mapping: two sticks and 17 buttons
    pub const STANDARD: GamepadLayout = GamepadLayout {
        axes: 4,
        buttons: 17,
        haptics: true,
    };
}

impl Default for GamepadLayout {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Point-in-time state of one controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamepadSnapshot {
    /// Slot index, stable while connected
    pub index: u32,
    pub id: String,
    pub connected: bool,
    pub axes: Vec<f32>,
    pub buttons: Vec<bool>,
    pub haptics: bool,
}

impl GamepadSnapshot {
    fn new(index: u32, id: String, layout: GamepadLayout) -> Self {
        Self {
            index,
            id,
            connected: true,
            axes: vec![0.0; layout.axes],
            buttons: vec![false; layout.buttons],
            haptics: layout.haptics,
        }
    }
}

/// Connection change waiting to be delivered to the guest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamepadEvent {
    Connected(u32),
    Disconnected(u32),
}

/// A validated dual-motor rumble request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rumble {
    pub low_frequency: u16,
    pub high_frequency: u16,
    pub duration_ms: u32,
}

/// Error type for rumble validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RumbleError {
    #[error("rumble frequency {0} outside 0..=65535")]
    Frequency(i32),

    #[error("rumble duration must be positive, got {0} ms")]
    Duration(i32),
}

impl Rumble {
    /// Validate raw guest arguments
    pub fn new(
        low_frequency: i32,
        high_frequency: i32,
        duration_ms: i32,
    ) -> Result<Self, RumbleError> {
        let frequency = |value: i32| {
            u16::try_from(value).map_err(|_| RumbleError::Frequency(value))
        };
        let low_frequency = frequency(low_frequency)?;
        let high_frequency = frequency(high_frequency)?;
        let duration_ms = u32::try_from(duration_ms)
            .ok()
            .filter(|&ms| ms > 0)
            .ok_or(RumbleError::Duration(duration_ms))?;
        Ok(Self {
            low_frequency,
            high_frequency,
            duration_ms,
        })
    }
}

/// The set of connected controllers
#[derive(Debug, Default)]
pub struct Gamepads {
    slots: Vec<Option<GamepadSnapshot>>,
    events: VecDeque<GamepadEvent>,
    rumbles: Vec<Option<Rumble>>,
    pending_rumbles: Vec<(u32, Rumble)>,
}

impl Gamepads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a controller in the lowest free slot, returning its index
    pub fn connect(&mut self, id: impl Into<String>, layout: GamepadLayout) -> u32 {
        let slot = match self.slots.iter().position(Option::is_none) {
            Some(slot) => slot,
            None => {
                self.slots.push(None);
                self.rumbles.push(None);
                self.slots.len() - 1
            }
        };
        let index = slot as u32;
        let pad = GamepadSnapshot::new(index, id.into(), layout);
        tracing::info!(index, id = %pad.id, "gamepad connected");

        self.slots[slot] = Some(pad);
        self.rumbles[slot] = None;
        self.events.push_back(GamepadEvent::Connected(index));
        index
    }

    /// Disconnect a controller. Returns false if the slot was empty.
    pub fn disconnect(&mut self, index: u32) -> bool {
        let Some(slot) = self.slots.get_mut(index as usize) else {
            return false;
        };
        match slot.take() {
            Some(pad) => {
                tracing::info!(index, id = %pad.id, "gamepad disconnected");
                self.pending_rumbles.retain(|&(slot, _)| slot != index);
                self.events.push_back(GamepadEvent::Disconnected(index));
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: u32) -> Option<&GamepadSnapshot> {
        self.slots.get(index as usize)?.as_ref()
    }

    /// Set one axis. Returns false if the pad or axis does not exist.
    pub fn set_axis(&mut self, index: u32, axis: usize, value: f32) -> bool {
        self.pad_mut(index)
            .and_then(|pad| pad.axes.get_mut(axis))
            .map(|slot| *slot = value.clamp(-1.0, 1.0))
            .is_some()
    }

    /// Set one button. Returns false if the pad or button does not exist.
    pub fn set_button(&mut self, index: u32, button: usize, pressed: bool) -> bool {
        self.pad_mut(index)
            .and_then(|pad| pad.buttons.get_mut(button))
            .map(|slot| *slot = pressed)
            .is_some()
    }

    /// Snapshot of every slot, `None` where nothing is connected
    pub fn snapshot_list(&self) -> Vec<Option<GamepadSnapshot>> {
        self.slots.clone()
    }

    pub fn connected_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn has_haptics(&self, index: u32) -> bool {
        self.get(index).is_some_and(|pad| pad.haptics)
    }

    /// Play a rumble effect. Returns false if the pad cannot rumble.
    pub fn rumble(&mut self, index: u32, rumble: Rumble) -> bool {
        if !self.has_haptics(index) {
            tracing::debug!(index, "rumble requested on a pad without haptics");
            return false;
        }
        tracing::debug!(index, ?rumble, "rumble");
        if let Some(slot) = self.rumbles.get_mut(index as usize) {
            *slot = Some(rumble);
        }
        self.pending_rumbles.push((index, rumble));
        true
    }

    /// Take the effects played since the last call, oldest first
    pub fn drain_rumbles(&mut self) -> Vec<(u32, Rumble)> {
        std::mem::take(&mut self.pending_rumbles)
    }

    /// The most recent effect played on a pad
    pub fn last_rumble(&self, index: u32) -> Option<Rumble> {
        self.rumbles.get(index as usize).copied().flatten()
    }

    /// Take all queued connection events, oldest first
    pub fn drain_events(&mut self) -> Vec<GamepadEvent> {
        self.events.drain(..).collect()
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    fn pad_mut(&mut self, index: u32) -> Option<&mut GamepadSnapshot> {
        self.slots.get_mut(index as usize)?.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_uses_lowest_free_slot() {
        let mut pads = Gamepads::new();
        assert_eq!(pads.connect("a", GamepadLayout::STANDARD), 0);
        assert_eq!(pads.connect("b", GamepadLayout::STANDARD), 1);
        assert_eq!(pads.connect("c", GamepadLayout::STANDARD), 2);

        assert!(pads.disconnect(1));
        assert_eq!(pads.connect("d", GamepadLayout::STANDARD), 1);
        assert_eq!(pads.get(1).unwrap().id, "d");
        assert_eq!(pads.connected_count(), 3);
    }

    #[test]
    fn test_snapshot_list_keeps_empty_slots() {
        let mut pads = Gamepads::new();
        pads.connect("a", GamepadLayout::STANDARD);
        pads.connect("b", GamepadLayout::STANDARD);
        pads.disconnect(0);

        let list = pads.snapshot_list();
        assert_eq!(list.len(), 2);
        assert!(list[0].is_none());
        assert_eq!(list[1].as_ref().unwrap().index, 1);
    }

    #[test]
    fn test_events_queue_in_order() {
        let mut pads = Gamepads::new();
        pads.connect("a", GamepadLayout::STANDARD);
        pads.disconnect(0);
        assert!(!pads.disconnect(0));

        assert_eq!(
            pads.drain_events(),
            vec![GamepadEvent::Connected(0), GamepadEvent::Disconnected(0)]
        );
        assert!(!pads.has_events());
    }

    #[test]
    fn test_state_updates() {
        let mut pads = Gamepads::new();
        let index = pads.connect("a", GamepadLayout::STANDARD);

        assert!(pads.set_axis(index, 1, -0.5));
        assert!(pads.set_axis(index, 0, 3.0));
        assert!(pads.set_button(index, 16, true));
        assert!(!pads.set_axis(index, 4, 0.0));
        assert!(!pads.set_button(7, 0, true));

        let pad = pads.get(index).unwrap();
        assert_eq!(pad.axes, vec![1.0, -0.5, 0.0, 0.0]);
        assert!(pad.buttons[16]);
    }

    #[test]
    fn test_rumble_validation() {
        assert_eq!(
            Rumble::new(0, 0xFFFF, 1),
            Ok(Rumble {
                low_frequency: 0,
                high_frequency: 0xFFFF,
                duration_ms: 1
            })
        );
        assert_eq!(Rumble::new(-1, 0, 10), Err(RumbleError::Frequency(-1)));
        assert_eq!(
            Rumble::new(0, 0x10000, 10),
            Err(RumbleError::Frequency(0x10000))
        );
        assert_eq!(Rumble::new(0, 0, 0), Err(RumbleError::Duration(0)));
        assert_eq!(Rumble::new(0, 0, -5), Err(RumbleError::Duration(-5)));
    }

    #[test]
    fn test_rumble_requires_haptics() {
        let mut pads = Gamepads::new();
        let plain = pads.connect(
            "plain",
            GamepadLayout {
                haptics: false,
                ..GamepadLayout::STANDARD
            },
        );
        let rumbly = pads.connect("rumbly", GamepadLayout::STANDARD);
        let effect = Rumble::new(100, 200, 300).unwrap();

        assert!(!pads.rumble(plain, effect));
        assert_eq!(pads.last_rumble(plain), None);
        assert!(pads.rumble(rumbly, effect));
        assert_eq!(pads.last_rumble(rumbly), Some(effect));
        assert_eq!(pads.drain_rumbles(), vec![(rumbly, effect)]);
        assert!(pads.drain_rumbles().is_empty());
    }

    #[test]
    fn test_disconnect_drops_queued_rumbles() {
        let mut pads = Gamepads::new();
        let first = pads.connect("first", GamepadLayout::STANDARD);
        let second = pads.connect("second", GamepadLayout::STANDARD);
        let effect = Rumble::new(1, 2, 3).unwrap();

        pads.rumble(first, effect);
        pads.rumble(second, effect);
        pads.disconnect(first);
        assert_eq!(pads.drain_rumbles(), vec![(second, effect)]);
    }
}
