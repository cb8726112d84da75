//! Physical controllers through gilrs
//!
//! Connection changes, stick motion and button presses are copied into the
//! host's [`Gamepads`] registry. Rumble effects the guest plays are sent
//! back to the device's force feedback.

use std::collections::HashMap;

use gilrs::ff::{BaseEffect, BaseEffectType, Effect, EffectBuilder, Repeat, Replay, Ticks};
use gilrs::{Axis, Button, EventType, GamepadId, Gilrs};
use tracing::{debug, warn};

use crate::gamepad::{GamepadLayout, Gamepads, Rumble};

pub struct GamepadBackend {
    gilrs: Gilrs,
    /// Registry slot of every connected device
    slots: HashMap<GamepadId, u32>,
    /// Effects kept alive while they play
    effects: HashMap<GamepadId, Effect>,
}

impl GamepadBackend {
    /// `None` when the platform has no gamepad support
    pub fn new() -> Option<Self> {
        match Gilrs::new() {
            Ok(gilrs) => Some(Self {
                gilrs,
                slots: HashMap::new(),
                effects: HashMap::new(),
            }),
            Err(err) => {
                warn!(error = %err, "gamepad support unavailable");
                None
            }
        }
    }

    /// Register the devices plugged in before the window opened
    pub fn connect_present(&mut self, pads: &mut Gamepads) {
        let present: Vec<GamepadId> = self
            .gilrs
            .gamepads()
            .filter(|(_, gamepad)| gamepad.is_connected())
            .map(|(id, _)| id)
            .collect();
        for id in present {
            self.connect(id, pads);
        }
    }

    /// Apply every pending device event to the registry
    pub fn poll(&mut self, pads: &mut Gamepads) {
        while let Some(event) = self.gilrs.next_event() {
            let id = event.id;
            match event.event {
                EventType::Connected => self.connect(id, pads),
                EventType::Disconnected => self.disconnect(id, pads),
                EventType::AxisChanged(axis, value, _) => {
                    if let (Some(&slot), Some(index)) = (self.slots.get(&id), axis_index(axis)) {
                        pads.set_axis(slot, index, axis_value(axis, value));
                    }
                }
                EventType::ButtonPressed(button, _) => self.set_button(id, button, true, pads),
                EventType::ButtonReleased(button, _) => self.set_button(id, button, false, pads),
                _ => {}
            }
        }
    }

    /// Play the rumbles the guest requested since the last call
    pub fn play_rumbles(&mut self, pads: &mut Gamepads) {
        for (slot, rumble) in pads.drain_rumbles() {
            let Some(id) = self.device(slot) else {
                continue;
            };
            match rumble_effect(rumble, id, &mut self.gilrs) {
                Ok(effect) => {
                    if let Err(err) = effect.play() {
                        warn!(slot, error = %err, "failed to play rumble");
                        continue;
                    }
                    // replacing the previous effect stops it
                    self.effects.insert(id, effect);
                }
                Err(err) => warn!(slot, error = %err, "failed to build rumble"),
            }
        }
    }

    fn connect(&mut self, id: GamepadId, pads: &mut Gamepads) {
        if self.slots.contains_key(&id) {
            return;
        }
        let gamepad = self.gilrs.gamepad(id);
        let layout = GamepadLayout {
            haptics: gamepad.is_ff_supported(),
            ..GamepadLayout::STANDARD
        };
        let slot = pads.connect(gamepad.name(), layout);
        debug!(slot, ?id, "device mapped");
        self.slots.insert(id, slot);
    }

    fn disconnect(&mut self, id: GamepadId, pads: &mut Gamepads) {
        self.effects.remove(&id);
        if let Some(slot) = self.slots.remove(&id) {
            pads.disconnect(slot);
        }
    }

    fn set_button(&self, id: GamepadId, button: Button, pressed: bool, pads: &mut Gamepads) {
        if let (Some(&slot), Some(index)) = (self.slots.get(&id), button_index(button)) {
            pads.set_button(slot, index, pressed);
        }
    }

    fn device(&self, slot: u32) -> Option<GamepadId> {
        self.slots
            .iter()
            .find_map(|(&id, &mapped)| (mapped == slot).then_some(id))
    }
}

fn rumble_effect(
    rumble: Rumble,
    id: GamepadId,
    gilrs: &mut Gilrs,
) -> Result<Effect, gilrs::ff::Error> {
    let duration = Ticks::from_ms(rumble.duration_ms);
    let motor = |kind| BaseEffect {
        kind,
        scheduling: Replay {
            play_for: duration,
            ..Default::default()
        },
        envelope: Default::default(),
    };
    EffectBuilder::new()
        .add_effect(motor(BaseEffectType::Strong {
            magnitude: rumble.low_frequency,
        }))
        .add_effect(motor(BaseEffectType::Weak {
            magnitude: rumble.high_frequency,
        }))
        .repeat(Repeat::For(duration))
        .gamepads(&[id])
        .finish(gilrs)
}

/// Position of an axis in the standard mapping
pub fn axis_index(axis: Axis) -> Option<usize> {
    match axis {
        Axis::LeftStickX => Some(0),
        Axis::LeftStickY => Some(1),
        Axis::RightStickX => Some(2),
        Axis::RightStickY => Some(3),
        _ => None,
    }
}

/// Standard mapping points the vertical axes down; gilrs points them up
pub fn axis_value(axis: Axis, value: f32) -> f32 {
    match axis {
        Axis::LeftStickY | Axis::RightStickY => -value,
        _ => value,
    }
}

/// Position of a button in the standard mapping
pub fn button_index(button: Button) -> Option<usize> {
    let index = match button {
        Button::South => 0,
        Button::East => 1,
        Button::West => 2,
        Button::North => 3,
        Button::LeftTrigger => 4,
        Button::RightTrigger => 5,
        Button::LeftTrigger2 => 6,
        Button::RightTrigger2 => 7,
        Button::Select => 8,
        Button::Start => 9,
        Button::LeftThumb => 10,
        Button::RightThumb => 11,
        Button::DPadUp => 12,
        Button::DPadDown => 13,
        Button::DPadLeft => 14,
        Button::DPadRight => 15,
        Button::Mode => 16,
        _ => return None,
    };
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axes_follow_standard_mapping() {
        assert_eq!(axis_index(Axis::LeftStickX), Some(0));
        assert_eq!(axis_index(Axis::RightStickY), Some(3));
        assert_eq!(axis_index(Axis::LeftZ), None);
        assert_eq!(axis_index(Axis::DPadX), None);
    }

    #[test]
    fn test_vertical_axes_are_flipped() {
        assert_eq!(axis_value(Axis::LeftStickY, 0.5), -0.5);
        assert_eq!(axis_value(Axis::RightStickY, -1.0), 1.0);
        assert_eq!(axis_value(Axis::LeftStickX, 0.25), 0.25);
    }

    #[test]
    fn test_buttons_follow_standard_mapping() {
        assert_eq!(button_index(Button::South), Some(0));
        assert_eq!(button_index(Button::North), Some(3));
        assert_eq!(button_index(Button::Start), Some(9));
        assert_eq!(button_index(Button::DPadRight), Some(15));
        assert_eq!(button_index(Button::Mode), Some(16));
        assert_eq!(button_index(Button::C), None);
        assert_eq!(button_index(Button::Unknown), None);
    }

    #[test]
    fn test_every_mapped_button_fits_the_standard_layout() {
        let buttons = [
            Button::South,
            Button::East,
            Button::West,
            Button::North,
            Button::LeftTrigger,
            Button::RightTrigger,
            Button::LeftTrigger2,
            Button::RightTrigger2,
            Button::Select,
            Button::Start,
            Button::LeftThumb,
            Button::RightThumb,
            Button::DPadUp,
            Button::DPadDown,
            Button::DPadLeft,
            Button::DPadRight,
            Button::Mode,
        ];
        let mut indices: Vec<usize> = buttons.iter().filter_map(|&b| button_index(b)).collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), GamepadLayout::STANDARD.buttons);
        assert!(indices.iter().all(|&i| i < GamepadLayout::STANDARD.buttons));
    }
}
