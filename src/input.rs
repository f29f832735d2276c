//! Operator controls: the directional pad and the actuator sliders.
//!
//! The surface turns raw control events into commands and remembers the
//! last position of every slider so the link can resynchronize the platform
//! after a reconnect. It never talks to the transport.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::protocol::{Channel, Command, MoveCode};

pub const SLIDER_DEFAULT: u8 = 125;

/// Buttons of the directional pad, all on [`Channel::Move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    Center,
}

impl Button {
    pub const ALL: [Button; 5] = [
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::Center,
    ];

    /// Code sent on press. Release always sends [`MoveCode::Stop`].
    pub fn press_code(&self) -> MoveCode {
        match self {
            Self::Up => MoveCode::Forward,
            Self::Down => MoveCode::Backward,
            Self::Left => MoveCode::Left,
            Self::Right => MoveCode::Right,
            Self::Center => MoveCode::Center,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Button::ALL.iter().copied().find(|b| b.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slider {
    Head,
    LeftFrontFoot,
    LeftHindFoot,
    RightFrontFoot,
    RightHindFoot,
}

impl Slider {
    pub const ALL: [Slider; 5] = [
        Slider::Head,
        Slider::LeftFrontFoot,
        Slider::LeftHindFoot,
        Slider::RightFrontFoot,
        Slider::RightHindFoot,
    ];

    pub fn channel(&self) -> Channel {
        match self {
            Self::Head => Channel::Head,
            Self::LeftFrontFoot => Channel::LeftFrontFoot,
            Self::LeftHindFoot => Channel::LeftHindFoot,
            Self::RightFrontFoot => Channel::RightFrontFoot,
            Self::RightHindFoot => Channel::RightHindFoot,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Slider::ALL.iter().copied().find(|s| s.channel().name() == name)
    }
}

/// Phase of a touch (or pointer) interaction on a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touch {
    Start,
    /// Pointer left the control's bounds while still down. The touch is
    /// still live and its release must still stop the platform.
    Leave,
    End,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Button(Button, Touch),
    Slider(Slider, u8),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edge {
    Rising,
    Falling,
}

/// Momentary button with edge detection.
#[derive(Debug, Clone)]
struct DiscreteControl {
    button: Button,
    held: bool,
}

impl DiscreteControl {
    fn new(button: Button) -> Self {
        DiscreteControl { button, held: false }
    }

    fn update(&mut self, touch: Touch) -> Option<Edge> {
        match (touch, self.held) {
            (Touch::Start, false) => {
                self.held = true;
                Some(Edge::Rising)
            }
            (Touch::End | Touch::Cancel, true) => {
                self.held = false;
                Some(Edge::Falling)
            }
            _ => None,
        }
    }

    fn command_for(&self, edge: Edge) -> Command {
        match edge {
            Edge::Rising => Command::drive(self.button.press_code()),
            Edge::Falling => Command::drive(MoveCode::Stop),
        }
    }
}

pub struct InputSurface {
    pad: Vec<DiscreteControl>,
    last_known: BTreeMap<Slider, u8>,
}

impl InputSurface {
    pub fn new(slider_default: u8) -> Self {
        InputSurface {
            pad: Button::ALL.iter().map(|&b| DiscreteControl::new(b)).collect(),
            last_known: Slider::ALL.iter().map(|&s| (s, slider_default)).collect(),
        }
    }

    /// Applies one control event, returning the command it produces, if any.
    pub fn handle(&mut self, event: ControlEvent) -> Option<Command> {
        match event {
            ControlEvent::Button(button, touch) => self.touch(button, touch),
            ControlEvent::Slider(slider, value) => self.slide(slider, value),
        }
    }

    fn touch(&mut self, button: Button, touch: Touch) -> Option<Command> {
        let control = self.pad.iter_mut().find(|c| c.button == button)?;
        let edge = control.update(touch)?;
        Some(control.command_for(edge))
    }

    fn slide(&mut self, slider: Slider, value: u8) -> Option<Command> {
        let previous = self.last_known.insert(slider, value);
        if previous == Some(value) {
            return None;
        }
        Command::position(slider.channel(), value)
    }

    pub fn is_held(&self, button: Button) -> bool {
        self.pad.iter().any(|c| c.button == button && c.held)
    }

    /// Ends every held touch, one stop per held button.
    pub fn release_all(&mut self) -> Vec<Command> {
        self.pad
            .iter_mut()
            .filter_map(|c| c.update(Touch::End).map(|edge| c.command_for(edge)))
            .collect()
    }

    pub fn position(&self, slider: Slider) -> Option<u8> {
        self.last_known.get(&slider).copied()
    }

    /// One command per slider carrying its last-known value, in replay order.
    pub fn replay(&self) -> Vec<Command> {
        Slider::ALL
            .iter()
            .filter_map(|s| {
                let value = self.last_known.get(s)?;
                Command::position(s.channel(), *value)
            })
            .collect()
    }
}

impl Default for InputSurface {
    fn default() -> Self {
        InputSurface::new(SLIDER_DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode;

    fn wire(surface: &mut InputSurface, events: &[ControlEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|&e| surface.handle(e))
            .map(|c| encode(&c))
            .collect()
    }

    fn press(b: Button) -> ControlEvent {
        ControlEvent::Button(b, Touch::Start)
    }

    fn release(b: Button) -> ControlEvent {
        ControlEvent::Button(b, Touch::End)
    }

    #[test]
    fn double_tap_forward() {
        let mut surface = InputSurface::default();
        let sent = wire(
            &mut surface,
            &[press(Button::Up), release(Button::Up), press(Button::Up), release(Button::Up)],
        );
        assert_eq!(sent, ["Move,1", "Move,0", "Move,1", "Move,0"]);
    }

    #[test]
    fn holding_does_not_refire() {
        let mut surface = InputSurface::default();
        let sent = wire(
            &mut surface,
            &[press(Button::Left), press(Button::Left), press(Button::Left), release(Button::Left)],
        );
        assert_eq!(sent, ["Move,3", "Move,0"]);
    }

    #[test]
    fn release_after_leaving_bounds_still_stops() {
        let mut surface = InputSurface::default();
        let sent = wire(
            &mut surface,
            &[
                press(Button::Right),
                ControlEvent::Button(Button::Right, Touch::Leave),
                release(Button::Right),
            ],
        );
        assert_eq!(sent, ["Move,4", "Move,0"]);
        assert!(!surface.is_held(Button::Right));
    }

    #[test]
    fn cancel_stops_once() {
        let mut surface = InputSurface::default();
        let sent = wire(
            &mut surface,
            &[
                press(Button::Down),
                ControlEvent::Button(Button::Down, Touch::Cancel),
                release(Button::Down),
            ],
        );
        assert_eq!(sent, ["Move,2", "Move,0"]);
    }

    #[test]
    fn stray_release_emits_nothing() {
        let mut surface = InputSurface::default();
        assert_eq!(surface.handle(release(Button::Center)), None);
    }

    #[test]
    fn stops_match_presses_for_mixed_sequences() {
        let touches = [Touch::Start, Touch::Leave, Touch::End, Touch::Cancel];
        let mut surface = InputSurface::default();
        let mut presses = 0;
        let mut stops = 0;
        // deterministic pseudo-random walk over every button and phase
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..2000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let button = Button::ALL[(seed % 5) as usize];
            let touch = touches[((seed >> 8) % 4) as usize];
            match surface.handle(ControlEvent::Button(button, touch)).and_then(|c| c.move_code()) {
                Some(MoveCode::Stop) => stops += 1,
                Some(_) => presses += 1,
                None => {}
            }
        }
        for button in Button::ALL {
            if surface.handle(release(button)).is_some() {
                stops += 1;
            }
        }
        assert!(presses > 0);
        assert_eq!(presses, stops);
    }

    #[test]
    fn release_all_stops_each_held_button_once() {
        let mut surface = InputSurface::default();
        surface.handle(press(Button::Up));
        surface.handle(press(Button::Right));
        surface.handle(ControlEvent::Button(Button::Right, Touch::Leave));

        let stops: Vec<String> = surface.release_all().iter().map(encode).collect();
        assert_eq!(stops, ["Move,0", "Move,0"]);
        assert!(!surface.is_held(Button::Up) && !surface.is_held(Button::Right));
        assert!(surface.release_all().is_empty());
        assert_eq!(surface.handle(release(Button::Up)), None);
    }

    #[test]
    fn center_press_uses_its_own_code() {
        let mut surface = InputSurface::default();
        let sent = wire(&mut surface, &[press(Button::Center), release(Button::Center)]);
        assert_eq!(sent, ["Move,5", "Move,0"]);
    }

    #[test]
    fn slider_forwards_changes_and_remembers_them() {
        let mut surface = InputSurface::default();
        let sent = wire(
            &mut surface,
            &[
                ControlEvent::Slider(Slider::Head, 200),
                ControlEvent::Slider(Slider::Head, 200),
                ControlEvent::Slider(Slider::Head, 201),
            ],
        );
        assert_eq!(sent, ["head,200", "head,201"]);
        assert_eq!(surface.position(Slider::Head), Some(201));
    }

    #[test]
    fn replay_covers_every_slider_with_defaults() {
        let mut surface = InputSurface::default();
        surface.handle(ControlEvent::Slider(Slider::LeftFrontFoot, 90));
        let replay: Vec<String> = surface.replay().iter().map(encode).collect();
        assert_eq!(
            replay,
            [
                "head,125",
                "left_front_foot,90",
                "left_hind_foot,125",
                "right_front_foot,125",
                "right_hind_foot,125",
            ]
        );
    }

    #[test]
    fn looks_up_controls_by_name() {
        assert_eq!(Button::from_name("center"), Some(Button::Center));
        assert_eq!(Slider::from_name("right_hind_foot"), Some(Slider::RightHindFoot));
        assert_eq!(Slider::from_name("Move"), None);
    }
}
