use irmp_link::input::Edge;
use rppal::gpio::{Gpio, InputPin, Level};
use std::time::{Duration, Instant};
use tracing::info;

const DEBOUNCE_MS: u64 = 30;

/// Debounced view of one push button. An edge is reported once the raw
/// level has been stable for [`DEBOUNCE_MS`].
struct ButtonState {
    current: Level,
    last_stable: Level,
    last_change: Instant,
}

impl ButtonState {
    fn new() -> Self {
        ButtonState {
            current: Level::Low,
            last_stable: Level::Low,
            last_change: Instant::now(),
        }
    }

    fn update(&mut self, new_level: Level, now: Instant) -> Option<Edge> {
        if new_level != self.current {
            self.current = new_level;
            self.last_change = now;
            return None;
        }

        if now.duration_since(self.last_change) >= Duration::from_millis(DEBOUNCE_MS)
            && self.current != self.last_stable
        {
            self.last_stable = self.current;
            return Some(match self.current {
                Level::High => Edge::Rising,
                Level::Low => Edge::Falling,
            });
        }

        None
    }
}

pub struct ButtonReader {
    pins: Vec<InputPin>,
    states: Vec<ButtonState>,
}

impl ButtonReader {
    pub fn new(pin_numbers: &[u8]) -> anyhow::Result<Self> {
        let gpio = Gpio::new()?;
        let mut pins = Vec::new();
        let mut states = Vec::new();

        for &pin_num in pin_numbers {
            let pin = gpio.get(pin_num)?.into_input_pulldown();
            info!("GPIO {} initialized", pin_num);
            pins.push(pin);
            states.push(ButtonState::new());
        }

        Ok(ButtonReader { pins, states })
    }

    pub fn read_and_detect_edges(&mut self) -> Vec<Option<Edge>> {
        let now = Instant::now();
        self.pins
            .iter()
            .zip(self.states.iter_mut())
            .map(|(pin, state)| state.update(pin.read(), now))
            .collect()
    }
}
