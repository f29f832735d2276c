use std::collections::HashMap;

use irmp_link::platform::Actuators;
use irmp_link::{Channel, MoveCode};
use tracing::info;

pub const PWM_FREQUENCY: f64 = 50.0;
const PULSE_MIN_US: u16 = 1000;
const PULSE_MAX_US: u16 = 2000;

/// Pulse width for a slider position, 0 -> 1000 us, 255 -> 2000 us.
pub fn pulse_width_us(position: u8) -> u16 {
    let span = (PULSE_MAX_US - PULSE_MIN_US) as u32;
    PULSE_MIN_US + (position as u32 * span / 255) as u16
}

pub fn duty_cycle(pulse_width_us: u16) -> f64 {
    let pulse_width_us = pulse_width_us.clamp(PULSE_MIN_US, PULSE_MAX_US);
    let period_us = 1_000_000.0 / PWM_FREQUENCY;
    pulse_width_us as f64 / period_us
}

/// Stand-in for the servo and drive hardware: computes the PWM each
/// actuator would get and logs it.
#[derive(Debug, Default)]
pub struct SimulatedServos {
    pulses: HashMap<Channel, u16>,
    drive: Option<MoveCode>,
}

impl Actuators for SimulatedServos {
    fn drive(&mut self, code: MoveCode) {
        if self.drive != Some(code) {
            info!("drive {:?}", code);
        }
        self.drive = Some(code);
    }

    fn position(&mut self, channel: Channel, value: u8) {
        let pulse = pulse_width_us(value);
        info!("{} -> {} us (duty {:.4})", channel, pulse, duty_cycle(pulse));
        self.pulses.insert(channel, pulse);
    }
}
