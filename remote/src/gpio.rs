//! Hardware frontend: a five-button pad on GPIO and five potentiometers on
//! the MCP3008.

use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use irmp_link::input::Edge;
use irmp_link::{Button, ControlEvent, SessionEvent, Slider, Touch};
use tracing::info;

use crate::adc::{AdcReader, SliderFilter};
use crate::buttons::ButtonReader;

const PAD_PINS: [(u8, Button); 5] = [
    (25, Button::Up),
    (24, Button::Down),
    (23, Button::Left),
    (18, Button::Right),
    (15, Button::Center),
];

const POLL_MS: u64 = 20;

/// Polls the hardware until the session goes away.
pub fn gpio_thread(events: Sender<SessionEvent>) -> anyhow::Result<()> {
    let pins: Vec<u8> = PAD_PINS.iter().map(|(pin, _)| *pin).collect();
    let mut button_reader = ButtonReader::new(&pins)?;
    let mut adc_reader = AdcReader::new()?;
    let mut filters: Vec<SliderFilter> =
        Slider::ALL.iter().map(|_| SliderFilter::default()).collect();

    info!("GPIO frontend polling every {} ms", POLL_MS);

    loop {
        let mut pending = Vec::new();

        for (edge, (_, button)) in button_reader.read_and_detect_edges().into_iter().zip(PAD_PINS) {
            let touch = match edge {
                Some(Edge::Rising) => Touch::Start,
                Some(Edge::Falling) => Touch::End,
                None => continue,
            };
            pending.push(ControlEvent::Button(button, touch));
        }

        let adc_values = adc_reader.read_all_channels()?;
        for ((slider, filter), raw) in Slider::ALL.iter().zip(filters.iter_mut()).zip(adc_values) {
            if let Some(position) = filter.update(raw) {
                pending.push(ControlEvent::Slider(*slider, position));
            }
        }

        for event in pending {
            if events.send(SessionEvent::Input(event)).is_err() {
                return Ok(());
            }
        }

        thread::sleep(Duration::from_millis(POLL_MS));
    }
}
