use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracing::info;

pub const ADC_CHANNELS: usize = 8;

/// Raw counts a reading has to move before the slider reports a new value.
const HYSTERESIS: u16 = 6;

/// MCP3008 on SPI0.0.
pub struct AdcReader {
    spi: Spi,
}

impl AdcReader {
    pub fn new() -> anyhow::Result<Self> {
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, 1_000_000, Mode::Mode0)?;
        info!("MCP3008 ADC initialized on SPI0.0");
        Ok(AdcReader { spi })
    }

    fn read_channel(&mut self, channel: u8) -> anyhow::Result<u16> {
        if channel as usize >= ADC_CHANNELS {
            anyhow::bail!("ADC channel must be 0-7, got {}", channel);
        }

        let tx_buffer = [0x01, (0x08 | channel) << 4, 0x00];
        let mut rx_buffer = [0u8; 3];
        self.spi.transfer(&mut rx_buffer, &tx_buffer)?;

        Ok((((rx_buffer[1] & 0x03) as u16) << 8) | (rx_buffer[2] as u16))
    }

    pub fn read_all_channels(&mut self) -> anyhow::Result<[u16; ADC_CHANNELS]> {
        let mut values = [0u16; ADC_CHANNELS];
        for (channel, value) in values.iter_mut().enumerate() {
            *value = self.read_channel(channel as u8)?;
        }
        Ok(values)
    }
}

/// 10-bit reading to slider position.
pub fn to_position(raw: u16) -> u8 {
    (raw.min(1023) >> 2) as u8
}

/// Suppresses ADC noise so a resting potentiometer does not flood the link.
#[derive(Debug, Default)]
pub struct SliderFilter {
    last_raw: Option<u16>,
}

impl SliderFilter {
    /// New position when the reading moved far enough, or reached an end stop.
    pub fn update(&mut self, raw: u16) -> Option<u8> {
        let moved = match self.last_raw {
            None => true,
            Some(last) => {
                let end_stop = (raw == 0 || raw >= 1023) && raw != last;
                last.abs_diff(raw) >= HYSTERESIS || end_stop
            }
        };
        if !moved {
            return None;
        }
        let previous = self.last_raw.map(to_position);
        self.last_raw = Some(raw);
        let position = to_position(raw);
        (previous != Some(position)).then_some(position)
    }
}
