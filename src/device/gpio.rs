//! HD44780 panel wired to Raspberry Pi GPIO, driven through Linux sysfs.

use linux_embedded_hal::{Delay, SysfsPin};
use sysfs_gpio::Direction;

use super::hd44780::{BlockingDisplay, Hd44780};
use super::DisplayError;
use crate::config::LcdPins;

/// HD44780 on sysfs GPIO lines.
pub type GpioLcd = BlockingDisplay<Hd44780<SysfsPin, Delay>>;

fn output_pin(number: u32) -> Result<SysfsPin, DisplayError> {
    let pin = SysfsPin::new(u64::from(number));
    pin.export()
        .map_err(|e| DisplayError::Bus(format!("export GPIO {number}: {e}")))?;
    pin.set_direction(Direction::Low)
        .map_err(|e| DisplayError::Bus(format!("configure GPIO {number}: {e}")))?;
    Ok(pin)
}

/// Exports the configured pins and initializes the panel.
pub fn open(pins: &LcdPins) -> Result<GpioLcd, DisplayError> {
    let [d4, d5, d6, d7] = pins.data;
    let lcd = Hd44780::new(
        output_pin(pins.rs)?,
        output_pin(pins.e)?,
        [
            output_pin(d4)?,
            output_pin(d5)?,
            output_pin(d6)?,
            output_pin(d7)?,
        ],
        Delay,
    )?;
    tracing::info!(rs = pins.rs, e = pins.e, data = ?pins.data, "HD44780 initialized on GPIO");
    Ok(BlockingDisplay::new(lcd))
}
