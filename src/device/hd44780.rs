//! HD44780 character LCD driver (4-bit parallel interface).
//!
//! Generic over `embedded-hal` 1.0 output pins and delay, so the same driver
//! runs on Linux GPIO (feature `gpio`) and against mock pins in tests.
//! Pin order for the data bus is D4, D5, D6, D7.
//!
//! The driver is blocking: every character costs a few enable pulses and
//! microsecond delays. [`BlockingDisplay`] moves those calls onto the
//! blocking thread pool so the async print queue never stalls a worker.

use async_trait::async_trait;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use parking_lot::Mutex;
use std::sync::Arc;

use super::{Display, DisplayError};
use crate::constants::{DISPLAY_COLS, DISPLAY_ROWS};

/// HD44780 instruction set (subset used by the board).
mod cmd {
    pub const CLEAR: u8 = 0x01;
    /// Increment cursor, no display shift.
    pub const ENTRY_MODE: u8 = 0x06;
    pub const DISPLAY_OFF: u8 = 0x08;
    /// Display on, cursor off, blink off.
    pub const DISPLAY_ON: u8 = 0x0C;
    /// 4-bit bus, 2 lines, 5x8 font.
    pub const FUNCTION_SET: u8 = 0x28;
    pub const SET_DDRAM_ADDR: u8 = 0x80;
}

/// DDRAM address of the first cell of each row.
const ROW_OFFSETS: [u8; DISPLAY_ROWS] = [0x00, 0x40];

/// Character used for glyphs outside the controller's 8-bit ROM.
const UNKNOWN_GLYPH: u8 = b'?';

/// Blocking operations of a character panel.
pub trait CharacterLcd: Send {
    fn clear(&mut self) -> Result<(), DisplayError>;

    fn write_at(&mut self, column: u8, row: u8, text: &str) -> Result<(), DisplayError>;

    fn close(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

fn bus_error<E: embedded_hal::digital::Error>(err: E) -> DisplayError {
    DisplayError::Bus(format!("{:?}", err.kind()))
}

/// Maps a char to the controller's character ROM. Latin-1 code points map
/// directly (0xDF is the degree sign on the A00 ROM).
fn encode(ch: char) -> u8 {
    u8::try_from(u32::from(ch)).unwrap_or(UNKNOWN_GLYPH)
}

/// HD44780 driver in 4-bit mode.
pub struct Hd44780<P, D> {
    rs: P,
    e: P,
    data: [P; 4],
    delay: D,
}

impl<P: OutputPin, D: DelayNs> Hd44780<P, D> {
    /// Takes ownership of the pins and runs the power-on initialization.
    pub fn new(rs: P, e: P, data: [P; 4], delay: D) -> Result<Self, DisplayError> {
        let mut lcd = Self { rs, e, data, delay };
        lcd.init()?;
        Ok(lcd)
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        // Power-on settle time
        self.delay.delay_ms(50);
        self.rs.set_low().map_err(bus_error)?;
        self.e.set_low().map_err(bus_error)?;

        // Reset sequence: three times "8-bit mode", then switch to 4-bit
        self.write_nibble(0x03)?;
        self.delay.delay_us(4500);
        self.write_nibble(0x03)?;
        self.delay.delay_us(4500);
        self.write_nibble(0x03)?;
        self.delay.delay_us(150);
        self.write_nibble(0x02)?;

        self.command(cmd::FUNCTION_SET)?;
        self.command(cmd::DISPLAY_ON)?;
        self.clear_screen()?;
        self.command(cmd::ENTRY_MODE)
    }

    fn clear_screen(&mut self) -> Result<(), DisplayError> {
        self.command(cmd::CLEAR)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    /// Moves the cursor to `column` on `row`.
    pub fn set_cursor(&mut self, column: u8, row: u8) -> Result<(), DisplayError> {
        if usize::from(column) >= DISPLAY_COLS || usize::from(row) >= DISPLAY_ROWS {
            return Err(DisplayError::OutOfRange { column, row });
        }
        self.command(cmd::SET_DDRAM_ADDR | (ROW_OFFSETS[usize::from(row)] + column))
    }

    /// Writes `text` at the cursor.
    pub fn print(&mut self, text: &str) -> Result<(), DisplayError> {
        for ch in text.chars() {
            self.send(encode(ch), true)?;
        }
        Ok(())
    }

    fn command(&mut self, byte: u8) -> Result<(), DisplayError> {
        self.send(byte, false)
    }

    fn send(&mut self, byte: u8, is_data: bool) -> Result<(), DisplayError> {
        if is_data {
            self.rs.set_high().map_err(bus_error)?;
        } else {
            self.rs.set_low().map_err(bus_error)?;
        }
        self.write_nibble(byte >> 4)?;
        self.write_nibble(byte & 0x0F)?;
        // Most instructions complete within 37us
        self.delay.delay_us(50);
        Ok(())
    }

    fn write_nibble(&mut self, nibble: u8) -> Result<(), DisplayError> {
        for (bit, pin) in self.data.iter_mut().enumerate() {
            if (nibble >> bit) & 1 == 1 {
                pin.set_high().map_err(bus_error)?;
            } else {
                pin.set_low().map_err(bus_error)?;
            }
        }
        self.pulse_enable()
    }

    fn pulse_enable(&mut self) -> Result<(), DisplayError> {
        self.e.set_low().map_err(bus_error)?;
        self.delay.delay_us(1);
        self.e.set_high().map_err(bus_error)?;
        self.delay.delay_us(1);
        self.e.set_low().map_err(bus_error)?;
        self.delay.delay_us(100);
        Ok(())
    }
}

impl<P, D> CharacterLcd for Hd44780<P, D>
where
    P: OutputPin + Send,
    D: DelayNs + Send,
{
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.clear_screen()
    }

    fn write_at(&mut self, column: u8, row: u8, text: &str) -> Result<(), DisplayError> {
        self.set_cursor(column, row)?;
        self.print(text)
    }

    fn close(&mut self) -> Result<(), DisplayError> {
        self.clear_screen()?;
        self.command(cmd::DISPLAY_OFF)
    }
}

/// Adapts a blocking [`CharacterLcd`] to the async [`Display`] capability.
///
/// Each call runs on `spawn_blocking`; the print queue guarantees calls do
/// not overlap, the mutex only satisfies the borrow across threads.
pub struct BlockingDisplay<T> {
    lcd: Arc<Mutex<T>>,
}

impl<T: CharacterLcd + 'static> BlockingDisplay<T> {
    pub fn new(lcd: T) -> Self {
        Self {
            lcd: Arc::new(Mutex::new(lcd)),
        }
    }

    async fn run<F>(&self, op: F) -> Result<(), DisplayError>
    where
        F: FnOnce(&mut T) -> Result<(), DisplayError> + Send + 'static,
    {
        let lcd = Arc::clone(&self.lcd);
        tokio::task::spawn_blocking(move || {
            let mut guard = lcd.lock();
            op(&mut *guard)
        })
        .await
        .map_err(|e| DisplayError::Bus(format!("driver task failed: {e}")))?
    }
}

#[async_trait]
impl<T: CharacterLcd + 'static> Display for BlockingDisplay<T> {
    async fn clear(&mut self) -> Result<(), DisplayError> {
        self.run(|lcd| lcd.clear()).await
    }

    async fn write(&mut self, column: u8, row: u8, text: &str) -> Result<(), DisplayError> {
        let text = text.to_string();
        self.run(move |lcd| lcd.write_at(column, row, &text)).await
    }

    async fn close(&mut self) -> Result<(), DisplayError> {
        self.run(|lcd| lcd.close()).await
    }
}
