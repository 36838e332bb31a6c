//! Console display for hosts without a panel.
//!
//! Keeps a 16x2 framebuffer and logs both rows after every change, so the
//! board can be run and watched on a development machine.

use async_trait::async_trait;

use super::{Display, DisplayError, Framebuffer};

/// Display that renders to the tracing log.
#[derive(Default)]
pub struct ConsoleDisplay {
    screen: Framebuffer,
    closed: bool,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current screen contents.
    pub fn lines(&self) -> [String; 2] {
        self.screen.lines()
    }

    fn render(&self) {
        let [top, bottom] = self.screen.lines();
        tracing::info!(target: "statusboard::display", "|{top}| |{bottom}|");
    }

    fn ensure_open(&self) -> Result<(), DisplayError> {
        if self.closed {
            Err(DisplayError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Display for ConsoleDisplay {
    async fn clear(&mut self) -> Result<(), DisplayError> {
        self.ensure_open()?;
        self.screen.clear();
        self.render();
        Ok(())
    }

    async fn write(&mut self, column: u8, row: u8, text: &str) -> Result<(), DisplayError> {
        self.ensure_open()?;
        self.screen.write(column, row, text)?;
        self.render();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DisplayError> {
        self.closed = true;
        tracing::debug!("Console display closed");
        Ok(())
    }
}
