//! Yes/no gate in front of destructive operations.

use dialoguer::{theme::ColorfulTheme, Confirm as Prompt};

use crate::Error;

/// Asked before anything is written to or erased from the chip.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool, Error>;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> Result<bool, Error> {
        Ok(self(prompt))
    }
}

/// Asks on the terminal. Anything but an explicit yes declines.
#[derive(Debug, Default)]
pub struct Interactive;

impl Confirm for Interactive {
    fn confirm(&mut self, prompt: &str) -> Result<bool, Error> {
        Prompt::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact_opt()
            .map(Option::unwrap_or_default)
            .map_err(|e| Error::Io(std::io::Error::other(e)))
    }
}
