use std::path::PathBuf;

use crate::Error;

/// The one thing `spi-dump` does per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Dump to the file, or to standard output when there is none.
    Read { output: Option<PathBuf> },
    Write { input: PathBuf },
    Erase,
    Identify,
}

impl Command {
    /// Map the mutually exclusive command flags to a command; read is the default.
    pub fn select(
        read: Option<PathBuf>,
        write: Option<PathBuf>,
        erase: bool,
        identify: bool,
    ) -> Result<Self, Error> {
        let selected =
            [read.is_some(), write.is_some(), erase, identify].into_iter().filter(|&s| s).count();
        if selected > 1 {
            return Err(Error::ConflictingCommands);
        }

        Ok(match (read, write) {
            (_, Some(input)) => Command::Write { input },
            _ if erase => Command::Erase,
            _ if identify => Command::Identify,
            (output, None) => Command::Read { output },
        })
    }
}
