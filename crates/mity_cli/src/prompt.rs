//! Line-oriented terminal input.

use std::fmt;
use std::io::Write;

use anyhow::Result;
use tokio::io::{stdin, AsyncBufReadExt, BufReader, Lines, Stdin};

/// Standard input reached end of file.
#[derive(Debug)]
pub struct InputClosed;

impl fmt::Display for InputClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Input closed")
    }
}

impl std::error::Error for InputClosed {}

pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(stdin()).lines(),
        }
    }

    /// Print `label` and read one trimmed line.
    pub async fn ask(&mut self, label: &str) -> Result<String> {
        print!("{} ", label);
        std::io::stdout().flush()?;
        self.next_line().await
    }

    /// Read one trimmed line. Cancel safe.
    pub async fn next_line(&mut self) -> Result<String> {
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(InputClosed.into()),
        }
    }
}
