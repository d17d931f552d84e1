//! Encode typed text into display markup.

use anyhow::Result;
use roomsync_core::encode;

/// Run the encode command.
pub fn run(text: &str) -> Result<()> {
    println!("{}", encode(text.trim_end_matches(['\r', '\n'])));
    Ok(())
}
