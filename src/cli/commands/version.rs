//! version command - Print the gzr version

use anyhow::Result;

/// Print the version.
pub fn version() -> Result<()> {
    println!("gzr {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
