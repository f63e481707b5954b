use std::path::Path;

use anyhow::Result;

use tsvtools::{CommandGenerator, Purpose};

pub fn cmd_make_page2tsv_commands(directory: &Path, purpose: Purpose) -> Result<()> {
    let commands = CommandGenerator::new(purpose)?.scan_directory(directory)?;

    for command in &commands {
        println!("{}", command.to_command_line());
    }
    eprintln!("🧾 {} commands for {}", commands.len(), directory.display());
    Ok(())
}
