//! Build script rendering `segments(1)` and one page per subcommand into
//! `$OUT_DIR/man`.

use std::{env, fs, path::Path};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

fn render(page: clap::Command, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = dir.join(format!("{}.1", page.get_name()));
    let mut buf = Vec::new();
    Man::new(page).render(&mut buf)?;
    fs::write(file, buf)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");

    let out_dir = env::var_os("OUT_DIR").ok_or("OUT_DIR is not set")?;
    let man_dir = Path::new(&out_dir).join("man");
    fs::create_dir_all(&man_dir)?;

    let cmd = cli::Cli::command();
    for sub in cmd.get_subcommands() {
        let name = format!("{}-{}", cmd.get_name(), sub.get_name());
        render(sub.clone().name(name), &man_dir)?;
    }
    render(cmd, &man_dir)?;
    Ok(())
}
