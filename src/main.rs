use clap::Parser;

use archflow::cli::{exit_code, run, Cli};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{} {err}", console::style("error:").red().bold());
        std::process::exit(exit_code(&err));
    }
}
