mod cmd;
use clap::{Parser, Subcommand};
use cmd::diff::DiffArgs;
use cmd::show::ShowArgs;
use eyre::Result;

#[derive(Subcommand, Debug)]
pub enum LCSubcommand {
    #[command(about = "Render a saved JSON leak report")]
    Show(ShowArgs),
    #[command(about = "Compare two JSON leak reports site by site")]
    Diff(DiffArgs),
}

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "leakcensus CLI: inspect and compare leak reports produced with --format json

https://github.com/leakcensus/leakcensus"
)]
pub struct LCArgs {
    #[command(subcommand)]
    pub cmd: LCSubcommand,
}

fn main() -> Result<()> {
    let root_args = LCArgs::parse();

    match root_args.cmd {
        LCSubcommand::Show(args) => {
            args.run()?;
        }
        LCSubcommand::Diff(args) => {
            args.run()?;
        }
    }

    Ok(())
}
