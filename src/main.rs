use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use repofolio::app::RunOptions;
use repofolio::present::DisplayWindow;

const HELP: &str = "repofolio: a portfolio of projects and GitHub repositories in the terminal.

  --version, -V        Show version and exit
  --help,    -h        Show this help message
  --user NAME          GitHub username whose repositories are listed
  --range START:END    Ranked repositories to show, 1-based inclusive (default 1:6)
  --config PATH        Read configuration from PATH
  --content PATH       Read page content from PATH
  --list               Print the repository cards once and exit";

enum Command {
    Exit,
    Run(RunOptions),
}

fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(Command::Exit) => return,
        Ok(Command::Run(options)) => options,
        Err(err) => {
            eprintln!("error: {err:#}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    if let Err(err) = repofolio::logging::init() {
        eprintln!("warning: logging disabled: {err:#}");
    }

    if let Err(err) = repofolio::run(options) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command> {
    let mut options = RunOptions::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("repofolio {}", repofolio::VERSION);
                return Ok(Command::Exit);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(Command::Exit);
            }
            "--user" => options.user = Some(value(&mut args, "--user")?),
            "--range" => {
                let raw = value(&mut args, "--range")?;
                let window: DisplayWindow = raw
                    .parse()
                    .with_context(|| format!("invalid --range {raw:?}"))?;
                options.window = Some(window);
            }
            "--config" => options.config_file = Some(PathBuf::from(value(&mut args, "--config")?)),
            "--content" => {
                options.content_file = Some(PathBuf::from(value(&mut args, "--content")?))
            }
            "--list" => options.list = true,
            other => bail!("unknown argument {other:?}"),
        }
    }
    Ok(Command::Run(options))
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    match args.next() {
        Some(value) if !value.starts_with("--") => Ok(value),
        _ => bail!("{flag} needs a value"),
    }
}
