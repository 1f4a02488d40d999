use std::process::ExitCode;

use anyhow::{bail, Context};
use deaduction::config::Config;
use deaduction::display::Format;
use deaduction::Options;

const USAGE: &str = "\
Usage: deaduction [OPTIONS] CONTEXT_FILE [TARGETS_FILE]

Reads a goal printed by the prover and displays it.

Options:
      --html             render as HTML spans
      --lean             render in the prover's syntax
      --text-depth N     write the N outermost levels in words
      --config FILE      read display preferences from a JSON file
      --previous FILE    tag context entries against an earlier goal
      --used NAME        mark the property NAME as already applied
  -h, --help             print this message
  -v, --version          print the version
";

struct Args {
    options: Options,
    context: String,
    targets: Option<String>,
    previous: Option<String>,
}

enum Command {
    Help,
    Version,
    Run(Args),
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Command> {
    let mut options = Options::default();
    let mut files = vec![];
    let mut previous = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-v" | "--version" => return Ok(Command::Version),
            "--html" => options.format = Format::Html,
            "--lean" => options.format = Format::Lean,
            "--text-depth" => {
                let depth = args.next().context("--text-depth needs a value")?;
                options.text_depth = depth
                    .parse()
                    .with_context(|| format!("invalid text depth `{depth}`"))?;
            }
            "--config" => {
                let path = args.next().context("--config needs a file")?;
                options.config = Config::from_json(&read(&path)?)?;
            }
            "--previous" => previous = Some(args.next().context("--previous needs a file")?),
            "--used" => options
                .used_properties
                .push(args.next().context("--used needs a property name")?),
            flag if flag.starts_with('-') => bail!("unknown option `{flag}`"),
            _ => files.push(arg),
        }
    }
    let mut files = files.into_iter();
    let Some(context) = files.next() else {
        bail!("missing CONTEXT_FILE\n\n{USAGE}");
    };
    let targets = files.next();
    if let Some(extra) = files.next() {
        bail!("unexpected argument `{extra}`");
    }
    Ok(Command::Run(Args {
        options,
        context,
        targets,
        previous,
    }))
}

fn read(path: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read `{path}`"))
}

/// A file holds the context and the targets separated by a line `---`, unless
/// the targets come in a file of their own.
fn split_goal(text: &str) -> (&str, &str) {
    match text.split_once("\n---\n") {
        Some((context, targets)) => (context, targets),
        None => ("", text),
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let context_text = read(&args.context)?;
    let (context, targets) = match &args.targets {
        Some(path) => (context_text.clone(), read(path)?),
        None => {
            let (context, targets) = split_goal(&context_text);
            (context.to_owned(), targets.to_owned())
        }
    };
    let previous = match &args.previous {
        Some(path) => Some(read(path)?),
        None => None,
    };
    let previous = previous.as_deref().map(split_goal);
    log::info!("displaying goal from {}", args.context);
    let output = deaduction::process(&args.options, &context, &targets, previous)?;
    print!("{output}");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let result = parse_args(std::env::args().skip(1)).and_then(|command| match command {
        Command::Help => {
            print!("{USAGE}");
            Ok(())
        }
        Command::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Run(args) => run(args),
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        }
    }
}
