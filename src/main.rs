use clap::Parser;
use nutmeg_lang::cli::{self, CliError, SearchOptions, SearchResult};
use std::io::{self, Read};

#[derive(Parser)]
#[command(name = "nutmeg")]
#[command(about = "Nutmeg - a JMESPath-style query language for JSON")]
#[command(version)]
struct Cli {
    /// The expression to evaluate
    expression: String,

    /// JSON input (reads from stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Pretty-print the output
    #[arg(short, long)]
    pretty: bool,

    /// Only compile the expression, don't evaluate
    #[arg(long)]
    compile_only: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let input = match cli.input {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(CliError::Io)?;
            Some(buffer)
        }
        None => None,
    };

    let options = SearchOptions {
        expression: cli.expression,
        input,
        pretty: cli.pretty,
        compile_only: cli.compile_only,
    };

    match cli::execute_search(&options)? {
        SearchResult::Compiled => println!("Expression is valid"),
        SearchResult::Output(json) => println!("{}", json),
    }

    Ok(())
}
