use anyhow::Result;
use clap::ArgMatches;
use clap::Args;
use clap::Command;
use hlolegal::convert::LegalizeOptions;
use hlolegal::convert::RewriteResult;
use hlolegal::parser::Parser;
use hlolegal::transform;
use hlolegal::DefaultTransformDispatch;
use hlolegal::Passes;
use std::io::Read;
use tracing::Level;

/// Legalize MHLO programs to StableHLO
#[derive(Args, Debug)]
#[command(version, about)]
struct HlolegalArgs {
    /// The input file (- is interpreted as stdin)
    #[arg(default_value = "-")]
    input: String,
    /// Print debug logs
    #[arg(long)]
    debug: bool,
}

fn cli() -> Command {
    let cli = Command::new("hlolegal-opt").args(hlolegal::default_arguments());
    HlolegalArgs::augment_args(cli)
}

fn options_from_matches(matches: &ArgMatches) -> LegalizeOptions {
    LegalizeOptions {
        allow_experimental_features: matches.get_flag("allow-experimental-features"),
    }
}

fn parse_and_transform(src: &str, passes: &Passes, options: &LegalizeOptions) -> Result<String> {
    let module = Parser::parse(src)?;
    let result = transform::<DefaultTransformDispatch>(&module, passes, options)?;
    let result = match result {
        RewriteResult::Changed(_) => module.to_string(),
        RewriteResult::Unchanged => src.to_string(),
    };
    Ok(result)
}

fn main() -> Result<()> {
    let cli = cli();
    let args = std::env::args_os();
    let passes = Passes::from_convert_args(args);
    let matches = cli.get_matches();

    if matches.get_flag("debug") {
        if let Err(e) = hlolegal::init_subscriber(Level::DEBUG) {
            eprintln!("Failed to initialize logging: {e}");
        }
    }
    let options = options_from_matches(&matches);

    let input = match matches.get_one::<String>("input") {
        Some(input) => input.clone(),
        None => "-".to_string(),
    };
    let input_text = if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(&input)?
    };
    if matches.get_flag("print-ir-before-all") {
        println!("// -----// IR Dump Before {passes} //----- //\n{input_text}");
    }

    let result = parse_and_transform(&input_text, &passes, &options)?;
    println!("{result}");
    Ok(())
}
