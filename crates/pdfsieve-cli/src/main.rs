mod blank_cmd;
mod cli;
mod info_cmd;
mod page_range;
mod shared;
mod sigs_cmd;
mod split_cmd;
mod strings_cmd;
mod tokens_cmd;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise only warnings (repairs, skipped signatures)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        cli::Commands::Info { ref file, ref format } => info_cmd::run(file, format),
        cli::Commands::Blank {
            ref file,
            ref pages,
            ref format,
            threshold,
        } => blank_cmd::run(file, pages.as_deref(), format, threshold),
        cli::Commands::Strings {
            ref file,
            ref pages,
            ref format,
            show_text,
        } => strings_cmd::run(file, pages.as_deref(), format, show_text),
        cli::Commands::Tokens {
            ref file,
            ref pages,
            ref format,
            comments,
        } => tokens_cmd::run(file, pages.as_deref(), format, comments),
        cli::Commands::Split {
            ref file,
            ref pages,
            ref format,
            ref out_dir,
            ref prefix,
        } => split_cmd::run(file, pages.as_deref(), format, out_dir, prefix),
        cli::Commands::Sigs {
            ref file,
            ref format,
            strict,
        } => sigs_cmd::run(file, format, strict),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
