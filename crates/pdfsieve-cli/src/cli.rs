use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use pdfsieve::DEFAULT_BLANK_THRESHOLD;

/// Find blank pages, split pages out, tokenize content, and read signatures.
#[derive(Debug, Parser)]
#[command(name = "pdfsieve", about, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show version, page count, document info, and repairs
    Info {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Classify pages and list the blank ones
    Blank {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Content streams of at most this many bytes count as blank
        #[arg(long, default_value_t = DEFAULT_BLANK_THRESHOLD)]
        threshold: usize,
    },

    /// Print the string operands of page content streams
    Strings {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Only strings shown by text operators (Tj, TJ, ', ")
        #[arg(long)]
        show_text: bool,
    },

    /// Print the lexical tokens of page content streams
    Tokens {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Include comment tokens
        #[arg(long)]
        comments: bool,
    },

    /// Write each page to its own single-page PDF
    Split {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Directory for the page files
        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,

        /// File name prefix; pages are written as PREFIX-N.pdf
        #[arg(long, default_value = "page")]
        prefix: String,
    },

    /// Read signature metadata from signature fields
    Sigs {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Verify each signed digest against the document bytes
        #[arg(long)]
        strict: bool,
    },
}

/// Output format shared by all subcommands.
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_blank_defaults() {
        let cli = Cli::parse_from(["pdfsieve", "blank", "test.pdf"]);
        match cli.command {
            Commands::Blank {
                ref file,
                ref pages,
                ref format,
                threshold,
            } => {
                assert_eq!(file, &PathBuf::from("test.pdf"));
                assert!(pages.is_none());
                assert!(matches!(format, OutputFormat::Text));
                assert_eq!(threshold, 20);
            }
            _ => panic!("expected Blank subcommand"),
        }
    }

    #[test]
    fn parse_blank_with_threshold_and_json() {
        let cli = Cli::parse_from([
            "pdfsieve",
            "blank",
            "test.pdf",
            "--threshold",
            "64",
            "--format",
            "json",
        ]);
        match cli.command {
            Commands::Blank {
                threshold,
                ref format,
                ..
            } => {
                assert_eq!(threshold, 64);
                assert!(matches!(format, OutputFormat::Json));
            }
            _ => panic!("expected Blank subcommand"),
        }
    }

    #[test]
    fn parse_tokens_with_comments() {
        let cli = Cli::parse_from(["pdfsieve", "tokens", "test.pdf", "--comments", "--pages", "2"]);
        match cli.command {
            Commands::Tokens {
                comments,
                ref pages,
                ..
            } => {
                assert!(comments);
                assert_eq!(pages.as_deref(), Some("2"));
            }
            _ => panic!("expected Tokens subcommand"),
        }
    }

    #[test]
    fn parse_split_options() {
        let cli = Cli::parse_from([
            "pdfsieve",
            "split",
            "test.pdf",
            "--out-dir",
            "/tmp/out",
            "--prefix",
            "scan",
        ]);
        match cli.command {
            Commands::Split {
                ref out_dir,
                ref prefix,
                ..
            } => {
                assert_eq!(out_dir, &PathBuf::from("/tmp/out"));
                assert_eq!(prefix, "scan");
            }
            _ => panic!("expected Split subcommand"),
        }
    }

    #[test]
    fn split_defaults_to_current_directory() {
        let cli = Cli::parse_from(["pdfsieve", "split", "test.pdf"]);
        match cli.command {
            Commands::Split {
                ref out_dir,
                ref prefix,
                ..
            } => {
                assert_eq!(out_dir, &PathBuf::from("."));
                assert_eq!(prefix, "page");
            }
            _ => panic!("expected Split subcommand"),
        }
    }

    #[test]
    fn parse_sigs_strict() {
        let cli = Cli::parse_from(["pdfsieve", "sigs", "signed.pdf", "--strict"]);
        match cli.command {
            Commands::Sigs { strict, .. } => assert!(strict),
            _ => panic!("expected Sigs subcommand"),
        }
    }

    #[test]
    fn invalid_format_rejected() {
        let result = Cli::try_parse_from(["pdfsieve", "info", "test.pdf", "--format", "csv"]);
        assert!(result.is_err());
    }
}
