use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "linkstash", about = "Download bookmarked resources into a local cache and extract their metadata", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "LINKSTASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the configured number of concurrent resolutions
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// More logging; repeat for trace output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download every bookmarked URL not already in the cache
    Resolve {
        /// CSV file with a `url` column
        #[arg(short, long, default_value = "bookmarks.csv")]
        input: PathBuf,
        /// Where to write the JSON resolution report
        #[arg(short, long, default_value = "non_arxiv_output.json")]
        output: PathBuf,
    },
    /// Scrape metadata from the cached files listed in a resolution report
    Extract {
        /// JSON resolution report written by `resolve`
        #[arg(short, long, default_value = "non_arxiv_output.json")]
        input: PathBuf,
        #[arg(short, long, default_value = "resources_extracted.json")]
        output: PathBuf,
    },
    /// Report index entries without files and files without index entries
    Check,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["linkstash", "resolve"]).unwrap();
        assert_eq!(args.log_format, LogFormat::Text);
        let Command::Resolve { input, output } = args.command else {
            panic!("expected resolve");
        };
        assert_eq!(input, PathBuf::from("bookmarks.csv"));
        assert_eq!(output, PathBuf::from("non_arxiv_output.json"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["linkstash", "check", "-vv", "--log-format", "json", "--concurrency", "8"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.log_format, LogFormat::Json);
        assert_eq!(args.concurrency, Some(8));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["linkstash", "check", "-q", "-v"]).is_err());
    }
}
