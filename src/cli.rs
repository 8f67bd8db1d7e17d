use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "diffgen")]
#[command(about = "Generate structural diff functions for struct types", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Directory containing the source package to analyze
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// The source type to generate the diff from
    #[arg(long = "type", value_name = "NAME")]
    pub type_name: String,

    /// Skip unhandled or unknown field types instead of failing
    #[arg(long)]
    pub skip: bool,

    /// Include exported methods in the diff
    #[arg(long)]
    pub methods: bool,

    /// Output file name; defaults to <type>_diffgen.rs
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsing_minimal_invocation() {
        let cli = Cli::parse_from(["diffgen", "--type", "Order"]);

        assert_eq!(cli.type_name, "Order");
        assert_eq!(cli.path, PathBuf::from("."));
        assert!(!cli.skip);
        assert!(!cli.methods);
        assert_eq!(cli.output, None);
    }

    #[test]
    fn test_parsing_all_flags() {
        let cli = Cli::parse_from([
            "diffgen",
            "--type",
            "Order",
            "--skip",
            "--methods",
            "--output",
            "out.rs",
            "src/model",
        ]);

        assert_eq!(cli.type_name, "Order");
        assert_eq!(cli.path, PathBuf::from("src/model"));
        assert!(cli.skip);
        assert!(cli.methods);
        assert_eq!(cli.output, Some(PathBuf::from("out.rs")));
    }

    #[test]
    fn test_missing_type_flag_is_a_usage_error() {
        let err = Cli::try_parse_from(["diffgen", "."]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_dash_output_is_an_ordinary_filename() {
        // A literal dash is not a stdout convention; it parses as a real
        // file name to create.
        let cli = Cli::parse_from(["diffgen", "--type", "Order", "--output", "-"]);
        assert_eq!(cli.output, Some(PathBuf::from("-")));
    }
}
