//! The `syntagma` command.
//!
//! Thin [`clap`] wrapper turning command-line options into the
//! generator's configuration record and reporting the first error of
//! the run. Unknown and duplicated options are usage errors handled by
//! clap itself.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use syntagma_codegen::{run_generator, GeneratorConfig, IncludeFile};

/// GLR parser generator: reads an extended-BNF grammar and emits the
/// parser sources.
#[derive(Parser)]
#[command(name = "syntagma")]
#[command(about = "GLR parser generator", long_about = None)]
#[command(version)]
struct Cli {
    /// Grammar file to read.
    input: PathBuf,

    /// Base name of the generated files (default: syngen).
    output: Option<PathBuf>,

    /// Include a file into the generated code; use <angle> form for
    /// system headers. May be repeated.
    #[arg(short = 'i', long = "include", value_name = "FILE")]
    include: Vec<String>,

    /// Member name pattern for attributes, in 'prefix^suffix' form.
    #[arg(long = "attr-pattern", value_name = "PATTERN")]
    attr_pattern: Option<String>,

    /// Namespace of user-supplied definitions.
    #[arg(short = 'n', long = "namespace", value_name = "NS")]
    namespace: Option<String>,

    /// Namespace of user classes (overrides --namespace).
    #[arg(long = "class-namespace", value_name = "NS")]
    class_namespace: Option<String>,

    /// Namespace of user types (overrides --namespace).
    #[arg(long = "type-namespace", value_name = "NS")]
    type_namespace: Option<String>,

    /// Namespace of native expressions (overrides --namespace).
    #[arg(long = "native-namespace", value_name = "NS")]
    native_namespace: Option<String>,

    /// Namespace of the generated code.
    #[arg(long = "code-namespace", value_name = "NS")]
    code_namespace: Option<String>,

    /// Assign attributes through setter functions instead of members.
    #[arg(short = 's', long = "setters")]
    setters: bool,

    /// Allocator type used by the generated code.
    #[arg(short = 'a', long = "allocator", value_name = "TYPE")]
    allocator: Option<String>,

    /// Print every intermediate result.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn include_file(argument: &str) -> IncludeFile {
    let trimmed = argument.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('<') && trimmed.ends_with('>') {
        IncludeFile {
            name: trimmed[1..trimmed.len() - 1].to_string(),
            system: true,
        }
    } else {
        IncludeFile {
            name: trimmed.to_string(),
            system: false,
        }
    }
}

fn config_from_cli(cli: Cli) -> GeneratorConfig {
    let mut config = GeneratorConfig::new(cli.input);
    config.output_base = cli.output;
    for argument in &cli.include {
        let file = include_file(argument);
        // Repeating the same include is harmless.
        if !config.include_files.contains(&file) {
            config.include_files.push(file);
        }
    }
    config.attr_name_pattern = cli.attr_pattern;
    config.namespace = cli.namespace;
    config.namespace_classes = cli.class_namespace;
    config.namespace_types = cli.type_namespace;
    config.namespace_native = cli.native_namespace;
    config.namespace_code = cli.code_namespace;
    config.use_attr_setters = cli.setters;
    config.allocator = cli.allocator;
    config.verbose = cli.verbose;
    config
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = config_from_cli(cli);
    match run_generator(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_includes_are_system_includes() {
        let file = include_file("<memory>");
        assert!(file.system);
        assert_eq!(file.name, "memory");
    }

    #[test]
    fn plain_includes_are_quoted_includes() {
        let file = include_file("ast.h");
        assert!(!file.system);
        assert_eq!(file.name, "ast.h");
    }

    #[test]
    fn duplicate_includes_collapse() {
        let cli = Cli::parse_from(["syntagma", "-i", "a.h", "-i", "a.h", "g.syn"]);
        let config = config_from_cli(cli);
        assert_eq!(config.include_files.len(), 1);
    }

    #[test]
    fn duplicated_single_options_are_rejected() {
        let result = Cli::try_parse_from(["syntagma", "-n", "a", "-n", "b", "g.syn"]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_input_is_a_usage_error() {
        assert!(Cli::try_parse_from(["syntagma"]).is_err());
    }
}
