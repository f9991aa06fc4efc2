mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use transformation::macros::builtin::register_builtin_macros;
use transformation::macros::wiki::{WikiMacroDefinitions, WikiMacroError};
use transformation::{
    DefaultMacroRegistry, MacroTransformation, TransformConfig, TransformationError,
};
use xdom::syntax::Syntax;

const SUBCOMMANDS: &[&str] = &["run", "test", "help"];

#[derive(Parser)]
#[command(name = "xdom", version, about = "Expand macros in xdom documents")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a document and expand its macros
    Run(RunArgs),

    /// Run .test.md test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Markup source file
    file: String,

    /// Target syntax, as type/version
    #[arg(short, long, default_value = "xwiki/2.0")]
    syntax: String,

    /// TOML file of wiki macro definitions. Repeatable.
    #[arg(short, long)]
    macros: Vec<PathBuf>,

    /// TOML transformation config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the maximum number of passes
    #[arg(long)]
    max_depth: Option<usize>,

    /// Fail on unknown macros
    #[arg(long)]
    strict: bool,

    /// Parse only, don't transform (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the parsed tree
    #[arg(long)]
    ast: bool,

    /// Print the event stream instead of markup
    #[arg(long)]
    events: bool,

    /// List the registered macro identifiers
    #[arg(long)]
    list_macros: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // `xdom file.md` is shorthand for `xdom run file.md`.
    let mut args: Vec<String> = std::env::args().collect();
    let first_pos = args
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, a)| !a.starts_with('-'))
        .map(|(i, a)| (i, a.clone()));
    if let Some((pos, first)) = first_pos {
        if !SUBCOMMANDS.contains(&first.as_str()) {
            args.insert(pos, "run".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_tracing(cli.verbose, cli.no_color);

    match cli.command {
        Command::Run(run_args) => do_run(run_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn init_tracing(verbose: u8, no_color: bool) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

/// Built-in macros plus every wiki macro defined in `macro_files`.
pub fn build_registry(macro_files: &[PathBuf]) -> Result<DefaultMacroRegistry, WikiMacroError> {
    let mut registry = DefaultMacroRegistry::new();
    register_builtin_macros(&mut registry);
    for path in macro_files {
        let count = WikiMacroDefinitions::load(path)?.register_all(&mut registry)?;
        tracing::info!(path = %path.display(), count, "loaded wiki macros");
    }
    Ok(registry)
}

fn do_run(args: RunArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let syntax: Syntax = match args.syntax.parse() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    // Read source
    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            process::exit(1);
        }
    };

    // Set up codespan file database
    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    // Parse
    let parser = xdom::parser::Parser::new(source, file_id).with_syntax(syntax.clone());
    let mut dom = match parser.parse() {
        Ok(dom) => dom,
        Err(errors) => {
            let writer = StandardStream::stderr(color_choice);
            let config = term::Config::default();
            for error in &errors {
                let diagnostic = error.to_diagnostic();
                let _ =
                    term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
            }
            process::exit(1);
        }
    };

    // --check: parse succeeded, exit
    if args.check {
        eprintln!("ok: {} parsed successfully", args.file);
        return;
    }

    // --ast: dump the tree
    if args.ast {
        println!("{:#?}", dom);
        return;
    }

    let registry = match build_registry(&args.macros) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    if args.list_macros {
        for identifier in registry.identifiers() {
            println!("{}", identifier);
        }
        return;
    }

    let mut config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        },
        None => TransformConfig::default(),
    };
    if let Some(max_depth) = args.max_depth {
        config.max_depth = max_depth;
    }
    config.strict |= args.strict;

    let result = MacroTransformation::new(&registry)
        .with_config(config)
        .transform(&mut dom, &syntax);

    let writer = StandardStream::stderr(color_choice);
    let term_config = term::Config::default();

    match result {
        Ok(report) => {
            for diagnostic in &report.diagnostics {
                emit_macro_diagnostic(&writer, &term_config, &files, diagnostic);
            }
            if args.events {
                print!("{}", dom.to_events_string());
            } else {
                print!("{}", dom);
            }
        }
        Err(error) => {
            emit_transformation_error(&writer, &term_config, &files, file_id, &error);
            process::exit(1);
        }
    }
}

fn load_config(path: &Path) -> Result<TransformConfig, String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    TransformConfig::from_toml_str(&source).map_err(|e| format!("{}: {}", path.display(), e))
}

fn emit_macro_diagnostic(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    diagnostic: &transformation::Diagnostic,
) {
    let (severity, prefix) = if diagnostic.is_warning() {
        (Severity::Warning, "warning")
    } else {
        (Severity::Error, "macro error")
    };
    if let Some(span) = &diagnostic.span {
        let report = Diagnostic::new(severity)
            .with_message(diagnostic.to_string())
            .with_labels(vec![Label::primary(diagnostic.source_id, span.clone())]);
        let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &report);
    } else {
        eprintln!("{}: {}", prefix, diagnostic);
    }
}

fn emit_transformation_error(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    file_id: usize,
    error: &TransformationError,
) {
    match error {
        TransformationError::UnresolvedMacro {
            span: Some(span), ..
        } => {
            let report = Diagnostic::error()
                .with_message(error.to_string())
                .with_labels(vec![Label::primary(file_id, span.clone())]);
            let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &report);
        }
        _ => eprintln!("error: {}", error),
    }
}
