//! Binary entry point for the qproj command line tool.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use qproj::{
    CompileErrorWithCode, CompilerOptions, FilterCompiler, FilterDescriptor, Lambda, Mapping,
    MemoryQuery, ProjectionCompiler, Schema, TypeRef, Value,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "qproj",
    version,
    about = "Compile projections and filters and run them over JSON rows",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for results"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "QPROJ_CONFIG",
        help = "Compiler options file (TOML)"
    )]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Print the compiled expression")]
    explain: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Input {
    #[arg(long, value_name = "FILE", help = "Schema document (JSON)")]
    schema: PathBuf,

    #[arg(long, value_name = "TYPE", help = "Root record type")]
    root: String,

    #[arg(long, value_name = "FILE", help = "JSON array of root entities")]
    data: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Apply structured filter descriptors")]
    Filter {
        #[command(flatten)]
        input: Input,

        #[arg(long, value_name = "FILE", help = "JSON array of filter descriptors")]
        filters: PathBuf,
    },

    #[command(about = "Apply a text filter such as 'Jo% or %ne' to one property")]
    TextFilter {
        #[command(flatten)]
        input: Input,

        #[arg(long, value_name = "PATH", help = "Dotted property path")]
        property: String,

        #[arg(long, help = "Filter text")]
        text: String,
    },

    #[command(about = "Project rows onto a synthesized shape")]
    Project {
        #[command(flatten)]
        input: Input,

        #[arg(
            long = "map",
            value_name = "TO=FROM",
            required = true,
            help = "Output field and the dotted path it is copied from (repeatable)"
        )]
        mappings: Vec<String>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    expression: Option<String>,
    rows: Vec<serde_json::Value>,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        match err.downcast_ref::<qproj::CompileError>() {
            Some(compile) => eprintln!("error: {}", CompileErrorWithCode(compile)),
            None => eprintln!("error: {err}"),
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let options = CompilerOptions::load(cli.config.clone())?;

    let (lambda, query) = match &cli.command {
        Command::Filter { input, filters } => {
            let (schema, root, rows) = load_input(input)?;
            let text = read(filters)?;
            let descriptors = FilterDescriptor::list_from_json(&text)?;
            let lambda = FilterCompiler::new(&schema)
                .with_options(&options)
                .compile(&root, &descriptors)?;
            (lambda.clone(), MemoryQuery::new(rows).filter(lambda))
        }
        Command::TextFilter {
            input,
            property,
            text,
        } => {
            let (schema, root, rows) = load_input(input)?;
            let lambda = FilterCompiler::new(&schema)
                .with_options(&options)
                .text_filter(&root, property, text)?;
            (lambda.clone(), MemoryQuery::new(rows).filter(lambda))
        }
        Command::Project { input, mappings } => {
            let (schema, root, rows) = load_input(input)?;
            let mappings = mappings
                .iter()
                .map(|arg| parse_mapping(arg))
                .collect::<Result<Vec<_>, _>>()?;
            let projection = ProjectionCompiler::new(&schema)
                .with_options(&options)
                .compile(&root, &mappings)?;
            let query = MemoryQuery::new(rows).project(&projection);
            (projection.lambda().clone(), query)
        }
    };

    let rows = query.to_vec()?;
    emit(cli.format, cli.explain.then_some(&lambda), &rows)
}

fn read(path: &Path) -> Result<String, Box<dyn Error>> {
    fs::read_to_string(path).map_err(|err| format!("failed to read {}: {err}", path.display()).into())
}

fn load_input(input: &Input) -> Result<(Schema, TypeRef, Vec<Value>), Box<dyn Error>> {
    let schema = Schema::from_json_str(&read(&input.schema)?)?;
    schema.validate()?;
    let root = TypeRef::parse(&input.root, &schema)?;
    if root.record_name().is_none() {
        return Err(format!("root type '{}' is not a record", input.root).into());
    }
    let json: serde_json::Value = serde_json::from_str(&read(&input.data)?)?;
    let serde_json::Value::Array(items) = json else {
        return Err("data file must contain a JSON array".into());
    };
    let rows = items
        .iter()
        .map(|item| Value::from_json(item, &root, &schema))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((schema, root, rows))
}

fn parse_mapping(arg: &str) -> Result<Mapping, String> {
    match arg.split_once('=') {
        Some((to, from)) if !to.trim().is_empty() && !from.trim().is_empty() => {
            Ok(Mapping::direct(to.trim(), from.trim()))
        }
        _ => Err(format!("mapping '{arg}' must look like TO=FROM")),
    }
}

fn emit(format: OutputFormat, lambda: Option<&Lambda>, rows: &[Value]) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Json => {
            let report = Report {
                expression: lambda.map(ToString::to_string),
                rows: rows.iter().map(Value::to_json).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            if let Some(lambda) = lambda {
                println!("expression: {lambda}");
            }
            for row in rows {
                println!("{}", row.to_text());
            }
            println!("({} rows)", rows.len());
        }
    }
    Ok(())
}
