//! Command definitions and handlers for the `reckon` binary

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use reckon_calculator::{CalculationResult, FunctionRegistry, Inputs, Value};
use reckon_core::{
    ContentResolver, EngineConfig, Registry, ResultFormatter, SourcePayload, builtin_sources,
};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "reckon")]
#[command(about = "Evaluate and inspect formula-driven calculators")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Configuration file (defaults to $RECKON_CONFIG_PATH or reckon.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Extra JSON source merged after the built-in catalog; repeatable
    #[arg(long = "source", global = true)]
    pub sources: Vec<String>,

    /// Skip the built-in catalog
    #[arg(long, global = true, default_value_t = false)]
    pub no_builtin: bool,

    /// Emit logs as JSON
    #[arg(long, global = true, default_value_t = false)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List calculators, optionally within one category
    List(ListArgs),
    /// Evaluate a calculator formula
    Evaluate(EvaluateArgs),
    /// Show localized content for a calculator
    Content(ContentArgs),
    /// Load all sources and report every definition problem
    Validate,
    /// List the functions formulas may call
    Functions,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Args)]
pub struct ListArgs {
    /// Filter by category id
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long, default_value = "en")]
    pub locale: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct EvaluateArgs {
    /// Calculator id
    pub calculator: String,

    /// Formula name; defaults to the calculator's first formula
    #[arg(long)]
    pub formula: Option<String>,

    /// Input as `name=value`; repeatable
    #[arg(short, long = "input", value_parser = parse_key_value)]
    pub inputs: Vec<(String, String)>,

    /// Treat values as typed JSON scalars instead of coercing form text
    #[arg(long, default_value_t = false)]
    pub typed: bool,

    #[arg(long, default_value = "en")]
    pub locale: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct ContentArgs {
    /// Calculator id
    pub calculator: String,

    #[arg(long, default_value = "en")]
    pub locale: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

/// Built-in catalog (unless disabled) followed by each `--source` file in order
pub fn collect_sources(global: &GlobalArgs) -> Result<Vec<SourcePayload>> {
    let mut sources = if global.no_builtin { Vec::new() } else { builtin_sources()? };

    for path in &global.sources {
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read source '{path}'"))?;
        let source =
            SourcePayload::from_json(&text).with_context(|| format!("Source '{path}' is not a valid payload"))?;
        debug!(path = %path, name = %source.name, "Loaded source file");
        sources.push(source);
    }

    Ok(sources)
}

pub fn run(cli: Cli, config: EngineConfig) -> Result<()> {
    let sources = collect_sources(&cli.global)?;
    let registry = Registry::load(&sources, &config)?;
    info!(calculators = registry.calculators().count(), "Registry ready");

    match cli.command {
        Commands::List(args) => list(&registry, &args),
        Commands::Evaluate(args) => evaluate(&registry, &config, &args),
        Commands::Content(args) => content(&registry, &args),
        Commands::Validate => {
            println!(
                "OK: {} categories, {} calculators",
                registry.categories().count(),
                registry.calculators().count()
            );
            Ok(())
        }
        Commands::Functions => {
            for line in describe_functions(registry.formulas().functions()) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn describe_functions(functions: &FunctionRegistry) -> Vec<String> {
    functions
        .names()
        .into_iter()
        .filter_map(|name| {
            let (arity, description) = functions.describe(name)?;
            Some(format!("{name:<8} {:<14} {description}", format!("({arity} args)")))
        })
        .collect()
}

fn list(registry: &Registry, args: &ListArgs) -> Result<()> {
    let resolver = ContentResolver::new(registry);
    let calculators = match &args.category {
        Some(category) => {
            if registry.category(category).is_none() {
                return Err(anyhow!("Unknown category '{category}'"));
            }
            registry.calculators_in(category)
        }
        None => registry.calculators().collect(),
    };

    match args.format {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = calculators
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "id": c.id,
                        "slug": c.slug,
                        "category": c.category,
                        "name": resolver.resolve_content(&c.id, &args.locale).name,
                        "formulas": c.formula_names().collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Table => {
            for c in calculators {
                println!(
                    "{:<20} {:<14} {}",
                    c.id,
                    resolver.category_name(&c.category, &args.locale),
                    resolver.resolve_content(&c.id, &args.locale).name
                );
            }
        }
    }
    Ok(())
}

fn evaluate(registry: &Registry, config: &EngineConfig, args: &EvaluateArgs) -> Result<()> {
    let formula = match &args.formula {
        Some(name) => name.clone(),
        None => registry
            .calculator(&args.calculator)
            .and_then(|c| c.primary_formula())
            .map(|f| f.name.clone())
            .ok_or_else(|| anyhow!("Unknown calculator '{}'", args.calculator))?,
    };

    let result = if args.typed {
        let inputs: Inputs = args
            .inputs
            .iter()
            .map(|(key, raw)| {
                let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw.as_str()));
                (key.clone(), value)
            })
            .collect();
        registry.evaluate(&args.calculator, &formula, &inputs)?
    } else {
        let raw: HashMap<String, String> = args.inputs.iter().cloned().collect();
        registry.evaluate_raw(&args.calculator, &formula, &raw)?
    };

    let formatter = ResultFormatter::new(config.formatting.clone(), registry.default_locale());
    print_result(&result, &formatter.format(&result, &args.locale), args.format)
}

fn print_result(
    result: &CalculationResult,
    formatted: &BTreeMap<String, String>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "result": result, "formatted": formatted });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            println!("{} / {}", result.calculator_id, result.formula_name);
            for (name, text) in formatted {
                println!("  {name:<24} {text}");
            }
        }
    }
    Ok(())
}

fn content(registry: &Registry, args: &ContentArgs) -> Result<()> {
    if registry.calculator(&args.calculator).is_none() {
        return Err(anyhow!("Unknown calculator '{}'", args.calculator));
    }

    let resolver = ContentResolver::new(registry);
    let resolved = resolver.resolve(&args.calculator, &args.locale);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolved.content)?),
        OutputFormat::Table => {
            let content = &resolved.content;
            println!("{} [{}]", content.name, resolved.locale.as_deref().unwrap_or("synthetic"));
            if !content.description.is_empty() {
                println!("{}", content.description);
            }
            for entry in &content.faq {
                println!("\nQ: {}\nA: {}", entry.question, entry.answer);
            }
            if !content.keywords.is_empty() {
                let keywords: Vec<&str> = content.keywords.iter().map(String::as_str).collect();
                println!("\nKeywords: {}", keywords.join(", "));
            }
            if let Some(example) = &content.example {
                println!("Example: {example}");
            }
        }
    }
    Ok(())
}
