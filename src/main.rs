use std::io::Read;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use treeq::document::{Arena, Candidate};
use treeq::format::Format;
use treeq::output;
use treeq::parser;
use treeq::query::{self, Expr, NavigatorOptions};

#[derive(Parser)]
#[command(name = "treeq", version, about = "Query and transform YAML and JSON documents")]
struct Cli {
    /// Path expression (default: "." returns each whole document)
    #[arg(default_value = ".")]
    expression: String,

    /// Input file(s) (reads from stdin if omitted)
    files: Vec<PathBuf>,

    /// Force input format [yaml, json]
    #[arg(short = 'p', long = "input-format")]
    input_format: Option<String>,

    /// Output format [yaml, json] (default: same as input)
    #[arg(short, long = "output-format")]
    output_format: Option<String>,

    /// Write the updated documents back to the file instead of printing results
    #[arg(short, long = "in-place")]
    in_place: bool,

    /// Compact JSON output
    #[arg(short, long)]
    compact: bool,

    /// Treat aliases as leaves instead of following them to their anchors
    #[arg(long)]
    no_follow_aliases: bool,

    /// Maximum nesting depth during evaluation
    #[arg(long, default_value_t = NavigatorOptions::default().max_depth)]
    max_depth: usize,

    /// Log evaluation steps to stderr (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if cli.in_place && cli.files.is_empty() {
        anyhow::bail!("--in-place requires a file argument");
    }

    let expr = query::parse_path(&cli.expression)
        .with_context(|| format!("parsing expression {:?}", cli.expression))?;
    let options = NavigatorOptions {
        follow_aliases: !cli.no_follow_aliases,
        max_depth: cli.max_depth,
    };

    let mut separator = Separator::default();
    let mut failed = 0;
    if cli.files.is_empty() {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("reading stdin")?;
        let in_fmt = match &cli.input_format {
            Some(f) => Format::from_str_name(f)?,
            None => Format::detect(&input),
        };
        failed += process(&cli, &expr, options, &input, in_fmt, None, &mut separator)?;
    } else {
        for path in &cli.files {
            let input = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let in_fmt = match &cli.input_format {
                Some(f) => Format::from_str_name(f)?,
                None => Format::from_extension(path)?,
            };
            failed += process(&cli, &expr, options, &input, in_fmt, Some(path), &mut separator)?;
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} document(s) failed to evaluate");
    }
    Ok(())
}

/// Evaluate the expression against each document of one input, one document at
/// a time. Results are printed as soon as their document is done; with
/// `--in-place` the updated documents are written back instead, unless any of
/// them failed. Returns the number of failed documents.
fn process(
    cli: &Cli,
    expr: &Expr,
    options: NavigatorOptions,
    input: &str,
    in_fmt: Format,
    path: Option<&Path>,
    separator: &mut Separator,
) -> Result<usize> {
    let out_fmt = match &cli.output_format {
        Some(f) => Format::from_str_name(f)?,
        None => in_fmt,
    };

    let mut arena = Arena::new();
    let documents = parser::parse(input, in_fmt, &mut arena)?;
    info!("evaluating {} {} documents, printing {}", documents.len(), in_fmt, out_fmt);

    let source = path.map_or_else(|| "stdin".to_string(), |p| p.display().to_string());
    let mut failed = 0;
    let mut updated = String::new();
    let mut updated_separator = Separator::default();
    for (index, &doc) in documents.iter().enumerate() {
        let root = Candidate::root(doc, index);
        let rendered = query::evaluate_with_options(&mut arena, &[root], expr, options)
            .and_then(|results| {
                debug!("document {} produced {} results", index, results.len());
                if cli.in_place {
                    return Ok(vec![output::format_node(&arena, doc, out_fmt, cli.compact)?]);
                }
                results
                    .iter()
                    .map(|result| output::format_node(&arena, result.node, out_fmt, cli.compact))
                    .collect::<Result<Vec<_>, _>>()
            });

        match rendered {
            Ok(texts) if cli.in_place => {
                for text in &texts {
                    updated.push_str(&updated_separator.chunk(text, out_fmt));
                }
            }
            Ok(texts) => {
                let mut stdout = std::io::stdout().lock();
                for text in &texts {
                    stdout
                        .write_all(separator.chunk(text, out_fmt).as_bytes())
                        .context("writing output")?;
                }
                stdout.flush().context("writing output")?;
            }
            Err(err) => {
                eprintln!("Error: {source}: document {index}: {err}");
                failed += 1;
            }
        }
    }

    match (cli.in_place, path) {
        (true, Some(path)) if failed == 0 => write_in_place(path, &updated)?,
        (true, Some(path)) => eprintln!("{} left unchanged", path.display()),
        _ => {}
    }
    Ok(failed)
}

fn write_in_place(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent).context("creating temporary file")?;
    tmp.write_all(content.as_bytes())
        .context("writing temporary file")?;
    tmp.persist(path)
        .context("replacing file with updated content")?;
    Ok(())
}

/// Puts `---` between consecutive YAML documents of one output stream.
#[derive(Default)]
struct Separator {
    count: usize,
}

impl Separator {
    fn chunk(&mut self, formatted: &str, format: Format) -> String {
        let mut chunk = String::with_capacity(formatted.len() + 5);
        if format == Format::Yaml && self.count > 0 {
            chunk.push_str("---\n");
        }
        chunk.push_str(formatted);
        if !formatted.ends_with('\n') {
            chunk.push('\n');
        }
        self.count += 1;
        chunk
    }
}
