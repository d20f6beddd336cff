//! Patina entrypoint: re-indent a C++ source file with the incremental
//! engine, honoring `patina.toml` style settings.

use anyhow::{Context, Result};
use clap::Parser;
use core_doc::Buffer;
use core_indent::{CodeFormatter, QtStyle};
use core_style::{Config, TabSettings, discover, load_from};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "patina", version, about = "Structural re-indenter for C++ sources")]
struct Args {
    /// Input file (UTF-8); stdin when omitted.
    pub path: Option<PathBuf>,
    /// Configuration file path (overrides discovery of `patina.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Print per-line `indent padding` depth pairs instead of the
    /// re-indented source.
    #[arg(long = "emit-depths")]
    pub emit_depths: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => load_from(path),
        None => discover(),
    }
}

fn read_input(path: &Option<PathBuf>) -> Result<(String, String)> {
    match path {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("reading {}", p.display()))?;
            Ok((p.display().to_string(), content))
        }
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .context("reading stdin")?;
            Ok(("<stdin>".to_string(), content))
        }
    }
}

/// Re-emit the buffer with computed leading whitespace. Lines inside raw
/// string literals pass through untouched; whitespace-only lines come out
/// empty.
fn reindent(buf: &Buffer, fmt: &mut CodeFormatter, tabs: &TabSettings) -> String {
    let mut out = String::new();
    for line in 0..buf.line_count() {
        let text = buf.line(line).unwrap_or_default();
        if fmt.is_in_raw_string_literal(buf, line) {
            out.push_str(&text);
        } else {
            let body = text.trim_start_matches([' ', '\t']);
            if !body.is_empty() {
                let (indent, padding) = fmt.indent_for(buf, line);
                out.push_str(&tabs.indentation_string(indent, padding));
                out.push_str(body);
            }
        }
        if line + 1 < buf.line_count() {
            out.push('\n');
        }
    }
    out
}

fn emit_depths(buf: &Buffer, fmt: &mut CodeFormatter) -> String {
    let mut out = String::new();
    for line in 0..buf.line_count() {
        let (indent, padding) = fmt.indent_for(buf, line);
        out.push_str(&format!("{line}\t{indent}\t{padding}\n"));
    }
    out
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = load_config(&args)?;
    let (name, content) = read_input(&args.path)?;
    info!(file = %name, lines = content.lines().count(), "re-indenting");

    let buf = Buffer::from_str(name, &content)?;
    let mut fmt = CodeFormatter::new(QtStyle::new(config.style(), config.tabs()));

    let output = if args.emit_depths {
        emit_depths(&buf, &mut fmt)
    } else {
        reindent(&buf, &mut fmt, &config.tabs())
    };
    print!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_style::CodeStyleSettings;

    fn run(input: &str) -> String {
        let buf = Buffer::from_str("test.cpp", input).unwrap();
        let tabs = TabSettings::default();
        let mut fmt = CodeFormatter::new(QtStyle::new(CodeStyleSettings::default(), tabs));
        reindent(&buf, &mut fmt, &tabs)
    }

    #[test]
    fn reindents_class_body() {
        assert_eq!(
            run("class C\n{\nint x;\n};"),
            "class C\n{\n    int x;\n};"
        );
    }

    #[test]
    fn normalizes_existing_whitespace() {
        assert_eq!(
            run("void f()\n{\n        int x;\n\t}"),
            "void f()\n{\n    int x;\n}"
        );
    }

    #[test]
    fn blank_lines_come_out_empty() {
        assert_eq!(run("void f()\n{\n   \nint x;\n}"), "void f()\n{\n\n    int x;\n}");
    }

    #[test]
    fn raw_string_interior_is_untouched() {
        let input = "auto s = R\"(\n  keep me\n)\";";
        assert_eq!(run(input), input);
    }
}
