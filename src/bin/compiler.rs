//! Compiler front end CLI
//!
//! Parses a source file (or standard input) into a typed AST and prints
//! the canonical S-expression rendering, or a JSON dump with `--json`.
//! Code generation consumes the same `Program` value; this binary stops
//! at the front end's boundary.

use c_front::{parse, CompilerError, Parser, Program, Result};
use console::style;
use log::{debug, info};
use std::io::Read;
use std::path::PathBuf;
use std::process;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "c_front_compiler",
    about = "Parse a small C-like language into a typed AST"
)]
struct Opt {
    /// Source file; reads standard input when omitted
    #[structopt(parse(from_os_str))]
    input: Option<PathBuf>,

    /// Emit the AST as JSON instead of S-expressions
    #[structopt(long)]
    json: bool,
}

fn read_source(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

fn parse_source(source: &str, file: Option<&PathBuf>) -> Result<Program> {
    match file {
        Some(path) => Parser::with_file(source, path.display().to_string()).parse_program(),
        None => parse(source),
    }
}

fn render(program: &Program, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(program)
            .map_err(|e| CompilerError::internal_error(format!("failed to serialize AST: {}", e)));
    }
    let mut out = String::new();
    for func in &program.functions {
        out.push_str(&func.to_string());
        out.push('\n');
    }
    Ok(out)
}

fn run(opt: &Opt) -> Result<String> {
    let source = read_source(opt.input.as_ref())?;
    info!(
        "parsing {}",
        opt.input
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<stdin>".to_string())
    );
    let program = parse_source(&source, opt.input.as_ref())?;
    debug!("parsed {} function(s)", program.functions.len());
    render(&program, opt.json)
}

fn main() {
    // Initialize logging with reasonable defaults
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let opt = Opt::from_args();
    match run(&opt) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_sexpressions_one_function_per_line() {
        let program = parse("int f(){return 1;} int g(){return 2;}").unwrap();
        let output = render(&program, false).unwrap();
        assert_eq!(output, "(int)f(){(return 1);}\n(int)g(){(return 2);}\n");
    }

    #[test]
    fn renders_json_with_functions_and_globals() {
        let program = parse("int f(){char s[] = \"hi\";}").unwrap();
        let output = render(&program, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["functions"].as_array().unwrap().len(), 1);
        assert_eq!(value["globals"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn parse_errors_carry_the_file_name() {
        let err = parse_source("int f(){x;}", Some(&PathBuf::from("demo.c"))).unwrap_err();
        assert!(err.to_string().contains("demo.c"), "got: {}", err);
    }
}
