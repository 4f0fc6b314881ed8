//! nooc-drv - Compiler Driver
//!
//! ============================================================================
//! PIPELINE OVERVIEW
//! ============================================================================
//!
//! The driver is the entry point and orchestrator for the whole pipeline:
//!
//! ```text
//! Source file (.noo)
//!        │
//!        ▼
//!   [Lexer]  ──▶ token stream          (nooc-lex)
//!        │
//!        ▼
//!   [Parser] ──▶ AST                   (nooc-par)
//!        │
//!        ▼
//!   [Typer]  ──▶ decorated AST         (nooc-sem)
//!        │       + trait registry
//!        ▼
//!   [Evaluator] ──▶ value              (nooc-eval)
//! ```
//!
//! Responsibilities:
//!
//! 1. COMMAND LINE PARSING - flags, input validation
//! 2. FILE MANAGEMENT - read sources, track them in a SourceMap
//! 3. PHASE ORCHESTRATION - run phases in order, stop on errors
//! 4. ERROR REPORTING - render diagnostics with source snippets, exit with
//!    the right status code
//!
//! Modes:
//!
//! - default: run the file, print the final value
//! - `--type`: print the rendered type of every top-level statement
//! - `--benchmark`: run and report per-phase timings
//! - `--repl`: interactive session with statement-level error recovery

pub mod repl;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use nooc_eval::Interpreter;
use nooc_sem::typecheck_with_base;
use nooc_util::{Diagnostic, Handler, SourceMap, SourceSnippet};

/// What the driver should do with the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Run the file and print the final value
    #[default]
    Run,
    /// Print the rendered type of each top-level statement
    TypeOnly,
    /// Run and report per-phase timings
    Benchmark,
    /// Interactive session
    Repl,
}

/// Driver configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Input source file (absent in REPL mode)
    pub input_file: Option<PathBuf>,
    /// What to do
    pub mode: Mode,
}

impl Config {
    /// Parse command-line arguments (everything after the program name).
    pub fn from_args(args: &[String]) -> Result<Config> {
        let mut config = Config::default();
        for arg in args {
            match arg.as_str() {
                "--type" => config.mode = Mode::TypeOnly,
                "--benchmark" => config.mode = Mode::Benchmark,
                "--repl" => config.mode = Mode::Repl,
                "--help" | "-h" => {
                    println!("{}", USAGE);
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => {
                    return Err(anyhow!("unknown flag `{}`\n{}", flag, USAGE));
                }
                file => {
                    if config.input_file.is_some() {
                        return Err(anyhow!("multiple input files given\n{}", USAGE));
                    }
                    config.input_file = Some(PathBuf::from(file));
                }
            }
        }
        if config.mode != Mode::Repl && config.input_file.is_none() {
            return Err(anyhow!("no input file\n{}", USAGE));
        }
        Ok(config)
    }
}

const USAGE: &str = "usage: nooc [--type | --benchmark | --repl] [FILE.noo]";

/// One driver invocation: configuration, sources, diagnostics.
pub struct Session {
    pub config: Config,
    pub sources: SourceMap,
    pub handler: Handler,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sources: SourceMap::new(),
            handler: Handler::new(),
        }
    }

    /// Run the session; returns the process exit code.
    pub fn run(&mut self) -> Result<i32> {
        match self.config.mode {
            Mode::Repl => {
                repl::run_repl()?;
                Ok(0)
            }
            Mode::Run => self.run_file(false),
            Mode::TypeOnly => self.type_file(),
            Mode::Benchmark => self.run_file(true),
        }
    }

    fn read_input(&mut self) -> Result<(nooc_util::FileId, String)> {
        let path = self
            .config
            .input_file
            .clone()
            .ok_or_else(|| anyhow!("no input file"))?;
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read `{}`", path.display()))?;
        let file_id = self.sources.add(path.display().to_string(), source.clone());
        Ok((file_id, source))
    }

    /// Lex and parse, reporting diagnostics on failure. The two phases are
    /// timed separately for `--benchmark`.
    fn parse(
        &mut self,
        file_id: nooc_util::FileId,
        source: &str,
    ) -> Option<(nooc_par::Program, Duration, Duration)> {
        let lex_start = Instant::now();
        let tokens = nooc_lex::Lexer::with_file(source, &self.handler, file_id).tokenize();
        let lex_time = lex_start.elapsed();

        let parse_start = Instant::now();
        let mut parser = nooc_par::Parser::new(tokens, &self.handler);
        let program = parser.parse_program();
        let parse_time = parse_start.elapsed();

        if self.handler.has_errors() {
            self.report_diagnostics();
            return None;
        }
        Some((program, lex_time, parse_time))
    }

    fn run_file(&mut self, benchmark: bool) -> Result<i32> {
        let total_start = Instant::now();
        let (file_id, source) = self.read_input()?;

        let Some((program, lex_time, parse_time)) = self.parse(file_id, &source) else {
            return Ok(1);
        };

        let type_start = Instant::now();
        let (typed, state) = match typecheck_with_base(&program, self.import_base()) {
            Ok(ok) => ok,
            Err(err) => {
                self.report_type_error(&err);
                return Ok(1);
            }
        };
        let type_time = type_start.elapsed();

        let eval_start = Instant::now();
        let mut interp = Interpreter::new(&state);
        let value = match interp.eval_program(&typed) {
            Ok(value) => value,
            Err(err) => {
                eprintln!("runtime error: {}", err);
                return Ok(1);
            }
        };
        let eval_time = eval_start.elapsed();

        println!("{}", value.display());

        if benchmark {
            eprintln!("--- benchmark ---");
            eprintln!("lex:       {:>10.3?}", lex_time);
            eprintln!("parse:     {:>10.3?}", parse_time);
            eprintln!("typecheck: {:>10.3?}", type_time);
            eprintln!("evaluate:  {:>10.3?}", eval_time);
            eprintln!("total:     {:>10.3?}", total_start.elapsed());
        }

        Ok(0)
    }

    fn type_file(&mut self) -> Result<i32> {
        let (file_id, source) = self.read_input()?;
        let Some((program, _, _)) = self.parse(file_id, &source) else {
            return Ok(1);
        };

        let (typed, state) = match typecheck_with_base(&program, self.import_base()) {
            Ok(ok) => ok,
            Err(err) => {
                self.report_type_error(&err);
                return Ok(1);
            }
        };

        for stmt in &typed {
            let rendered = nooc_sem::rendered_type(&state, stmt);
            if stmt.effects.is_empty() {
                println!("{}", rendered);
            } else {
                println!("{} {}", rendered, stmt.effects);
            }
        }
        Ok(0)
    }

    /// The directory `import` paths resolve against first: the directory of
    /// the input file.
    fn import_base(&self) -> Option<PathBuf> {
        self.config
            .input_file
            .as_ref()
            .and_then(|f| f.parent())
            .filter(|p| p.components().next().is_some())
            .map(PathBuf::from)
    }

    fn report_type_error(&self, err: &nooc_sem::TypeError) {
        let mut diag = err.to_diagnostic();
        self.attach_snippet(&mut diag);
        eprintln!("{}", diag.render());
    }

    fn report_diagnostics(&self) {
        for mut diag in self.handler.diagnostics() {
            self.attach_snippet(&mut diag);
            eprintln!("{}", diag.render());
        }
    }

    /// Attach the offending source line to a diagnostic, when we have it.
    fn attach_snippet(&self, diag: &mut Diagnostic) {
        if diag.span.line == 0 {
            return;
        }
        if let Some(file) = self.sources.get(diag.span.file_id) {
            if let Ok(line) = file.line_text(diag.span.line) {
                let start = diag.span.column as usize;
                let width = diag.span.end.saturating_sub(diag.span.start).max(1);
                diag.snippets.push(SourceSnippet::new(
                    line,
                    diag.span.line as usize,
                    start,
                    start + width,
                    None::<String>,
                ));
            }
        }
    }
}

/// CLI entry: parse args, run a session, translate to an exit code.
pub fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::from_args(&args)?;
    let mut session = Session::new(config);
    let code = session.run()?;
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_mode_is_run() {
        let config = Config::from_args(&["main.noo".to_string()]).unwrap();
        assert_eq!(config.mode, Mode::Run);
        assert_eq!(config.input_file, Some(PathBuf::from("main.noo")));
    }

    #[test]
    fn test_config_flags() {
        let config =
            Config::from_args(&["--type".to_string(), "main.noo".to_string()]).unwrap();
        assert_eq!(config.mode, Mode::TypeOnly);

        let config =
            Config::from_args(&["--benchmark".to_string(), "m.noo".to_string()]).unwrap();
        assert_eq!(config.mode, Mode::Benchmark);

        let config = Config::from_args(&["--repl".to_string()]).unwrap();
        assert_eq!(config.mode, Mode::Repl);
    }

    #[test]
    fn test_config_requires_input_outside_repl() {
        assert!(Config::from_args(&[]).is_err());
        assert!(Config::from_args(&["--type".to_string()]).is_err());
    }

    #[test]
    fn test_config_rejects_unknown_flag() {
        assert!(Config::from_args(&["--frobnicate".to_string()]).is_err());
    }

    #[test]
    fn test_config_rejects_two_inputs() {
        assert!(Config::from_args(&["a.noo".to_string(), "b.noo".to_string()]).is_err());
    }
}
