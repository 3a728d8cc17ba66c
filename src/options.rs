use std::path::PathBuf;

use crate::pipeline::ParsingMode;

pub const USAGE: &str = "\
Usage: scheme-annotate [options] [input file]

Reads Scheme source from the input file (stdin when absent) and prints the
analyzed trees as JSON.

Options:
  -h, --help: Print this help message
  --mode <mode>: VALUES, UNANNOTATED or ANNOTATED (default: ANNOTATED)
  --request: Input is a JSON request {\"mode\": ..., \"code\": ...}
  --pretty: Render trees as text instead of JSON
  --fold-case: Read symbols and characters case-insensitively";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub mode: ParsingMode,
    pub request: bool,
    pub pretty: bool,
    pub fold_case: bool,
    pub help: bool,
    pub filename: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: ParsingMode::Annotated,
            request: false,
            pretty: false,
            fold_case: false,
            help: false,
            filename: None,
        }
    }
}

impl Options {
    pub fn parse() -> Result<Self, String> {
        parse(pico_args::Arguments::from_env())
    }
}

pub fn parse(mut args: pico_args::Arguments) -> Result<Options, String> {
    let mut options = Options::default();

    if args.contains(["-h", "--help"]) {
        options.help = true;
        return Ok(options);
    }

    options.mode = match args.opt_value_from_str::<_, ParsingMode>("--mode") {
        Ok(Some(mode)) => mode,
        Ok(None) => ParsingMode::Annotated,
        Err(e) => return Err(e.to_string()),
    };

    options.request = args.contains("--request");
    options.pretty = args.contains("--pretty");
    options.fold_case = args.contains("--fold-case");

    options.filename = match args.opt_free_from_str::<PathBuf>() {
        Ok(filename) => filename,
        Err(e) => return Err(e.to_string()),
    };

    let rest = args.finish();
    if !rest.is_empty() {
        return Err(format!("unexpected arguments: {:?}", rest));
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::*;

    fn parse_args(args: &[&str]) -> Result<Options, String> {
        parse(pico_args::Arguments::from_vec(
            args.iter().map(OsString::from).collect(),
        ))
    }

    #[test]
    fn defaults() {
        assert_eq!(parse_args(&[]).unwrap(), Options::default());
    }

    #[test]
    fn flags_and_input() {
        let options = parse_args(&["--mode", "VALUES", "--pretty", "--fold-case", "in.scm"]).unwrap();

        assert_eq!(options.mode, ParsingMode::Values);
        assert!(options.pretty);
        assert!(options.fold_case);
        assert!(!options.request);
        assert_eq!(options.filename, Some(PathBuf::from("in.scm")));
    }

    #[test]
    fn unknown_mode() {
        assert!(parse_args(&["--mode", "FOO"]).is_err());
    }

    #[test]
    fn help() {
        assert!(parse_args(&["-h"]).unwrap().help);
    }
}
