use std::io::Read;

use scheme_annotate::{
    options::{Options, USAGE},
    prelude::*,
};
use termcolor::{ColorChoice, StandardStream};

fn read_input(options: &Options) -> std::io::Result<String> {
    match &options.filename {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

fn request(options: &Options, input: String) -> ScmResult<Request> {
    if !options.request {
        return Ok(Request::new(options.mode, input));
    }

    let body = serde_json::from_str(&input)
        .map_err(|e| ScmError::Lookup(format!("malformed request: {}", e)))?;
    Request::from_json(&body)
}

fn fail(err: ScmError) -> ! {
    match serde_json::to_string_pretty(&err.to_wire()) {
        Ok(json) => println!("{}", json),
        Err(_) => eprintln!("{}", err),
    }
    std::process::exit(1);
}

fn main() {
    env_logger::init();

    let options = match Options::parse() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    if options.help {
        println!("{}", USAGE);
        return;
    }

    let input = match read_input(&options) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("failed to read input: {}", e);
            std::process::exit(2);
        }
    };

    let request = request(&options, input).unwrap_or_else(|err| fail(err));
    log::debug!("mode {}, {} bytes of source", request.mode, request.code.len());

    let pipeline = Pipeline::new(R7rsReader::new(options.fold_case));
    let analyzed = pipeline
        .analyze(request.mode, &request.code)
        .unwrap_or_else(|err| fail(err));

    if options.pretty {
        let stdout = StandardStream::stdout(ColorChoice::Auto);
        if let Err(e) = analyzed.pretty_print(stdout.lock()) {
            eprintln!("failed to write output: {}", e);
            std::process::exit(2);
        }
        return;
    }

    match serde_json::to_string_pretty(&analyzed.to_wire()) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("failed to encode output: {}", e);
            std::process::exit(2);
        }
    }
}
