use std::error::Error;
use std::process;

use log::debug;

use wasmdec::parser;
use wasmdec::parser::module::Module;

const PREVIEW_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Output {
    Summary,
    Details,
    Disassemble,
    Json,
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} <file.wasm> [--details|--disassemble|--json]");
    process::exit(1);
}

fn print_custom_previews(module: &Module) {
    for custom in module.custom_sections() {
        let shown = custom.contents.len().min(PREVIEW_BYTES);
        let ellipsis = if shown < custom.contents.len() { "..." } else { "" };
        println!(
            "custom \"{}\": {}{}",
            custom.name,
            hex::encode(&custom.contents[..shown]),
            ellipsis
        );
    }
}

fn run(path: &str, output: Output) -> Result<(), Box<dyn Error>> {
    let bytes = std::fs::read(path)?;
    debug!("read {} bytes from {}", bytes.len(), path);

    let module = parser::decode(&bytes)?;

    match output {
        Output::Summary => {
            print!("{module}");
            print_custom_previews(&module);
        }
        Output::Details => print!("{}", module.to_details_string()),
        Output::Disassemble => print!("{}", module.disassemble()),
        Output::Json => println!("{}", serde_json::to_string_pretty(&module)?),
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("wasmdec");

    let mut path = None;
    let mut output = Output::Summary;
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--details" => output = Output::Details,
            "--disassemble" => output = Output::Disassemble,
            "--json" => output = Output::Json,
            flag if flag.starts_with("--") => usage(program),
            file if path.is_none() => path = Some(file.to_string()),
            _ => usage(program),
        }
    }

    let Some(path) = path else { usage(program) };

    if let Err(e) = run(&path, output) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
