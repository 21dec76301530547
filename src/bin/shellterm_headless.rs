//! shellterm headless runner
//!
//! Feeds a byte stream through the parser and screen without a pty, then
//! prints the resulting terminal state.

use std::io::{self, Read};
use std::process::ExitCode;

use shellterm::app;
use shellterm::core::{Line, Screen};
use shellterm::parser::Parser;

fn main() -> ExitCode {
    app::init_logging("warn");

    let args: Vec<String> = std::env::args().collect();

    let mut cols = 80usize;
    let mut rows = 24usize;
    let mut chunk = 0usize;
    let mut input_file: Option<String> = None;
    let mut output_format = OutputFormat::Text;
    let mut with_scrollback = false;
    let mut show_help = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--cols" => {
                i += 1;
                if i < args.len() {
                    cols = args[i].parse().unwrap_or(80);
                }
            }
            "-r" | "--rows" => {
                i += 1;
                if i < args.len() {
                    rows = args[i].parse().unwrap_or(24);
                }
            }
            "--chunk" => {
                i += 1;
                if i < args.len() {
                    chunk = args[i].parse().unwrap_or(0);
                }
            }
            "-f" | "--file" => {
                i += 1;
                if i < args.len() {
                    input_file = Some(args[i].clone());
                }
            }
            "-s" | "--scrollback" => with_scrollback = true,
            "-j" | "--json" => output_format = OutputFormat::Json,
            "-t" | "--text" => output_format = OutputFormat::Text,
            "-h" | "--help" => show_help = true,
            other => {
                if input_file.is_none() && !other.starts_with('-') {
                    input_file = Some(other.to_string());
                } else {
                    eprintln!("Unknown argument '{}'", other);
                    return ExitCode::FAILURE;
                }
            }
        }
        i += 1;
    }

    if show_help {
        print_help();
        return ExitCode::SUCCESS;
    }

    let input_data = match &input_file {
        Some(path) => match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            let mut data = Vec::new();
            if let Err(e) = io::stdin().read_to_end(&mut data) {
                eprintln!("Error reading stdin: {}", e);
                return ExitCode::FAILURE;
            }
            data
        }
    };

    let mut screen = Screen::new(cols, rows);
    let mut parser = Parser::new();

    // Chunked feeding exercises the parser's resumption across reads
    let chunk = if chunk == 0 { input_data.len().max(1) } else { chunk };
    for piece in input_data.chunks(chunk) {
        for action in parser.feed(piece) {
            screen.apply(action);
        }
    }

    let snapshot = screen.snapshot();
    match output_format {
        OutputFormat::Text => {
            if with_scrollback {
                for line in screen.scrollback().iter() {
                    println!("{}", Line::text(line));
                }
                println!("=== scrollback: {} lines ===", screen.scrollback().len());
            }
            println!("Terminal State ({}x{}):", snapshot.cols, snapshot.rows);
            println!("Cursor: ({}, {})", snapshot.cursor.row, snapshot.cursor.col);
            if !snapshot.title.is_empty() {
                println!("Title: {}", snapshot.title);
            }
            println!("---");
            for row in 0..snapshot.rows {
                println!("{}", snapshot.row_text(row));
            }
            println!("---");
            if parser.malformed_count() > 0 {
                eprintln!("{} malformed sequences skipped", parser.malformed_count());
            }
        }
        OutputFormat::Json => match snapshot.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing snapshot: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}

#[derive(Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

fn print_help() {
    println!("shellterm headless runner");
    println!();
    println!("Usage: shellterm-headless [OPTIONS] [INPUT_FILE]");
    println!();
    println!("Options:");
    println!("  -c, --cols <N>      Set terminal width (default: 80)");
    println!("  -r, --rows <N>      Set terminal height (default: 24)");
    println!("  -f, --file <PATH>   Read input from file");
    println!("      --chunk <N>     Feed the input N bytes at a time");
    println!("  -s, --scrollback    Also print scrollback lines (text mode)");
    println!("  -j, --json          Output snapshot as JSON");
    println!("  -t, --text          Output snapshot as text (default)");
    println!("  -h, --help          Show this help message");
    println!();
    println!("If no input file is specified, reads from stdin.");
    println!();
    println!("Examples:");
    println!("  printf 'Hello\\033[31mWorld\\033[0m' | shellterm-headless");
    println!("  shellterm-headless -c 120 -r 40 --chunk 1 capture.bin");
    println!("  shellterm-headless --json < capture.bin > snapshot.json");
}
