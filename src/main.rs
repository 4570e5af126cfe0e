use std::{
    ffi::OsStr,
    ffi::OsString,
    fs,
    io::Read,
    path::{Path, PathBuf},
    process,
};

use clap::{ArgGroup, Parser as ClapParser};
use oxc_span::SourceType;
use tracing::info;
use tracing_subscriber::EnvFilter;

use esmify_rs::{ConvertOptions, Esmify};

#[derive(Debug, ClapParser)]
#[command(name = "esmify", about = "esmify - convert CommonJS modules to ES modules")]
#[command(group(
    ArgGroup::new("verbosity")
        .args(["quiet", "verbose"])
        .multiple(false)
))]
struct Cli {
    /// The CommonJS source file
    input_filename: PathBuf,

    /// Only report critical errors
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Log every rewrite while converting
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Write the converted module to output filename. <input_stem>.mjs is used if no filename is provided
    #[arg(short = 'o', long = "output", num_args = 0..=1, default_missing_value = "")]
    output: Option<OsString>,
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.kind() == clap::error::ErrorKind::ArgumentConflict => {
            eprintln!("[-] Critical Error: Don't set both -q and -v at the same time");
            process::exit(2);
        }
        Err(e) => e.exit(),
    };
    init_tracing(&cli);

    let input_path = cli.input_filename;
    let source_text = match read_file_to_string_with_capacity(&input_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[-] Critical Error: Failed to read {}: {e}", input_path.display());
            process::exit(1);
        }
    };

    let source_type = match SourceType::from_path(&input_path) {
        Ok(st) => st,
        Err(e) => {
            eprintln!(
                "[-] Critical Error: Failed to determine source type for {}: {e}",
                input_path.display()
            );
            process::exit(1);
        }
    };

    info!("[!] Converting {}...", input_path.display());

    let result = match Esmify::default().convert(
        &source_text,
        ConvertOptions { source_type: Some(source_type.with_module(true)), filename_for_source_type: None },
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[-] Critical Error: {e}");
            process::exit(1);
        }
    };

    if !result.modified {
        info!("[!] Nothing to convert");
    }

    if cli.output.is_some() {
        let output_path = resolve_output_path(&input_path, cli.output.as_deref());
        if let Err(e) = fs::write(&output_path, result.code.as_bytes()) {
            eprintln!("[-] Critical Error: Failed to write {}: {e}", output_path.display());
            process::exit(1);
        }
        info!("[+] Saved {}", output_path.display());
    } else {
        print!("{}", result.code);
    }
}

fn read_file_to_string_with_capacity(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
    let cap = file.metadata().ok().and_then(|m| usize::try_from(m.len()).ok()).unwrap_or(0);
    let mut s = String::with_capacity(cap.saturating_add(1));
    file.read_to_string(&mut s)?;
    Ok(s)
}

fn resolve_output_path(input_path: &Path, output: Option<&OsStr>) -> PathBuf {
    match output {
        Some(v) if !v.is_empty() => PathBuf::from(v),
        _ => input_path.with_extension("mjs"),
    }
}
