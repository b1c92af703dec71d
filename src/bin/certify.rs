//! Certify one document described by a JSON request
//!
//! Reads the key store and options from `CERTIFIER_*` environment
//! variables, fetches the document from the file system store, and writes
//! the signed file to `<store root>/<prefix>/<key>`.
//!
//! Usage:
//!   cargo run --release --bin certify -- request.json
//!   cargo run --release --bin certify -- request.json --output signed.pdf

use pdf_certifier::config::CertifierConfig;
use pdf_certifier::request::{CertificationRequest, CertificationResponse, ErrorResponse};
use pdf_certifier::storage::FileSystemStore;
use pdf_certifier::{Certifier, Error, Result};
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;

struct Args {
    request: PathBuf,
    output: Option<PathBuf>,
}

impl Args {
    fn from_args() -> Option<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut request = None;
        let mut output = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--output" | "-o" => {
                    i += 1;
                    output = args.get(i).map(PathBuf::from);
                },
                other if request.is_none() => request = Some(PathBuf::from(other)),
                other => log::warn!("Ignoring argument '{}'", other),
            }
            i += 1;
        }

        Some(Self {
            request: request?,
            output,
        })
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(args) = Args::from_args() else {
        eprintln!("Usage: certify <request.json> [--output <signed.pdf>]");
        return ExitCode::from(2);
    };

    match run(&args) {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
            ExitCode::SUCCESS
        },
        Err(err) => {
            let response = ErrorResponse::from(&err);
            println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
            ExitCode::FAILURE
        },
    }
}

fn run(args: &Args) -> Result<CertificationResponse> {
    let request = CertificationRequest::from_json(&std::fs::read_to_string(&args.request)?)?;
    let config = CertifierConfig::from_env()?;
    let store = FileSystemStore::new(&config.store_root);
    let certifier = Certifier::new(config);

    let certification = certifier.certify(&request, &store)?;
    let output = match &args.output {
        Some(path) => path.clone(),
        None => output_path(store.root(), &certification.response.signed_document_location)?,
    };
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output, certification.document.into_bytes())?;
    log::info!("Wrote {}", output.display());

    Ok(certification.response)
}

fn output_path(root: &Path, location: &str) -> Result<PathBuf> {
    let relative = Path::new(location);
    if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
        return Err(Error::Validation(vec![format!(
            "signed document location '{}' must be a relative path",
            location
        )]));
    }
    Ok(root.join(relative))
}
