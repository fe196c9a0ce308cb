//! CertSeal CLI
//!
//! Seal and verify land-certificate images from the command line.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use certseal::stego::{capacity_bits, max_payload_len};
use certseal::{
    ensure_unsealed, seal_certificate, verify_image_bytes, CertError, JsonRecordStore, Payload,
    RasterImage, RecordStore, SealKey, VerificationReport,
};

/// CertSeal CLI - Seal and verify land-certificate images
#[derive(Parser, Debug)]
#[command(name = "certseal")]
#[command(version)]
#[command(about = "Seal and verify land-certificate images from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Seal key as 64 hex characters
    #[arg(short, long, env = "CERTSEAL_KEY", hide_env_values = true, global = true)]
    key: Option<String>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed a sealed payload into a certificate image
    Seal {
        /// Certificate image to seal
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Payload JSON file
        #[arg(short, long, value_name = "JSON")]
        payload: PathBuf,

        /// Output PNG path
        #[arg(short, long, value_name = "PNG")]
        out: PathBuf,

        /// Record store to check and update with the integrity anchor
        #[arg(short, long, value_name = "JSON")]
        records: Option<PathBuf>,
    },

    /// Verify a certificate image against the record store
    Verify {
        /// Certificate image to verify
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Record store JSON file
        #[arg(short, long, value_name = "JSON")]
        records: PathBuf,
    },

    /// Show how much data an image can carry
    Capacity {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
}

#[derive(Clone, Debug, PartialEq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'text' or 'json'", s)),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            print_error(&e, &cli.format);
            let code = e
                .downcast_ref::<CertError>()
                .map(CertError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "certseal=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        Command::Seal {
            image,
            payload,
            out,
            records,
        } => {
            let key = load_key(cli)?;
            run_seal(image, payload, out, records.as_deref(), &key, &cli.format)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { image, records } => {
            let key = load_key(cli)?;
            let store = JsonRecordStore::load(records)
                .with_context(|| format!("Failed to load records: {}", records.display()))?;
            let bytes = fs::read(image)
                .with_context(|| format!("Failed to read image: {}", image.display()))?;

            let report = verify_image_bytes(&bytes, &key, &store);
            print_report(&report, &cli.format, cli.verbose);
            Ok(ExitCode::from(report.verdict.exit_code()))
        }
        Command::Capacity { image } => {
            let raster = read_raster(image)?;
            print_capacity(&raster, &cli.format);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_key(cli: &Cli) -> Result<SealKey> {
    let encoded = cli.key.as_deref().ok_or(CertError::InvalidKey)?;
    Ok(SealKey::from_hex(encoded)?)
}

fn read_raster(path: &Path) -> Result<RasterImage> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read image: {}", path.display()))?;
    RasterImage::decode(&bytes).with_context(|| format!("Failed to decode image: {}", path.display()))
}

fn run_seal(
    image_path: &Path,
    payload_path: &Path,
    out: &Path,
    records_path: Option<&Path>,
    key: &SealKey,
    format: &OutputFormat,
) -> Result<()> {
    let payload_bytes = fs::read(payload_path)
        .with_context(|| format!("Failed to read payload: {}", payload_path.display()))?;
    let mut payload = Payload::from_json(&payload_bytes)?;
    if payload.verified_at_timestamp.is_empty() {
        payload.verified_at_timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    }

    // Check the anchor precondition before touching the image
    let mut store = match records_path {
        Some(path) => {
            let store = JsonRecordStore::load(path)
                .with_context(|| format!("Failed to load records: {}", path.display()))?;
            let record = store
                .find_record(&payload.certificate_id)
                .ok_or(CertError::RecordNotFound)?;
            ensure_unsealed(&record)?;
            Some((path, store))
        }
        None => None,
    };

    let raster = read_raster(image_path)?;
    let outcome = seal_certificate(raster, &payload, key)?;

    let hash = outcome.integrity_hash_hex();
    let png = outcome.image.encode_png()?;

    // The image only appears at `out` once its anchor is on record
    write_sealed_image(out, &png, || {
        if let Some((path, store)) = store.as_mut() {
            store.anchor(&payload.certificate_id, &hash)?;
            store
                .save(path)
                .with_context(|| format!("Failed to save records: {}", path.display()))?;
        }
        Ok(())
    })?;

    if *format == OutputFormat::Json {
        let json = serde_json::json!({
            "status": "sealed",
            "certificateId": payload.certificate_id,
            "output": out.display().to_string(),
            "integrityHash": hash,
            "anchored": records_path.is_some()
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("Sealed:         {}", out.display());
        println!("Certificate:    {}", payload.certificate_id);
        println!("Integrity Hash: {}", hash);
        if records_path.is_none() {
            println!("Note: no record store given; persist the integrity hash with the certificate.");
        }
    }
    Ok(())
}

/// Stages `png` next to `out`, runs `commit`, then moves the image into place.
///
/// If `commit` fails the staged file is dropped and `out` is left untouched.
fn write_sealed_image<F>(out: &Path, png: &[u8], commit: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let parent = match out.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut staged = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    staged
        .write_all(png)
        .context("Failed to write to temp file")?;

    commit()?;

    staged
        .persist(out)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write image: {}", out.display()))?;
    Ok(())
}

fn print_capacity(raster: &RasterImage, format: &OutputFormat) {
    if *format == OutputFormat::Json {
        let json = serde_json::json!({
            "width": raster.width(),
            "height": raster.height(),
            "capacityBits": capacity_bits(raster),
            "maxPayloadBytes": max_payload_len(raster)
        });
        println!("{}", json);
    } else {
        println!("Dimensions:   {}x{}", raster.width(), raster.height());
        println!("Capacity:     {} bits", capacity_bits(raster));
        println!("Max payload:  {} bytes", max_payload_len(raster));
    }
}

fn print_report(report: &VerificationReport, format: &OutputFormat, verbose: bool) {
    if *format == OutputFormat::Json {
        match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize report: {}", e),
        }
    } else {
        print_report_text(report, verbose);
    }
}

fn print_report_text(report: &VerificationReport, verbose: bool) {
    let reset = "\x1b[0m";
    let bold = "\x1b[1m";
    let color = report.verdict.color_code();

    println!();
    println!("{}CERTIFICATE VERIFICATION SUMMARY{}", bold, reset);
    println!("================================");
    println!("Status:      {}{}{}{}", bold, color, report.verdict.display_name(), reset);
    println!("Reason:      {}", report.reason);

    if let Some(conflict) = &report.serial_conflict {
        println!();
        println!("Image serial:   {}", conflict.image_serial);
        println!("Record serial:  {}", conflict.record_serial);
    }

    let Some(cert) = &report.certificate else {
        println!();
        return;
    };

    println!();
    println!("{}CERTIFICATE DETAILS{}", bold, reset);
    println!("-------------------");
    println!("Number:      {}", cert.serial_number);
    if !cert.status.is_empty() {
        println!("Status:      {}", cert.status);
    }
    if let Some(image_owner) = &report.image_owner_name {
        println!("Image owner: {}", image_owner);
    }
    println!("Owner:       {}", cert.owner_name);
    println!("Email:       {}", cert.owner_email);
    if verbose {
        println!("Certificate: {}", cert.certificate_id);
    }

    if !cert.history.is_empty() {
        println!();
        println!("{}OWNERSHIP HISTORY{}", bold, reset);
        println!("-----------------");
        for entry in &cert.history {
            let who = if entry.owner_name.is_empty() {
                &entry.owner_email
            } else {
                &entry.owner_name
            };
            match &entry.note {
                Some(note) => println!("{}  {:<12} {} ({})", entry.date, entry.action, who, note),
                None => println!("{}  {:<12} {}", entry.date, entry.action, who),
            }
        }
    }
    println!();
}

fn print_error(error: &anyhow::Error, format: &OutputFormat) {
    if *format == OutputFormat::Json {
        let code = error
            .downcast_ref::<CertError>()
            .map(CertError::exit_code)
            .unwrap_or(1);
        let json = serde_json::json!({
            "status": "failed",
            "error": format!("{:#}", error),
            "exitCode": code
        });
        println!("{}", json);
    } else {
        let reset = "\x1b[0m";
        let red = "\x1b[31m";
        let bold = "\x1b[1m";

        eprintln!("{}{}Error:{} {:#}", bold, red, reset, error);
        if let Some(CertError::CapacityExceeded { .. }) = error.downcast_ref::<CertError>() {
            eprintln!("Use a larger image or a smaller payload.");
        }
    }
}
