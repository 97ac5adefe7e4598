// Command-line front end: recognizes one scanned score and prints the JSON
// response a web caller would receive.
//
// Usage:
//   notescan [OPTIONS] <input.pdf>
//     --settings <FILE>      Settings JSON (default: <config dir>/notescan/settings.json)
//     --engine <PATH>        Audiveris executable or .app bundle
//     --output-dir <DIR>     Root for per-job output directories
//     --timeout <SECS>       Engine timeout in seconds
//     --log-level <LEVEL>    trace|debug|info|warn|error
//     --log-dir <DIR>        Write rotating log files here instead of stderr

use notescan_core::{
    default_log_level, init_logging, RecognitionResponse, Recognizer, RecognizerConfig,
};
use notescan_infra_omr_audiveris::AudiverisOmr;
use notescan_infra_storage_fs::FsSettingsStore;
use notescan_ports::storage::{RecognizerSettings, StoragePort};
use std::path::PathBuf;
use std::process;

const USAGE: &str = "Usage: notescan [--settings FILE] [--engine PATH] [--output-dir DIR] \
[--timeout SECS] [--log-level LEVEL] [--log-dir DIR] <input.pdf>";

#[derive(Debug, Default)]
struct CliArgs {
    input: Option<String>,
    settings_path: Option<PathBuf>,
    engine: Option<String>,
    output_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
    log_level: Option<String>,
    log_dir: Option<PathBuf>,
}

fn main() {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    if let Err(err) = init_logging(&level, args.log_dir.as_deref()) {
        eprintln!("Failed to initialize logging: {err}");
        process::exit(2);
    }

    let Some(input) = args.input.clone() else {
        eprintln!("{USAGE}");
        process::exit(2);
    };

    let settings = match load_settings(args.settings_path.clone()) {
        Ok(settings) => apply_overrides(settings, &args),
        Err(message) => {
            eprintln!("{message}");
            process::exit(2);
        }
    };
    let omr = AudiverisOmr::new(settings.engine_path.clone())
        .with_leading_args(settings.engine_leading_args.clone());
    let recognizer = Recognizer::new(Box::new(omr), RecognizerConfig::from_settings(&settings));

    log::info!("event=cli_recognize input={}", input);
    let response = RecognitionResponse::from(recognizer.recognize(&input));

    match response.to_json_pretty() {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("Failed to serialize response: {err}");
            process::exit(1);
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--settings" => parsed.settings_path = Some(PathBuf::from(value("--settings")?)),
            "--engine" => parsed.engine = Some(value("--engine")?),
            "--output-dir" => parsed.output_dir = Some(expand_tilde(&value("--output-dir")?)),
            "--timeout" => {
                let raw = value("--timeout")?;
                let secs = raw
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| format!("--timeout expects a positive number, got `{raw}`"))?;
                parsed.timeout_secs = Some(secs);
            }
            "--log-level" => parsed.log_level = Some(value("--log-level")?),
            "--log-dir" => parsed.log_dir = Some(expand_tilde(&value("--log-dir")?)),
            "-h" | "--help" => return Err("notescan: recognize notes in a scanned score".to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            _ => {
                if parsed.input.is_some() {
                    return Err(format!("unexpected extra argument `{arg}`"));
                }
                parsed.input = Some(arg);
            }
        }
    }

    Ok(parsed)
}

/// An explicit `--settings` file must exist; the default location may be absent.
fn load_settings(settings_path: Option<PathBuf>) -> Result<RecognizerSettings, String> {
    let store = match settings_path {
        Some(path) => {
            let path = expand_tilde(&path.to_string_lossy());
            if !path.is_file() {
                return Err(format!("settings file {} not found", path.display()));
            }
            FsSettingsStore::from_file(path)
        }
        None => FsSettingsStore::default(),
    };
    let settings = store.load_settings().map_err(|err| {
        log::error!(
            "event=settings_load status=error path={} error={}",
            store.settings_path().display(),
            err
        );
        format!(
            "failed to load settings from {}: {err}",
            store.settings_path().display()
        )
    })?;
    log::debug!(
        "event=settings_load status=ok path={}",
        store.settings_path().display()
    );
    Ok(settings)
}

fn apply_overrides(mut settings: RecognizerSettings, args: &CliArgs) -> RecognizerSettings {
    if let Some(engine) = &args.engine {
        settings.engine_path = Some(engine.clone());
    }
    if let Some(dir) = &args.output_dir {
        settings.output_root = Some(dir.clone());
    }
    if let Some(secs) = args.timeout_secs {
        settings.timeout_secs = secs;
    }
    settings
}

fn expand_tilde(path: &str) -> PathBuf {
    let Some(rest) = path.strip_prefix("~/") else {
        return PathBuf::from(path);
    };
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    home.join(rest)
}
