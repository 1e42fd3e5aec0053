mod debug_report;

use clap::Parser;
use mapcascade::{DataDocument, Options, SheetDocument, StyleSource, style_verbose_with};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Style map primitives with a MapCSS-style rule sheet and print the cascades.
///
/// Exit codes: 0 success, 1 the sheet loaded with errors, 2 unreadable input.
#[derive(Debug, Parser)]
#[command(name = "mapcascade", version, about)]
struct Cli {
    /// Stylesheet document (JSON).
    sheet: PathBuf,

    /// Primitives to style (JSON).
    data: PathBuf,

    /// Zoom level to style at.
    #[arg(short, long, default_value_t = mapcascade::api::DEFAULT_ZOOM, conflicts_with = "scale")]
    zoom: u32,

    /// Explicit render scale in meters per pixel.
    #[arg(long)]
    scale: Option<f64>,

    /// Treat open ways as closed.
    #[arg(long)]
    pretend_closed: bool,

    /// Switch a style setting on (`id`) or off (`id=false`). Repeatable.
    #[arg(long = "set", value_name = "ID[=BOOL]")]
    settings: Vec<String>,

    /// Force ANSI color output.
    #[arg(long, conflicts_with = "no_color")]
    color: bool,

    /// Disable ANSI color output.
    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let sheet = match read_json(&cli.sheet, SheetDocument::from_json) {
        Ok(sheet) => sheet,
        Err(err) => return fail(err),
    };
    let data = match read_json(&cli.data, DataDocument::from_json) {
        Ok(data) => data.into_data_set(),
        Err(err) => return fail(err),
    };

    let source = StyleSource::new(sheet.name.clone());
    let report = match sheet.load_into(&source) {
        Ok(report) => report,
        Err(err) => return fail(format!("error: {err}")),
    };
    for (id, value) in cli.settings.iter().map(|s| parse_setting(s)) {
        if !source.set_setting(id, value) {
            log::warn!("unknown setting '{id}'");
        }
    }

    let mut options = Options::at_zoom(cli.zoom);
    if let Some(scale) = cli.scale {
        options.scale = scale;
    }
    options.pretend_way_closed = cli.pretend_closed;

    let color = if cli.no_color { false } else { cli.color || io::stdout().is_terminal() };
    let res = style_verbose_with(&source, &data, &options);
    debug_report::print_run(&source, &report, &res, &options, color);

    if report.is_clean() { ExitCode::SUCCESS } else { ExitCode::from(1) }
}

fn read_json<T>(path: &Path, parse: fn(&str) -> mapcascade::Result<T>) -> Result<T, String> {
    let text = std::fs::read_to_string(path).map_err(|err| format!("error: failed to read {}: {err}", path.display()))?;
    parse(&text).map_err(|err| format!("error: {}: {err}", path.display()))
}

fn parse_setting(arg: &str) -> (&str, bool) {
    match arg.split_once('=') {
        Some((id, value)) => (id, !matches!(value, "false" | "no" | "0" | "off")),
        None => (arg, true),
    }
}

fn fail(message: String) -> ExitCode {
    eprintln!("{message}");
    ExitCode::from(2)
}
