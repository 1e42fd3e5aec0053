use mapcascade::api::StyleResultVerbose;
use mapcascade::{LoadReport, Options, StyleSource, StyledPrimitive};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_run(source: &StyleSource, report: &LoadReport, res: &StyleResultVerbose, options: &Options, color: bool) {
    let palette = ansi::Palette::new(color);
    let meta = source.meta();
    let title = meta.title.as_deref().unwrap_or(&source.name);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Styling with \"{title}\""), ansi::CYAN)));
    println!("  {} {:.3} m/px", palette.dim("scale:"), options.scale);
    if let Some(background) = source.background_color_override() {
        println!("  {} {}", palette.dim("canvas:"), palette.paint(background, ansi::YELLOW));
    }

    println!("\n{}", palette.paint("━━━ Load ━━━", ansi::GRAY));
    print_load(source, report, &palette);

    println!("\n{}", palette.paint("━━━ Index ━━━", ansi::GRAY));
    for (category, stats) in &res.details.index {
        if stats.rules == 0 {
            continue;
        }
        println!(
            "  {} {} rules  {} kv {} in {} buckets  {} key {} in {}  {} remaining {}",
            palette.paint(format!("{:<13}", category.name()), ansi::BLUE),
            stats.rules,
            palette.dim("│"),
            stats.key_value_rules,
            stats.key_value_buckets,
            palette.dim("│"),
            stats.key_rules,
            stats.key_buckets,
            palette.dim("│"),
            stats.remaining,
        );
    }

    println!("\n{}", palette.paint("━━━ Cascades ━━━", ansi::GRAY));
    if res.styled.iter().all(|s| s.layers.is_empty()) {
        println!("{}", palette.dim("  No declarations executed"));
        println!("\n{}", palette.paint("Possible reasons:", ansi::YELLOW));
        println!("  • No selector matched (check base and conditions)");
        println!("  • Matches were outside their zoom range");
        println!("\n{}", palette.dim("  Tip: Set RUST_LOG=mapcascade=trace to see every executed rule"));
    } else {
        for (styled, (_, metrics)) in res.styled.iter().zip(&res.details.per_primitive) {
            print_styled(styled, metrics.candidates, metrics.executed, &palette);
        }
    }

    let totals = &res.details.totals;
    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Candidates: {}  │  Matched: {}  │  Executed: {}  │  Out of range: {}  │  Deduplicated: {}",
        palette.paint(format!("{:?}", res.details.total), ansi::GREEN),
        palette.paint(totals.candidates.to_string(), ansi::CYAN),
        totals.matched,
        palette.paint(totals.executed.to_string(), ansi::GREEN),
        palette.dim(totals.out_of_range.to_string()),
        palette.dim(totals.deduplicated.to_string()),
    );
    println!();
}

fn print_load(source: &StyleSource, report: &LoadReport, palette: &ansi::Palette) {
    println!(
        "  {} rules in {}  {} generation {}",
        palette.paint(report.metrics.rules.to_string(), ansi::GREEN),
        palette.dim(format!("{:?}", report.metrics.total)),
        palette.dim("│"),
        source.generation(),
    );
    for err in &report.errors {
        println!("  {} {}", palette.paint("✗", ansi::RED), err);
    }
    for setting in source.settings() {
        let on = source.setting_value(&setting.id).unwrap_or(setting.default);
        println!(
            "  {} {} {}",
            palette.dim("setting"),
            palette.paint(&setting.id, ansi::CYAN),
            if on { palette.paint("on", ansi::GREEN) } else { palette.dim("off") }
        );
    }
}

fn print_styled(styled: &StyledPrimitive, candidates: usize, executed: usize, palette: &ansi::Palette) {
    println!(
        "  {} {} {}",
        palette.bold(palette.paint(styled.id.to_string(), ansi::GREEN)),
        palette.dim("│"),
        palette.dim(format!("{executed}/{candidates} rules  valid {}", styled.range)),
    );
    if styled.layers.is_empty() {
        println!("      {}", palette.dim("(unstyled)"));
    }
    for (layer, props) in &styled.layers {
        println!("      {}", palette.paint(format!("::{layer}"), ansi::BLUE));
        for (key, value) in props {
            println!("        {}: {}", palette.paint(key, ansi::YELLOW), value);
        }
    }
}
