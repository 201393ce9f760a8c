//! Welcome banner for `pm-kit init`.

use owo_colors::OwoColorize;
use pmkit_core::metadata::CLI_VERSION;
use std::io::{IsTerminal, Write};
use std::time::Duration;

const LINE_DELAY: Duration = Duration::from_millis(45);

const LOGO: &[&str] = &[
    "██████╗ ███╗   ███╗    ██╗  ██╗██╗████████╗",
    "██╔══██╗████╗ ████║    ██║ ██╔╝██║╚══██╔══╝",
    "██████╔╝██╔████╔██║    █████╔╝ ██║   ██║",
    "██╔═══╝ ██║╚██╔╝██║    ██╔═██╗ ██║   ██║",
    "██║     ██║ ╚═╝ ██║    ██║  ██╗██║   ██║",
    "╚═╝     ╚═╝     ╚═╝    ╚═╝  ╚═╝╚═╝   ╚═╝",
];

/// Print the logo, revealing it line by line when `animate` is set and
/// stdout is a terminal.
pub fn show_banner(animate: bool) {
    let animate = animate && std::io::stdout().is_terminal();
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out);
    for (i, line) in LOGO.iter().enumerate() {
        let colored = if i < LOGO.len() / 2 {
            line.truecolor(0xff, 0x99, 0x66).to_string()
        } else {
            line.truecolor(0xff, 0x5e, 0x62).to_string()
        };
        let _ = writeln!(out, "{colored}");
        if animate {
            let _ = out.flush();
            std::thread::sleep(LINE_DELAY);
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {}  {} {}  {}  {}",
        "Product Managers Claude Kit".bold(),
        "Version".dimmed(),
        CLI_VERSION.yellow(),
        "•".dimmed(),
        "AI-Powered PM Toolkit".dimmed()
    );
    let _ = writeln!(out);
}
