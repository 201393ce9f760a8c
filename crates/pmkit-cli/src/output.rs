use owo_colors::OwoColorize;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("  {}", header_row.join("  ").bold());

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("  {}", cells.join("  "));
    }
}

pub fn header(title: &str) {
    println!();
    println!("{}", title.bold().cyan());
    println!("{}", "─".repeat(title.chars().count().max(20)).dimmed());
}

pub fn success(message: &str) {
    println!("{} {message}", "✓".green());
}

pub fn info(message: &str) {
    println!("{} {message}", "ℹ".blue());
}

pub fn warn(message: &str) {
    println!("{} {message}", "⚠".yellow());
}

pub fn failure(message: &str) {
    println!("{} {message}", "✗".red());
}

/// `✓ name: message` or `✗ name: message`.
pub fn check(name: &str, passed: bool, message: &str) {
    if passed {
        println!("  {} {}: {}", "✓".green(), name, message.dimmed());
    } else {
        println!("  {} {}: {}", "✗".red(), name, message);
    }
}

pub fn list<S: AsRef<str>>(items: &[S]) {
    for item in items {
        println!("  • {}", item.as_ref().cyan());
    }
}

pub fn key_value(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// A rounded box around `lines`, sized to the widest line.
pub fn boxed(lines: &[String]) {
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 2;
    println!("╭{}╮", "─".repeat(width));
    for line in lines {
        let pad = width - 1 - line.chars().count();
        println!("│ {line}{}│", " ".repeat(pad));
    }
    println!("╰{}╯", "─".repeat(width));
}
