pub mod new;
pub mod plugin;

use colored::Colorize;

pub fn heading(message: &str) {
    println!("\n{}", message.bold());
    println!("{}", "=".repeat(50).cyan());
}

pub fn success(message: &str) {
    println!("{} {message}", "✔".green());
}

pub fn info(message: &str) {
    println!("{} {message}", "ℹ".blue());
}

pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message.yellow());
}

pub fn error(message: &str) {
    eprintln!("{} {}", "✖".red(), message.red());
}

pub fn hint(message: &str) {
    println!("{}", message.cyan());
}
