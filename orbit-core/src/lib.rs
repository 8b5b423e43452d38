use colored::Colorize;

pub mod crawl;
pub mod render;
pub mod report;
pub mod summary;

pub fn print_banner() {
    let banner = r#"
   ____       __    _ __
  / __ \_____/ /_  (_) /_
 / / / / ___/ __ \/ / __/
/ /_/ / /  / /_/ / / /_
\____/_/  /_.___/_/\__/
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "mutual-follow graph crawler".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
