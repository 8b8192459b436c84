use colored::Colorize;
use declarative::{Change, ChangeKind, ExecuteSummary, group_by_type};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Section title for a change type
fn type_name(change_type: &str) -> &str {
    match change_type {
        "function" => "Function",
        "api" => "API",
        "resource" => "Resources",
        "method" => "Methods",
        "integration" => "Integrations",
        "response" => "Responses",
        "stage" => "Stage",
        "permission" => "Permissions",
        other => other,
    }
}

/// Print planned changes grouped by type
pub fn changes(changes: &[Change]) {
    if changes.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    for (change_type, group) in group_by_type(changes) {
        println!();
        println!("  {}", type_name(change_type).bold());
        for change in group {
            let symbol = match change.kind {
                ChangeKind::Create => "+".green(),
                ChangeKind::Modify => "~".yellow(),
                ChangeKind::Remove => "-".red(),
            };
            println!("    {} {}", symbol, change.description);
        }
    }
}

/// Print what a deploy did
pub fn summary(summary: &ExecuteSummary) {
    println!();
    if summary.total_changes() == 0 {
        println!("  {} Already up to date", "✓".green().bold());
        return;
    }
    println!("  {} Deployed", "✓".green().bold());
    if summary.created > 0 {
        println!("    • {} created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} removed", summary.removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(type_name("resource"), "Resources");
        assert_eq!(type_name("permission"), "Permissions");
        assert_eq!(type_name("custom"), "custom");
    }
}
