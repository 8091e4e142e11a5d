//! Output formatting for CLI

use crate::pipeline::EvaluationReport;

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Print a subsection header
pub fn print_subsection(title: &str) {
    println!("\n{title}");
    println!("{}", "-".repeat(40));
}

/// Format a number with thousands separators
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:20} {}", format!("{}:", key), value);
}

/// Print statistics table
pub fn print_stats_table(stats: &[(&str, &str)]) {
    for (key, value) in stats {
        print_kv(key, value);
    }
}

/// Print the aggregate lines of an evaluation
pub fn print_evaluation(report: &EvaluationReport) {
    print_stats_table(&[
        ("Episodes", &format_number(report.episodes)),
        (
            "Reward",
            &format!("{:.2} ± {:.2}", report.mean_reward, report.reward_std_dev),
        ),
        (
            "Distance",
            &format!(
                "{:.1} ± {:.1}",
                report.mean_distance, report.distance_std_dev
            ),
        ),
        ("Best distance", &format!("{:.1}", report.best_distance)),
        (
            "Deaths",
            &format!("{}/{}", report.terminal_episodes, report.episodes),
        ),
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }
}
