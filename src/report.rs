use std::fmt::Write;

use crate::catalog::Catalog;
use crate::models::StudentRecord;

#[derive(Debug, Clone)]
pub struct SubjectSummary {
    pub subject_name: String,
    pub students_started: usize,
    pub avg_completion: f64,
}

pub fn summarize_by_subject(records: &[StudentRecord], catalog: &Catalog) -> Vec<SubjectSummary> {
    catalog
        .subjects
        .iter()
        .map(|subject| {
            let entries: Vec<u8> = records
                .iter()
                .filter_map(|r| r.progress.get(&subject.id))
                .map(|p| p.completion_percentage)
                .collect();
            SubjectSummary {
                subject_name: subject.name.clone(),
                students_started: entries.len(),
                avg_completion: if entries.is_empty() {
                    0.0
                } else {
                    entries.iter().map(|&p| p as f64).sum::<f64>() / entries.len() as f64
                },
            }
        })
        .collect()
}

pub fn badge_counts(records: &[StudentRecord]) -> Vec<(String, usize)> {
    let mut map: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for record in records {
        for badge in &record.badges {
            *map.entry(badge.clone()).or_insert(0) += 1;
        }
    }
    let mut counts: Vec<(String, usize)> = map.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

pub fn build_report(leaderboard: &[StudentRecord], catalog: &Catalog) -> String {
    let summaries = summarize_by_subject(leaderboard, catalog);
    let badges = badge_counts(leaderboard);

    let mut output = String::new();
    let _ = writeln!(output, "# VidyaHub Class Progress Report");
    let _ = writeln!(
        output,
        "Generated on {} for {} students",
        chrono::Utc::now().date_naive(),
        leaderboard.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Leaderboard");

    if leaderboard.is_empty() {
        let _ = writeln!(output, "No students on the roster.");
    } else {
        for record in leaderboard.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} (grade {}, {}) {} coins, {} badges",
                record.name,
                record.grade,
                record.level,
                record.coins,
                record.badges.len()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subject Completion");

    for summary in summaries.iter() {
        if summary.students_started == 0 {
            let _ = writeln!(output, "- {}: not started by anyone", summary.subject_name);
        } else {
            let _ = writeln!(
                output,
                "- {}: {} students started, avg completion {:.0}%",
                summary.subject_name, summary.students_started, summary.avg_completion
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Badges Earned");

    if badges.is_empty() {
        let _ = writeln!(output, "No badges earned yet.");
    } else {
        for (badge, count) in badges.iter() {
            let icon = crate::catalog::BADGES
                .iter()
                .find(|b| b.name == *badge)
                .map(|b| b.icon)
                .unwrap_or("🎖️");
            let _ = writeln!(output, "- {icon} {badge}: {count}");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::standard_catalog;
    use crate::models::SubjectProgress;

    fn record_with_math(pct: u8, badges: &[&str]) -> StudentRecord {
        let mut record = StudentRecord::fresh(&format!("u{pct}"), "Student", None);
        record.badges = badges.iter().map(|b| b.to_string()).collect();
        record.progress.insert(
            "math".to_string(),
            SubjectProgress {
                completion_percentage: pct,
                ..Default::default()
            },
        );
        record
    }

    #[test]
    fn subject_summary_averages_started_students_only() {
        let records = vec![record_with_math(40, &[]), record_with_math(60, &[])];
        let summaries = summarize_by_subject(&records, &standard_catalog());
        let math = summaries
            .iter()
            .find(|s| s.subject_name == "Mathematics")
            .unwrap();
        assert_eq!(math.students_started, 2);
        assert!((math.avg_completion - 50.0).abs() < 0.001);

        let science = summaries
            .iter()
            .find(|s| s.subject_name == "Science")
            .unwrap();
        assert_eq!(science.students_started, 0);
    }

    #[test]
    fn badge_counts_sort_by_frequency() {
        let records = vec![
            record_with_math(10, &["Math Whiz", "Top Learner"]),
            record_with_math(20, &["Math Whiz"]),
        ];
        let counts = badge_counts(&records);
        assert_eq!(counts[0], ("Math Whiz".to_string(), 2));
        assert_eq!(counts[1], ("Top Learner".to_string(), 1));
    }

    #[test]
    fn report_contains_all_sections() {
        let records = crate::catalog::seed_roster();
        let report = build_report(&records, &standard_catalog());
        assert!(report.contains("## Leaderboard"));
        assert!(report.contains("## Subject Completion"));
        assert!(report.contains("## Badges Earned"));
        assert!(report.contains("Charlie"));
    }
}
