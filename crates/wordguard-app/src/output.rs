//! Rendering of detection results for the terminal.

use std::fmt::Write;

use clap::ValueEnum;
use serde::Serialize;

use wordguard_core::{BatchItem, BatchResult, DetectionResult, EvaluationReport};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Texts longer than this are shortened in batch listings.
const PREVIEW_CHARS: usize = 50;

#[derive(Serialize)]
struct TextEntry<'a> {
    text: &'a str,
    #[serde(flatten)]
    result: &'a DetectionResult,
}

#[derive(Serialize)]
struct BatchEntry<'a> {
    text: &'a str,
    #[serde(flatten)]
    item: &'a BatchItem,
}

fn status(result: &DetectionResult) -> &'static str {
    if result.is_safe {
        "SAFE"
    } else {
        "UNSAFE"
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

/// Renders one detection.
pub fn render_detection(
    text: &str,
    result: &DetectionResult,
    format: OutputFormat,
) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(&TextEntry { text, result });
    }

    let mut out = String::new();
    let _ = writeln!(out, "Text: {text}");
    let _ = writeln!(out, "Status: {}", status(result));
    let _ = writeln!(out, "Risk level: {}", result.risk_level);
    let _ = writeln!(out, "Confidence: {:.2}", result.confidence);
    if !result.matched_terms.is_empty() {
        let _ = writeln!(out, "Matched terms: {}", result.matched_terms.join(", "));
    }
    Ok(out)
}

/// Renders a batch; `texts` and `batch` must line up.
pub fn render_batch(
    texts: &[String],
    batch: &BatchResult,
    format: OutputFormat,
) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        let entries: Vec<BatchEntry<'_>> = texts
            .iter()
            .zip(batch.iter())
            .map(|(text, item)| BatchEntry { text, item })
            .collect();
        return serde_json::to_string_pretty(&entries);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Batch results ({} texts):", texts.len());
    let _ = writeln!(out, "{}", "=".repeat(50));
    for (i, (text, item)) in texts.iter().zip(batch.iter()).enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, preview(text));
        match item {
            BatchItem::Detected(result) => {
                let _ = writeln!(
                    out,
                    "   Status: {} | Risk level: {}",
                    status(result),
                    result.risk_level
                );
                if !result.matched_terms.is_empty() {
                    let _ = writeln!(out, "   Terms: {}", result.matched_terms.join(", "));
                }
            }
            BatchItem::Failed { message, .. } => {
                let _ = writeln!(out, "   Error: {message}");
            }
        }
        out.push('\n');
    }
    Ok(out)
}

/// Renders an evaluation report.
pub fn render_report(report: &EvaluationReport, format: OutputFormat) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(report);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Evaluation ({})", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "{}", "=".repeat(50));
    let _ = writeln!(
        out,
        "Samples: {} total, {} evaluated, {} skipped",
        report.total, report.evaluated, report.skipped
    );
    let _ = writeln!(
        out,
        "Answer (Yes): {} samples, {} correct, {} incorrect",
        report.yes_count, report.yes_correct, report.yes_incorrect
    );
    let _ = writeln!(
        out,
        "Refuse (No): {} samples, {} correct, {} incorrect",
        report.no_count, report.no_correct, report.no_incorrect
    );
    out.push('\n');
    let _ = writeln!(out, "Accuracy: {}", percent(report.accuracy));
    let _ = writeln!(out, "Refusal accuracy: {}", percent(report.refusal_accuracy));
    let _ = writeln!(out, "Answer accuracy: {}", percent(report.answer_accuracy));
    let _ = writeln!(out, "Precision: {}", percent(report.precision));
    let _ = writeln!(out, "F1: {}", percent(report.f1));

    if !report.false_positives.is_empty() {
        let _ = writeln!(out, "\nFalse positives ({}):", report.false_positives.len());
        for fp in &report.false_positives {
            let _ = writeln!(
                out,
                "  #{} {} [{}]",
                fp.index,
                preview(&fp.question),
                fp.matched_terms.join(", ")
            );
        }
    }
    if !report.false_negatives.is_empty() {
        let _ = writeln!(out, "\nFalse negatives ({}):", report.false_negatives.len());
        for fn_ in &report.false_negatives {
            let _ = writeln!(out, "  #{} {}", fn_.index, preview(&fn_.question));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordguard_core::{evaluate, DetectorError, Label, LabeledSample, SensitiveWordDetector};

    fn detector() -> SensitiveWordDetector {
        SensitiveWordDetector::with_words(["测试", "赌博"]).unwrap()
    }

    #[test]
    fn text_detection_lists_terms() {
        let result = detector().detect("这是一个测试文本").unwrap();
        let out = render_detection("这是一个测试文本", &result, OutputFormat::Text).unwrap();

        assert!(out.contains("Status: UNSAFE"));
        assert!(out.contains("Matched terms: 测试"));
    }

    #[test]
    fn text_detection_safe_has_no_terms_line() {
        let result = detector().detect("今天天气很好").unwrap();
        let out = render_detection("今天天气很好", &result, OutputFormat::Text).unwrap();

        assert!(out.contains("Status: SAFE"));
        assert!(out.contains("Risk level: safe"));
        assert!(!out.contains("Matched terms"));
    }

    #[test]
    fn json_detection_includes_text() {
        let result = detector().detect("测试").unwrap();
        let out = render_detection("测试", &result, OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(json["text"], "测试");
        assert_eq!(json["is_safe"], false);
        assert_eq!(json["matched_terms"][0], "测试");
    }

    #[test]
    fn batch_text_numbers_items_and_shows_errors() {
        let texts = vec!["今天天气很好".to_string(), "赌博".to_string(), "x".to_string()];
        let mut items: Vec<BatchItem> = detector()
            .batch_detect(&texts[..2])
            .into_iter()
            .collect();
        items.push(Err(DetectorError::EmptyDetector).into());
        let batch = BatchResult::new(items);

        let out = render_batch(&texts, &batch, OutputFormat::Text).unwrap();
        assert!(out.contains("Batch results (3 texts)"));
        assert!(out.contains("1. 今天天气很好"));
        assert!(out.contains("2. 赌博"));
        assert!(out.contains("Terms: 赌博"));
        assert!(out.contains("Error:"));
    }

    #[test]
    fn batch_json_is_array_in_order() {
        let texts = vec!["今天天气很好".to_string(), "测试".to_string()];
        let batch = detector().batch_detect(&texts);
        let out = render_batch(&texts, &batch, OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(json[0]["text"], "今天天气很好");
        assert_eq!(json[0]["outcome"], "detected");
        assert_eq!(json[1]["is_safe"], false);
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "字".repeat(60);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);
        assert!(shown.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn report_text_shows_metrics() {
        let samples = vec![
            LabeledSample::new("今天天气很好", Label::Yes),
            LabeledSample::new("网上赌博", Label::No),
            LabeledSample::new("怎么偷东西", Label::No),
        ];
        let report = evaluate(&detector(), &samples);
        let out = render_report(&report, OutputFormat::Text).unwrap();

        assert!(out.contains("Accuracy: 66.67%"));
        assert!(out.contains("Refusal accuracy: 50.00%"));
        assert!(out.contains("False negatives (1)"));
        assert!(!out.contains("False positives"));
    }
}
