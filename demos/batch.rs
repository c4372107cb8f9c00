/// Batch prediction example
///
/// Train models first, then run:
/// ```
/// cargo run --example batch
/// ```

use bookmark_classifier::{Dimension, Predictor};
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Bookmark Classifier - Batch Prediction Example\n");

    let predictor = Predictor::new()?;
    println!("✓ Models loaded\n");

    let texts = vec![
        "tokio tutorial https://tokio.rs/tokio/tutorial",
        "requests https://pypi.org/project/requests/",
        "GitHub REST API https://docs.github.com/en/rest",
        "bilibili 番剧 https://www.bilibili.com/anime/",
        "Figma https://www.figma.com/",
        "MDN Web Docs https://developer.mozilla.org/",
        "Hacker News https://news.ycombinator.com/",
        "美团外卖 https://waimai.meituan.com/",
    ];

    println!("Predicting {} texts in batch...\n", texts.len());

    let start = Instant::now();
    let results = predictor.predict_batch(&texts);
    let elapsed = start.elapsed();

    println!("{}", "=".repeat(90));
    println!("{:<50} | {:<10} | {:<10} | {:<10}", "Text (truncated)", "Type", "Domain", "Content");
    println!("{}", "=".repeat(90));

    for (text, result) in texts.iter().zip(results.iter()) {
        let truncated = if text.chars().count() > 47 {
            format!("{}...", text.chars().take(47).collect::<String>())
        } else {
            text.to_string()
        };
        let top = |dimension: Dimension| {
            result
                .labels(dimension)
                .first()
                .map_or_else(|| "-".to_string(), |s| s.label.value().to_string())
        };

        println!(
            "{:<50} | {:<10} | {:<10} | {:<10}",
            truncated,
            top(Dimension::Type),
            top(Dimension::Domain),
            top(Dimension::Content)
        );
    }

    println!("{}", "=".repeat(90));
    println!("\n✓ Batch prediction complete");
    println!(
        "  Time: {:.2}ms ({:.2}ms per text)",
        elapsed.as_millis(),
        elapsed.as_millis() as f64 / texts.len() as f64
    );

    Ok(())
}
