/// Simple example of using the bookmark classifier library
///
/// Train models first, then run:
/// ```
/// cargo run --example simple
/// ```
use bookmark_classifier::{Dimension, Predictor};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Bookmark Classifier - Simple Example\n");

    println!("Loading models...");
    let predictor = Predictor::new()?;
    println!("✓ Loaded dimensions: {:?}\n", predictor.dimensions());

    let bookmarks = vec![
        ("doc: The Rust Programming Language", "https://doc.rust-lang.org/book/"),
        ("pkg:serde - crates.io", "https://crates.io/crates/serde"),
        ("原神 攻略 | 米游社", "https://bbs.mihoyo.com/ys/"),
        ("How to center a div - Stack Overflow", "https://stackoverflow.com/questions/114543"),
    ];

    println!("Making predictions...\n");
    println!("{}", "=".repeat(70));

    for (title, url) in bookmarks {
        let result = predictor.predict_bookmark(title, url);

        println!("\nTitle: \"{}\"", title);
        println!("URL:   {}", url);
        println!("Breakdown:");
        for dimension in Dimension::ALL {
            let labels: Vec<String> = result
                .labels(dimension)
                .iter()
                .map(|s| format!("{} ({:.1}%)", s.label.value(), s.score * 100.0))
                .collect();
            let shown = if labels.is_empty() {
                "-".to_string()
            } else {
                labels.join(", ")
            };
            println!("  {:<8} {}", dimension, shown);
        }
        println!("{}", "-".repeat(70));
    }

    println!("\n✓ Done!");

    Ok(())
}
