//! Example: Extract a few live pages and check the results
//!
//! Run with: cargo run -p renderkit --example extract_pages
//! Add `--features chromium` to render through headless Chromium.

use renderkit::{
    format, BatchItemResult, BatchOptions, ExtractedDocument, ExtractionOptions, Extractor,
    OutputFormat,
};

/// Page to extract and what to expect from it
struct Case {
    url: &'static str,
    description: &'static str,
    expect_documentation: bool,
    expect_contains: Option<&'static str>,
}

const CASES: &[Case] = &[
    Case {
        url: "https://example.com",
        description: "Simple static page",
        expect_documentation: false,
        expect_contains: Some("Example Domain"),
    },
    Case {
        url: "https://httpbin.org/html",
        description: "Long-form HTML",
        expect_documentation: false,
        expect_contains: Some("Herman Melville"),
    },
    Case {
        url: "https://sapui5.hana.ondemand.com/sdk/#/api/sap.m.Button",
        description: "API reference page",
        expect_documentation: true,
        expect_contains: None,
    },
];

#[tokio::main]
async fn main() {
    println!("RenderKit Extraction Examples");
    println!("=============================\n");

    let extractor = Extractor::default();
    println!("Backend: {}\n", extractor.backend_name());

    let urls: Vec<String> = CASES.iter().map(|c| c.url.to_string()).collect();
    let options = BatchOptions::new(ExtractionOptions::new().with_links()).concurrency(2);
    let results = extractor.extract_many(&urls, &options).await;

    let mut passed = 0;
    let mut failed = 0;

    for (i, (case, result)) in CASES.iter().zip(&results).enumerate() {
        println!("{}. {}", i + 1, case.description);
        println!("   URL: {}", case.url);

        match result {
            BatchItemResult::Success(doc) => {
                print_summary(doc);
                if check_expectations(case, doc) {
                    println!("   ✓ PASS\n");
                    passed += 1;
                } else {
                    println!("   ✗ FAIL (expectations not met)\n");
                    failed += 1;
                }
            }
            BatchItemResult::Failure { error, .. } => {
                println!("   Error: {}", error);
                println!("   ✗ FAIL\n");
                failed += 1;
            }
        }
    }

    extractor.shutdown().await;

    println!("=============================");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn print_summary(doc: &ExtractedDocument) {
    println!("   Title: {}", doc.title);
    println!("   Headings: {}", doc.headings.len());
    if let Some(ref links) = doc.links {
        println!("   Links: {}", links.len());
    }

    let markdown = format(doc, OutputFormat::Markdown);
    let preview = markdown.chars().take(100).collect::<String>().replace('\n', " ");
    println!(
        "   Preview: {}{}",
        preview,
        if markdown.chars().count() > 100 { "..." } else { "" }
    );
}

fn check_expectations(case: &Case, doc: &ExtractedDocument) -> bool {
    if case.expect_documentation != doc.documentation.is_some() {
        println!(
            "   Expected documentation model: {}",
            case.expect_documentation
        );
        return false;
    }

    if let Some(expected_text) = case.expect_contains {
        if !doc.content.contains(expected_text) {
            println!("   Expected content to contain '{}'", expected_text);
            return false;
        }
    }

    true
}
