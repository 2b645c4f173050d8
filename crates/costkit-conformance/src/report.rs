use std::io::{self, Write};

use costkit_types::{ConformanceResult, TestCategory};

fn category_name(category: TestCategory) -> &'static str {
    match category {
        TestCategory::Functional => "Functional",
        TestCategory::ErrorHandling => "Error handling",
        TestCategory::Concurrency => "Concurrency",
        TestCategory::Performance => "Performance",
        TestCategory::Compatibility => "Compatibility",
    }
}

/// Render a human-readable certification report.
///
/// Failed tests are listed with their errors; passing tests appear only in
/// the tallies. The output is plain text suitable for terminals and CI
/// logs. For machine consumption, serialize the result as JSON instead.
pub fn render(result: &ConformanceResult, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Conformance report for plugin {:?}", result.plugin_name())?;
    match result.level_achieved() {
        Some(level) => writeln!(out, "Level achieved: {level}")?,
        None => writeln!(out, "Level achieved: none (basic requirements not met)")?,
    }
    writeln!(out)?;

    let summary = result.summary();
    writeln!(
        out,
        "Tests: {} total, {} passed, {} failed, {} skipped",
        summary.total, summary.passed, summary.failed, summary.skipped
    )?;

    for (category, tally) in result.categories() {
        writeln!(
            out,
            "  {:<15} {:>2} passed, {:>2} failed, {:>2} skipped",
            category_name(*category),
            tally.passed,
            tally.failed,
            tally.skipped
        )?;
    }

    let failures: Vec<_> = result.results().iter().filter(|r| !r.success).collect();
    if !failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "Failures:")?;
        for failure in failures {
            writeln!(
                out,
                "  {} [{}]: {}",
                failure.method,
                category_name(failure.category),
                failure.error.as_deref().unwrap_or("no error recorded")
            )?;
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "Completed in {:.2}s at unix {}",
        result.duration().as_secs_f64(),
        result.completed_at_unix()
    )?;
    Ok(())
}

/// Render to a string, for callers that do not hold a writer.
pub fn render_to_string(result: &ConformanceResult) -> String {
    let mut out = Vec::new();
    // Writing to a Vec<u8> cannot fail.
    let _ = render(result, &mut out);
    String::from_utf8_lossy(&out).into_owned()
}
