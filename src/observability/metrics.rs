//! Metrics collection.
//!
//! # Metrics
//! - `render_total` (counter): renders by outcome (`ok`, `error`)
//! - `render_directive_lines` (gauge): lines in the last rendered configuration
//! - `render_postprocess_fallbacks_total` (counter): post-processing failures
//! - `deny_slugs_minted_total` (counter): new deny variable slugs
//! - `helper_type_mismatches_total` (counter): helper calls with wrong argument shapes
//!
//! # Design Decisions
//! - Uses the `metrics` facade; the embedding process chooses the exporter

/// Record the outcome of one render.
pub fn record_render(ok: bool, lines: usize) {
    let outcome = if ok { "ok" } else { "error" };
    ::metrics::counter!("render_total", "outcome" => outcome).increment(1);
    if ok {
        ::metrics::gauge!("render_directive_lines").set(lines as f64);
    }
}

/// Record a post-processing failure that fell back to raw output.
pub fn record_postprocess_fallback() {
    ::metrics::counter!("render_postprocess_fallbacks_total").increment(1);
}

/// Record a newly minted deny slug.
pub fn record_deny_slug_minted() {
    ::metrics::counter!("deny_slugs_minted_total").increment(1);
}

/// Record a helper invoked with arguments of the wrong shape.
pub fn record_type_mismatch(helper: &str) {
    ::metrics::counter!("helper_type_mismatches_total", "helper" => helper.to_string()).increment(1);
}
