//! Masking of opaque tokens in values destined for log lines.

/// Minimum run length before an opaque token is masked.
const MASK_THRESHOLD: usize = 16;

/// Replace long opaque runs in `input` with `[redacted]`.
///
/// A run is a maximal sequence of ASCII alphanumerics plus `-` and `_`,
/// the alphabet of bearer tokens, authorization codes, and device tokens.
/// Runs shorter than 16 characters (ordinary words, hostnames, scheme
/// names) pass through untouched, as do digit-free runs of any length
/// (snake_case error codes), so a redirect URI stays readable while any
/// embedded credential does not.
pub fn mask_tokens(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut run = String::new();

    for c in input.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            run.push(c);
        } else {
            flush_run(&mut output, &mut run);
            output.push(c);
        }
    }
    flush_run(&mut output, &mut run);
    output
}

fn flush_run(output: &mut String, run: &mut String) {
    if run.len() >= MASK_THRESHOLD && run.chars().any(|c| c.is_ascii_digit()) {
        output.push_str("[redacted]");
    } else {
        output.push_str(run);
    }
    run.clear();
}
