//! Terminal rendering of comparison results and provider failures.

use caddie_core::{
    CaddieConfig, ComparisonRequest, ComparisonResult, GenerationError, ProviderId,
    display_category,
};
use std::fmt::Write;
use textwrap::Options;

/// Column width for wrapped output.
pub const WIDTH: usize = 88;

const REDACTED: &str = "<redacted>";

/// Render a comparison as plain text.
pub fn render_comparison(
    request: &ComparisonRequest,
    result: &ComparisonResult,
    width: usize,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} vs {}",
        request.item1.label(),
        request.item2.label()
    );
    let _ = writeln!(
        out,
        "{}, handicap {}",
        display_category(&request.category),
        request.player_skill_level
    );
    out.push('\n');

    if result.is_degraded() {
        // The summary holds the raw reply; wrapping would mangle any JSON in it.
        out.push_str("The provider's reply could not be read as a comparison.\n\n");
        out.push_str(&result.summary);
        out.push('\n');
        return out;
    }

    for (name, pros_cons) in &result.per_item {
        let _ = writeln!(out, "{}", name);
        push_list(&mut out, "Pros", "+ ", &pros_cons.pros, width);
        push_list(&mut out, "Cons", "- ", &pros_cons.cons, width);
        out.push('\n');
    }

    out.push_str("Summary:\n");
    let options = Options::new(width)
        .initial_indent("  ")
        .subsequent_indent("  ");
    out.push_str(&textwrap::fill(result.summary.trim(), &options));
    out.push('\n');
    out
}

fn push_list(out: &mut String, heading: &str, marker: &str, entries: &[String], width: usize) {
    let _ = writeln!(out, "  {}:", heading);
    if entries.is_empty() {
        out.push_str("    (none)\n");
        return;
    }
    let initial = format!("    {}", marker);
    let subsequent = " ".repeat(initial.len());
    let options = Options::new(width)
        .initial_indent(&initial)
        .subsequent_indent(&subsequent);
    for entry in entries {
        out.push_str(&textwrap::fill(entry.trim(), &options));
        out.push('\n');
    }
}

/// Turn a provider failure into a CLI error, with a hint where one helps.
pub fn generation_failure(provider: ProviderId, err: &GenerationError) -> anyhow::Error {
    match hint(provider, err) {
        Some(hint) => anyhow::anyhow!("{}\n\n  Hint: {}", err, hint),
        None => anyhow::anyhow!("{}", err),
    }
}

fn hint(provider: ProviderId, err: &GenerationError) -> Option<String> {
    match err {
        GenerationError::AuthFailed { .. } | GenerationError::ProviderUnavailable { .. } => {
            Some(format!(
                "store a key with `caddie auth set {}` or export the variable named by \
                 `providers.{}.api_key_env`",
                provider, provider
            ))
        }
        GenerationError::RateLimited { retry_after_secs } => Some(format!(
            "wait {}s and try again, or pick another provider with --provider",
            retry_after_secs
        )),
        GenerationError::Connection { .. } => {
            Some("check your network connection and try again".to_string())
        }
        GenerationError::EmptyReply { .. } | GenerationError::ApiRequest { .. } => {
            Some("try again, or pick another provider with --provider".to_string())
        }
        GenerationError::ResponseParse { .. } => None,
    }
}

/// Blank out every API key before a config is printed.
pub fn redact_secrets(config: &mut CaddieConfig) {
    for id in ProviderId::ALL {
        let provider = config.providers.get_mut(id);
        if provider.api_key.is_some() {
            provider.api_key = Some(REDACTED.to_string());
        }
    }
}
