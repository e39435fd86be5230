//! Ranked list summary message

use crate::model::Candidate;
use crate::report::escape_html;

/// Telegram's message length limit, in characters
pub const MAX_MESSAGE_CHARS: usize = 4096;

const SEPARATOR: &str = "──────────────────";

/// Render the ranked list as one Telegram HTML message
///
/// Candidates are added whole; the list stops at the first one that would
/// push the message past [`MAX_MESSAGE_CHARS`], so no tag or entity is cut.
pub fn render_summary(candidates: &[Candidate]) -> String {
    let mut out = String::from("<b>💰 Top Stocks Under ₹100</b> 🚀\n");
    let mut length = out.chars().count();

    for candidate in candidates {
        let block = format!(
            "\n🏢 <b>{}</b> ({})\n• Price: ₹{:.2} | PE: {:.2}\n• Volatility: {}% | Mcap: {}\n{SEPARATOR}",
            escape_html(&candidate.name),
            escape_html(candidate.symbol.as_str()),
            candidate.price,
            candidate.pe,
            candidate.volatility,
            escape_html(&candidate.market_cap_display),
        );

        let block_length = block.chars().count();
        if length + block_length > MAX_MESSAGE_CHARS {
            break;
        }
        out.push_str(&block);
        length += block_length;
    }

    out.trim_end().to_string()
}
