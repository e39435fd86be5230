//! Per-candidate commentary report

use crate::model::Candidate;
use crate::report::{escape_html, group_thousands};
use std::fmt::Write;

/// Valuation bucket on trailing P/E
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Valuation {
    StronglyUndervalued,
    ModeratelyUndervalued,
    FairlyValued,
    Overvalued,
    HighlyOvervalued,
}

impl Valuation {
    pub fn classify(pe: f64) -> Self {
        if pe < 6.0 {
            Self::StronglyUndervalued
        } else if pe < 8.0 {
            Self::ModeratelyUndervalued
        } else if pe <= 15.0 {
            Self::FairlyValued
        } else if pe <= 25.0 {
            Self::Overvalued
        } else {
            Self::HighlyOvervalued
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::StronglyUndervalued => "Strongly Undervalued (P/E <6)",
            Self::ModeratelyUndervalued => "Moderately Undervalued (P/E 6-8)",
            Self::FairlyValued => "Fairly Valued (P/E 8-15)",
            Self::Overvalued => "Overvalued (P/E 15-25)",
            Self::HighlyOvervalued => "Highly Overvalued (P/E >25)",
        }
    }
}

/// Risk bucket on annualized volatility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityRisk {
    VeryLow,
    Low,
    Moderate,
    High,
    Extreme,
}

impl VolatilityRisk {
    pub fn classify(volatility: f64) -> Self {
        if volatility < 15.0 {
            Self::VeryLow
        } else if volatility < 20.0 {
            Self::Low
        } else if volatility <= 35.0 {
            Self::Moderate
        } else if volatility <= 50.0 {
            Self::High
        } else {
            Self::Extreme
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low (Excellent for long-term)",
            Self::Low => "Low (Good for investors)",
            Self::Moderate => "Moderate (Swing trading potential)",
            Self::High => "High (Speculative)",
            Self::Extreme => "Extreme (Day traders only)",
        }
    }
}

/// Size bucket on the display market cap (crore)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapSize {
    Mega,
    Large,
    Mid,
    Small,
    Micro,
}

impl CapSize {
    pub fn classify(market_cap_cr: f64) -> Self {
        if market_cap_cr > 100_000.0 {
            Self::Mega
        } else if market_cap_cr > 20_000.0 {
            Self::Large
        } else if market_cap_cr > 5_000.0 {
            Self::Mid
        } else if market_cap_cr > 500.0 {
            Self::Small
        } else {
            Self::Micro
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Mega => "Mega Cap (₹100,000Cr+)",
            Self::Large => "Large Cap (₹20,000-100,000Cr)",
            Self::Mid => "Mid Cap (₹5,000-20,000Cr)",
            Self::Small => "Small Cap (₹500-5,000Cr)",
            Self::Micro => "Micro Cap (₹&lt;500Cr)",
        }
    }
}

/// Composite call on P/E, volatility and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    StrongBuy,
    Accumulate,
    Watchlist,
    Avoid,
    HighRiskSpeculative,
}

impl Recommendation {
    pub fn classify(pe: f64, volatility: f64, market_cap_cr: f64) -> Self {
        if pe < 8.0 && volatility < 25.0 && market_cap_cr > 5_000.0 {
            Self::StrongBuy
        } else if pe < 12.0 && volatility < 35.0 {
            Self::Accumulate
        } else if pe < 18.0 {
            Self::Watchlist
        } else if volatility > 50.0 {
            Self::Avoid
        } else {
            Self::HighRiskSpeculative
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::StrongBuy => "✅ Strong Buy",
            Self::Accumulate => "🔼 Accumulate",
            Self::Watchlist => "🔍 Watchlist",
            Self::Avoid => "⏸️ Avoid",
            Self::HighRiskSpeculative => "⚠️ High Risk Speculative",
        }
    }
}

/// Advice line for a sector tag, matched exactly
pub fn sector_advice(sector: Option<&str>) -> &'static str {
    match sector {
        Some("BANKING") => "📌 Rising interest rate environment benefits net interest margins",
        Some("INFRA") => "📌 Government infrastructure push (Budget 2024 allocation: ₹10L Cr)",
        Some("IT") => "📌 Global slowdown concerns but rupee depreciation helps",
        Some("AUTO") => "📌 EV transition creating new opportunities",
        Some("METALS") => "📌 China reopening could boost commodity prices",
        _ => "📌 Sector outlook neutral",
    }
}

fn rsi_reading(rsi: f64) -> &'static str {
    if rsi < 30.0 {
        "Oversold"
    } else if rsi > 70.0 {
        "Overbought"
    } else {
        "Neutral"
    }
}

fn leverage_reading(debt_to_equity: f64) -> &'static str {
    if debt_to_equity > 1.0 {
        "High"
    } else if debt_to_equity > 0.5 {
        "Moderate"
    } else {
        "Low"
    }
}

fn roe_reading(roe_pct: f64) -> &'static str {
    if roe_pct > 20.0 {
        "Excellent"
    } else if roe_pct > 15.0 {
        "Good"
    } else {
        "Weak"
    }
}

fn dividend_reading(yield_pct: f64) -> &'static str {
    if yield_pct > 3.0 {
        "High"
    } else if yield_pct > 1.0 {
        "Moderate"
    } else {
        "Low"
    }
}

fn liquidity_reading(average_volume: u64) -> &'static str {
    if average_volume > 500_000 {
        "Excellent"
    } else if average_volume > 100_000 {
        "Adequate"
    } else {
        "Thin"
    }
}

fn bullet_block(out: &mut String, lines: &[String], placeholder: &str) {
    if lines.is_empty() {
        out.push_str(placeholder);
        out.push('\n');
    } else {
        for line in lines {
            let _ = writeln!(out, "- {line}");
        }
    }
}

/// Render the commentary report for one candidate as Telegram HTML
pub fn generate_analysis(candidate: &Candidate) -> String {
    let cap_cr = candidate.market_cap_display_value();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "🔍 <b>{} ({}) - Comprehensive Analysis</b>\n",
        escape_html(&candidate.name),
        escape_html(candidate.symbol.as_str())
    );

    out.push_str("📊 <i>Valuation</i>:\n");
    let _ = writeln!(out, "- Current Price: ₹{:.2}", candidate.price);
    let _ = writeln!(
        out,
        "- P/E Ratio: {:.2} → {}",
        candidate.pe,
        Valuation::classify(candidate.pe).label()
    );
    let _ = writeln!(
        out,
        "- Market Cap: {} ({})",
        escape_html(&candidate.market_cap_display),
        CapSize::classify(cap_cr).label()
    );
    if let Some(yield_pct) = candidate.dividend_yield_pct {
        let _ = writeln!(
            out,
            "- Dividend Yield: {yield_pct:.2}% ({})",
            dividend_reading(yield_pct)
        );
    }

    out.push_str("\n📈 <i>Technical Outlook</i>:\n");
    let mut technicals = Vec::new();
    if let Some(ma) = candidate.moving_average_200d {
        let side = if candidate.price > ma { "Above" } else { "Below" };
        technicals.push(format!("200D MA: ₹{ma:.2} ({side} key level)"));
    }
    if let Some(rsi) = candidate.rsi {
        technicals.push(format!("RSI: {rsi:.1} ({})", rsi_reading(rsi)));
    }
    bullet_block(&mut out, &technicals, "⚠️ No technical data available");

    out.push_str("\n💼 <i>Fundamentals</i>:\n");
    let mut financials = Vec::new();
    if let Some(de) = candidate.debt_to_equity {
        financials.push(format!(
            "Debt/Equity: {de:.2} ({} leverage)",
            leverage_reading(de)
        ));
    }
    if let Some(roe) = candidate.roe_pct {
        financials.push(format!("ROE: {roe:.1}% ({})", roe_reading(roe)));
    }
    bullet_block(&mut out, &financials, "⚠️ Limited fundamental data");

    let beta = candidate.beta.unwrap_or(1.0);
    out.push_str("\n⚠️ <i>Risk Assessment</i>:\n");
    let _ = writeln!(
        out,
        "- Volatility: {}",
        VolatilityRisk::classify(candidate.volatility).label()
    );
    let _ = writeln!(
        out,
        "- Liquidity: {} (Avg Vol: {})",
        liquidity_reading(candidate.average_volume),
        group_thousands(candidate.average_volume)
    );
    let _ = writeln!(
        out,
        "- Beta: {beta:.2} ({} volatile than market)",
        if beta < 1.0 { "Less" } else { "More" }
    );

    let _ = writeln!(out, "\n{}", sector_advice(candidate.sector.as_deref()));

    let _ = writeln!(
        out,
        "\n💡 <i>Recommendation</i>:\n{}",
        Recommendation::classify(candidate.pe, candidate.volatility, cap_cr).label()
    );

    let price = candidate.price;
    out.push_str("\n🎯 <i>Price Targets</i>:\n");
    let _ = writeln!(out, "- Conservative: ₹{:.2} (-10% stop-loss)", price * 0.9);
    let _ = writeln!(out, "- Base Case: ₹{:.2} (+25%)", price * 1.25);
    let _ = write!(
        out,
        "- Bull Case: ₹{:.2} (+50%) if sector outperforms",
        price * 1.5
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Symbol, format_market_cap};

    fn candidate(pe: f64, volatility: f64, market_cap: f64) -> Candidate {
        Candidate {
            symbol: Symbol::new("TEST.NS"),
            name: "Test & Sons".to_string(),
            price: 40.0,
            pe,
            market_cap,
            market_cap_display: format_market_cap(market_cap),
            volatility,
            average_volume: 1_234_567,
            moving_average_200d: None,
            rsi: None,
            debt_to_equity: None,
            roe_pct: None,
            dividend_yield_pct: None,
            beta: None,
            sector: None,
        }
    }

    #[test]
    fn test_valuation_boundaries() {
        assert_eq!(Valuation::classify(5.9), Valuation::StronglyUndervalued);
        assert_eq!(Valuation::classify(6.0), Valuation::ModeratelyUndervalued);
        assert_eq!(Valuation::classify(8.0), Valuation::FairlyValued);
        assert_eq!(Valuation::classify(15.0), Valuation::FairlyValued);
        assert_eq!(Valuation::classify(25.0), Valuation::Overvalued);
        assert_eq!(Valuation::classify(25.1), Valuation::HighlyOvervalued);
    }

    #[test]
    fn test_volatility_boundaries() {
        assert_eq!(VolatilityRisk::classify(14.9), VolatilityRisk::VeryLow);
        assert_eq!(VolatilityRisk::classify(15.0), VolatilityRisk::Low);
        assert_eq!(VolatilityRisk::classify(35.0), VolatilityRisk::Moderate);
        assert_eq!(VolatilityRisk::classify(50.0), VolatilityRisk::High);
        assert_eq!(VolatilityRisk::classify(50.1), VolatilityRisk::Extreme);
    }

    #[test]
    fn test_cap_size_uses_display_units() {
        assert_eq!(CapSize::classify(100_001.0), CapSize::Mega);
        assert_eq!(CapSize::classify(100_000.0), CapSize::Large);
        assert_eq!(CapSize::classify(5_000.0), CapSize::Small);
        assert_eq!(CapSize::classify(500.0), CapSize::Micro);
    }

    #[test]
    fn test_recommendation_precedence() {
        assert_eq!(Recommendation::classify(5.0, 10.0, 6_000.0), Recommendation::StrongBuy);
        assert_eq!(Recommendation::classify(5.0, 10.0, 4_000.0), Recommendation::Accumulate);
        assert_eq!(Recommendation::classify(15.0, 60.0, 0.0), Recommendation::Watchlist);
        assert_eq!(Recommendation::classify(20.0, 60.0, 0.0), Recommendation::Avoid);
        assert_eq!(
            Recommendation::classify(20.0, 40.0, 0.0),
            Recommendation::HighRiskSpeculative
        );
    }

    #[test]
    fn test_strong_buy_report() {
        // Raw 600 000 displays as ₹6000.00Cr
        let report = generate_analysis(&candidate(5.0, 10.0, 600_000.0));

        assert!(report.contains("Strongly Undervalued"));
        assert!(report.contains("Very Low"));
        assert!(report.contains("Strong Buy"));
        assert!(report.contains("Mid Cap"));
        assert!(report.contains("₹6000.00Cr"));
    }

    #[test]
    fn test_optional_sections() {
        let bare = generate_analysis(&candidate(10.0, 30.0, 1000.0));
        assert!(bare.contains("No technical data available"));
        assert!(bare.contains("Limited fundamental data"));
        assert!(!bare.contains("Dividend Yield"));
        assert!(bare.contains("Beta: 1.00 (More volatile than market)"));
        assert!(bare.contains("Sector outlook neutral"));

        let rich = generate_analysis(&Candidate {
            moving_average_200d: Some(35.0),
            rsi: Some(25.0),
            debt_to_equity: Some(0.7),
            roe_pct: Some(22.0),
            dividend_yield_pct: Some(3.5),
            beta: Some(0.8),
            sector: Some("BANKING".to_string()),
            ..candidate(10.0, 30.0, 1000.0)
        });
        assert!(rich.contains("200D MA: ₹35.00 (Above key level)"));
        assert!(rich.contains("RSI: 25.0 (Oversold)"));
        assert!(rich.contains("Debt/Equity: 0.70 (Moderate leverage)"));
        assert!(rich.contains("ROE: 22.0% (Excellent)"));
        assert!(rich.contains("Dividend Yield: 3.50% (High)"));
        assert!(rich.contains("Less volatile than market"));
        assert!(rich.contains("net interest margins"));
    }

    #[test]
    fn test_price_targets_and_escaping() {
        let report = generate_analysis(&candidate(10.0, 30.0, 1000.0));
        assert!(report.contains("Conservative: ₹36.00"));
        assert!(report.contains("Base Case: ₹50.00"));
        assert!(report.contains("Bull Case: ₹60.00"));
        assert!(report.contains("Test &amp; Sons"));
        assert!(report.contains("Avg Vol: 1,234,567"));
    }

    #[test]
    fn test_sector_advice_is_exact_match() {
        assert!(sector_advice(Some("IT")).contains("rupee"));
        assert_eq!(sector_advice(Some("Technology")), "📌 Sector outlook neutral");
        assert_eq!(sector_advice(None), "📌 Sector outlook neutral");
    }
}
