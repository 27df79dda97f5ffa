//! Display formatting for totals and contribution values.

/// Render integral values without a decimal point, everything else with
/// two decimals.
pub fn format_number(value: f64) -> String {
    format_value(value, false)
}

/// Like [`format_number`], but always renders two decimals when
/// `fractional` is set (used once any contribution carries a fraction).
pub fn format_value(value: f64, fractional: bool) -> String {
    if !fractional && value.is_finite() && value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
