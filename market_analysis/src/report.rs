//! Plain-text analysis reports

use crate::analysis::AssetAnalysis;
use crate::correlation::CorrelationMatrix;
use std::fmt::Write;

/// Render `{asset}_analysis.txt`
pub fn asset_report(a: &AssetAnalysis) -> String {
    let mut out = String::new();
    let s = &a.stats;

    let _ = writeln!(out, "Analysis report: {}", a.asset);
    let _ = writeln!(out, "{}", "=".repeat(40));
    if let (Some(start), Some(end)) = (a.start, a.end) {
        let _ = writeln!(
            out,
            "Period: {} to {}",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );
    }

    let _ = writeln!(out, "\nDescriptive statistics (price)");
    let _ = writeln!(out, "  observations: {}", s.count);
    let _ = writeln!(out, "  mean:         {:.4}", s.mean);
    let _ = writeln!(out, "  std dev:      {:.4}", s.std_dev);
    let _ = writeln!(out, "  min:          {:.4}", s.min);
    let _ = writeln!(out, "  25%:          {:.4}", s.q25);
    let _ = writeln!(out, "  median:       {:.4}", s.median);
    let _ = writeln!(out, "  75%:          {:.4}", s.q75);
    let _ = writeln!(out, "  max:          {:.4}", s.max);

    let _ = writeln!(out, "\nDaily returns");
    let _ = writeln!(out, "  mean:                  {:.6}", s.mean_return);
    let _ = writeln!(out, "  std dev:               {:.6}", s.return_std);
    let _ = writeln!(out, "  skewness:              {:.4}", s.return_skewness);
    let _ = writeln!(out, "  excess kurtosis:       {:.4}", s.return_excess_kurtosis);
    let _ = writeln!(out, "  annualized volatility: {:.2}%", s.annualized_volatility * 100.0);
    let _ = writeln!(out, "  max drawdown:          {:.2}%", s.max_drawdown * 100.0);
    let _ = writeln!(out, "  outliers (|z| > threshold): {}", a.outliers);

    let _ = writeln!(out, "\nStationarity");
    for check in &a.stationarity {
        let o = &check.outcome;
        let critical: Vec<String> = o
            .critical_values
            .iter()
            .map(|(level, v)| format!("{}={:.3}", level, v))
            .collect();
        let _ = writeln!(
            out,
            "  {} on {}: statistic={:.4}, p~{:.4}, critical [{}] -> {}",
            o.name,
            check.subject,
            o.statistic,
            o.p_value,
            critical.join(", "),
            if o.stationary { "stationary" } else { "non-stationary" }
        );
    }
    if let Some(r) = &a.rolling {
        let _ = writeln!(
            out,
            "  rolling {}-day: mean variation {:.4} ({}), std variation {:.4} ({})",
            r.window,
            r.mean_variation,
            if r.stable_mean { "stable" } else { "drifting" },
            r.std_variation,
            if r.stable_variance { "stable" } else { "drifting" }
        );
    }

    if !a.acf.is_empty() {
        let _ = writeln!(
            out,
            "\nAutocorrelation of log returns (band +/-{:.4})",
            a.acf_bound
        );
        let _ = writeln!(out, "  lag      acf     pacf");
        for (lag, value) in a.acf.iter().enumerate().skip(1) {
            let partial = a.pacf.get(lag).copied().unwrap_or(f64::NAN);
            let marker = if value.abs() > a.acf_bound { " *" } else { "" };
            let _ = writeln!(out, "  {:>3} {:>8.4} {:>8.4}{}", lag, value, partial, marker);
        }
    }
    if let Some(lb) = &a.ljung_box {
        let _ = writeln!(
            out,
            "  Ljung-Box({}): Q={:.4}, p={:.4} -> {}",
            lb.lags,
            lb.statistic,
            lb.p_value,
            if lb.significant {
                "autocorrelated"
            } else {
                "no significant autocorrelation"
            }
        );
    }

    if let Some(d) = &a.decomposition {
        let _ = writeln!(out, "\nSeasonal decomposition (additive, period {})", d.period);
        let indices: Vec<String> = d.seasonal[..d.period]
            .iter()
            .map(|v| format!("{:.4}", v))
            .collect();
        let _ = writeln!(out, "  seasonal indices: [{}]", indices.join(", "));
        if let Some(strength) = d.seasonal_strength() {
            let _ = writeln!(out, "  seasonal strength: {:.4}", strength);
        }
    }

    if !a.skipped.is_empty() {
        let _ = writeln!(out, "\nSkipped");
        for reason in &a.skipped {
            let _ = writeln!(out, "  {}", reason);
        }
    }

    out
}

/// Render `correlation.txt`
pub fn correlation_report(m: &CorrelationMatrix) -> String {
    let mut out = String::new();
    let width = m.assets.iter().map(String::len).max().unwrap_or(0).max(8);

    let _ = writeln!(
        out,
        "Daily return correlation ({} common observations)\n",
        m.observations
    );
    let _ = write!(out, "{:width$}", "", width = width);
    for asset in &m.assets {
        let _ = write!(out, " {:>width$}", asset, width = width);
    }
    let _ = writeln!(out);
    for (asset, row) in m.assets.iter().zip(&m.values) {
        let _ = write!(out, "{:width$}", asset, width = width);
        for v in row {
            let _ = write!(out, " {:>width$.4}", v, width = width);
        }
        let _ = writeln!(out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_report_layout() {
        let m = CorrelationMatrix {
            assets: vec!["bitcoin".to_string(), "ethereum".to_string()],
            values: vec![vec![1.0, 0.8], vec![0.8, 1.0]],
            observations: 42,
        };
        let text = correlation_report(&m);
        assert!(text.contains("42 common observations"));
        assert!(text.lines().any(|l| l.starts_with("bitcoin") && l.contains("0.8000")));
    }
}
