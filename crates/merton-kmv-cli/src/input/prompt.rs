use rust_decimal::Decimal;
use std::io::{self, BufRead, Write};

use merton_kmv_core::structural::MarketObservables;

/// Ask for the five observables interactively. Prompts go to stderr.
pub fn prompt_observables() -> Result<MarketObservables, Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    read_observables(stdin.lock(), io::stderr())
}

fn read_observables<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
) -> Result<MarketObservables, Box<dyn std::error::Error>> {
    let mut lines = reader.lines();
    let mut ask = |label: &str| -> Result<Decimal, Box<dyn std::error::Error>> {
        write!(writer, "{}", label)?;
        writer.flush()?;
        let line = lines.next().ok_or("no input provided")??;
        parse_number(line.trim())
    };

    Ok(MarketObservables {
        equity_value: ask("Enter equity value: $")?,
        debt_face_value: ask("Enter debt value: $")?,
        time_to_maturity: ask("Enter time to maturity (in years): ")?,
        risk_free_rate: ask("Enter risk-free rate (as a decimal): ")?,
        equity_vol: ask("Enter volatility of equity (as a decimal): ")?,
    })
}

fn parse_number(text: &str) -> Result<Decimal, Box<dyn std::error::Error>> {
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| format!("invalid number '{}': {}", text, e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    #[test]
    fn test_reads_five_answers_in_order() {
        let answers = Cursor::new("3\n10\n1\n0.05\n0.3\n");
        let mut prompts = Vec::new();
        let obs = read_observables(answers, &mut prompts).unwrap();
        assert_eq!(obs.equity_value, dec!(3));
        assert_eq!(obs.debt_face_value, dec!(10));
        assert_eq!(obs.time_to_maturity, dec!(1));
        assert_eq!(obs.risk_free_rate, dec!(0.05));
        assert_eq!(obs.equity_vol, dec!(0.3));
        let shown = String::from_utf8(prompts).unwrap();
        assert!(shown.starts_with("Enter equity value: $"));
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(parse_number("5e-2").unwrap(), dec!(0.05));
    }

    #[test]
    fn test_short_input_fails() {
        let answers = Cursor::new("3\n10\n");
        assert!(read_observables(answers, Vec::new()).is_err());
    }
}
