//! Text formatting for the aggregate table.

use crate::capture::Sides;
use crate::monitor::Ratio;

/// `"5 sec."`, `"1 min."`, `"1.50 min."`
pub fn horizon_label(seconds: u32) -> String {
    if seconds < 60 {
        format!("{} sec.", seconds)
    } else if seconds % 60 == 0 {
        format!("{} min.", seconds / 60)
    } else {
        format!("{:.2} min.", seconds as f64 / 60.0)
    }
}

/// Whole numbers without decimals, everything else with two.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Latest scalars, shown only when both sides read something.
pub fn latest_cells(latest: Sides<f64>) -> Sides<String> {
    if latest.bid > 0.0 && latest.ask > 0.0 {
        latest.map(|_, v| format_value(v))
    } else {
        Sides::default()
    }
}

/// Per-side ratio cells: the larger side shows the factor, the smaller `1`.
pub fn ratio_cells(ratio: Ratio) -> Sides<String> {
    match ratio {
        Ratio::Undefined => Sides::default(),
        Ratio::Even => Sides::new("1".to_string(), "1".to_string()),
        Ratio::Bid(r) => Sides::new(format!("{:.2}", r), "1".to_string()),
        Ratio::Ask(r) => Sides::new("1".to_string(), format!("{:.2}", r)),
    }
}

/// `"2.00 : 1"`, `"1 : 1"`, or blank.
pub fn ratio_text(ratio: Ratio) -> String {
    match ratio {
        Ratio::Undefined => String::new(),
        _ => {
            let cells = ratio_cells(ratio);
            format!("{} : {}", cells.bid, cells.ask)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizon_labels() {
        assert_eq!(horizon_label(1), "1 sec.");
        assert_eq!(horizon_label(20), "20 sec.");
        assert_eq!(horizon_label(60), "1 min.");
        assert_eq!(horizon_label(300), "5 min.");
        assert_eq!(horizon_label(90), "1.50 min.");
    }

    #[test]
    fn test_ratio_cells() {
        let r = Ratio::from_sums(Sides::new(10.0, 5.0));
        assert_eq!(ratio_cells(r), Sides::new("2.00".to_string(), "1".to_string()));
        assert_eq!(ratio_text(r), "2.00 : 1");

        let even = Ratio::from_sums(Sides::new(5.0, 5.0));
        assert_eq!(ratio_text(even), "1 : 1");

        let undefined = Ratio::from_sums(Sides::new(10.0, 0.0));
        assert_eq!(ratio_cells(undefined), Sides::default());
        assert_eq!(ratio_text(undefined), "");

        let ask = Ratio::from_sums(Sides::new(3.0, 4.0));
        assert_eq!(ratio_text(ask), "1 : 1.33");
    }

    #[test]
    fn test_latest_requires_both_sides() {
        assert_eq!(
            latest_cells(Sides::new(1250.0, 2.5)),
            Sides::new("1250".to_string(), "2.50".to_string())
        );
        assert_eq!(latest_cells(Sides::new(1250.0, 0.0)), Sides::default());
    }
}
