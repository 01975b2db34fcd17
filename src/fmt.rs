/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let parts: Vec<&str> = cents.split('.').collect();
    let int_part = parts[0];
    let dec_part = parts[1];

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// Budget-vs-actual variance as a signed percentage of the budget amount.
pub fn variance_percent(actual: f64, budget: f64) -> Option<String> {
    if budget == 0.0 {
        return None;
    }
    let pct = (actual - budget) / budget.abs() * 100.0;
    Some(format!("{pct:+.1}%"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "$1,234.56");
        assert_eq!(money(-500.00), "-$500.00");
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(1000000.99), "$1,000,000.99");
        assert_eq!(money(50000.0), "$50,000.00");
    }

    #[test]
    fn test_variance_percent() {
        assert_eq!(variance_percent(110.0, 100.0).as_deref(), Some("+10.0%"));
        assert_eq!(variance_percent(80.0, 100.0).as_deref(), Some("-20.0%"));
        assert_eq!(variance_percent(50.0, 0.0), None);
    }
}
