use crate::data::filter::{FilterSpec, MonthSelection};
use crate::data::model::{Dimension, Measure};

/// Thousands separator used for every figure on screen.
pub const SEPARATOR: char = '\'';

/// Group digits in threes: `1234567` → `1'234'567`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(SEPARATOR);
        }
        out.push(ch);
    }
    out
}

pub fn usd(n: u64) -> String {
    format!("USD {}", group_thousands(n))
}

pub fn kg(n: u64) -> String {
    format!("{} kg", group_thousands(n))
}

/// Format a sum of `measure` with its unit.
pub fn measure(n: u64, measure: Measure) -> String {
    match measure {
        Measure::Value => usd(n),
        Measure::NetWeight => kg(n),
    }
}

/// KPI heading naming the selected origin departments.
pub fn department_heading(spec: &FilterSpec) -> String {
    match spec.active(Dimension::Department) {
        Some(selected) => format!(
            "Departamentos seleccionados: {}",
            selected.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
        ),
        None => "Todos los departamentos".to_string(),
    }
}

pub fn month_label(month: MonthSelection) -> String {
    match month {
        MonthSelection::All => "Todos".to_string(),
        MonthSelection::Month(m) => m.to_string(),
    }
}
