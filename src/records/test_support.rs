/// Builds a `.dly` line. Days not covered by `values` are written as missing.
pub(crate) fn dly_line(id: &str, year: i32, month: u32, element: &str, values: &[i32]) -> String {
    let mut line = format!("{id:<11}{year:04}{month:02}{element:<4}");
    for day in 0..31 {
        let value = values.get(day).copied().unwrap_or(-9999);
        line.push_str(&format!("{value:>5}   "));
    }
    line
}

/// A month where every day has the same raw value.
pub(crate) fn full_month(id: &str, year: i32, month: u32, element: &str, value: i32) -> String {
    dly_line(id, year, month, element, &[value; 31])
}
