/// Fixed-width progress prefix for log lines, e.g. `__50.00% _5/10`.
pub fn progress(current: usize, total: usize) -> String {
    let width = total.to_string().len();
    let percent = if total == 0 {
        100.0
    } else {
        current as f64 / total as f64 * 100.0
    };
    format!(
        "{:_>7} {:_>width$}/{:_>width$}",
        format!("{:.2}%", percent),
        current,
        total,
        width = width
    )
}
