//! Numeric and table formatting matching the EMME conventions.

/// Full-precision rendering used in the base network tables: integral
/// floats print without a decimal point, others keep the shortest exact
/// representation.
pub fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// `%g`-style rendering used in attribute tables: six significant
/// digits, trailing zeros trimmed, scientific notation outside
/// [1e-4, 1e6).
pub fn fmt_g(v: f64) -> String {
    fmt_sig(v, 6)
}

/// `%.4g`, the precision the zone data tables are published with.
pub fn fmt_g4(v: f64) -> String {
    fmt_sig(v, 4)
}

fn fmt_sig(v: f64, digits: i32) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    if !v.is_finite() {
        return format!("{v}");
    }
    let exp = v.abs().log10().floor() as i32;
    if (-4..digits).contains(&exp) {
        let decimals = (digits - 1 - exp).max(0) as usize;
        let s = format!("{v:.decimals$}");
        trim_trailing_zeros(&s)
    } else {
        let mantissa = v / 10f64.powi(exp);
        let m = trim_trailing_zeros(&format!("{mantissa:.prec$}", prec = (digits - 1) as usize));
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{m}e{sign}{:02}", exp.abs())
    }
}

fn trim_trailing_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// Width-aligned plain table, cells left-justified and separated by two
/// spaces, trailing whitespace trimmed per line.
pub fn tabulate_plain(headers: &[String], rows: &[Vec<String>]) -> String {
    align(headers, rows, false)
}

/// Width-aligned table with right-justified cells, used for the
/// attribute files.
pub fn tabulate_right(headers: &[String], rows: &[Vec<String>]) -> String {
    align(headers, rows, true)
}

fn align(headers: &[String], rows: &[Vec<String>], right: bool) -> String {
    let mut widths: Vec<usize> = headers.iter().map(String::len).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            } else {
                widths.push(cell.len());
            }
        }
    }

    let mut out = String::new();
    let mut write_row = |cells: &[String], out: &mut String| {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            if right {
                line.push_str(&format!("{cell:>width$}", width = widths[i]));
            } else {
                line.push_str(&format!("{cell:<width$}", width = widths[i]));
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    };

    write_row(headers, &mut out);
    for row in rows {
        write_row(row, &mut out);
    }
    // No trailing newline, callers append sections themselves.
    out.pop();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_floats_have_no_decimal_point() {
        assert_eq!(fmt_num(25496813.0), "25496813");
        assert_eq!(fmt_num(-3.0), "-3");
        assert_eq!(fmt_num(0.0), "0");
    }

    #[test]
    fn fractional_floats_keep_precision() {
        assert_eq!(fmt_num(25496813.25), "25496813.25");
        assert_eq!(fmt_num(0.5), "0.5");
    }

    #[test]
    fn g_format_trims_and_limits_digits() {
        assert_eq!(fmt_g(0.0), "0");
        assert_eq!(fmt_g(10.0), "10");
        assert_eq!(fmt_g(1.5), "1.5");
        assert_eq!(fmt_g(0.123456789), "0.123457");
        assert_eq!(fmt_g(1234.5), "1234.5");
        assert_eq!(fmt_g(-2.0), "-2");
    }

    #[test]
    fn g4_format_limits_to_four_digits() {
        assert_eq!(fmt_g4(0.123456), "0.1235");
        assert_eq!(fmt_g4(12.5), "12.5");
        assert_eq!(fmt_g4(12345.6), "1.235e+04");
    }

    #[test]
    fn g_format_uses_scientific_for_extremes() {
        assert_eq!(fmt_g(1_000_000.0), "1e+06");
        assert_eq!(fmt_g(0.00001), "1e-05");
    }

    #[test]
    fn plain_table_is_width_aligned() {
        let headers = vec!["c".to_string(), "Node".to_string()];
        let rows = vec![
            vec!["a*".to_string(), "101".to_string()],
            vec!["a".to_string(), "20102".to_string()],
        ];
        let table = tabulate_plain(&headers, &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "c   Node");
        assert_eq!(lines[1], "a*  101");
        assert_eq!(lines[2], "a   20102");
    }

    #[test]
    fn right_table_right_justifies() {
        let headers = vec!["inode".to_string(), "jnode".to_string()];
        let rows = vec![vec!["1".to_string(), "22".to_string()]];
        let table = tabulate_right(&headers, &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "inode  jnode");
        assert_eq!(lines[1], "    1     22");
    }
}
