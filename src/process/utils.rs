use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::process::raw_table::Cell;

/// How column labels are turned into keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnKeyStyle {
    /// Remove `.` from labels (`Blanco Biolog.` → `blanco_biolog`).
    pub strip_periods: bool,
}

/// NFKD-decompose and keep only ASCII code points, which removes accents
/// (`Año` → `Ano`) along with any other non-ASCII symbol.
pub fn fold_ascii(raw: &str) -> String {
    raw.nfkd().filter(char::is_ascii).collect()
}

/// Upper-case the first letter of every run of letters and lower-case the rest.
/// Any non-letter starts a new word, so `o'neil 2da` → `O'Neil 2Da`.
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_word = false;
    for c in raw.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Accent-fold, trim and title-case free text.
pub fn normalize_str(raw: &str) -> String {
    title_case(fold_ascii(raw).trim())
}

/// Text normalizer for a cell; missing cells stay missing.
pub fn normalize_text(cell: &Cell) -> Option<String> {
    cell.as_string().map(|s| normalize_str(&s))
}

/// Canonical key for one column label.
pub fn normalize_column_key(label: &str, style: ColumnKeyStyle) -> String {
    let key = fold_ascii(label).trim().to_lowercase().replace(' ', "_");
    if style.strip_periods {
        key.replace('.', "")
    } else {
        key
    }
}

/// Order-preserving, one key per label. Blank labels get a positional name.
pub fn normalize_columns<S: AsRef<str>>(labels: &[S], style: ColumnKeyStyle) -> Vec<String> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let key = normalize_column_key(label.as_ref(), style);
            if key.is_empty() {
                format!("unnamed_{}", i)
            } else {
                key
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_accents_and_titles() {
        assert_eq!(
            normalize_text(&Cell::text("  FLORES DEL NEUSA ")).as_deref(),
            Some("Flores Del Neusa")
        );
        assert_eq!(
            normalize_text(&Cell::text("poscosecha señorío")).as_deref(),
            Some("Poscosecha Senorio")
        );
        assert_eq!(normalize_text(&Cell::Empty), None);
        assert_eq!(normalize_text(&Cell::Number(12.0)).as_deref(), Some("12"));
        assert_eq!(normalize_text(&Cell::text("n/a")).as_deref(), Some("N/A"));
    }

    #[test]
    fn normalize_text_is_idempotent() {
        let samples = [
            "  ácaros en HOJA  ",
            "\u{301} trips",
            "o'neil 2da",
            "MM BV EUROPA",
            "",
            "Çà\u{a0}ñ",
            "sunburst farms (elite)",
        ];
        for s in samples {
            let once = normalize_text(&Cell::text(s));
            let twice = once.as_deref().and_then(|v| normalize_text(&Cell::text(v)));
            assert_eq!(once, twice, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn title_case_breaks_words_on_non_letters() {
        assert_eq!(title_case("o'neil 2da"), "O'Neil 2Da");
        assert_eq!(title_case("no intercep."), "No Intercep.");
        assert_eq!(title_case("ROSA-ROJA"), "Rosa-Roja");
    }

    #[test]
    fn column_keys_follow_style() {
        assert_eq!(
            normalize_column_key(" Poscosecha Proceso ", ColumnKeyStyle::default()),
            "poscosecha_proceso"
        );
        assert_eq!(normalize_column_key("AÑO", ColumnKeyStyle::default()), "ano");
        assert_eq!(
            normalize_column_key("Blanco Biolog.", ColumnKeyStyle::default()),
            "blanco_biolog."
        );
        assert_eq!(
            normalize_column_key("Blanco Biolog.", ColumnKeyStyle { strip_periods: true }),
            "blanco_biolog"
        );
    }

    #[test]
    fn normalize_columns_keeps_order_and_length() {
        let labels = ["Predio", "", "País", "Predio"];
        let keys = normalize_columns(&labels, ColumnKeyStyle::default());
        assert_eq!(keys, vec!["predio", "unnamed_1", "pais", "predio"]);
    }
}
