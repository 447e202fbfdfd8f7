//! Fixed wording printed on the generated documents.
//!
//! The documents are French delivery paperwork; every visible string lives
//! here so wording changes never touch layout or drawing code.

/// Value substituted for a missing or empty CSV field.
pub const SENTINEL: &str = "Non spécifié";

/// Caption of the drawn box when a record has no photo at all.
pub const NO_IMAGE_CAPTION: &str = "Pas d'image";

/// Caption of the drawn box when a photo could not be resolved and no
/// placeholder asset is available.
pub const IMAGE_ERROR_CAPTION: &str = "Erreur Image";

/// Text drawn in place of the logo when `logo.png` is missing.
pub const DEFAULT_BRAND_NAME: &str = "LUMA ARLES";

/// Title of the pickup/delivery form.
pub const FORM_TITLE: &str = "Bon d'enlèvement/livraison";

/// Second line of the list title block.
pub const LIST_SUBTITLE: &str = "Service de Production";

/// Header cells of the form table, left column then right column.
pub const FORM_ORIGIN: &str = "Origine";
pub const FORM_DESTINATION: &str = "Destination";
pub const FORM_SIGNATURE: &str = "Nom, date et signature";

/// Legal footer printed at the bottom of the document.
pub const DEFAULT_FOOTER_TEXT: &str = "FDD LUMA/ARLES\n\
SIEGE SOCIAL : 7-9-11 RUE DE LA REPUBLIQUE, 13200 ARLES - SIRET 800185977 00025\n\
ADRESSE POSTALE : PARC DES ATELIERS, CS 50007, 13633 ARLES CEDEX";

/// Title of the list variant for a given artifact stem.
pub fn list_title(stem: &str) -> String {
    format!("Liste de {stem}")
}

/// Header date line, e.g. `Date : 16/10/2026`.
pub fn date_line(date: chrono::NaiveDate) -> String {
    format!("Date : {}", date.format("%d/%m/%Y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn date_line_uses_french_order() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 7).expect("valid date");
        assert_eq!(date_line(d), "Date : 07/03/2024");
    }

    #[test]
    fn footer_has_three_lines() {
        assert_eq!(DEFAULT_FOOTER_TEXT.lines().count(), 3);
        assert!(DEFAULT_FOOTER_TEXT.lines().all(|l| l == l.trim()));
    }

    #[test]
    fn list_title_embeds_stem() {
        assert_eq!(list_title("mobilier"), "Liste de mobilier");
    }
}
