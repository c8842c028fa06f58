//! Normalization used by the data maintenance operations.

/// Domains frequently mistyped on registration forms.
const DOMAIN_FIXES: &[(&str, &str)] = &[
    ("gmial.com", "gmail.com"),
    ("gmai.com", "gmail.com"),
    ("gmal.com", "gmail.com"),
    ("gamil.com", "gmail.com"),
    ("gmail.co", "gmail.com"),
    ("gmail.fr", "gmail.com"),
    ("gmail.con", "gmail.com"),
    ("hotmial.com", "hotmail.com"),
    ("hotmail.con", "hotmail.com"),
    ("hotmal.fr", "hotmail.fr"),
    ("homail.fr", "hotmail.fr"),
    ("yahooo.fr", "yahoo.fr"),
    ("yaho.fr", "yahoo.fr"),
    ("outlok.fr", "outlook.fr"),
    ("outlook.con", "outlook.com"),
    ("orange.fe", "orange.fr"),
    ("wanadoo.f", "wanadoo.fr"),
];

/// `jean-pierre DUPONT` becomes `Jean-Pierre Dupont`. Whitespace is collapsed.
pub fn capitalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut start = true;
    for c in word.chars() {
        if start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        start = matches!(c, '-' | '\'' | '’');
    }
    out
}

/// Trimmed, lower-cased address with known domain typos corrected.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim().to_lowercase();
    match email.rsplit_once('@') {
        Some((local, domain)) => {
            let domain = DOMAIN_FIXES
                .iter()
                .find(|(typo, _)| *typo == domain)
                .map(|(_, fixed)| *fixed)
                .unwrap_or(domain);
            format!("{local}@{domain}")
        }
        None => email,
    }
}

/// Corrected address when normalization changes it.
pub fn fix_email(email: &str) -> Option<String> {
    let fixed = normalize_email(email);
    (fixed != email).then_some(fixed)
}

/// Cheap shape check, full validation is the confirmation e-mail.
pub fn looks_like_email(email: &str) -> bool {
    match email.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize_name() {
        assert_eq!(capitalize_name("jean-pierre DUPONT"), "Jean-Pierre Dupont");
        assert_eq!(capitalize_name("  éloïse   d'ARTAGNAN "), "Éloïse D'Artagnan");
        assert_eq!(capitalize_name("Marie"), "Marie");
        assert_eq!(capitalize_name(""), "");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Lucas.Martin@GMIAL.com "), "lucas.martin@gmail.com");
        assert_eq!(normalize_email("a@yahooo.fr"), "a@yahoo.fr");
        assert_eq!(normalize_email("a@example.org"), "a@example.org");
        assert_eq!(normalize_email("not-an-email"), "not-an-email");
    }

    #[test]
    fn test_fix_email_only_reports_changes() {
        assert_eq!(fix_email("x@gmail.com"), None);
        assert_eq!(fix_email("x@hotmial.com"), Some("x@hotmail.com".to_string()));
        assert_eq!(fix_email("X@gmail.com"), Some("x@gmail.com".to_string()));
    }

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("coach@club.fr"));
        assert!(!looks_like_email("coach@club"));
        assert!(!looks_like_email("@club.fr"));
        assert!(!looks_like_email("coach.club.fr"));
    }
}
