//! Well-known mail services addressable by name.

/// Connection details of a named mail service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WellKnownService {
    pub host: &'static str,
    pub port: u16,
    /// Implicit TLS when true, mandatory STARTTLS otherwise.
    pub secure: bool,
}

const fn service(host: &'static str, port: u16, secure: bool) -> WellKnownService {
    WellKnownService { host, port, secure }
}

const SERVICES: &[(&[&str], WellKnownService)] = &[
    (&["gmail", "googlemail"], service("smtp.gmail.com", 465, true)),
    (&["outlook", "hotmail", "live"], service("smtp-mail.outlook.com", 587, false)),
    (&["outlook365", "office365"], service("smtp.office365.com", 587, false)),
    (&["yahoo", "ymail"], service("smtp.mail.yahoo.com", 465, true)),
    (&["sendgrid"], service("smtp.sendgrid.net", 587, false)),
    (&["mailgun"], service("smtp.mailgun.org", 465, true)),
    (&["postmark"], service("smtp.postmarkapp.com", 2525, false)),
    (&["zoho"], service("smtp.zoho.com", 465, true)),
    (&["icloud", "me", "mac"], service("smtp.mail.me.com", 587, false)),
    (&["fastmail"], service("smtp.fastmail.com", 465, true)),
    (&["mailjet"], service("in-v3.mailjet.com", 587, false)),
    (&["ses", "sesuseast1"], service("email-smtp.us-east-1.amazonaws.com", 465, true)),
];

/// Look up a service by name.
///
/// Matching ignores case and any non-alphanumeric characters, so `Office 365`
/// and `office-365` name the same service.
pub fn lookup_service(name: &str) -> Option<WellKnownService> {
    let key: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    SERVICES
        .iter()
        .find(|(aliases, _)| aliases.contains(&key.as_str()))
        .map(|(_, service)| *service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case_and_punctuation() {
        assert_eq!(lookup_service("Gmail").map(|s| s.host), Some("smtp.gmail.com"));
        assert_eq!(lookup_service("Office 365").map(|s| s.host), Some("smtp.office365.com"));
        assert_eq!(lookup_service("SES-US-EAST-1").map(|s| s.port), Some(465));
    }

    #[test]
    fn test_aliases_share_settings() {
        assert_eq!(lookup_service("hotmail"), lookup_service("Outlook"));
    }

    #[test]
    fn test_unknown_service() {
        assert!(lookup_service("mail.example.com").is_none());
        assert!(lookup_service("").is_none());
    }
}
